//! Diagram rendering collaborator.

use std::path::{Path, PathBuf};

/// Renders diagram source text to a raster image.
///
/// Implementations write the image into `output_dir` and return its path.
/// `None` means the renderer is unavailable or rendering failed; callers
/// substitute a fallback block and carry on.
pub trait DiagramRenderer: Send + Sync {
    /// Render `source` into an image file inside `output_dir`.
    fn render(&self, source: &str, output_dir: &Path) -> Option<PathBuf>;
}

impl<T: DiagramRenderer + ?Sized> DiagramRenderer for std::sync::Arc<T> {
    fn render(&self, source: &str, output_dir: &Path) -> Option<PathBuf> {
        (**self).render(source, output_dir)
    }
}
