//! Mermaid diagram rendering for mdexport.
//!
//! Two [`DiagramRenderer`] backends are provided:
//! - [`MermaidCli`]: runs the local `mmdc` executable
//! - [`KrokiRenderer`]: posts the source to a Kroki server
//!
//! Both write a PNG into the caller's working directory and return `None` on
//! any failure, which the converter turns into a fallback code block.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mdexport_diagrams::MermaidCli;
//! use mdexport_renderer::{Converter, OutputFormat};
//!
//! let converter = Converter::new().with_diagrams(Arc::new(MermaidCli::new()));
//! let outcome = converter.convert(
//!     "```mermaid\ngraph TD\n    A-->B\n```",
//!     OutputFormat::Pdf,
//!     "flow.pdf".as_ref(),
//! );
//! assert!(outcome.success);
//! ```

mod consts;
mod kroki;
mod mermaid;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use mdexport_renderer::DiagramRenderer;

pub use consts::DEFAULT_TIMEOUT;
pub use kroki::{KrokiError, KrokiRenderer};
pub use mermaid::{MermaidCli, MermaidError};

/// Pick a renderer from configuration.
///
/// A Kroki URL takes precedence over `mmdc`. Without an explicit `mmdc`
/// path the executable is looked up on `PATH`.
pub fn select_renderer(
    kroki_url: Option<&str>,
    mmdc_path: Option<&Path>,
    timeout: Duration,
) -> Arc<dyn DiagramRenderer> {
    if let Some(url) = kroki_url {
        tracing::info!(kroki_url = %url, "Rendering diagrams via Kroki");
        return Arc::new(KrokiRenderer::new(url).with_timeout(timeout));
    }

    let cli = match mmdc_path {
        Some(path) => MermaidCli::with_program(path),
        None => MermaidCli::new(),
    };
    if let Some(program) = cli.program() {
        tracing::info!(mmdc = %program.display(), "Rendering diagrams via mmdc");
    }
    Arc::new(cli.with_timeout(timeout))
}
