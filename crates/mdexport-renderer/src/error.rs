//! Error types for document emission.

/// Error raised while building or serializing a document.
///
/// These never escape [`crate::Converter::convert`]; they are logged and
/// reported as a failed [`crate::ConversionOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// OOXML package could not be written.
    #[error("Word package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Image could not be decoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Error raised while applying a header or footer.
#[derive(Debug, thiserror::Error)]
pub enum DecorationError {
    /// Color value is not `#rrggbb`.
    #[error("Invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),

    /// Font size is zero, negative or not finite.
    #[error("Invalid font size {0}")]
    InvalidFontSize(f32),
}

/// Output format name was not recognized.
#[derive(Debug, thiserror::Error)]
#[error("Unknown output format {0:?}, expected word, pdf or html")]
pub struct UnknownFormatError(pub String);
