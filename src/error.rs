//! Error types for the PDF to slides pipeline

use thiserror::Error;

/// Result type alias for the PDF to slides pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error types.
///
/// Anything in here aborts the operation that returned it. Problems that only
/// degrade one run or one page are reported as [`Degradation`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is password protected and no password was provided
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Incorrect password provided
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Page out of bounds (0-based index)
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: usize, total: usize },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// The document reader could not rasterize a page
    #[error("Failed to render page {page}: {reason}")]
    PageRender { page: usize, reason: String },

    /// Conversion settings rejected by validation
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Font substitution table rejected by validation
    #[error("Invalid font table: {reason}")]
    InvalidFontTable { reason: String },

    /// The deck assembler rejected the slide list
    #[error("Deck assembly failed: {reason}")]
    DeckAssembly { reason: String },

    /// The caller cancelled the conversion
    #[error("Conversion cancelled after {completed} page(s)")]
    Cancelled { completed: usize },

    /// A page worker panicked or was aborted
    #[error("Page task failed: {reason}")]
    Task { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encode/decode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Return a sanitized error message safe to show to end users.
    /// Internal details (paths, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::PasswordRequired => "PDF is password protected".to_string(),
            Error::IncorrectPassword => "Incorrect password".to_string(),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::PageRender { page, .. } => format!("Page {} could not be rendered", page),
            Error::InvalidConfig { reason } => format!("Invalid configuration: {}", reason),
            Error::InvalidFontTable { reason } => format!("Invalid font table: {}", reason),
            Error::DeckAssembly { .. } => "Slide deck could not be written".to_string(),
            Error::Cancelled { .. } => "Conversion cancelled".to_string(),
            Error::Task { .. } => "Internal processing error".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Image(_) => "Image processing error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
        }
    }
}

/// Why a single text run was left out of a slide
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("empty bounding box ({width} x {height} pt)")]
    EmptyBox { width: f64, height: f64 },

    #[error("non-finite coordinates")]
    NonFinite,

    #[error("bounding box outside the page")]
    OutOfPage,
}

/// A recoverable quality problem, collected into the conversion summary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Degradation {
    /// A run was dropped because its geometry is unusable
    #[error("page {page}, run {run}: skipped, {reason}")]
    MalformedGeometry {
        page: usize,
        run: usize,
        reason: SkipReason,
    },

    /// No usable border around an erase region, a fallback fill was used
    #[error("page {page}: no background sample around region {region}, used fallback fill")]
    SamplingFailure { page: usize, region: usize },

    /// The reader could not produce a raster or text layer for the page
    #[error("page {page}: skipped, {reason}")]
    PageRenderFailure { page: usize, reason: String },

    /// The notes generator failed, fallback notes were attached
    #[error("slide {page}: speaker notes unavailable, {reason}")]
    NotesUnavailable { page: usize, reason: String },
}
