//! Document reading layer
//!
//! The pipeline consumes pages through [`PageSource`]; [`PdfiumSource`] is the
//! PDFium-backed implementation.

mod reader;
mod source;

pub use reader::{PdfiumSource, PDF_MAGIC};
pub use source::PageSource;
