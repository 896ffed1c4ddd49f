//! Page source contract

use crate::error::Result;
use crate::model::{PageSize, TextSpan};
use image::RgbImage;

/// Per-page access to a document's raster and text layer.
///
/// Implementations are shared by concurrent page workers, so every method
/// takes `&self` and returns owned data.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Page size in points
    fn page_size(&self, index: usize) -> Result<PageSize>;

    /// Render the page to 8-bit RGB at `dpi`
    fn render_raster(&self, index: usize, dpi: f64) -> Result<RgbImage>;

    /// Text layer entries in document order, boxes in top-left page points
    fn extract_text_layer(&self, index: usize) -> Result<Vec<TextSpan>>;
}
