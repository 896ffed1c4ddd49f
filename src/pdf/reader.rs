//! PDF reader wrapper for PDFium

use crate::error::{Error, Result};
use crate::model::{PageSize, Rect, Rgb, TextSpan};
use crate::pdf::PageSource;
use crate::units::POINTS_PER_INCH;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::Path;

/// Every PDF starts with this
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    // Try to bind to system library or use static linking
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

fn check_header(data: &[u8]) -> Result<()> {
    if data.len() < PDF_MAGIC.len() || &data[..PDF_MAGIC.len()] != PDF_MAGIC {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}

/// Page source reading a PDF held in memory.
///
/// Only page sizes are read up front. Every render or text request binds its
/// own PDFium instance and reloads the document, so one source can serve
/// concurrent page workers.
pub struct PdfiumSource {
    data: Vec<u8>,
    password: Option<String>,
    page_sizes: Vec<PageSize>,
}

impl PdfiumSource {
    /// Open a PDF from a file path
    pub fn open<P: AsRef<Path>>(path: P, password: Option<&str>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::PdfNotFound {
                path: path.display().to_string(),
            });
        }

        let data = std::fs::read(path)?;
        Self::open_bytes(data, password)
    }

    /// Open a PDF from bytes
    pub fn open_bytes(data: Vec<u8>, password: Option<&str>) -> Result<Self> {
        check_header(&data)?;

        let pdfium = create_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&data, password)
            .map_err(|e| Self::map_pdfium_error(e, password.is_some()))?;

        let page_sizes = document
            .pages()
            .iter()
            .map(|page| PageSize::new(page.width().value as f64, page.height().value as f64))
            .collect::<Vec<_>>();

        tracing::debug!(pages = page_sizes.len(), bytes = data.len(), "opened PDF");

        drop(document);
        Ok(Self {
            data,
            password: password.map(str::to_string),
            page_sizes,
        })
    }

    fn map_pdfium_error(err: PdfiumError, has_password: bool) -> Error {
        match err {
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                if has_password {
                    Error::IncorrectPassword
                } else {
                    Error::PasswordRequired
                }
            }
            _ => Error::Pdfium {
                reason: format!("{}", err),
            },
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.page_sizes.len() {
            return Err(Error::PageOutOfBounds {
                page: index,
                total: self.page_sizes.len(),
            });
        }
        Ok(())
    }

    /// Run `f` against one page of a freshly loaded document
    fn with_page<T>(&self, index: usize, f: impl FnOnce(&PdfPage) -> Result<T>) -> Result<T> {
        self.check_index(index)?;
        let page_index = u16::try_from(index).map_err(|_| Error::PageOutOfBounds {
            page: index,
            total: self.page_sizes.len(),
        })?;

        let pdfium = create_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&self.data, self.password.as_deref())
            .map_err(|e| Self::map_pdfium_error(e, self.password.is_some()))?;
        let pages = document.pages();
        let page = pages.get(page_index).map_err(|e| Error::Pdfium {
            reason: format!("Failed to get page {}: {}", index, e),
        })?;

        f(&page)
    }

    /// Collect text objects as spans; PDF space is bottom-left, spans are top-left
    fn collect_spans(page: &PdfPage) -> Vec<TextSpan> {
        let page_height = page.height().value as f64;
        let mut spans = Vec::new();

        for object in page.objects().iter() {
            let text_object = match object {
                PdfPageObject::Text(ref text_obj) => text_obj,
                _ => continue,
            };

            let bbox = object.bounds().ok().map(|bounds| {
                let left = bounds.left().value as f64;
                let bottom = bounds.bottom().value as f64;
                let width = bounds.width().value as f64;
                let height = bounds.height().value as f64;
                Rect::new(left, page_height - bottom - height, width, height)
            });

            let font = text_object.font();
            let font_name = Some(font.name()).filter(|n| !n.trim().is_empty());
            let color = object
                .fill_color()
                .ok()
                .map(|c| Rgb::new(c.red(), c.green(), c.blue()));

            spans.push(TextSpan {
                text: text_object.text(),
                bbox,
                font_name,
                font_size_pt: Some(text_object.scaled_font_size().value as f64),
                bold: font.is_bold_reenforced(),
                italic: font.is_italic(),
                color,
            });
        }

        spans
    }
}

impl PageSource for PdfiumSource {
    fn page_count(&self) -> usize {
        self.page_sizes.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        self.check_index(index)?;
        Ok(self.page_sizes[index])
    }

    fn render_raster(&self, index: usize, dpi: f64) -> Result<RgbImage> {
        self.with_page(index, |page| {
            let config = PdfRenderConfig::new()
                .scale_page_by_factor((dpi / POINTS_PER_INCH) as f32)
                .render_form_data(true)
                .render_annotations(true);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| Error::PageRender {
                    page: index,
                    reason: e.to_string(),
                })?;

            Ok(bitmap.as_image().to_rgb8())
        })
    }

    fn extract_text_layer(&self, index: usize) -> Result<Vec<TextSpan>> {
        self.with_page(index, |page| Ok(Self::collect_spans(page)))
    }
}
