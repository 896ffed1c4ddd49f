//! Speaker notes hook
//!
//! The text generation service itself lives outside this crate. Callers plug
//! it in through [`NotesGenerator`]; retries and rate limiting are theirs.

use crate::error::Degradation;
use crate::model::Slide;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attached when the generator fails
pub const FALLBACK_NOTES: &str = "Speaker notes could not be generated for this slide.";

/// What the generator is shown
#[derive(Debug, Clone, Copy)]
pub enum NotesInput<'a> {
    /// The page as rendered, text included
    Image(&'a RgbImage),
    /// The slide's text, one text box per line
    Text(&'a str),
}

/// Which [`NotesInput`] the pipeline builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotesMode {
    #[default]
    Image,
    Text,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotesError {
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// External text generation service
pub trait NotesGenerator: Send + Sync {
    fn generate(&self, input: NotesInput<'_>) -> Result<String, NotesError>;
}

/// Text of a slide as the text-mode prompt input
pub fn slide_text(slide: &Slide) -> String {
    slide
        .text_boxes
        .iter()
        .map(|b| b.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the generator for notes and attach them to the slide.
///
/// `page_raster` is the rendered page before text removal; image mode shows
/// it to the generator. Failures and empty answers attach [`FALLBACK_NOTES`]
/// and return a degradation; they never fail the slide.
pub fn attach_notes(
    generator: &dyn NotesGenerator,
    mode: NotesMode,
    page_raster: &RgbImage,
    slide: &mut Slide,
) -> Option<Degradation> {
    let result = match mode {
        NotesMode::Image => generator.generate(NotesInput::Image(page_raster)),
        NotesMode::Text => {
            let text = slide_text(slide);
            generator.generate(NotesInput::Text(&text))
        }
    };

    let (notes, degradation) = match result {
        Ok(notes) if !notes.trim().is_empty() => (notes.trim().to_string(), None),
        Ok(_) => (
            FALLBACK_NOTES.to_string(),
            Some("generator returned no text".to_string()),
        ),
        Err(e) => (FALLBACK_NOTES.to_string(), Some(e.to_string())),
    };

    slide.notes = Some(notes);
    degradation.map(|reason| {
        tracing::warn!(page = slide.index, %reason, "speaker notes unavailable");
        Degradation::NotesUnavailable {
            page: slide.index,
            reason,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::placeholder_slide;
    use crate::model::{Rgb, StyledTextBox};
    use crate::Canvas;

    struct Echo;

    impl NotesGenerator for Echo {
        fn generate(&self, input: NotesInput<'_>) -> Result<String, NotesError> {
            match input {
                NotesInput::Image(img) => Ok(format!("  image {}x{}\n", img.width(), img.height())),
                NotesInput::Text(t) => Ok(format!("text: {}", t)),
            }
        }
    }

    struct Failing;

    impl NotesGenerator for Failing {
        fn generate(&self, _: NotesInput<'_>) -> Result<String, NotesError> {
            Err(NotesError::RateLimited {
                retry_after_secs: Some(30),
            })
        }
    }

    fn text_box(text: &str) -> StyledTextBox {
        StyledTextBox {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            text: text.to_string(),
            font_family: "Arial".to_string(),
            size_pt: 12.0,
            bold: false,
            italic: false,
            color: Rgb::BLACK,
        }
    }

    fn page() -> RgbImage {
        RgbImage::new(40, 30)
    }

    #[test]
    fn test_image_mode_shows_page_raster() {
        let mut slide = placeholder_slide(0, Canvas::WIDESCREEN);
        assert!(attach_notes(&Echo, NotesMode::Image, &page(), &mut slide).is_none());
        // the page, not the 1x1 placeholder background
        assert_eq!(slide.notes.as_deref(), Some("image 40x30"));
    }

    #[test]
    fn test_text_mode_joins_boxes_in_order() {
        let mut slide = placeholder_slide(0, Canvas::WIDESCREEN);
        slide.text_boxes = vec![text_box("Title"), text_box("  "), text_box("Body ")];
        attach_notes(&Echo, NotesMode::Text, &page(), &mut slide);
        assert_eq!(slide.notes.as_deref(), Some("text: Title\nBody"));
    }

    #[test]
    fn test_failure_attaches_fallback() {
        let mut slide = placeholder_slide(7, Canvas::WIDESCREEN);
        let degradation = attach_notes(&Failing, NotesMode::Image, &page(), &mut slide);
        assert_eq!(slide.notes.as_deref(), Some(FALLBACK_NOTES));
        assert!(matches!(
            degradation,
            Some(Degradation::NotesUnavailable { page: 7, .. })
        ));
    }
}
