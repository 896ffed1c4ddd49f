//! Deck assembly
//!
//! [`DeckAssembler`] is the boundary to whatever serializes the final deck.
//! Slides arrive in page order, each fully composed, and only after the whole
//! list passed [`validate_slide`].

use crate::compose::Canvas;
use crate::error::{Error, Result};
use crate::model::{Slide, SlideRect, StyledTextBox};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name written into deck manifests
pub const GENERATOR: &str = concat!("pdf-to-slides ", env!("CARGO_PKG_VERSION"));

/// Consumer of the ordered slide sequence
pub trait DeckAssembler {
    /// Add the next slide; called in page order
    fn add_slide(&mut self, slide: &Slide) -> Result<()>;

    /// Commit the deck; nothing is visible to others before this succeeds
    fn finish(&mut self) -> Result<()>;
}

fn check_box(slide: usize, index: usize, b: &StyledTextBox) -> Result<()> {
    let problem = if b.text.trim().is_empty() {
        Some("empty text")
    } else if b.width <= 0 || b.height <= 0 {
        Some("non-positive size")
    } else if !(b.size_pt.is_finite() && b.size_pt > 0.0) {
        Some("non-positive font size")
    } else if b.font_family.trim().is_empty() {
        Some("empty font family")
    } else {
        None
    };

    match problem {
        Some(p) => Err(Error::DeckAssembly {
            reason: format!("slide {}, text box {}: {}", slide, index, p),
        }),
        None => Ok(()),
    }
}

/// Reject text boxes a deck writer cannot represent
pub fn validate_slide(slide: &Slide) -> Result<()> {
    if slide.background_rect.width <= 0 || slide.background_rect.height <= 0 {
        return Err(Error::DeckAssembly {
            reason: format!("slide {}: empty background placement", slide.index),
        });
    }
    for (i, b) in slide.text_boxes.iter().enumerate() {
        check_box(slide.index, i, b)?;
    }
    Ok(())
}

/// Collects slides in memory
#[derive(Debug, Default)]
pub struct MemoryDeck {
    slides: Vec<Slide>,
    finished: bool,
}

impl MemoryDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn into_slides(self) -> Vec<Slide> {
        self.slides
    }
}

impl DeckAssembler for MemoryDeck {
    fn add_slide(&mut self, slide: &Slide) -> Result<()> {
        validate_slide(slide)?;
        self.slides.push(slide.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Manifest entry for one slide
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideEntry {
    pub index: usize,
    /// File name of the background PNG, relative to the deck directory
    pub background: String,
    pub background_rect: SlideRect,
    pub text_boxes: Vec<StyledTextBox>,
    pub notes: Option<String>,
    pub placeholder: bool,
}

/// `deck.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckManifest {
    pub generator: String,
    pub created_at: String,
    pub canvas: Canvas,
    pub slides: Vec<SlideEntry>,
}

/// Writes `slide-NNN.png` backgrounds plus a `deck.json` manifest.
///
/// Output goes to a staging directory next to the target that is renamed into
/// place by [`DeckAssembler::finish`]; an unfinished staging directory is
/// removed on drop.
#[derive(Debug)]
pub struct DirectoryDeck {
    target: PathBuf,
    staging: PathBuf,
    manifest: DeckManifest,
    finished: bool,
}

impl DirectoryDeck {
    pub const MANIFEST: &'static str = "deck.json";

    pub fn create<P: AsRef<Path>>(target: P, canvas: Canvas) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        if target.exists() {
            return Err(Error::DeckAssembly {
                reason: format!("output {} already exists", target.display()),
            });
        }

        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "deck".to_string());
        let staging = target.with_file_name(format!(".{}.{}.partial", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&staging)?;

        Ok(Self {
            target,
            staging,
            manifest: DeckManifest {
                generator: GENERATOR.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
                canvas,
                slides: Vec::new(),
            },
            finished: false,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Read a finished deck's manifest
    pub fn read_manifest<P: AsRef<Path>>(dir: P) -> Result<DeckManifest> {
        let json = std::fs::read_to_string(dir.as_ref().join(Self::MANIFEST))?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl DeckAssembler for DirectoryDeck {
    fn add_slide(&mut self, slide: &Slide) -> Result<()> {
        validate_slide(slide)?;

        let file = format!("slide-{:03}.png", self.manifest.slides.len() + 1);
        slide
            .background
            .save_with_format(self.staging.join(&file), image::ImageFormat::Png)?;

        self.manifest.slides.push(SlideEntry {
            index: slide.index,
            background: file,
            background_rect: slide.background_rect,
            text_boxes: slide.text_boxes.clone(),
            notes: slide.notes.clone(),
            placeholder: slide.placeholder,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.manifest)?;
        std::fs::write(self.staging.join(Self::MANIFEST), json)?;
        std::fs::rename(&self.staging, &self.target)?;
        self.finished = true;
        tracing::info!(
            path = %self.target.display(),
            slides = self.manifest.slides.len(),
            "deck written"
        );
        Ok(())
    }
}

impl Drop for DirectoryDeck {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = std::fs::remove_dir_all(&self.staging) {
                tracing::debug!(
                    error = %e,
                    path = %self.staging.display(),
                    "staging cleanup failed"
                );
            }
        }
    }
}
