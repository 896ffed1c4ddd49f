//! Conversion settings

use crate::compose::{Canvas, ComposeConfig};
use crate::erase::EraseConfig;
use crate::error::{Error, Result};
use crate::notes::NotesMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Semaphore;

/// Environment variable naming a JSON config file
pub const ENV_CONFIG: &str = "PDF_TO_SLIDES_CONFIG";
/// Environment override for [`ConvertConfig::dpi`]
pub const ENV_DPI: &str = "PDF_TO_SLIDES_DPI";
/// Environment override for [`ConvertConfig::concurrency`]
pub const ENV_CONCURRENCY: &str = "PDF_TO_SLIDES_CONCURRENCY";

/// What to emit for a page that could not be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderPolicy {
    /// A blank slide keeps slide numbers aligned with page numbers
    #[default]
    BlankSlide,
    Omit,
}

/// Settings for a document conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Rasterization density (default: 200)
    pub dpi: f64,
    /// Pages processed at once (default: 4)
    pub concurrency: usize,
    /// Target slide size (default: 10 x 5.625 in)
    pub canvas: Canvas,
    pub erase: EraseConfig,
    /// Share of each text box height trimmed (default: 0.1)
    pub text_tighten: f64,
    pub placeholder: PlaceholderPolicy,
    pub notes_input: NotesMode,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            dpi: 200.0,
            concurrency: 4,
            canvas: Canvas::WIDESCREEN,
            erase: EraseConfig::default(),
            text_tighten: 0.1,
            placeholder: PlaceholderPolicy::BlankSlide,
            notes_input: NotesMode::Image,
        }
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        reason: reason.into(),
    }
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            return Err(invalid(format!("dpi must be positive, got {}", self.dpi)));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency must be at least 1"));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(invalid(format!(
                "concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.concurrency
            )));
        }
        if self.canvas.width_emu <= 0 || self.canvas.height_emu <= 0 {
            return Err(invalid("canvas must have a positive size"));
        }
        if !(0.0..1.0).contains(&self.text_tighten) {
            return Err(invalid(format!(
                "text_tighten must be in [0, 1), got {}",
                self.text_tighten
            )));
        }
        if !(0.0..=1.0).contains(&self.erase.flat_ratio) {
            return Err(invalid("erase.flat_ratio must be in [0, 1]"));
        }
        Ok(())
    }

    pub fn compose(&self) -> ComposeConfig {
        ComposeConfig {
            canvas: self.canvas,
            text_tighten: self.text_tighten,
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overlaid with the config file and variables from the environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(dpi) = lookup(ENV_DPI) {
            config.dpi = dpi
                .trim()
                .parse()
                .map_err(|_| invalid(format!("{} is not a number: {}", ENV_DPI, dpi)))?;
        }
        if let Some(n) = lookup(ENV_CONCURRENCY) {
            config.concurrency = n
                .trim()
                .parse()
                .map_err(|_| invalid(format!("{} is not a count: {}", ENV_CONCURRENCY, n)))?;
        }

        config.validate()?;
        Ok(config)
    }
}
