//! Data model shared by the pipeline stages
//!
//! Page space uses PDF points with a top-left origin (y grows downwards).
//! Slide space uses EMU, also top-left.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Font family sentinel for runs whose source layer carried no font name
pub const UNKNOWN_FONT: &str = "unknown";

/// Axis-aligned rectangle in page points, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Clip to `[0, width] x [0, height]`
    pub fn clamp_to(&self, width: f64, height: f64) -> Rect {
        let x0 = self.x.clamp(0.0, width);
        let y0 = self.y.clamp(0.0, height);
        let x1 = self.right().clamp(0.0, width);
        let y1 = self.bottom().clamp(0.0, height);
        Rect::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(px: image::Rgb<u8>) -> Self {
        Rgb::new(px[0], px[1], px[2])
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(c: Rgb) -> Self {
        image::Rgb([c.r, c.g, c.b])
    }
}

// Colors travel as hex strings in the deck manifest
impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Rgb::from_hex(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color \"{}\"", value)))
    }
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f64,
    pub height_pt: f64,
}

impl PageSize {
    pub fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }

    /// US Letter, portrait
    pub const LETTER: PageSize = PageSize {
        width_pt: 612.0,
        height_pt: 792.0,
    };
}

/// One source page with its raster, consumed once by the pipeline
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based page index
    pub index: usize,
    pub size: PageSize,
    /// Density the raster was rendered at
    pub dpi: f64,
    pub raster: RgbImage,
}

/// One entry of the reader's raw text layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSpan {
    pub text: String,
    /// Bounding box in page points, top-left origin
    pub bbox: Option<Rect>,
    pub font_name: Option<String>,
    pub font_size_pt: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub color: Option<Rgb>,
}

/// Smallest unit of styled text on a page
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Position of the source span in the page's text layer; degradations
    /// name runs by this index
    pub layer_index: usize,
    pub text: String,
    pub bbox: Rect,
    /// Source family name, possibly [`UNKNOWN_FONT`]
    pub font_family: String,
    pub font_size_pt: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgb,
}

/// Font resolved against the target rendering environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFont {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

/// A run paired with its resolved font, ready for layout
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun {
    pub run: TextRun,
    pub font: ResolvedFont,
}

/// Rectangle in slide length units (EMU)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Positioned, styled text box handed to the deck assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledTextBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub text: String,
    pub font_family: String,
    pub size_pt: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgb,
}

/// One output slide; only ever published fully composed
#[derive(Debug, Clone)]
pub struct Slide {
    /// Index of the source page
    pub index: usize,
    pub background: RgbImage,
    /// Where the background picture sits on the canvas
    pub background_rect: SlideRect,
    /// Z-order follows sequence order
    pub text_boxes: Vec<StyledTextBox>,
    pub notes: Option<String>,
    /// True when the page failed to render and this slide only holds its place
    pub placeholder: bool,
}
