//! Conversions between PDF points, raster pixels and slide lengths (EMU)
//!
//! Every conversion is a single linear factor. Nothing here rounds: callers
//! pick their own rounding policy so composed conversions stay consistent.

/// PDF user space units per inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// English Metric Units per inch (the slide length unit)
pub const EMU_PER_INCH: f64 = 914_400.0;

/// English Metric Units per PDF point
pub const EMU_PER_POINT: f64 = EMU_PER_INCH / POINTS_PER_INCH;

/// Points to raster pixels at `dpi` (factor `dpi / 72`)
pub fn points_to_pixels(value_pt: f64, dpi: f64) -> f64 {
    value_pt * dpi / POINTS_PER_INCH
}

/// Raster pixels at `dpi` back to points
pub fn pixels_to_points(value_px: f64, dpi: f64) -> f64 {
    value_px * POINTS_PER_INCH / dpi
}

/// Raster pixels at `dpi` to slide length units
pub fn pixels_to_slide_length(value_px: f64, dpi: f64) -> f64 {
    value_px * EMU_PER_INCH / dpi
}

/// Slide length units to raster pixels at `dpi`
pub fn slide_length_to_pixels(value_emu: f64, dpi: f64) -> f64 {
    value_emu * dpi / EMU_PER_INCH
}

/// Points to slide length units
pub fn points_to_slide_length(value_pt: f64) -> f64 {
    value_pt * EMU_PER_POINT
}

/// Slide length units to points
pub fn slide_length_to_points(value_emu: f64) -> f64 {
    value_emu / EMU_PER_POINT
}

/// Inches to slide length units
pub fn inches_to_slide_length(inches: f64) -> f64 {
    inches * EMU_PER_INCH
}

/// Effective DPI of a raster `pixels` wide that covers `points` of page space
pub fn effective_dpi(pixels: u32, points: f64) -> f64 {
    pixels as f64 * POINTS_PER_INCH / points
}
