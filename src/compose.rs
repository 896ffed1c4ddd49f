//! Slide layout: background placement and text box positioning

use crate::error::{Degradation, SkipReason};
use crate::extract::validate_bbox;
use crate::model::{PageSize, Rect, Slide, SlideRect, StyledRun, StyledTextBox};
use crate::units::{inches_to_slide_length, points_to_slide_length, slide_length_to_points};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Target slide size in EMU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width_emu: i64,
    pub height_emu: i64,
}

impl Canvas {
    /// 10 x 5.625 inches (16:9)
    pub const WIDESCREEN: Canvas = Canvas {
        width_emu: 9_144_000,
        height_emu: 5_143_500,
    };

    /// 10 x 7.5 inches (4:3)
    pub const STANDARD: Canvas = Canvas {
        width_emu: 9_144_000,
        height_emu: 6_858_000,
    };

    pub fn from_inches(width: f64, height: f64) -> Self {
        Self {
            width_emu: inches_to_slide_length(width).round() as i64,
            height_emu: inches_to_slide_length(height).round() as i64,
        }
    }

    pub fn full(&self) -> SlideRect {
        SlideRect {
            x: 0,
            y: 0,
            width: self.width_emu,
            height: self.height_emu,
        }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas::WIDESCREEN
    }
}

/// Where a page lands on the canvas and at what scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Page origin on the canvas, EMU
    pub left: f64,
    pub top: f64,
    /// EMU per page point
    pub scale: f64,
    pub page: PageSize,
}

impl Placement {
    /// Fit the page inside the canvas keeping its aspect ratio, centred on the
    /// axis with slack
    pub fn fit(page: PageSize, canvas: Canvas) -> Self {
        let canvas_w = canvas.width_emu as f64;
        let canvas_h = canvas.height_emu as f64;
        let scale = (canvas_w / page.width_pt).min(canvas_h / page.height_pt);

        Self {
            left: (canvas_w - page.width_pt * scale) / 2.0,
            top: (canvas_h - page.height_pt * scale) / 2.0,
            scale,
            page,
        }
    }

    /// Page point rectangle to canvas EMU, unrounded
    pub fn map(&self, r: &Rect) -> (f64, f64, f64, f64) {
        (
            self.left + r.x * self.scale,
            self.top + r.y * self.scale,
            r.width * self.scale,
            r.height * self.scale,
        )
    }

    /// Rectangle covered by the background picture
    pub fn background_rect(&self) -> SlideRect {
        let page = Rect::new(0.0, 0.0, self.page.width_pt, self.page.height_pt);
        let (x, y, w, h) = self.map(&page);
        SlideRect {
            x: x.round() as i64,
            y: y.round() as i64,
            width: w.round() as i64,
            height: h.round() as i64,
        }
    }

    /// Font size on the slide for a size on the page
    pub fn scale_font(&self, size_pt: f64) -> f64 {
        slide_length_to_points(size_pt * self.scale)
    }

    /// Ratio of slide length to page length (1.0 when the page fills the canvas at 1pt = 1pt)
    pub fn zoom(&self) -> f64 {
        self.scale / points_to_slide_length(1.0)
    }
}

/// Layout settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub canvas: Canvas,
    /// Share of each box height removed (half above, half below); extraction
    /// boxes include ascent and descent, which overflow once re-rendered
    pub text_tighten: f64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::WIDESCREEN,
            text_tighten: 0.1,
        }
    }
}

/// Layout result for one page
#[derive(Debug, Clone)]
pub struct ComposedSlide {
    pub slide: Slide,
    pub skipped: Vec<Degradation>,
}

/// Place one run on the canvas
pub fn place_run(
    styled: &StyledRun,
    placement: &Placement,
    text_tighten: f64,
) -> Result<StyledTextBox, SkipReason> {
    let bbox = validate_bbox(&styled.run.bbox, placement.page)?;

    let inset = bbox.height * text_tighten / 2.0;
    let height = bbox.height - 2.0 * inset;
    let tight = Rect::new(bbox.x, bbox.y + inset, bbox.width, height);
    let (x, y, w, h) = placement.map(&tight);

    Ok(StyledTextBox {
        x: x.round() as i64,
        y: y.round() as i64,
        width: w.round().max(1.0) as i64,
        height: h.round().max(1.0) as i64,
        text: styled.run.text.clone(),
        font_family: styled.font.family.clone(),
        size_pt: placement.scale_font(styled.run.font_size_pt),
        bold: styled.font.bold,
        italic: styled.font.italic,
        color: styled.run.color,
    })
}

/// Build the slide for one page from its cleaned raster and styled runs.
///
/// Output boxes keep run order; runs with unusable geometry are skipped and
/// reported.
pub fn compose_slide(
    page_index: usize,
    page: PageSize,
    background: RgbImage,
    runs: &[StyledRun],
    config: &ComposeConfig,
) -> ComposedSlide {
    let placement = Placement::fit(page, config.canvas);
    let mut text_boxes = Vec::with_capacity(runs.len());
    let mut skipped = Vec::new();

    for styled in runs {
        match place_run(styled, &placement, config.text_tighten) {
            Ok(text_box) => text_boxes.push(text_box),
            Err(reason) => {
                let run = styled.run.layer_index;
                tracing::warn!(page = page_index, run, %reason, "text box skipped");
                skipped.push(Degradation::MalformedGeometry {
                    page: page_index,
                    run,
                    reason,
                });
            }
        }
    }

    tracing::debug!(
        page = page_index,
        boxes = text_boxes.len(),
        zoom = placement.zoom(),
        "composed slide"
    );

    ComposedSlide {
        slide: Slide {
            index: page_index,
            background,
            background_rect: placement.background_rect(),
            text_boxes,
            notes: None,
            placeholder: false,
        },
        skipped,
    }
}

/// Slide standing in for a page that could not be rendered
pub fn placeholder_slide(page_index: usize, canvas: Canvas) -> Slide {
    Slide {
        index: page_index,
        background: RgbImage::from_pixel(1, 1, image::Rgb([255, 255, 255])),
        background_rect: canvas.full(),
        text_boxes: Vec::new(),
        notes: None,
        placeholder: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResolvedFont, Rgb, TextRun};
    use crate::units::EMU_PER_POINT;
    use pretty_assertions::assert_eq;

    fn styled(text: &str, bbox: Rect, size: f64) -> StyledRun {
        StyledRun {
            run: TextRun {
                layer_index: 0,
                text: text.to_string(),
                bbox,
                font_family: "Helvetica".to_string(),
                font_size_pt: size,
                bold: false,
                italic: false,
                color: Rgb::new(10, 20, 30),
            },
            font: ResolvedFont {
                family: "Arial".to_string(),
                bold: true,
                italic: false,
            },
        }
    }

    #[test]
    fn test_portrait_page_is_pillarboxed() {
        let p = Placement::fit(PageSize::LETTER, Canvas::WIDESCREEN);
        let bg = p.background_rect();
        assert_eq!(bg.height, Canvas::WIDESCREEN.height_emu);
        assert_eq!(bg.y, 0);
        // 612/792 of the height, centred horizontally
        let expected_w = (5_143_500.0 * 612.0 / 792.0_f64).round() as i64;
        assert_eq!(bg.width, expected_w);
        assert!((bg.x - (9_144_000 - expected_w) / 2).abs() <= 1);
    }

    #[test]
    fn test_wide_page_is_letterboxed() {
        let page = PageSize::new(1000.0, 300.0);
        let bg = Placement::fit(page, Canvas::WIDESCREEN).background_rect();
        assert_eq!(bg.x, 0);
        assert_eq!(bg.width, 9_144_000);
        assert_eq!(bg.height, 2_743_200);
        assert_eq!(bg.y, (5_143_500 - 2_743_200) / 2);
    }

    #[test]
    fn test_page_matching_canvas_maps_one_to_one() {
        // 720 x 405 pt is exactly 10 x 5.625 in
        let page = PageSize::new(720.0, 405.0);
        let p = Placement::fit(page, Canvas::WIDESCREEN);
        assert!((p.scale - EMU_PER_POINT).abs() < 1e-9);
        assert!((p.zoom() - 1.0).abs() < 1e-12);

        let config = ComposeConfig {
            text_tighten: 0.0,
            ..ComposeConfig::default()
        };
        let out = compose_slide(
            0,
            page,
            RgbImage::new(1, 1),
            &[styled("x", Rect::new(72.0, 36.0, 144.0, 18.0), 18.0)],
            &config,
        );
        let b = &out.slide.text_boxes[0];
        assert_eq!(
            (b.x, b.y, b.width, b.height),
            (914_400, 457_200, 1_828_800, 228_600)
        );
        assert!((b.size_pt - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_boxes_follow_run_order_and_style() {
        let mut bad = styled("bad", Rect::new(10.0, 10.0, -5.0, 20.0), 16.0);
        bad.run.layer_index = 4;
        let runs = vec![
            styled("first", Rect::new(300.0, 700.0, 100.0, 20.0), 16.0),
            bad,
            styled("second", Rect::new(10.0, 10.0, 100.0, 20.0), 16.0),
        ];
        let out = compose_slide(
            1,
            PageSize::LETTER,
            RgbImage::new(1, 1),
            &runs,
            &ComposeConfig::default(),
        );
        let boxes = &out.slide.text_boxes;
        let texts: Vec<&str> = boxes.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        // Named by its text layer position, not its place in `runs`
        assert!(matches!(
            out.skipped[..],
            [Degradation::MalformedGeometry { page: 1, run: 4, .. }]
        ));

        let b = &out.slide.text_boxes[0];
        assert_eq!(b.font_family, "Arial");
        assert!(b.bold);
        assert_eq!(b.color, Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_font_size_follows_background_scale() {
        let p = Placement::fit(PageSize::LETTER, Canvas::WIDESCREEN);
        let zoom = 405.0 / 792.0;
        assert!((p.scale_font(24.0) - 24.0 * zoom).abs() < 1e-9);
    }

    #[test]
    fn test_tightening_is_symmetric() {
        let page = PageSize::new(720.0, 405.0);
        let config = ComposeConfig {
            text_tighten: 0.2,
            ..ComposeConfig::default()
        };
        let out = compose_slide(
            0,
            page,
            RgbImage::new(1, 1),
            &[styled("x", Rect::new(0.0, 100.0, 100.0, 50.0), 40.0)],
            &config,
        );
        let b = &out.slide.text_boxes[0];
        // 5pt off the top, 5pt off the bottom
        assert_eq!(b.y, 105 * 12_700);
        assert_eq!(b.height, 40 * 12_700);
    }

    #[test]
    fn test_placeholder_covers_canvas() {
        let s = placeholder_slide(3, Canvas::STANDARD);
        assert!(s.placeholder);
        assert_eq!(s.index, 3);
        assert_eq!(s.background_rect, Canvas::STANDARD.full());
        assert!(s.text_boxes.is_empty());
    }

    #[test]
    fn test_canvas_from_inches() {
        assert_eq!(Canvas::from_inches(10.0, 5.625), Canvas::WIDESCREEN);
    }
}
