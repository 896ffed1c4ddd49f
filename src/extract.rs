//! Run extraction: raw text layer entries to validated [`TextRun`]s
//!
//! Deterministic and order preserving. Runs are never merged, split or
//! re-sorted here; reading order is whatever the reader produced.

use crate::error::{Degradation, SkipReason};
use crate::model::{PageSize, Rect, Rgb, TextRun, TextSpan, UNKNOWN_FONT};

/// How far a box may overshoot the page edge before it counts as malformed.
/// Loose glyph bounds routinely poke a fraction of a point past the edge.
pub const PAGE_OVERSHOOT_TOLERANCE_PT: f64 = 1.0;

/// Outcome for a single text layer entry
#[derive(Debug, Clone, PartialEq)]
pub enum SpanOutcome {
    Run(TextRun),
    /// Empty or whitespace-only text; dropped silently
    Blank,
    Skipped(SkipReason),
}

/// Runs extracted from one page, plus what was left out
#[derive(Debug, Clone, Default)]
pub struct RunExtraction {
    pub runs: Vec<TextRun>,
    pub skipped: Vec<Degradation>,
}

/// Check a page-space box against the page and clamp small overshoot
pub fn validate_bbox(bbox: &Rect, page: PageSize) -> Result<Rect, SkipReason> {
    if !bbox.is_finite() {
        return Err(SkipReason::NonFinite);
    }
    if bbox.width <= 0.0 || bbox.height <= 0.0 {
        return Err(SkipReason::EmptyBox {
            width: bbox.width,
            height: bbox.height,
        });
    }

    let tol = PAGE_OVERSHOOT_TOLERANCE_PT;
    if bbox.x < -tol
        || bbox.y < -tol
        || bbox.right() > page.width_pt + tol
        || bbox.bottom() > page.height_pt + tol
    {
        return Err(SkipReason::OutOfPage);
    }

    let clamped = bbox.clamp_to(page.width_pt, page.height_pt);
    if clamped.width <= 0.0 || clamped.height <= 0.0 {
        return Err(SkipReason::OutOfPage);
    }
    Ok(clamped)
}

/// Turn the text layer entry at `layer_index` into a run
pub fn classify_span(layer_index: usize, span: TextSpan, page: PageSize) -> SpanOutcome {
    if span.text.trim().is_empty() {
        return SpanOutcome::Blank;
    }

    let bbox = match span.bbox {
        Some(b) => b,
        None => {
            return SpanOutcome::Skipped(SkipReason::EmptyBox {
                width: 0.0,
                height: 0.0,
            })
        }
    };
    let bbox = match validate_bbox(&bbox, page) {
        Ok(b) => b,
        Err(reason) => return SpanOutcome::Skipped(reason),
    };

    let font_family = span
        .font_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_FONT.to_string());

    // Without a usable size the box height is the best estimate we have
    let font_size_pt = span
        .font_size_pt
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(bbox.height);

    SpanOutcome::Run(TextRun {
        layer_index,
        text: span.text,
        bbox,
        font_family,
        font_size_pt,
        bold: span.bold,
        italic: span.italic,
        color: span.color.unwrap_or(Rgb::BLACK),
    })
}

/// Extract the ordered run list for a page
pub fn extract_runs(page_index: usize, page: PageSize, layer: Vec<TextSpan>) -> RunExtraction {
    let mut extraction = RunExtraction::default();

    for (run, span) in layer.into_iter().enumerate() {
        match classify_span(run, span, page) {
            SpanOutcome::Run(r) => extraction.runs.push(r),
            SpanOutcome::Blank => {}
            SpanOutcome::Skipped(reason) => {
                tracing::warn!(page = page_index, run, %reason, "text run skipped");
                extraction.skipped.push(Degradation::MalformedGeometry {
                    page: page_index,
                    run,
                    reason,
                });
            }
        }
    }

    tracing::debug!(
        page = page_index,
        runs = extraction.runs.len(),
        skipped = extraction.skipped.len(),
        "extracted text runs"
    );
    extraction
}
