//! Text removal from the rendered page raster
//!
//! Every run's box becomes a pixel rectangle, grown by a small margin to cover
//! anti-aliased glyph edges. Rectangles that overlap are grouped into one
//! [`EraseRegion`] and filled in a single pass with a single color, but only
//! pixels inside one of the group's rectangles are painted; whatever sits
//! between them is left alone. The fill is the dominant color of the thin band
//! just outside the group, sampled from the untouched raster, which makes the
//! result independent of processing order.

use crate::error::{Degradation, SkipReason};
use crate::extract::validate_bbox;
use crate::model::{PageSize, Rect, Rgb, TextRun};
use crate::units::{effective_dpi, points_to_pixels};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tuning for the eraser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EraseConfig {
    /// Pixels added on every side of a run's box
    pub margin_px: u32,
    /// Width of the band sampled around a region
    pub sample_band_px: u32,
    /// Fewer border samples than this is a sampling failure
    pub min_samples: usize,
    /// Share of samples the most common color needs for the background to count as flat
    pub flat_ratio: f64,
    /// Fill used when nothing on the page could be sampled
    pub neutral_fill: Rgb,
}

impl Default for EraseConfig {
    fn default() -> Self {
        Self {
            margin_px: 2,
            sample_band_px: 3,
            min_samples: 8,
            flat_ratio: 0.5,
            neutral_fill: Rgb::WHITE,
        }
    }
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn overlaps(&self, other: &PixelRect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grown by `by` on every side, clamped to a `width` x `height` raster
    pub fn grow(&self, by: u32, width: u32, height: u32) -> PixelRect {
        PixelRect {
            x0: self.x0.saturating_sub(by),
            y0: self.y0.saturating_sub(by),
            x1: self.x1.saturating_add(by).min(width),
            y1: self.y1.saturating_add(by).min(height),
        }
    }

    fn center(&self) -> (f64, f64) {
        (
            (self.x0 + self.x1) as f64 / 2.0,
            (self.y0 + self.y1) as f64 / 2.0,
        )
    }
}

/// Group of overlapping run rectangles painted with one fill
#[derive(Debug, Clone, PartialEq)]
pub struct EraseRegion {
    /// Grown run boxes; only pixels inside one of these are painted
    pub rects: Vec<PixelRect>,
    /// Text layer indices of the runs in the group
    pub runs: Vec<usize>,
}

impl EraseRegion {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.rects.iter().any(|r| r.contains(x, y))
    }

    /// True when any rectangle of one overlaps any rectangle of the other
    pub fn touches(&self, other: &EraseRegion) -> bool {
        self.rects
            .iter()
            .any(|a| other.rects.iter().any(|b| a.overlaps(b)))
    }

    /// Bounding box of the group
    pub fn bounds(&self) -> Option<PixelRect> {
        self.rects.iter().copied().reduce(|a, b| a.union(&b))
    }
}

/// What happened while erasing one page
#[derive(Debug, Clone, Default)]
pub struct EraseReport {
    /// Regions painted, after merging
    pub regions: usize,
    /// Runs whose geometry could not be mapped to pixels
    pub skipped_runs: Vec<Degradation>,
    /// Regions filled with a fallback color
    pub sampling_failures: Vec<Degradation>,
}

/// Cleaned raster plus report
#[derive(Debug, Clone)]
pub struct ErasedPage {
    pub image: RgbImage,
    pub report: EraseReport,
}

/// Map a page-space box to pixels, grown by `margin` and clamped to the raster
pub fn to_pixel_rect(
    bbox: &Rect,
    page: PageSize,
    width_px: u32,
    height_px: u32,
    margin: u32,
) -> Option<PixelRect> {
    let dpi_x = effective_dpi(width_px, page.width_pt);
    let dpi_y = effective_dpi(height_px, page.height_pt);
    let margin = margin as f64;

    let x0 = (points_to_pixels(bbox.x, dpi_x).floor() - margin).max(0.0);
    let y0 = (points_to_pixels(bbox.y, dpi_y).floor() - margin).max(0.0);
    let x1 = (points_to_pixels(bbox.right(), dpi_x).ceil() + margin).min(width_px as f64);
    let y1 = (points_to_pixels(bbox.bottom(), dpi_y).ceil() + margin).min(height_px as f64);

    if !(x1 > x0 && y1 > y0) {
        return None;
    }
    Some(PixelRect {
        x0: x0 as u32,
        y0: y0 as u32,
        x1: x1 as u32,
        y1: y1 as u32,
    })
}

/// Group regions until no two groups touch
pub fn merge_overlapping(mut regions: Vec<EraseRegion>) -> Vec<EraseRegion> {
    loop {
        let mut merged_any = false;
        let mut out: Vec<EraseRegion> = Vec::with_capacity(regions.len());

        for region in regions {
            match out.iter_mut().find(|o| o.touches(&region)) {
                Some(existing) => {
                    existing.rects.extend(region.rects);
                    existing.runs.extend(region.runs);
                    merged_any = true;
                }
                None => out.push(region),
            }
        }

        regions = out;
        if !merged_any {
            break;
        }
    }

    for region in &mut regions {
        region.runs.sort_unstable();
    }
    regions
}

/// Build the merged erase regions for a page
pub fn plan_regions(
    page_index: usize,
    page: PageSize,
    width_px: u32,
    height_px: u32,
    runs: &[TextRun],
    config: &EraseConfig,
) -> (Vec<EraseRegion>, Vec<Degradation>) {
    let mut regions = Vec::with_capacity(runs.len());
    let mut skipped = Vec::new();

    for run in runs {
        let rect = validate_bbox(&run.bbox, page).and_then(|bbox| {
            to_pixel_rect(&bbox, page, width_px, height_px, config.margin_px)
                .ok_or(SkipReason::OutOfPage)
        });
        match rect {
            Ok(rect) => regions.push(EraseRegion {
                rects: vec![rect],
                runs: vec![run.layer_index],
            }),
            Err(reason) => {
                tracing::warn!(
                    page = page_index,
                    run = run.layer_index,
                    %reason,
                    "erase region skipped"
                );
                skipped.push(Degradation::MalformedGeometry {
                    page: page_index,
                    run: run.layer_index,
                    reason,
                });
            }
        }
    }

    (merge_overlapping(regions), skipped)
}

/// Collect the pixels within `band` of any rectangle of `regions[target]`,
/// ignoring pixels that belong to any region
pub fn sample_border(
    raster: &RgbImage,
    regions: &[EraseRegion],
    target: usize,
    band: u32,
) -> Vec<Rgb> {
    let (width, height) = raster.dimensions();
    let region = &regions[target];
    let rings: Vec<PixelRect> = region
        .rects
        .iter()
        .map(|r| r.grow(band, width, height))
        .collect();
    let Some(outer) = rings.iter().copied().reduce(|a, b| a.union(&b)) else {
        return Vec::new();
    };

    let mut samples = Vec::new();
    for y in outer.y0..outer.y1 {
        for x in outer.x0..outer.x1 {
            if !rings.iter().any(|r| r.contains(x, y)) {
                continue;
            }
            if regions.iter().any(|o| o.contains(x, y)) {
                continue;
            }
            samples.push(Rgb::from(*raster.get_pixel(x, y)));
        }
    }
    samples
}

/// Most common color when the border is flat, mean color otherwise.
///
/// Colors are bucketed at 4 bits per channel so scanner noise and
/// anti-aliasing do not split a flat background into many modes; the fill is
/// the mean of the winning bucket.
pub fn dominant_color(samples: &[Rgb], flat_ratio: f64) -> Option<Rgb> {
    if samples.is_empty() {
        return None;
    }

    let mut buckets: BTreeMap<(u8, u8, u8), [u64; 4]> = BTreeMap::new();
    for c in samples {
        let entry = buckets.entry((c.r >> 4, c.g >> 4, c.b >> 4)).or_default();
        entry[0] += 1;
        entry[1] += c.r as u64;
        entry[2] += c.g as u64;
        entry[3] += c.b as u64;
    }

    let mode = buckets.values().max_by_key(|acc| acc[0])?;
    if mode[0] as f64 / samples.len() as f64 >= flat_ratio {
        return Some(mean_of(mode));
    }

    let mut total = [0u64; 4];
    for acc in buckets.values() {
        for (t, v) in total.iter_mut().zip(acc.iter()) {
            *t += v;
        }
    }
    Some(mean_of(&total))
}

fn mean_of(acc: &[u64; 4]) -> Rgb {
    let n = acc[0].max(1);
    let avg = |sum: u64| ((sum + n / 2) / n) as u8;
    Rgb::new(avg(acc[1]), avg(acc[2]), avg(acc[3]))
}

fn region_center(region: &EraseRegion) -> (f64, f64) {
    region.bounds().map_or((0.0, 0.0), |b| b.center())
}

/// Replace failed samples with the fill of the nearest sampled region, or the
/// neutral fill when the page has none. Returns the fill and whether it is a fallback.
pub fn resolve_fills(
    regions: &[EraseRegion],
    sampled: &[Option<Rgb>],
    neutral: Rgb,
) -> Vec<(Rgb, bool)> {
    regions
        .iter()
        .zip(sampled)
        .map(|(region, fill)| match fill {
            Some(c) => (*c, false),
            None => {
                let (cx, cy) = region_center(region);
                let nearest = regions
                    .iter()
                    .zip(sampled)
                    .filter_map(|(other, fill)| fill.map(|c| (region_center(other), c)))
                    .min_by(|((ax, ay), _), ((bx, by), _)| {
                        let da = (ax - cx).powi(2) + (ay - cy).powi(2);
                        let db = (bx - cx).powi(2) + (by - cy).powi(2);
                        da.total_cmp(&db)
                    })
                    .map(|(_, c)| c);
                (nearest.unwrap_or(neutral), true)
            }
        })
        .collect()
}

/// Erase all runs from a page raster.
///
/// The input raster is left untouched; a page without runs yields an
/// identical copy.
pub fn erase_text(
    page_index: usize,
    raster: &RgbImage,
    page: PageSize,
    runs: &[TextRun],
    config: &EraseConfig,
) -> ErasedPage {
    let mut image = raster.clone();
    if runs.is_empty() {
        return ErasedPage {
            image,
            report: EraseReport::default(),
        };
    }

    let (regions, skipped_runs) = plan_regions(
        page_index,
        page,
        raster.width(),
        raster.height(),
        runs,
        config,
    );

    let sampled: Vec<Option<Rgb>> = (0..regions.len())
        .map(|i| {
            let samples = sample_border(raster, &regions, i, config.sample_band_px);
            if samples.len() < config.min_samples {
                None
            } else {
                dominant_color(&samples, config.flat_ratio)
            }
        })
        .collect();

    let mut sampling_failures = Vec::new();
    let fills = resolve_fills(&regions, &sampled, config.neutral_fill);

    for (index, (region, (fill, fallback))) in regions.iter().zip(fills).enumerate() {
        if fallback {
            tracing::warn!(
                page = page_index,
                region = index,
                fill = %fill.to_hex(),
                "background sampling failed"
            );
            sampling_failures.push(Degradation::SamplingFailure {
                page: page_index,
                region: index,
            });
        }
        let px = image::Rgb::from(fill);
        for rect in &region.rects {
            for y in rect.y0..rect.y1 {
                for x in rect.x0..rect.x1 {
                    image.put_pixel(x, y, px);
                }
            }
        }
    }

    tracing::debug!(
        page = page_index,
        regions = regions.len(),
        fallbacks = sampling_failures.len(),
        "erased text regions"
    );

    ErasedPage {
        image,
        report: EraseReport {
            regions: regions.len(),
            skipped_runs,
            sampling_failures,
        },
    }
}
