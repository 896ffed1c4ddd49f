//! Document conversion pipeline
//!
//! Each page runs render, extract, erase, map and compose strictly in
//! sequence. Pages are independent and run as blocking tasks, at most
//! `concurrency` at a time. Finished slides are stored by page index, so the
//! deck order never depends on completion order.

use crate::compose::{compose_slide, placeholder_slide};
use crate::config::{ConvertConfig, PlaceholderPolicy};
use crate::deck::{validate_slide, DeckAssembler};
use crate::erase::erase_text;
use crate::error::{Degradation, Error, Result};
use crate::extract::extract_runs;
use crate::model::{Page, Slide, TextSpan};
use crate::notes::{attach_notes, NotesGenerator};
use crate::pdf::PageSource;
use crate::style::FontTable;
use crate::units::effective_dpi;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Cooperative cancellation for a running conversion.
///
/// Clones share state. Once cancelled, no further page starts; pages already
/// running finish, and the conversion reports [`Error::Cancelled`] without
/// publishing any slide.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A composed slide and everything that degraded along the way
#[derive(Debug, Clone)]
pub struct PageReport {
    pub slide: Slide,
    pub degradations: Vec<Degradation>,
}

/// Result of one page worker
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Converted(PageReport),
    /// The reader could not produce the page; nothing else was attempted
    Failed {
        index: usize,
        reason: String,
    },
}

/// Document-level report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionSummary {
    pub pages_total: usize,
    pub pages_processed: usize,
    pub pages_skipped: usize,
    pub runs_skipped: usize,
    pub sampling_fallbacks: usize,
    pub notes_failed: usize,
    pub warnings: Vec<String>,
}

impl ConversionSummary {
    fn record(&mut self, degradation: &Degradation) {
        match degradation {
            Degradation::MalformedGeometry { .. } => self.runs_skipped += 1,
            Degradation::SamplingFailure { .. } => self.sampling_fallbacks += 1,
            Degradation::PageRenderFailure { .. } => self.pages_skipped += 1,
            Degradation::NotesUnavailable { .. } => self.notes_failed += 1,
        }
        self.warnings.push(degradation.to_string());
    }
}

/// Converts documents into slides
#[derive(Clone)]
pub struct Converter {
    config: Arc<ConvertConfig>,
    fonts: Arc<FontTable>,
    notes: Option<Arc<dyn NotesGenerator>>,
}

impl Converter {
    pub fn new(config: ConvertConfig, fonts: FontTable) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            fonts: Arc::new(fonts),
            notes: None,
        })
    }

    /// Request speaker notes for every converted slide
    pub fn with_notes(mut self, generator: Arc<dyn NotesGenerator>) -> Self {
        self.notes = Some(generator);
        self
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn fonts(&self) -> &FontTable {
        &self.fonts
    }

    /// Extract, erase, map and compose one rendered page, then attach notes
    pub fn convert_page(&self, page: Page, layer: Vec<TextSpan>) -> PageReport {
        let Page {
            index,
            size,
            dpi,
            raster,
        } = page;

        let density = effective_dpi(raster.width(), size.width_pt);
        if (density - dpi).abs() > dpi * 0.01 {
            tracing::warn!(
                page = index,
                requested = dpi,
                density,
                "raster density differs"
            );
        }

        let extraction = extract_runs(index, size, layer);
        let erased = erase_text(
            index,
            &raster,
            size,
            &extraction.runs,
            &self.config.erase,
        );

        // A run the eraser could not place keeps its glyphs on the background,
        // so it gets no text box either
        let unerased: BTreeSet<usize> = erased
            .report
            .skipped_runs
            .iter()
            .filter_map(|d| match d {
                Degradation::MalformedGeometry { run, .. } => Some(*run),
                _ => None,
            })
            .collect();
        let runs = extraction
            .runs
            .into_iter()
            .filter(|run| !unerased.contains(&run.layer_index))
            .collect();

        let styled = self.fonts.map_runs(runs);
        let compose = self.config.compose();
        let composed = compose_slide(index, size, erased.image, &styled, &compose);

        let mut degradations = extraction.skipped;
        degradations.extend(erased.report.skipped_runs);
        degradations.extend(erased.report.sampling_failures);
        degradations.extend(composed.skipped);

        let mut slide = composed.slide;
        if let Some(generator) = &self.notes {
            let mode = self.config.notes_input;
            let failure = attach_notes(generator.as_ref(), mode, &raster, &mut slide);
            degradations.extend(failure);
        }

        PageReport {
            slide,
            degradations,
        }
    }

    fn load_page(&self, source: &dyn PageSource, index: usize) -> Result<(Page, Vec<TextSpan>)> {
        let size = source.page_size(index)?;
        let raster = source.render_raster(index, self.config.dpi)?;
        let layer = source.extract_text_layer(index)?;
        tracing::debug!(
            page = index,
            width = raster.width(),
            height = raster.height(),
            spans = layer.len(),
            "rendered page"
        );

        Ok((
            Page {
                index,
                size,
                dpi: self.config.dpi,
                raster,
            },
            layer,
        ))
    }

    /// Run the whole per-page pipeline against a page source
    pub fn process_page(&self, source: &dyn PageSource, index: usize) -> PageOutcome {
        match self.load_page(source, index) {
            Ok((page, layer)) => PageOutcome::Converted(self.convert_page(page, layer)),
            Err(e) => {
                tracing::warn!(page = index, error = %e, "page skipped");
                PageOutcome::Failed {
                    index,
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Convert every page, returning slides in page order.
    ///
    /// Pages the reader cannot render become placeholders or are omitted,
    /// per [`PlaceholderPolicy`].
    pub async fn build_slides(
        &self,
        source: Arc<dyn PageSource>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<Slide>, ConversionSummary)> {
        let total = source.page_count();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<PageOutcome>> = (0..total).map(|_| None).collect();
        let mut cancelled = false;

        tracing::info!(
            pages = total,
            concurrency = self.config.concurrency,
            dpi = self.config.dpi,
            "converting document"
        );

        for index in 0..total {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::Task {
                    reason: e.to_string(),
                })?;
            // The token may have flipped while we waited for a permit
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let converter = self.clone();
            let source = Arc::clone(&source);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                (index, converter.process_page(source.as_ref(), index))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.map_err(|e| Error::Task {
                reason: e.to_string(),
            })?;
            slots[index] = Some(outcome);
        }

        if cancelled {
            let completed = slots.iter().filter(|s| s.is_some()).count();
            tracing::info!(completed, pages = total, "conversion cancelled");
            return Err(Error::Cancelled { completed });
        }

        Ok(self.merge(slots))
    }

    /// Ordered merge of page outcomes
    fn merge(&self, slots: Vec<Option<PageOutcome>>) -> (Vec<Slide>, ConversionSummary) {
        let mut summary = ConversionSummary {
            pages_total: slots.len(),
            ..ConversionSummary::default()
        };
        let mut slides = Vec::with_capacity(slots.len());

        for (index, slot) in slots.into_iter().enumerate() {
            let reason = match slot {
                Some(PageOutcome::Converted(report)) => {
                    summary.pages_processed += 1;
                    for d in &report.degradations {
                        summary.record(d);
                    }
                    slides.push(report.slide);
                    continue;
                }
                Some(PageOutcome::Failed { reason, .. }) => reason,
                None => "page task did not complete".to_string(),
            };

            summary.record(&Degradation::PageRenderFailure {
                page: index,
                reason,
            });
            if self.config.placeholder == PlaceholderPolicy::BlankSlide {
                slides.push(placeholder_slide(index, self.config.canvas));
            }
        }

        (slides, summary)
    }

    /// Convert a document and hand the slides to `deck`.
    ///
    /// Every slide is validated before the first `add_slide`, so a rejected
    /// slide list never produces a partial deck.
    pub async fn convert(
        &self,
        source: Arc<dyn PageSource>,
        deck: &mut dyn DeckAssembler,
        cancel: &CancellationToken,
    ) -> Result<ConversionSummary> {
        let (slides, summary) = self.build_slides(source, cancel).await?;

        for slide in &slides {
            validate_slide(slide)?;
        }
        for slide in &slides {
            deck.add_slide(slide)?;
        }
        deck.finish()?;

        tracing::info!(
            processed = summary.pages_processed,
            skipped = summary.pages_skipped,
            runs_skipped = summary.runs_skipped,
            fallbacks = summary.sampling_fallbacks,
            "conversion finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PageSize, Rect};
    use crate::notes::{NotesError, NotesInput};
    use image::RgbImage;
    use std::sync::Mutex;

    const PAPER: image::Rgb<u8> = image::Rgb([240, 240, 240]);
    const INK: image::Rgb<u8> = image::Rgb([20, 20, 20]);

    /// Remembers the pixel at (30, 50) of every image it is shown
    #[derive(Default)]
    struct PixelRecorder {
        seen: Mutex<Vec<image::Rgb<u8>>>,
    }

    impl NotesGenerator for PixelRecorder {
        fn generate(&self, input: NotesInput<'_>) -> std::result::Result<String, NotesError> {
            if let NotesInput::Image(img) = input {
                if let Ok(mut seen) = self.seen.lock() {
                    seen.push(*img.get_pixel(30, 50));
                }
            }
            Ok("Revenue grew.".to_string())
        }
    }

    fn converter() -> Converter {
        Converter::new(ConvertConfig::default(), FontTable::default()).unwrap()
    }

    #[test]
    fn test_converter_rejects_invalid_config() {
        let config = ConvertConfig {
            dpi: 0.0,
            ..ConvertConfig::default()
        };
        assert!(matches!(
            Converter::new(config, FontTable::default()),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_convert_page_maps_fonts_and_keeps_order() {
        let page = Page {
            index: 0,
            size: PageSize::new(72.0, 72.0),
            dpi: 72.0,
            raster: RgbImage::from_pixel(72, 72, image::Rgb([255, 255, 255])),
        };
        let layer = vec![
            TextSpan {
                text: "B".to_string(),
                bbox: Some(Rect::new(40.0, 40.0, 10.0, 10.0)),
                font_name: Some("Times-Bold".to_string()),
                ..TextSpan::default()
            },
            TextSpan {
                text: "A".to_string(),
                bbox: Some(Rect::new(5.0, 5.0, 10.0, 10.0)),
                ..TextSpan::default()
            },
        ];
        let report = converter().convert_page(page, layer);
        let boxes = &report.slide.text_boxes;
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].text, "B");
        assert_eq!(boxes[0].font_family, "Times New Roman");
        assert!(boxes[0].bold);
        assert_eq!(boxes[1].font_family, "Calibri");
        assert!(report.degradations.is_empty());
    }

    #[test]
    fn test_image_notes_see_text_before_erasure() {
        let mut raster = RgbImage::from_pixel(100, 100, PAPER);
        for y in 45..57 {
            for x in 20..80 {
                raster.put_pixel(x, y, INK);
            }
        }
        let page = Page {
            index: 0,
            size: PageSize::new(100.0, 100.0),
            dpi: 72.0,
            raster,
        };
        let layer = vec![TextSpan {
            text: "Revenue grew 40%".to_string(),
            bbox: Some(Rect::new(20.0, 45.0, 60.0, 12.0)),
            ..TextSpan::default()
        }];
        let recorder = Arc::new(PixelRecorder::default());

        let report = converter()
            .with_notes(recorder.clone())
            .convert_page(page, layer);

        assert_eq!(*recorder.seen.lock().unwrap(), vec![INK]);
        assert_eq!(*report.slide.background.get_pixel(30, 50), PAPER);
        assert_eq!(report.slide.notes.as_deref(), Some("Revenue grew."));
    }

    #[test]
    fn test_skipped_run_is_named_by_layer_position() {
        let page = Page {
            index: 2,
            size: PageSize::new(72.0, 72.0),
            dpi: 72.0,
            raster: RgbImage::from_pixel(72, 72, PAPER),
        };
        let span = |text: &str, bbox: Rect| TextSpan {
            text: text.to_string(),
            bbox: Some(bbox),
            ..TextSpan::default()
        };
        let layer = vec![
            span(" ", Rect::new(1.0, 1.0, 5.0, 5.0)),
            span("gone", Rect::new(10.0, 10.0, 0.0, 5.0)),
            span("kept", Rect::new(10.0, 30.0, 20.0, 8.0)),
        ];

        let report = converter().convert_page(page, layer);

        assert_eq!(report.slide.text_boxes.len(), 1);
        assert_eq!(report.slide.text_boxes[0].text, "kept");
        assert!(matches!(
            report.degradations[..],
            [Degradation::MalformedGeometry { page: 2, run: 1, .. }]
        ));
    }

    #[test]
    fn test_summary_counts_by_kind() {
        let converter = converter();
        let slots = vec![
            Some(PageOutcome::Failed {
                index: 0,
                reason: "boom".to_string(),
            }),
            Some(PageOutcome::Converted(PageReport {
                slide: placeholder_slide(1, converter.config().canvas),
                degradations: vec![
                    Degradation::SamplingFailure { page: 1, region: 0 },
                    Degradation::NotesUnavailable {
                        page: 1,
                        reason: "rate limited".to_string(),
                    },
                ],
            })),
        ];
        let (slides, summary) = converter.merge(slots);
        assert_eq!(slides.len(), 2);
        assert!(slides[0].placeholder);
        assert_eq!(summary.pages_total, 2);
        assert_eq!(summary.pages_processed, 1);
        assert_eq!(summary.pages_skipped, 1);
        assert_eq!(summary.sampling_fallbacks, 1);
        assert_eq!(summary.notes_failed, 1);
        assert_eq!(summary.warnings.len(), 3);
    }

    #[test]
    fn test_cancellation_token_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
