//! PDF to slides library
//!
//! Turns each page of a PDF into an editable slide:
//! - the page is rasterized and its text glyphs are painted out of the image
//! - every text run becomes a positioned, styled text box over that background
//! - slides come out in page order whatever order pages finish in
//!
//! [`Converter`] drives the per-page pipeline; a [`DeckAssembler`] receives the
//! finished slides.

pub mod compose;
pub mod config;
pub mod deck;
pub mod erase;
pub mod error;
pub mod extract;
pub mod model;
pub mod notes;
pub mod pdf;
pub mod pipeline;
pub mod source;
pub mod style;
pub mod units;

pub use compose::{Canvas, ComposeConfig};
pub use config::{ConvertConfig, PlaceholderPolicy};
pub use deck::{DeckAssembler, DirectoryDeck, MemoryDeck};
pub use erase::EraseConfig;
pub use error::{Degradation, Error, Result, SkipReason};
pub use model::{
    Page, PageSize, Rect, Rgb, Slide, SlideRect, StyledRun, StyledTextBox, TextRun, TextSpan,
};
pub use notes::{NotesError, NotesGenerator, NotesInput, NotesMode};
pub use pdf::{PageSource, PdfiumSource};
pub use pipeline::{CancellationToken, ConversionSummary, Converter, PageOutcome, PageReport};
pub use style::FontTable;
