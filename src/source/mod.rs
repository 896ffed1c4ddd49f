//! Input resolution

pub mod resolver;

pub use resolver::{find_pdfs, output_dir_for, resolve_base64, resolve_path, ResolvedPdf};
