//! Resolve PDF input to bytes

use crate::error::{Error, Result};
use crate::pdf::PDF_MAGIC;
use base64::Engine;
use std::path::{Path, PathBuf};

/// Resolved PDF data
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
}

fn is_pdf(data: &[u8]) -> bool {
    data.len() >= PDF_MAGIC.len() && &data[..PDF_MAGIC.len()] == PDF_MAGIC
}

/// Resolve a file path to PDF data
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<ResolvedPdf> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path).map_err(Error::Io)?;

    if !is_pdf(&data) {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }

    Ok(ResolvedPdf {
        data,
        source_name: path.display().to_string(),
    })
}

/// Resolve base64 encoded data to PDF data
pub fn resolve_base64(base64_data: &str) -> Result<ResolvedPdf> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data.trim())?;

    if !is_pdf(&data) {
        return Err(Error::InvalidPdf {
            reason: "Decoded data is not a valid PDF file".to_string(),
        });
    }

    Ok(ResolvedPdf {
        data,
        source_name: "<base64>".to_string(),
    })
}

/// PDF files directly inside `dir`, sorted by path
pub fn find_pdfs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::PdfNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut found = Vec::new();
    for pattern in ["*.pdf", "*.PDF"] {
        let full = dir.join(pattern);
        let pattern = full.to_string_lossy();
        let entries = glob::glob(&pattern).map_err(|e| Error::InvalidConfig {
            reason: format!("bad search pattern: {}", e),
        })?;
        found.extend(entries.flatten().filter(|p| p.is_file()));
    }
    found.sort();
    found.dedup();
    Ok(found)
}

/// Default deck directory for an input: `<stem>_slides` next to it
pub fn output_dir_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "deck".to_string());
    input.with_file_name(format!("{}_slides", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_base64_invalid() {
        let engine = base64::engine::general_purpose::STANDARD;
        let result = resolve_base64(&engine.encode(b"not a pdf"));
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
    }

    #[test]
    fn test_resolve_base64_invalid_base64() {
        let result = resolve_base64("!!!not base64!!!");
        assert!(matches!(result, Err(Error::Base64Decode(_))));
    }

    #[test]
    fn test_resolve_base64_valid_header() {
        let engine = base64::engine::general_purpose::STANDARD;
        let resolved = resolve_base64(&format!("{}\n", engine.encode(b"%PDF-1.7 ..."))).unwrap();
        assert_eq!(resolved.source_name, "<base64>");
        assert!(resolved.data.starts_with(b"%PDF"));
    }

    #[test]
    fn test_resolve_path_not_found() {
        let result = resolve_path("/nonexistent/file.pdf");
        assert!(matches!(result, Err(Error::PdfNotFound { .. })));
    }

    #[test]
    fn test_find_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.pdf", "notes.txt", "C.PDF"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        let found = find_pdfs(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["C.PDF", "a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_output_dir_for() {
        assert_eq!(
            output_dir_for(Path::new("/tmp/talk.pdf")),
            PathBuf::from("/tmp/talk_slides")
        );
    }
}
