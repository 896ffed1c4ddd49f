//! pdf-to-slides - Entry point
//!
//! Usage: `pdf-to-slides <input.pdf|directory> [output_dir] [dpi]`

use anyhow::{bail, Context};
use pdf_to_slides::source::{find_pdfs, output_dir_for, resolve_path};
use pdf_to_slides::{
    CancellationToken, ConvertConfig, Converter, DirectoryDeck, FontTable, PdfiumSource,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// JSON font table replacing the built-in substitutions
const ENV_FONTS: &str = "PDF_TO_SLIDES_FONTS";
/// Password for encrypted documents
const ENV_PASSWORD: &str = "PDF_TO_SLIDES_PASSWORD";

const USAGE: &str = "usage: pdf-to-slides <input.pdf|directory> [output_dir] [dpi]";

async fn convert_file(
    converter: &Converter,
    input: &Path,
    output_root: Option<&Path>,
    password: Option<&str>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let target = match output_root {
        Some(root) => {
            let name = input.file_name().unwrap_or(input.as_os_str());
            output_dir_for(&root.join(name))
        }
        None => output_dir_for(input),
    };
    tracing::info!(input = %input.display(), output = %target.display(), "converting");

    let resolved = resolve_path(input)?;
    let source = PdfiumSource::open_bytes(resolved.data, password)?;
    let mut deck = DirectoryDeck::create(&target, converter.config().canvas)?;
    let summary = converter.convert(Arc::new(source), &mut deck, cancel).await?;

    let line = serde_json::json!({
        "input": resolved.source_name,
        "output": deck.target().display().to_string(),
        "summary": summary,
    });
    println!("{}", line);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_to_slides=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.len() > 3 {
        bail!(USAGE);
    }
    let input = PathBuf::from(&args[0]);
    let output_root = args.get(1).map(PathBuf::from);

    let mut config = ConvertConfig::from_env()?;
    if let Some(dpi) = args.get(2) {
        config.dpi = dpi
            .parse()
            .with_context(|| format!("dpi must be a number, got {}", dpi))?;
    }
    let fonts = match std::env::var(ENV_FONTS) {
        Ok(path) => FontTable::load(&path)
            .with_context(|| format!("loading font table {}", path))?,
        Err(_) => FontTable::default(),
    };
    let password = std::env::var(ENV_PASSWORD).ok();
    let converter = Converter::new(config, fonts)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing pages in flight");
            on_signal.cancel();
        }
    });

    let inputs = if input.is_dir() {
        find_pdfs(&input)?
    } else {
        vec![input]
    };
    if inputs.is_empty() {
        bail!("no PDF files found");
    }

    tracing::info!(documents = inputs.len(), "Starting pdf-to-slides");

    let mut failed = 0usize;
    for path in &inputs {
        if let Err(e) = convert_file(
            &converter,
            path,
            output_root.as_deref(),
            password.as_deref(),
            &cancel,
        )
        .await
        {
            let message = match e.downcast_ref::<pdf_to_slides::Error>() {
                Some(err) => err.client_message(),
                None => e.to_string(),
            };
            tracing::error!(input = %path.display(), error = %message, "conversion failed");
            failed += 1;
        }
        if cancel.is_cancelled() {
            break;
        }
    }

    if failed > 0 {
        bail!("{} of {} documents failed", failed, inputs.len());
    }
    Ok(())
}
