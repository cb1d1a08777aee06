use anyhow::Result;
use clap::Parser;
#[cfg(feature = "tesseract")]
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use transcribex::config::AppConfig;
use transcribex::errors::{error_logging, AppError, AppResult};
use transcribex::observability;
use transcribex::ocr;
#[cfg(feature = "tesseract")]
use transcribex::ocr_config::DocumentMode;

/// Transcribe a photographed page with optional image enhancement
#[derive(Parser, Debug)]
#[command(name = "transcribex")]
#[command(about = "Preprocess a page image and transcribe it strip by strip")]
struct CliArgs {
    /// Page image (PNG, JPEG, WEBP, BMP, TIFF or GIF)
    image: PathBuf,

    /// Write the preprocessed image to this PNG file
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Print the transcription as JSON
    #[arg(long)]
    json: bool,
}

impl CliArgs {
    /// Rejects a preview target that would not hold PNG data.
    fn validate(&self) -> AppResult<()> {
        let Some(preview) = &self.preview else {
            return Ok(());
        };
        let is_png = preview
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png {
            return Ok(());
        }

        let err = AppError::Validation(format!(
            "Preview path must end in .png, got {}",
            preview.display()
        ));
        error_logging::log_validation_error(&err, "parse_args", "preview_path", preview.to_str());
        Err(err)
    }
}

/// Result printed with `--json`
#[cfg(feature = "tesseract")]
#[derive(Debug, Serialize)]
struct TranscriptionOutput<'a> {
    file: &'a str,
    document_mode: DocumentMode,
    language: &'a str,
    text: &'a str,
}

fn read_image(path: &Path) -> AppResult<Vec<u8>> {
    if !path.is_file() {
        let err = AppError::Validation(format!("{} is not a readable file", path.display()));
        error_logging::log_validation_error(&err, "read_image", "image_path", path.to_str());
        return Err(err);
    }

    let bytes = std::fs::read(path).inspect_err(|e| {
        error_logging::log_filesystem_error(e, "read_image", path.to_str(), None);
    })?;
    Ok(bytes)
}

fn write_preview(path: &Path, bytes: &[u8], config: &AppConfig) -> AppResult<()> {
    let raw = ocr::decode_image(bytes, &config.ocr)?;
    let preview = ocr::preview_image(&raw, &config.ocr)?;
    let png = ocr::encode_preview(&preview)?;

    std::fs::write(path, &png).inspect_err(|e| {
        error_logging::log_filesystem_error(e, "write_preview", path.to_str(), Some(png.len() as u64));
    })?;

    info!(
        path = %path.display(),
        width = preview.width(),
        height = preview.height(),
        "Preview written"
    );
    Ok(())
}

/// Cancel the transcription on Ctrl+C
#[cfg(feature = "tesseract")]
fn cancel_on_ctrl_c(cancel_token: tokio_util::sync::CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling transcription after the current strip");
            cancel_token.cancel();
        }
    });
}

#[cfg(feature = "tesseract")]
async fn run_transcription(args: &CliArgs, bytes: &[u8], config: &AppConfig) -> Result<()> {
    use tokio_util::sync::CancellationToken;
    use transcribex::progress::ProgressReporter;
    use transcribex::recognizer::TesseractRecognizer;

    let recognizer = TesseractRecognizer::new(config.ocr.tessdata_path.clone());
    let (progress, mut receiver) = ProgressReporter::channel();

    let progress_task = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            info!(percent = event.percent, strip = ?event.strip, "Transcription progress");
        }
    });

    let cancel_token = CancellationToken::new();
    cancel_on_ctrl_c(cancel_token.clone());

    let result = ocr::transcribe(bytes, &config.ocr, &recognizer, &progress, &cancel_token).await;
    drop(progress);
    progress_task.await.ok();
    let text = result?;

    if args.json {
        let file = args.image.to_string_lossy();
        let output = TranscriptionOutput {
            file: &file,
            document_mode: config.ocr.document_mode,
            language: &config.ocr.recognition.language,
            text: &text,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", text);
    }
    Ok(())
}

#[cfg(not(feature = "tesseract"))]
async fn run_transcription(args: &CliArgs, bytes: &[u8], config: &AppConfig) -> Result<()> {
    // Input problems are still reported before the missing backend
    ocr::validate_image_bytes(bytes, &config.ocr)?;

    Err(anyhow::anyhow!(
        "Cannot transcribe {}: no recognizer backend was compiled in. Rebuild with --features tesseract",
        args.image.display()
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();

    let config = AppConfig::from_env().map_err(|e| {
        error_logging::log_config_error(&e, "environment", "load_config");
        anyhow::anyhow!("Configuration loading failed: {}", e)
    })?;

    observability::init_tracing(&config.logging)?;

    config.validate().map_err(|e| {
        error_logging::log_config_error(&e, "ocr", "validate_config");
        anyhow::anyhow!("Configuration validation failed: {}. Please check your configuration values.", e)
    })?;

    info!("{}", config.summary());
    args.validate()?;

    let bytes = read_image(&args.image)?;
    info!(
        image = %args.image.display(),
        size_bytes = bytes.len(),
        json = args.json,
        "Image loaded"
    );

    if let Some(preview_path) = &args.preview {
        write_preview(preview_path, &bytes, &config)?;
    }

    run_transcription(&args, &bytes, &config).await
}
