//! Batch processing command for directories of quotation images.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use tracing::warn;

use super::process::{render, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input directory or glob pattern
    pub input: String,

    /// Directory for the generated spreadsheets (defaults to each
    /// input file's directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// OCR language code
    #[arg(short, long, default_value = "por")]
    pub language: String,

    /// Fail instead of falling back to English when the requested
    /// language model is missing
    #[arg(long)]
    pub no_lang_fallback: bool,

    /// Directory holding <lang>.traineddata files
    #[arg(long, default_value = "tessdata")]
    pub tessdata_dir: PathBuf,
}

/// Outcome of one image, kept for the end-of-run report.
struct FileResult {
    path: PathBuf,
    records: usize,
    error: Option<String>,
}

impl FileResult {
    fn succeeded(&self) -> bool {
        self.error.is_none() && self.records > 0
    }
}

pub fn run(args: BatchArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    let files = find_images(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("No images found for: {}", args.input);
    }
    println!("{} Found {} images to process", style("ℹ").blue(), files.len());

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)?;
    }

    let pipeline = super::build_pipeline(&args.tessdata_dir, &args.language, args.no_lang_fallback)?;
    let results = process_all(&pipeline, files, args.output_dir.as_deref(), args.format);

    let succeeded = results.iter().filter(|r| r.succeeded()).count();
    println!();
    println!(
        "{} {} of {} images converted in {:?}",
        style("✓").green(),
        succeeded,
        results.len(),
        start.elapsed()
    );

    let failed: Vec<_> = results.iter().filter(|r| !r.succeeded()).collect();
    if !failed.is_empty() {
        println!("{}", style("Skipped:").yellow());
        for result in failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Run every file through the pipeline. One image never aborts the
/// run: each failure is recorded and the driver moves on.
fn process_all<R: cotiz_ocr::OcrBackend>(
    pipeline: &cotiz_ocr::QuotePipeline<R>,
    files: Vec<PathBuf>,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Vec<FileResult> {
    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let result = match pipeline.process_file(&path) {
            Ok(extraction) if extraction.is_empty() => {
                warn!("No table data extracted from {}", path.display());
                FileResult {
                    path,
                    records: 0,
                    error: Some("no table data extracted".to_string()),
                }
            }
            Ok(extraction) => {
                let out_path = output_path(&path, output_dir, format);
                match render(&extraction, format)
                    .and_then(|content| Ok(fs::write(&out_path, content)?))
                {
                    Ok(()) => {
                        println!(
                            "{} {} → {} ({} records)",
                            style("✓").green(),
                            path.display(),
                            out_path.display(),
                            extraction.table.len()
                        );
                        FileResult { path, records: extraction.table.len(), error: None }
                    }
                    Err(e) => {
                        warn!("Failed to write output for {}: {}", path.display(), e);
                        FileResult { path, records: 0, error: Some(e.to_string()) }
                    }
                }
            }
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                FileResult { path, records: 0, error: Some(e.to_string()) }
            }
        };
        results.push(result);
    }
    results
}

/// Expand the input into image paths: a directory is scanned
/// non-recursively, anything else is treated as a glob pattern.
fn find_images(input: &str) -> anyhow::Result<Vec<PathBuf>> {
    let as_path = Path::new(input);
    let mut files: Vec<PathBuf> = if as_path.is_dir() {
        fs::read_dir(as_path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect()
    } else {
        glob(input)?.filter_map(|r| r.ok()).collect()
    };
    files.retain(|p| super::is_supported_image(p));
    files.sort();
    Ok(files)
}

fn output_path(input: &Path, output_dir: Option<&Path>, format: OutputFormat) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("quote");
    let name = format!("{stem}_extracted.{}", format.extension());
    match output_dir {
        Some(dir) => dir.join(name),
        None => input.parent().unwrap_or(Path::new(".")).join(name),
    }
}
