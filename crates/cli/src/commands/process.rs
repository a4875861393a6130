//! Single-image processing command.

use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use console::style;
use cotiz_ocr::{normalize, EnhanceProfile, QuoteExtraction};
use tracing::info;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input image file
    pub input: PathBuf,

    /// OCR language code
    #[arg(short, long, default_value = "por")]
    pub language: String,

    /// Fail instead of falling back to English when the requested
    /// language model is missing
    #[arg(long)]
    pub no_lang_fallback: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory holding <lang>.traineddata files
    #[arg(long, default_value = "tessdata")]
    pub tessdata_dir: PathBuf,

    /// Save the detected region crop and the normalized image here
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn render(extraction: &QuoteExtraction, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Csv => cotiz_export::to_csv_string(&extraction.table)?,
        OutputFormat::Json => cotiz_export::to_json(&extraction.table)?,
        OutputFormat::Text => cotiz_export::to_text(&extraction.table),
    })
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let pipeline = super::build_pipeline(&args.tessdata_dir, &args.language, args.no_lang_fallback)?;

    info!("Processing {}", args.input.display());
    let extraction = pipeline.process_file(&args.input)?;

    if let Some(debug_dir) = &args.debug_dir {
        save_snapshots(&args.input, &extraction, debug_dir)?;
    }

    if extraction.is_empty() {
        println!(
            "{} No table data extracted from {}",
            style("⚠").yellow(),
            args.input.display()
        );
        return Ok(());
    }

    let content = render(&extraction, args.format)?;
    match &args.output {
        Some(path) => {
            fs::write(path, content)?;
            println!(
                "{} {} records written to {}",
                style("✓").green(),
                extraction.table.len(),
                path.display()
            );
        }
        None => print!("{content}"),
    }

    Ok(())
}

/// Persist the intermediate images that the pipeline computed, for
/// tuning detection and normalization parameters against a new
/// document layout.
fn save_snapshots(
    input: &PathBuf,
    extraction: &QuoteExtraction,
    debug_dir: &PathBuf,
) -> anyhow::Result<()> {
    fs::create_dir_all(debug_dir)?;
    let r = extraction.region;
    let img = image::open(input)?;
    let crop = img.crop_imm(r.x, r.y, r.width, r.height);
    crop.save(debug_dir.join("table_region.png"))?;
    normalize(&crop, &EnhanceProfile::default()).save(debug_dir.join("normalized.png"))?;
    info!("Debug snapshots written to {}", debug_dir.display());
    Ok(())
}
