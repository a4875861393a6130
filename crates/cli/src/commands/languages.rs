//! Languages command - download and manage Tesseract language models.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

/// Arguments for the languages command.
#[derive(Args)]
pub struct LanguagesArgs {
    #[command(subcommand)]
    command: LanguagesCommand,
}

#[derive(Subcommand)]
enum LanguagesCommand {
    /// List the language models this tool knows about
    List,

    /// Check which models are present locally
    Status(StatusArgs),

    /// Download missing models
    Download(DownloadArgs),
}

#[derive(Args)]
struct StatusArgs {
    /// Directory holding <lang>.traineddata files
    #[arg(long, default_value = "tessdata")]
    tessdata_dir: PathBuf,
}

#[derive(Args)]
struct DownloadArgs {
    /// Directory to place the models in
    #[arg(long, default_value = "tessdata")]
    tessdata_dir: PathBuf,

    /// Re-download even if the file already exists
    #[arg(long)]
    force: bool,
}

/// A known language model and the sources to fetch it from, tried in
/// order.
struct LanguageModel {
    code: &'static str,
    description: &'static str,
    urls: [&'static str; 3],
}

const MODELS: [LanguageModel; 3] = [
    LanguageModel {
        code: "por",
        description: "Portuguese (default for quotation documents)",
        urls: [
            "https://github.com/tesseract-ocr/tessdata/raw/main/por.traineddata",
            "https://github.com/tesseract-ocr/tessdata_best/raw/main/por.traineddata",
            "https://tesseract-ocr.github.io/tessdata/4.00/por.traineddata",
        ],
    },
    LanguageModel {
        code: "eng",
        description: "English (fallback language)",
        urls: [
            "https://github.com/tesseract-ocr/tessdata/raw/main/eng.traineddata",
            "https://github.com/tesseract-ocr/tessdata_best/raw/main/eng.traineddata",
            "https://tesseract-ocr.github.io/tessdata/4.00/eng.traineddata",
        ],
    },
    LanguageModel {
        code: "osd",
        description: "Orientation and script detection",
        urls: [
            "https://github.com/tesseract-ocr/tessdata/raw/main/osd.traineddata",
            "https://github.com/tesseract-ocr/tessdata_best/raw/main/osd.traineddata",
            "https://tesseract-ocr.github.io/tessdata/4.00/osd.traineddata",
        ],
    },
];

const MAX_DOWNLOAD_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Files smaller than this are truncated downloads, not real models.
const MIN_MODEL_BYTES: u64 = 100_000;

pub async fn run(args: LanguagesArgs) -> anyhow::Result<()> {
    match args.command {
        LanguagesCommand::List => list(),
        LanguagesCommand::Status(args) => status(args),
        LanguagesCommand::Download(args) => download(args).await,
    }
}

fn list() -> anyhow::Result<()> {
    for model in &MODELS {
        println!("{}  {}", style(model.code).cyan().bold(), model.description);
    }
    println!();
    println!("Download with: cotiz languages download");
    Ok(())
}

fn model_path(tessdata_dir: &Path, code: &str) -> PathBuf {
    tessdata_dir.join(format!("{code}.traineddata"))
}

fn is_present(tessdata_dir: &Path, code: &str) -> bool {
    fs::metadata(model_path(tessdata_dir, code))
        .map(|m| m.len() >= MIN_MODEL_BYTES)
        .unwrap_or(false)
}

fn status(args: StatusArgs) -> anyhow::Result<()> {
    for model in &MODELS {
        if is_present(&args.tessdata_dir, model.code) {
            println!("{} {}", style("✓").green(), model.code);
        } else {
            println!("{} {} (missing)", style("✗").red(), model.code);
        }
    }
    Ok(())
}

async fn download(args: DownloadArgs) -> anyhow::Result<()> {
    fs::create_dir_all(&args.tessdata_dir)?;

    let client = reqwest::Client::builder()
        .user_agent("cotiz-cli/0.3")
        .timeout(Duration::from_secs(300))
        .build()?;

    let mut failed = 0usize;
    for model in &MODELS {
        let path = model_path(&args.tessdata_dir, model.code);

        if !args.force && is_present(&args.tessdata_dir, model.code) {
            println!("{} {} (already present)", style("✓").green(), model.code);
            continue;
        }

        if fetch_model(&client, model, &path).await {
            println!("{} {} downloaded", style("✓").green(), model.code);
        } else {
            failed += 1;
            println!(
                "{} {} could not be downloaded from any source",
                style("✗").red(),
                model.code
            );
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "{failed} model(s) failed to download; fetch them manually into {}",
            args.tessdata_dir.display()
        );
    }
    println!("{} All language models are in place", style("✓").green().bold());
    Ok(())
}

/// Try every source URL in order, with retries and a pause between
/// attempts. Partial files are removed on failure.
async fn fetch_model(client: &reqwest::Client, model: &LanguageModel, path: &Path) -> bool {
    for url in model.urls {
        for attempt in 1..=MAX_DOWNLOAD_RETRIES {
            debug!(url, attempt, "downloading {}", model.code);
            match download_file(client, url, path, model.code).await {
                Ok(()) => return true,
                Err(e) => {
                    println!(
                        "  {} attempt {attempt}/{MAX_DOWNLOAD_RETRIES} failed: {e}",
                        style("↻").yellow()
                    );
                    let _ = fs::remove_file(path);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
    false
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    label: &str,
) -> anyhow::Result<()> {
    let response = client.get(url).send().await?.error_for_status()?;
    let total = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} {msg:<16} [{bar:25.cyan/blue}] {bytes}/{total_bytes}")?
            .progress_chars("=>-"),
    );
    pb.set_message(label.to_string());

    let mut file = File::create(path)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        written += chunk.len() as u64;
        pb.set_position(written);
    }
    pb.finish_and_clear();

    if written < MIN_MODEL_BYTES {
        anyhow::bail!("truncated download ({written} bytes)");
    }
    Ok(())
}
