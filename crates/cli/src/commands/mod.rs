pub mod batch;
pub mod languages;
pub mod process;

use std::path::Path;

use cotiz_ocr::{LanguageOptions, OcrBackend, QuotePipeline};

/// Image extensions the scanner and batch driver accept.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(feature = "tesseract")]
fn build_backend(tessdata_dir: &Path) -> anyhow::Result<Box<dyn OcrBackend>> {
    use cotiz_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    Ok(Box::new(TesseractRecognizer::new(tessdata_dir)))
}

#[cfg(not(feature = "tesseract"))]
fn build_backend(_tessdata_dir: &Path) -> anyhow::Result<Box<dyn OcrBackend>> {
    anyhow::bail!(
        "this build has no OCR engine; rebuild with `--features tesseract` \
         (requires system libtesseract and libleptonica)"
    )
}

/// Assemble the per-image pipeline from CLI flags.
pub fn build_pipeline(
    tessdata_dir: &Path,
    language: &str,
    no_lang_fallback: bool,
) -> anyhow::Result<QuotePipeline<Box<dyn OcrBackend>>> {
    let backend = build_backend(tessdata_dir)?;
    let options = LanguageOptions {
        requested: language.to_string(),
        fallback: if no_lang_fallback { None } else { Some("eng".to_string()) },
    };
    Ok(QuotePipeline::new(backend, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(is_supported_image(&PathBuf::from("scan.JPG")));
        assert!(is_supported_image(&PathBuf::from("scan.png")));
        assert!(!is_supported_image(&PathBuf::from("notes.txt")));
        assert!(!is_supported_image(&PathBuf::from("noextension")));
    }
}
