use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::detect::{detect_table_region, DetectConfig};
use crate::parse::RowParser;
use crate::preprocess::{encode_as_png, normalize, EnhanceProfile, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::{NumericFormat, RecordTable, Region};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Which language model to request, and what to do when it is absent.
#[derive(Debug, Clone)]
pub struct LanguageOptions {
    pub requested: String,
    /// Tried when the requested model is missing; `None` means fail
    /// cleanly instead.
    pub fallback: Option<String>,
}

impl Default for LanguageOptions {
    fn default() -> Self {
        LanguageOptions { requested: "por".into(), fallback: Some("eng".into()) }
    }
}

/// Everything extracted from one image.
#[derive(Debug)]
pub struct QuoteExtraction {
    /// Where the table was found (or assumed) on the page.
    pub region: Region,
    /// Raw OCR output, kept for diagnostics.
    pub ocr_text: String,
    pub table: RecordTable,
}

impl QuoteExtraction {
    /// Zero records parsed, the "no table found" condition. Not an
    /// error; the caller decides whether that is fatal for its input.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Strict sequential pipeline for one image:
/// detect region on the raw page → crop → normalize → OCR → parse.
/// A batch of images is embarrassingly parallel around this type; the
/// pipeline itself holds only read-only configuration.
pub struct QuotePipeline<R: OcrBackend> {
    recognizer: R,
    profile: EnhanceProfile,
    detect: DetectConfig,
    language: LanguageOptions,
    parser: RowParser,
}

impl<R: OcrBackend> QuotePipeline<R> {
    pub fn new(recognizer: R, language: LanguageOptions) -> Self {
        Self {
            recognizer,
            profile: EnhanceProfile::default(),
            detect: DetectConfig::default(),
            language,
            parser: RowParser::new(NumericFormat::brazilian()),
        }
    }

    pub fn with_profile(mut self, profile: EnhanceProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_detect_config(mut self, detect: DetectConfig) -> Self {
        self.detect = detect;
        self
    }

    pub fn with_format(mut self, format: NumericFormat) -> Self {
        self.parser = RowParser::new(format);
        self
    }

    /// Process an image file on disk.
    pub fn process_file(&self, path: &Path) -> Result<QuoteExtraction, PipelineError> {
        let img = image::open(path)?;
        self.process_image(&img)
    }

    /// Process an already-loaded image.
    pub fn process_image(&self, img: &image::DynamicImage) -> Result<QuoteExtraction, PipelineError> {
        // The detector works on the raw page; normalization would
        // erase the gridlines it depends on.
        let region = detect_table_region(img, &self.detect);
        debug!(?region, "table region");

        let crop = img.crop_imm(region.x, region.y, region.width, region.height);
        let prepared = normalize(&crop, &self.profile);
        let png = encode_as_png(&prepared)?;

        let lang = self.resolve_language()?;
        let ocr_text = self.recognizer.recognize(&png, lang)?;

        let table = self.parser.parse_text(&ocr_text);
        Ok(QuoteExtraction { region, ocr_text, table })
    }

    /// Standalone region detection, for diagnostics.
    pub fn detect_region(&self, img: &image::DynamicImage) -> Region {
        detect_table_region(img, &self.detect)
    }

    fn resolve_language(&self) -> Result<&str, OcrError> {
        if self.recognizer.is_language_available(&self.language.requested) {
            return Ok(&self.language.requested);
        }
        if let Some(fallback) = &self.language.fallback {
            if self.recognizer.is_language_available(fallback) {
                warn!(
                    requested = %self.language.requested,
                    fallback = %fallback,
                    "language model missing, using fallback"
                );
                return Ok(fallback);
            }
        }
        Err(OcrError::LanguageUnavailable(self.language.requested.clone()))
    }
}
