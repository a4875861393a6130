use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Language model '{0}' is not available")]
    LanguageUnavailable(String),
}

/// Abstraction over an OCR engine.
///
/// Implementations accept raw PNG/JPEG image bytes plus a language code
/// and return the recognized text, top-to-bottom, one line per text
/// row. The call is synchronous and potentially slow; callers wanting
/// bounded latency wrap it externally.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8], lang: &str) -> Result<String, OcrError>;

    /// Whether the language model for `lang` is present. Backends with
    /// no per-language models just answer true.
    fn is_language_available(&self, lang: &str) -> bool;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image_bytes: &[u8], lang: &str) -> Result<String, OcrError> {
        (**self).recognize(image_bytes, lang)
    }

    fn is_language_available(&self, lang: &str) -> bool {
        (**self).is_language_available(lang)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string, letting the region/parse pipeline be
/// tested without Tesseract installed.
pub struct MockRecognizer {
    pub text: String,
    missing_languages: Vec<String>,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), missing_languages: Vec::new() }
    }

    /// Pretend the given language models are absent.
    pub fn without_language(mut self, lang: impl Into<String>) -> Self {
        self.missing_languages.push(lang.into());
        self
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8], lang: &str) -> Result<String, OcrError> {
        if !self.is_language_available(lang) {
            return Err(OcrError::LanguageUnavailable(lang.to_string()));
        }
        Ok(self.text.clone())
    }

    fn is_language_available(&self, lang: &str) -> bool {
        !self.missing_languages.iter().any(|l| l == lang)
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use leptess::{LepTess, Variable};
    use std::path::PathBuf;

    /// Tesseract over leptonica, configured for tabular pages:
    /// page-segmentation mode 6 (uniform block of text) with interword
    /// spaces preserved so column gaps survive into the raw text.
    ///
    /// The tessdata directory is explicit construction-time state, not
    /// a process-wide environment variable, so two recognizers with
    /// different model directories can coexist in one process.
    pub struct TesseractRecognizer {
        tessdata_dir: PathBuf,
    }

    impl TesseractRecognizer {
        pub fn new(tessdata_dir: impl Into<PathBuf>) -> Self {
            Self { tessdata_dir: tessdata_dir.into() }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8], lang: &str) -> Result<String, OcrError> {
            if !self.is_language_available(lang) {
                return Err(OcrError::LanguageUnavailable(lang.to_string()));
            }
            let data_path = self.tessdata_dir.to_string_lossy();
            let mut lt = LepTess::new(Some(data_path.as_ref()), lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, "6")
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::PreserveInterwordSpaces, "1")
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }

        fn is_language_available(&self, lang: &str) -> bool {
            self.tessdata_dir.join(format!("{lang}.traineddata")).exists()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::new("10 Cadeira 1.345,00");
        assert_eq!(r.recognize(b"fake image data", "por").unwrap(), "10 Cadeira 1.345,00");
    }

    #[test]
    fn mock_ignores_image_content() {
        let r = MockRecognizer::new("hello");
        assert_eq!(r.recognize(b"anything", "por").unwrap(), "hello");
        assert_eq!(r.recognize(b"", "eng").unwrap(), "hello");
    }

    #[test]
    fn mock_reports_missing_language() {
        let r = MockRecognizer::new("text").without_language("por");
        assert!(!r.is_language_available("por"));
        assert!(r.is_language_available("eng"));
        assert!(matches!(
            r.recognize(b"img", "por"),
            Err(OcrError::LanguageUnavailable(l)) if l == "por"
        ));
    }
}
