//! Table extraction from photographed price-quotation documents:
//! region detection, OCR normalization, and pattern-based row parsing.

pub mod detect;
pub mod parse;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use detect::{detect_table_region, DetectConfig};
pub use parse::{normalize_value, LineOutcome, RowParser, SkipReason};
pub use pipeline::{LanguageOptions, PipelineError, QuoteExtraction, QuotePipeline};
pub use preprocess::{normalize, prepare_for_ocr, EnhanceProfile, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use types::{NumericFormat, Record, RecordTable, Region};
