use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle inside an image's coordinate space.
/// Always non-empty and fully contained within the parent image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Build a region clamped to an `image_width` × `image_height` parent.
    /// The result never ends up empty for a non-empty parent: a rectangle
    /// that falls entirely outside collapses onto the nearest in-bounds
    /// strip of at least one pixel.
    pub fn clipped_to(x: u32, y: u32, width: u32, height: u32, image_width: u32, image_height: u32) -> Self {
        let x = x.min(image_width.saturating_sub(1));
        let y = y.min(image_height.saturating_sub(1));
        let width = width.min(image_width - x).max(1);
        let height = height.min(image_height - y).max(1);
        Region { x, y, width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Which characters separate decimals and thousands in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericFormat {
    pub decimal_separator: char,
    pub thousands_separator: char,
}

impl NumericFormat {
    /// Brazilian convention: `1.345,00`.
    pub fn brazilian() -> Self {
        NumericFormat { decimal_separator: ',', thousands_separator: '.' }
    }
}

impl Default for NumericFormat {
    fn default() -> Self {
        Self::brazilian()
    }
}

/// One structured row extracted from a quotation table.
/// Exists only when a code pattern matched and at least one monetary
/// value parsed from the source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub code: String,
    pub description: String,
    /// The largest value on the row, heuristically the unit price in
    /// this document family. A replaceable policy, not a law.
    pub unit_value: Option<Decimal>,
    /// Remaining values, in descending order.
    pub additional_values: Vec<Decimal>,
}

/// Column labels emitted ahead of the records by the exporters.
pub const COLUMN_LABELS: [&str; 4] = ["code", "description", "unit_value", "additional_values"];

/// An ordered table of extracted records. Populated row-by-row by the
/// assembler, read-only once handed to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordTable {
    records: Vec<Record>,
}

impl RecordTable {
    pub fn new() -> Self {
        RecordTable { records: Vec::new() }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Zero records parsed, the "no table found" condition. Not an
    /// error; the caller decides whether that is fatal for its input.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMN_LABELS
    }
}
