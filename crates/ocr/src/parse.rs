use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::types::{NumericFormat, Record, RecordTable};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Product codes come in three shapes: a leading sequence number
// ("10 "), an alphanumeric slash code ("RSCAT/7-/R") or a bare 7–8
// digit tariff code. Leftmost match wins, so a leading sequence number
// beats a slash code further into the line.
re!(re_code, r"^\d+\s+|[A-Z0-9]+(?:/[A-Z0-9\-]+)+|\d{7,8}");

// Monetary values: integer part with optional dot-grouped thousands,
// then exactly two decimals after `.` or `,` ("1.345,00", "12,50",
// "12.50").
re!(re_value, r"\d+(?:\.\d{3})*[.,]\d{2}");

/// Lines shorter than this are OCR noise, never data rows.
const MIN_LINE_LEN: usize = 5;

/// Why a line produced no record. Always recovered locally; one
/// malformed line never aborts the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty or below the minimum length.
    TooShort,
    /// No code pattern matched, so not a data row.
    NoCode,
    /// A code matched but no monetary value parsed; a row without a
    /// price is not a data row.
    NoValues,
}

/// Typed per-line result, in place of catch-and-continue.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Record(Record),
    Skipped(SkipReason),
}

/// Strip the thousands separator, swap the decimal separator for `.`,
/// and parse. Pure; malformed input yields `None` rather than an error.
pub fn normalize_value(raw: &str, format: &NumericFormat) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != format.thousands_separator)
        .map(|c| if c == format.decimal_separator { '.' } else { c })
        .collect();
    Decimal::from_str(&cleaned).ok()
}

/// Line-by-line tokenizer turning raw OCR text into structured records.
pub struct RowParser {
    format: NumericFormat,
}

impl RowParser {
    pub fn new(format: NumericFormat) -> Self {
        Self { format }
    }

    /// Parse every line in OCR order and assemble the record table.
    /// Skipped lines are logged and dropped.
    pub fn parse_text(&self, text: &str) -> RecordTable {
        let mut table = RecordTable::new();
        for line in text.lines() {
            match self.parse_line(line) {
                LineOutcome::Record(record) => table.push(record),
                LineOutcome::Skipped(reason) => {
                    debug!(?reason, line, "skipping line");
                }
            }
        }
        table
    }

    /// Parse a single line independently of its neighbors.
    pub fn parse_line(&self, line: &str) -> LineOutcome {
        let line = line.trim();
        if line.len() < MIN_LINE_LEN {
            return LineOutcome::Skipped(SkipReason::TooShort);
        }

        let Some(code_match) = re_code().find(line) else {
            return LineOutcome::Skipped(SkipReason::NoCode);
        };
        let code = code_match.as_str().trim().to_string();

        // Description: remainder after the code, cut at the first
        // monetary value if one follows.
        let rest = line[code_match.end()..].trim();
        let description = match re_value().find(rest) {
            Some(v) => rest[..v.start()].trim().to_string(),
            None => rest.to_string(),
        };

        // Collect every value on the line, left to right, dropping any
        // that fail to normalize.
        let mut values: Vec<Decimal> = re_value()
            .find_iter(line)
            .filter_map(|m| normalize_value(m.as_str(), &self.format))
            .collect();

        if values.is_empty() {
            return LineOutcome::Skipped(SkipReason::NoValues);
        }

        // Largest value first: on this document family the unit price
        // dwarfs quantities and multipliers. A heuristic, not a law.
        values.sort_unstable_by(|a, b| b.cmp(a));
        let unit_value = Some(values[0]);
        let additional_values = values.split_off(1);

        LineOutcome::Record(Record { code, description, unit_value, additional_values })
    }
}

impl Default for RowParser {
    fn default() -> Self {
        Self::new(NumericFormat::brazilian())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(line: &str) -> Record {
        match RowParser::default().parse_line(line) {
            LineOutcome::Record(r) => r,
            LineOutcome::Skipped(reason) => panic!("line skipped: {reason:?}"),
        }
    }

    // ── Numeric normalization ─────────────────────────────────────────────────

    #[test]
    fn normalize_brazilian_thousands() {
        let f = NumericFormat::brazilian();
        assert_eq!(normalize_value("1.234,56", &f), Some(dec("1234.56")));
    }

    #[test]
    fn normalize_plain_comma_decimal() {
        let f = NumericFormat::brazilian();
        assert_eq!(normalize_value("12,50", &f), Some(dec("12.50")));
    }

    #[test]
    fn normalize_malformed_is_none() {
        let f = NumericFormat::brazilian();
        assert_eq!(normalize_value("12,5,6", &f), None);
        assert_eq!(normalize_value("", &f), None);
        assert_eq!(normalize_value("abc", &f), None);
    }

    #[test]
    fn normalize_dot_is_thousands_separator() {
        // The document convention treats a bare dot as grouping.
        let f = NumericFormat::brazilian();
        assert_eq!(normalize_value("1.345", &f), Some(dec("1345")));
    }

    // ── Code precedence ───────────────────────────────────────────────────────

    #[test]
    fn leading_sequence_number_wins() {
        let r = record("10 RSCAT/7-/R 94012090 Cadeira 1.345,00 12,50");
        assert_eq!(r.code, "10");
    }

    #[test]
    fn slash_code_matches_without_leading_number() {
        let r = record("RSCAT/7-/R Cadeira giratoria 890,00");
        assert_eq!(r.code, "RSCAT/7-/R");
    }

    #[test]
    fn bare_tariff_code_matches() {
        let r = record("94012090 Mesa de apoio 215,90");
        assert_eq!(r.code, "94012090");
    }

    #[test]
    fn line_without_code_is_skipped() {
        let out = RowParser::default().parse_line("Condições de pagamento: 30,00 dias");
        // Lowercase prose with no digit prefix, slash code, or tariff
        // number is not a data row.
        assert_eq!(out, LineOutcome::Skipped(SkipReason::NoCode));
    }

    // ── Skip rules ────────────────────────────────────────────────────────────

    #[test]
    fn short_lines_are_skipped() {
        let parser = RowParser::default();
        assert_eq!(parser.parse_line(""), LineOutcome::Skipped(SkipReason::TooShort));
        assert_eq!(parser.parse_line("   "), LineOutcome::Skipped(SkipReason::TooShort));
        assert_eq!(parser.parse_line("10 a"), LineOutcome::Skipped(SkipReason::TooShort));
    }

    #[test]
    fn row_without_price_is_skipped() {
        let out = RowParser::default().parse_line("10 Cadeira ergonomica");
        assert_eq!(out, LineOutcome::Skipped(SkipReason::NoValues));
    }

    // ── Field assignment ──────────────────────────────────────────────────────

    #[test]
    fn largest_value_becomes_unit_value() {
        let r = record("20 Mesa 12,50 1.345,00 3,00");
        assert_eq!(r.unit_value, Some(dec("1345.00")));
        assert_eq!(r.additional_values, vec![dec("12.50"), dec("3.00")]);
    }

    #[test]
    fn single_value_has_no_additional() {
        let r = record("30 Armario 215,90");
        assert_eq!(r.unit_value, Some(dec("215.90")));
        assert!(r.additional_values.is_empty());
    }

    #[test]
    fn description_cut_at_first_value() {
        let r = record("10 RSCAT/7-/R 94012090 Cadeira 1.345,00 12,50");
        assert_eq!(r.description, "RSCAT/7-/R 94012090 Cadeira");
    }

    #[test]
    fn description_after_tariff_code() {
        let r = record("94012090 Mesa lateral 99,90");
        assert_eq!(r.description, "Mesa lateral");
    }

    // ── End-to-end line ───────────────────────────────────────────────────────

    #[test]
    fn documented_example_line() {
        let r = record("10 RSCAT/7-/R 94012090 Cadeira 1.345,00 12,50");
        assert_eq!(r.code, "10");
        assert_eq!(r.description, "RSCAT/7-/R 94012090 Cadeira");
        assert_eq!(r.unit_value, Some(dec("1345.00")));
        assert_eq!(r.additional_values, vec![dec("12.50")]);
    }

    // ── Table assembly ────────────────────────────────────────────────────────

    #[test]
    fn parse_text_preserves_line_order() {
        let text = "COTAÇÃO DE PREÇOS\n\
                    10 Cadeira 1.345,00\n\
                    ruído\n\
                    20 Mesa 215,90 2,00\n";
        let table = RowParser::default().parse_text(text);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].code, "10");
        assert_eq!(table.records()[1].code, "20");
    }

    #[test]
    fn record_count_bounded_by_lines_with_values() {
        let text = "10 Cadeira 1.345,00\n\
                    20 Mesa sem preco\n\
                    sem codigo 12,50\n\
                    30 Armario 99,90\n";
        let lines_with_values = text.lines().filter(|l| re_value().is_match(l)).count();
        let table = RowParser::default().parse_text(text);
        assert!(table.len() <= lines_with_values);
    }

    #[test]
    fn empty_text_yields_empty_table() {
        assert!(RowParser::default().parse_text("").is_empty());
        assert!(RowParser::default().parse_text("\n\n\n").is_empty());
    }

    #[test]
    fn garbage_never_panics() {
        let parser = RowParser::default();
        let _ = parser.parse_text("!@#$%^&*()\n\0\x01\x02\n10 \u{fffd}\u{fffd} 1,00");
    }
}
