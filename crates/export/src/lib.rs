//! Spreadsheet serialization for extracted record tables.

use std::io;

use cotiz_ocr::RecordTable;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Write the table as CSV, one record per row, header first.
/// Additional values share one cell, joined with `;`.
pub fn write_csv<W: io::Write>(table: &RecordTable, writer: W) -> Result<(), ExportError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.columns())?;
    for record in table.records() {
        let unit = record.unit_value.map(format_value).unwrap_or_default();
        let extras = record
            .additional_values
            .iter()
            .copied()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(";");
        out.write_record([
            record.code.as_str(),
            record.description.as_str(),
            unit.as_str(),
            extras.as_str(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

pub fn to_csv_string(table: &RecordTable) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    // csv never writes invalid UTF-8 for UTF-8 input.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn to_json(table: &RecordTable) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(table)?)
}

/// Plain-text rendering for terminal inspection.
pub fn to_text(table: &RecordTable) -> String {
    let mut out = String::new();
    for record in table.records() {
        out.push_str(&record.code);
        out.push_str("  ");
        out.push_str(&record.description);
        if let Some(unit) = record.unit_value {
            out.push_str(&format!("  unit={}", format_value(unit)));
        }
        for extra in &record.additional_values {
            out.push_str(&format!("  {}", format_value(*extra)));
        }
        out.push('\n');
    }
    out
}

/// Two decimal places with a dot separator, regardless of the source
/// document's locale.
fn format_value(value: Decimal) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cotiz_ocr::RowParser;

    fn sample_table() -> RecordTable {
        RowParser::default()
            .parse_text("10 Cadeira giratoria 1.345,00 12,50 3,00\n20 Mesa 215,90")
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = to_csv_string(&sample_table()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("code,description,unit_value,additional_values"));
        assert_eq!(lines.next(), Some("10,Cadeira giratoria,1345.00,12.50;3.00"));
        assert_eq!(lines.next(), Some("20,Mesa,215.90,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_of_empty_table_is_header_only() {
        let csv = to_csv_string(&RecordTable::new()).unwrap();
        assert_eq!(csv.trim_end(), "code,description,unit_value,additional_values");
    }

    #[test]
    fn json_roundtrips_record_fields() {
        let json = to_json(&sample_table()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["records"][0]["code"], "10");
        assert_eq!(parsed["records"][1]["description"], "Mesa");
    }

    #[test]
    fn text_lists_all_values() {
        let text = to_text(&sample_table());
        assert!(text.contains("unit=1345.00"));
        assert!(text.contains("12.50"));
        assert!(text.lines().count() == 2);
    }
}
