//! CSV export of the unified stream
//!
//! Deterministic column order `Tipo,ID/Título,Estado,Monto,Fecha`. Every
//! field is quoted regardless of content (internal quotes doubled), so the
//! output stays valid CSV even when titles contain commas or quotes.

use csv::{QuoteStyle, WriterBuilder};
use trato_types::{Result, TratoError, UnifiedTransaction};

const HEADER: [&str; 5] = ["Tipo", "ID/Título", "Estado", "Monto", "Fecha"];

/// Render rows as a CSV document
pub fn export_csv(rows: &[UnifiedTransaction]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(HEADER)
        .map_err(|e| TratoError::internal(e.to_string()))?;

    for row in rows {
        let title = if row.title.is_empty() {
            row.id.as_str()
        } else {
            row.title.as_str()
        };
        let amount = row.amount.map(|a| a.to_string()).unwrap_or_default();
        let date = row.date.to_rfc3339();
        writer
            .write_record([row.source.label(), title, row.status.as_str(), &amount, &date])
            .map_err(|e| TratoError::internal(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TratoError::internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| TratoError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use trato_types::SourceKind;

    fn row(source: SourceKind, title: &str, amount: Option<rust_decimal::Decimal>) -> UnifiedTransaction {
        UnifiedTransaction {
            source,
            id: "esc_0001".to_string(),
            title: title.to_string(),
            date: Utc::now(),
            amount,
            status: "held".to_string(),
            meta: serde_json::json!({}),
        }
    }

    #[test]
    fn test_header_and_quoting() {
        let csv = export_csv(&[row(SourceKind::Payment, "Café", Some(dec!(45.00)))]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Tipo\",\"ID/Título\",\"Estado\",\"Monto\",\"Fecha\""
        );
        assert!(lines.next().unwrap().starts_with("\"Pago\",\"Café\","));
    }

    #[test]
    fn test_hostile_title_roundtrip() {
        let title = "Cámara \"pro\", usada";
        let csv = export_csv(&[row(SourceKind::Escrow, title, None)]).unwrap();

        // A standard CSV parser must split the row back into the original fields
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "Compra protegida");
        assert_eq!(&record[1], title);
        assert_eq!(&record[2], "held");
        assert_eq!(&record[3], "");
    }

    #[test]
    fn test_empty_title_falls_back_to_id() {
        let csv = export_csv(&[row(SourceKind::Escrow, "", None)]).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "esc_0001");
    }

    #[test]
    fn test_amount_column() {
        let csv = export_csv(&[
            row(SourceKind::Payment, "Con monto", Some(dec!(149.90))),
            row(SourceKind::Escrow, "Sin monto", None),
        ])
        .unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv.as_bytes());
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][3], "149.90");
        assert_eq!(&rows[1][3], "");
    }
}
