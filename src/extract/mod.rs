//! Extract step: reading raw order rows from a CSV source.
//!
//! Columns are located by header name so that column order and extra
//! columns in the export do not matter. Cells are passed through as text;
//! validation is left to the cleaner.

use crate::error::{PipelineError, PipelineResult};
use crate::models::RawOrder;
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns without which no row can ever be valid.
pub const REQUIRED_COLUMNS: [&str; 2] = ["order_id", "order_date"];

/// Rows read from a source.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    /// Raw rows in source order.
    pub rows: Vec<RawOrder>,
    /// Header names as found in the source.
    pub columns: Vec<String>,
    /// Lines that could not be parsed as a CSV record and were skipped.
    pub unreadable_rows: usize,
}

/// Read all order rows from a CSV file.
pub fn read_orders(path: &Path) -> PipelineResult<Extracted> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    info!("Reading orders from {}", path.display());
    let file = File::open(path)?;
    read_labelled(file, path)
}

/// Read all order rows from any reader producing CSV text.
pub fn read_orders_from_reader<R: Read>(reader: R) -> PipelineResult<Extracted> {
    read_labelled(reader, Path::new("<reader>"))
}

fn read_labelled<R: Read>(reader: R, label: &Path) -> PipelineResult<Extracted> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|source| PipelineError::Unreadable {
            path: label.to_path_buf(),
            source,
        })?
        .clone();

    let header_map = build_header_map(&headers);
    for column in REQUIRED_COLUMNS {
        if !header_map.contains_key(column) {
            return Err(PipelineError::MissingColumn(column.to_string()));
        }
    }

    let mut extracted = Extracted {
        columns: headers.iter().map(String::from).collect(),
        ..Default::default()
    };

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line, lines are 1-based
        let line = idx + 2;

        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(PipelineError::Unreadable {
                    path: label.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                warn!("Skipping unreadable line {}: {}", line, e);
                extracted.unreadable_rows += 1;
                continue;
            }
        };

        extracted.rows.push(to_raw_order(&record, &header_map));
    }

    if extracted.rows.is_empty() {
        let reason = if extracted.unreadable_rows > 0 {
            format!("all {} data rows were unreadable", extracted.unreadable_rows)
        } else {
            "no data rows".to_string()
        };
        return Err(PipelineError::EmptyInput(reason));
    }

    debug!(
        "Extracted {} rows ({} unreadable) with columns {:?}",
        extracted.rows.len(),
        extracted.unreadable_rows,
        extracted.columns
    );

    Ok(extracted)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = name.trim_start_matches('\u{feff}').trim().to_lowercase();
            (name, idx)
        })
        .collect()
}

fn get_optional(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<String> {
    let idx = header_map.get(name)?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn to_raw_order(record: &StringRecord, header_map: &HashMap<String, usize>) -> RawOrder {
    RawOrder {
        order_id: get_optional(record, header_map, "order_id"),
        product_name: get_optional(record, header_map, "product_name"),
        category: get_optional(record, header_map, "category"),
        quantity: get_optional(record, header_map, "quantity"),
        unit_price: get_optional(record, header_map, "unit_price"),
        total_amount: get_optional(record, header_map, "total_amount"),
        customer_id: get_optional(record, header_map, "customer_id"),
        order_date: get_optional(record, header_map, "order_date"),
        region: get_optional(record, header_map, "region"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "order_id,product_name,category,quantity,unit_price,total_amount,customer_id,order_date,region\n";

    #[test]
    fn test_read_rows_in_order() {
        let data = format!(
            "{}O1,Laptop,Electronics,2,50,100,C1,2024-01-06,North\nO2,Mouse,Electronics,,10,20,C2,2024-01-07,South\n",
            HEADER
        );

        let extracted = read_orders_from_reader(data.as_bytes()).unwrap();

        assert_eq!(extracted.rows.len(), 2);
        assert_eq!(extracted.columns.len(), 9);
        assert_eq!(extracted.rows[0].order_id.as_deref(), Some("O1"));
        assert_eq!(extracted.rows[1].order_id.as_deref(), Some("O2"));
        assert_eq!(extracted.rows[1].quantity, None);
        assert_eq!(extracted.rows[1].unit_price.as_deref(), Some("10"));
    }

    #[test]
    fn test_header_lookup_ignores_order_case_and_extras() {
        let data = "Region, ORDER_DATE ,Order_ID,notes\nWest,2024-02-01,O9,hello\n";

        let extracted = read_orders_from_reader(data.as_bytes()).unwrap();
        let row = &extracted.rows[0];

        assert_eq!(row.order_id.as_deref(), Some("O9"));
        assert_eq!(row.order_date.as_deref(), Some("2024-02-01"));
        assert_eq!(row.region.as_deref(), Some("West"));
        assert_eq!(row.quantity, None);
    }

    #[test]
    fn test_missing_required_column() {
        let data = "order_id,quantity\nO1,2\n";
        let err = read_orders_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "order_date"));
    }

    #[test]
    fn test_header_only_is_empty_input() {
        let err = read_orders_from_reader(HEADER.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput(_)));
    }

    #[test]
    fn test_short_rows_are_padded_with_missing() {
        let data = format!("{}O1,Laptop\n", HEADER);
        let extracted = read_orders_from_reader(data.as_bytes()).unwrap();
        assert_eq!(extracted.rows[0].product_name.as_deref(), Some("Laptop"));
        assert_eq!(extracted.rows[0].order_date, None);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(b"order_id,order_date\nO1,2024-01-01\n");
        data.extend_from_slice(b"\xff\xfe,2024-01-02\n");
        data.extend_from_slice(b"O3,2024-01-03\n");

        let extracted = read_orders_from_reader(data.as_slice()).unwrap();

        assert_eq!(extracted.rows.len(), 2);
        assert_eq!(extracted.unreadable_rows, 1);
    }

    #[test]
    fn test_read_orders_missing_file() {
        let err = read_orders(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound(_)));
    }

    #[test]
    fn test_read_orders_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}O1,Laptop,Electronics,1,999,999,C1,2024-03-01,East\n", HEADER).unwrap();

        let extracted = read_orders(file.path()).unwrap();
        assert_eq!(extracted.rows.len(), 1);
    }
}
