//! Data warehouse snapshot.
//!
//! Writes `data_warehouse/warehouse_data.json` with run metadata and all
//! summaries, plus `data_warehouse/data_dictionary.json` describing the
//! transformed record columns.

use super::{LoadBatch, Sink};
use crate::error::SinkError;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const WAREHOUSE_DIR: &str = "data_warehouse";
pub const SNAPSHOT_FILE: &str = "warehouse_data.json";
pub const DICTIONARY_FILE: &str = "data_dictionary.json";

/// Column descriptions for the transformed records.
const DICTIONARY: [(&str, &str, &str); 17] = [
    ("order_id", "string", "Unique order identifier"),
    ("product_name", "string", "Name of the product"),
    ("category", "string", "Product category"),
    ("quantity", "integer", "Number of units ordered"),
    ("unit_price", "decimal", "Price per unit"),
    ("total_amount", "decimal", "Order total, quantity times unit price"),
    ("customer_id", "string", "Customer identifier"),
    ("order_date", "date", "Order date, YYYY-MM-DD"),
    ("region", "string", "Sales region"),
    ("year", "integer", "Order year"),
    ("month", "integer", "Order month, 1-12"),
    ("quarter", "integer", "Order quarter, 1-4"),
    ("month_key", "string", "Order month, YYYY-MM"),
    ("day_of_week", "string", "Weekday name"),
    ("is_weekend", "boolean", "Placed on Saturday or Sunday"),
    ("revenue_segment", "string", "Low (<100), Medium (<500), High (<1000), Very High"),
    ("quantity_segment", "string", "Single (1), Small (2-5), Medium (6-10), Large (>10)"),
];

/// Writes the warehouse snapshot and its data dictionary.
#[derive(Debug, Default, Clone, Copy)]
pub struct WarehouseSink;

fn write_json(path: &Path, value: &Value) -> Result<(), SinkError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn snapshot(batch: &LoadBatch<'_>) -> Result<Value, SinkError> {
    let mut summaries = Map::new();
    for (group_by, rows) in batch.summaries.iter() {
        summaries.insert(group_by.table_name().to_string(), serde_json::to_value(rows)?);
    }

    Ok(json!({
        "metadata": {
            "created_at": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Sales data warehouse snapshot",
            "record_counts": {
                "cleaned": batch.cleaned.len(),
                "transformed": batch.transformed.len(),
            },
        },
        "summaries": summaries,
    }))
}

fn dictionary() -> Value {
    let columns: Map<String, Value> = DICTIONARY
        .iter()
        .map(|(name, kind, description)| {
            (
                name.to_string(),
                json!({ "type": kind, "description": description }),
            )
        })
        .collect();
    json!({ "sales_data": columns })
}

impl Sink for WarehouseSink {
    fn name(&self) -> &'static str {
        "warehouse"
    }

    fn write(&mut self, dir: &Path, batch: &LoadBatch<'_>) -> Result<Vec<PathBuf>, SinkError> {
        let root = dir.join(WAREHOUSE_DIR);
        fs::create_dir_all(&root)?;

        write_json(&root.join(SNAPSHOT_FILE), &snapshot(batch)?)?;
        write_json(&root.join(DICTIONARY_FILE), &dictionary())?;

        Ok(vec![
            Path::new(WAREHOUSE_DIR).join(SNAPSHOT_FILE),
            Path::new(WAREHOUSE_DIR).join(DICTIONARY_FILE),
        ])
    }
}
