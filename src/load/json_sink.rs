//! JSON records output.

use super::{LoadBatch, Sink};
use crate::error::SinkError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes the transformed records as one pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonSink {
    file_name: String,
}

impl JsonSink {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Sink for JsonSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write(&mut self, dir: &Path, batch: &LoadBatch<'_>) -> Result<Vec<PathBuf>, SinkError> {
        let mut writer = BufWriter::new(File::create(dir.join(&self.file_name))?);
        serde_json::to_writer_pretty(&mut writer, batch.transformed)?;
        writer.flush()?;
        Ok(vec![PathBuf::from(&self.file_name)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::test_support::sample_data;

    #[test]
    fn test_records_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let (orders, transformed, summaries) = sample_data();
        let batch = LoadBatch {
            cleaned: &orders,
            transformed: &transformed,
            summaries: &summaries,
        };

        let written = JsonSink::new("records.json").write(dir.path(), &batch).unwrap();
        assert_eq!(written, vec![PathBuf::from("records.json")]);

        let content = std::fs::read_to_string(dir.path().join("records.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["order_id"], "O1");
        assert_eq!(records[0]["day_of_week"], "Saturday");
        assert_eq!(records[0]["revenue_segment"], "High");
        assert_eq!(records[1]["month_key"], "2024-02");
        assert_eq!(records[1]["quantity"], 2);
        assert_eq!(records[1]["unit_price"], "150.50");
        assert_eq!(records[1]["total_amount"], "301.00");
    }
}
