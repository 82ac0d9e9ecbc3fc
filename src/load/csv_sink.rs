//! CSV output.

use super::{LoadBatch, Sink};
use crate::error::SinkError;
use crate::models::{
    DayOfWeek, EnrichedOrder, GroupBy, QuantitySegment, RevenueSegment, SummaryRecord,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const CLEANED_FILE: &str = "cleaned_sales.csv";
pub const TRANSFORMED_FILE: &str = "transformed_sales.csv";

/// Writes cleaned and transformed records plus one CSV per summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvSink;

/// Transformed record flattened for CSV, which has no nested structures.
#[derive(Serialize)]
struct TransformedRow<'a> {
    order_id: &'a str,
    product_name: &'a str,
    category: &'a str,
    quantity: u32,
    unit_price: Decimal,
    total_amount: Decimal,
    customer_id: &'a str,
    order_date: NaiveDate,
    region: &'a str,
    year: i32,
    month: u32,
    quarter: u32,
    month_key: &'a str,
    day_of_week: DayOfWeek,
    is_weekend: bool,
    revenue_segment: RevenueSegment,
    quantity_segment: QuantitySegment,
}

impl<'a> From<&'a EnrichedOrder> for TransformedRow<'a> {
    fn from(e: &'a EnrichedOrder) -> Self {
        Self {
            order_id: &e.order.order_id,
            product_name: &e.order.product_name,
            category: &e.order.category,
            quantity: e.order.quantity,
            unit_price: e.order.unit_price,
            total_amount: e.order.total_amount,
            customer_id: &e.order.customer_id,
            order_date: e.order.order_date,
            region: &e.order.region,
            year: e.year,
            month: e.month,
            quarter: e.quarter,
            month_key: &e.month_key,
            day_of_week: e.day_of_week,
            is_weekend: e.is_weekend,
            revenue_segment: e.revenue_segment,
            quantity_segment: e.quantity_segment,
        }
    }
}

/// Column names of a summary file; the first one depends on the dimension.
pub fn summary_header(group_by: GroupBy) -> [&'static str; 7] {
    [
        group_by.key_name(),
        "order_count",
        "total_quantity",
        "total_revenue",
        "avg_order_value",
        "unique_customers",
        "unique_products",
    ]
}

fn write_summary(path: &Path, group_by: GroupBy, rows: &[SummaryRecord]) -> Result<(), SinkError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(summary_header(group_by))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl Sink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write(&mut self, dir: &Path, batch: &LoadBatch<'_>) -> Result<Vec<PathBuf>, SinkError> {
        let mut written = Vec::new();

        let mut cleaned = csv::Writer::from_path(dir.join(CLEANED_FILE))?;
        for order in batch.cleaned {
            cleaned.serialize(order)?;
        }
        cleaned.flush()?;
        written.push(PathBuf::from(CLEANED_FILE));

        let mut transformed = csv::Writer::from_path(dir.join(TRANSFORMED_FILE))?;
        for order in batch.transformed {
            transformed.serialize(TransformedRow::from(order))?;
        }
        transformed.flush()?;
        written.push(PathBuf::from(TRANSFORMED_FILE));

        for (group_by, rows) in batch.summaries.iter() {
            let file = format!("{}.csv", group_by.table_name());
            write_summary(&dir.join(&file), group_by, rows)?;
            written.push(PathBuf::from(file));
        }

        Ok(written)
    }
}
