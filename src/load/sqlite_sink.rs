//! SQLite output.
//!
//! One `sales_data` table holding the transformed records, indexed on the
//! columns dashboards filter by, and one table per summary.

use super::{LoadBatch, Sink};
use crate::error::SinkError;
use crate::models::{GroupBy, SummaryRecord};
use rusqlite::{params, Connection, Transaction};
use rust_decimal::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Columns of `sales_data` that get an index.
pub const INDEXED_COLUMNS: [&str; 5] = [
    "order_date",
    "product_name",
    "category",
    "region",
    "customer_id",
];

const SALES_TABLE: &str = r#"
    CREATE TABLE sales_data (
        order_id         TEXT PRIMARY KEY,
        product_name     TEXT NOT NULL,
        category         TEXT NOT NULL,
        quantity         INTEGER NOT NULL,
        unit_price       REAL NOT NULL,
        total_amount     REAL NOT NULL,
        customer_id      TEXT NOT NULL,
        order_date       TEXT NOT NULL,
        region           TEXT NOT NULL,
        year             INTEGER NOT NULL,
        month            INTEGER NOT NULL,
        quarter          INTEGER NOT NULL,
        month_key        TEXT NOT NULL,
        day_of_week      TEXT NOT NULL,
        is_weekend       INTEGER NOT NULL,
        revenue_segment  TEXT NOT NULL,
        quantity_segment TEXT NOT NULL
    );
"#;

/// Writes a fresh SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    file_name: String,
}

impl SqliteSink {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

fn money(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn insert_sales(tx: &Transaction<'_>, batch: &LoadBatch<'_>) -> Result<(), SinkError> {
    let mut stmt = tx.prepare(
        "INSERT INTO sales_data VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
    )?;
    for e in batch.transformed {
        let o = &e.order;
        stmt.execute(params![
            o.order_id,
            o.product_name,
            o.category,
            o.quantity,
            money(o.unit_price),
            money(o.total_amount),
            o.customer_id,
            o.order_date.format("%Y-%m-%d").to_string(),
            o.region,
            e.year,
            e.month,
            e.quarter,
            e.month_key,
            e.day_of_week.to_string(),
            e.is_weekend,
            e.revenue_segment.to_string(),
            e.quantity_segment.to_string(),
        ])?;
    }
    Ok(())
}

fn insert_summary(
    tx: &Transaction<'_>,
    group_by: GroupBy,
    rows: &[SummaryRecord],
) -> Result<(), SinkError> {
    let table = group_by.table_name();
    tx.execute_batch(&format!(
        "CREATE TABLE {table} (
            {key} TEXT PRIMARY KEY,
            order_count      INTEGER NOT NULL,
            total_quantity   INTEGER NOT NULL,
            total_revenue    REAL NOT NULL,
            avg_order_value  REAL NOT NULL,
            unique_customers INTEGER NOT NULL,
            unique_products  INTEGER NOT NULL
        );",
        key = group_by.key_name(),
    ))?;

    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {table} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    ))?;
    for row in rows {
        stmt.execute(params![
            row.key,
            row.order_count as i64,
            i64::try_from(row.total_quantity).unwrap_or(i64::MAX),
            money(row.total_revenue),
            money(row.avg_order_value),
            row.unique_customers as i64,
            row.unique_products as i64,
        ])?;
    }
    Ok(())
}

impl Sink for SqliteSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write(&mut self, dir: &Path, batch: &LoadBatch<'_>) -> Result<Vec<PathBuf>, SinkError> {
        let path = dir.join(&self.file_name);
        let mut conn = Connection::open(&path)?;
        let tx = conn.transaction()?;

        tx.execute_batch(SALES_TABLE)?;
        insert_sales(&tx, batch)?;
        for column in INDEXED_COLUMNS {
            tx.execute_batch(&format!(
                "CREATE INDEX idx_sales_{column} ON sales_data ({column});"
            ))?;
        }
        for (group_by, rows) in batch.summaries.iter() {
            insert_summary(&tx, group_by, rows)?;
        }

        tx.commit()?;
        conn.close().map_err(|(_, e)| e)?;
        debug!("Wrote {} rows to {}", batch.transformed.len(), path.display());

        Ok(vec![PathBuf::from(&self.file_name)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::test_support::sample_data;

    fn write_sample(dir: &Path) -> Connection {
        let (orders, transformed, summaries) = sample_data();
        let batch = LoadBatch {
            cleaned: &orders,
            transformed: &transformed,
            summaries: &summaries,
        };
        SqliteSink::new("sales.db").write(dir, &batch).unwrap();
        Connection::open(dir.join("sales.db")).unwrap()
    }

    #[test]
    fn test_sales_table() {
        let dir = tempfile::tempdir().unwrap();
        let conn = write_sample(dir.path());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sales_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let (segment, weekend): (String, bool) = conn
            .query_row(
                "SELECT revenue_segment, is_weekend FROM sales_data WHERE order_id = ?1",
                params!["O1"],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(segment, "High");
        assert!(weekend);

        let revenue: f64 = conn
            .query_row("SELECT SUM(total_amount) FROM sales_data", [], |row| row.get(0))
            .unwrap();
        assert!((revenue - 1300.99).abs() < 1e-6);
    }

    #[test]
    fn test_indexes_exist() {
        let dir = tempfile::tempdir().unwrap();
        let conn = write_sample(dir.path());

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'sales_data' AND name LIKE 'idx_%'")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(names.len(), INDEXED_COLUMNS.len());
        assert!(names.contains(&"idx_sales_region".to_string()));
    }

    #[test]
    fn test_summary_tables() {
        let dir = tempfile::tempdir().unwrap();
        let conn = write_sample(dir.path());

        for group_by in GroupBy::ALL {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {}", group_by.table_name()),
                    [],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 2, "{}", group_by);
        }

        let orders: i64 = conn
            .query_row(
                "SELECT order_count FROM category_summary WHERE category = 'Furniture'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orders, 1);
    }
}
