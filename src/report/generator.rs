//! Markdown and JSON report generation.
//!
//! This module renders a [`RunSummary`] as a human-readable Markdown
//! document or as pretty-printed JSON for downstream tooling.

use crate::models::{
    CleaningReport, GroupBy, MonthlyTrend, Overview, SegmentBucket, SegmentMix, SummaryRecord,
};
use crate::pipeline::RunSummary;
use rust_decimal::Decimal;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(summary: &RunSummary) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Sales Analysis Report\n\n");

    output.push_str(&generate_metadata_section(summary));
    output.push_str(&generate_table_of_contents(summary));
    output.push_str(&generate_stages_section(summary));
    output.push_str(&generate_quality_section(summary.rows_extracted, summary.unreadable_rows, &summary.cleaning));
    output.push_str(&generate_overview_section(&summary.report.overview));

    // Top lists
    output.push_str("## Top Performers\n\n");
    for group_by in GroupBy::ALL {
        output.push_str(&generate_top_table(group_by, summary.report.top(group_by)));
    }

    output.push_str(&generate_trend_section(&summary.report.monthly_trend));
    output.push_str(&generate_segments_section(&summary.report.segments));
    output.push_str(&generate_outputs_section(summary));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", summary.input.display()));
    section.push_str(&format!(
        "- **Output Directory:** `{}`\n",
        summary.output_dir.display()
    ));
    section.push_str(&format!(
        "- **Run Date:** {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        summary.duration_seconds
    ));
    if summary.dry_run {
        section.push_str("- **Dry Run:** nothing was written\n");
    }
    section.push('\n');

    section
}

fn anchor(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

/// Generate the table of contents.
fn generate_table_of_contents(summary: &RunSummary) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    for title in [
        "Metadata",
        "Pipeline Stages",
        "Data Quality",
        "Overview",
        "Top Performers",
        "Monthly Trend",
        "Segments",
    ] {
        toc.push_str(&format!("- [{}](#{})\n", title, anchor(title)));
    }
    if !summary.outputs.is_empty() {
        toc.push_str("- [Outputs](#outputs)\n");
    }
    toc.push('\n');

    toc
}

/// Generate the stage timing table.
fn generate_stages_section(summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str("## Pipeline Stages\n\n");
    section.push_str("| Stage | Status | Duration | Details |\n");
    section.push_str("|:---|:---:|---:|:---|\n");
    for record in &summary.stages {
        section.push_str(&format!(
            "| {} | {} {} | {} ms | {} |\n",
            record.stage,
            record.status.emoji(),
            record.status,
            record.duration_ms,
            record.detail
        ));
    }
    section.push('\n');

    section
}

/// Generate the data quality section.
fn generate_quality_section(rows_read: usize, unreadable: usize, cleaning: &CleaningReport) -> String {
    let mut section = String::new();

    section.push_str("## Data Quality\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|:---|---:|\n");
    section.push_str(&format!("| Rows read | {} |\n", rows_read));
    if unreadable > 0 {
        section.push_str(&format!("| Unreadable rows skipped | {} |\n", unreadable));
    }
    section.push_str(&format!("| Rows kept | {} |\n", cleaning.rows_out));
    section.push_str(&format!("| Rows dropped | {} |\n", cleaning.dropped()));
    section.push_str(&format!(
        "| Drop ratio | {:.1}% |\n",
        cleaning.drop_ratio() * 100.0
    ));
    section.push_str(&format!("| Repairs applied | {} |\n\n", cleaning.repaired()));

    if !cleaning.dropped_by_reason.is_empty() {
        section.push_str("### Dropped Rows\n\n");
        section.push_str("| Reason | Rows |\n");
        section.push_str("|:---|---:|\n");
        for (reason, count) in &cleaning.dropped_by_reason {
            section.push_str(&format!("| {} | {} |\n", reason, count));
        }
        section.push('\n');
    }

    if !cleaning.repairs_by_kind.is_empty() {
        section.push_str("### Repairs\n\n");
        section.push_str("| Repair | Count |\n");
        section.push_str("|:---|---:|\n");
        for (kind, count) in &cleaning.repairs_by_kind {
            section.push_str(&format!("| {} | {} |\n", kind, count));
        }
        section.push('\n');
    }

    section
}

/// Generate the overview section.
fn generate_overview_section(overview: &Overview) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|:---|---:|\n");
    section.push_str(&format!("| Total revenue | {} |\n", money(overview.total_revenue)));
    section.push_str(&format!("| Total orders | {} |\n", overview.total_orders));
    section.push_str(&format!("| Units sold | {} |\n", overview.total_quantity));
    section.push_str(&format!("| Average order value | {} |\n", money(overview.avg_order_value)));
    section.push_str(&format!("| Customers | {} |\n", overview.unique_customers));
    section.push_str(&format!("| Products | {} |\n", overview.unique_products));
    section.push_str(&format!("| Categories | {} |\n", overview.unique_categories));
    if let Some(ref range) = overview.date_range {
        section.push_str(&format!(
            "| Date range | {} to {} ({} days) |\n",
            range.first, range.last, range.days
        ));
    }
    for (label, value) in [
        ("Most popular product", &overview.most_popular_product),
        ("Most popular category", &overview.most_popular_category),
        ("Top region", &overview.top_region),
    ] {
        if let Some(value) = value {
            section.push_str(&format!("| {} | {} |\n", label, value));
        }
    }
    section.push('\n');

    section
}

fn plural(group_by: GroupBy) -> &'static str {
    match group_by {
        GroupBy::Product => "Products",
        GroupBy::Category => "Categories",
        GroupBy::Month => "Months",
        GroupBy::Region => "Regions",
        GroupBy::Customer => "Customers",
    }
}

/// Generate one top-N table.
fn generate_top_table(group_by: GroupBy, rows: &[SummaryRecord]) -> String {
    let mut table = String::new();

    table.push_str(&format!("### Top {}\n\n", plural(group_by)));
    if rows.is_empty() {
        table.push_str("No data.\n\n");
        return table;
    }

    table.push_str(&format!(
        "| # | {} | Orders | Units | Revenue | Avg Order |\n",
        group_by
    ));
    table.push_str("|---:|:---|---:|---:|---:|---:|\n");
    for (i, row) in rows.iter().enumerate() {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            i + 1,
            row.key,
            row.order_count,
            row.total_quantity,
            money(row.total_revenue),
            money(row.avg_order_value)
        ));
    }
    table.push('\n');

    table
}

/// Generate the monthly trend section.
fn generate_trend_section(trend: &MonthlyTrend) -> String {
    let mut section = String::new();

    section.push_str("## Monthly Trend\n\n");
    if trend.months.is_empty() {
        section.push_str("No data.\n\n");
        return section;
    }

    section.push_str("| Month | Revenue | Orders | Growth |\n");
    section.push_str("|:---|---:|---:|---:|\n");
    for point in &trend.months {
        let growth = point
            .revenue_growth_pct
            .map(|g| format!("{:+.2}%", g))
            .unwrap_or_else(|| "-".to_string());
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            point.month,
            money(point.revenue),
            point.orders,
            growth
        ));
    }
    section.push('\n');

    section.push_str(&format!(
        "Average monthly revenue: **{}** over **{}** orders per month.",
        money(trend.average_monthly_revenue),
        trend.average_monthly_orders
    ));
    if let Some(ref best) = trend.best_month {
        section.push_str(&format!(" Best month: **{}**.", best));
    }
    section.push_str("\n\n");

    section
}

fn segment_table(title: &str, buckets: &[SegmentBucket]) -> String {
    let mut table = String::new();

    table.push_str(&format!("### {}\n\n", title));
    table.push_str("| Segment | Orders | Revenue |\n");
    table.push_str("|:---|---:|---:|\n");
    for bucket in buckets {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            bucket.segment,
            bucket.orders,
            money(bucket.revenue)
        ));
    }
    table.push('\n');

    table
}

/// Generate the segments section.
fn generate_segments_section(segments: &SegmentMix) -> String {
    let mut section = String::new();

    section.push_str("## Segments\n\n");
    section.push_str(&segment_table("By Order Value", &segments.by_revenue));
    section.push_str(&segment_table("By Quantity", &segments.by_quantity));
    section.push_str(&segment_table(
        "Weekend vs Weekday",
        &[
            SegmentBucket {
                segment: "Weekend".to_string(),
                orders: segments.weekend_orders,
                revenue: segments.weekend_revenue,
            },
            SegmentBucket {
                segment: "Weekday".to_string(),
                orders: segments.weekday_orders,
                revenue: segments.weekday_revenue,
            },
        ],
    ));

    section
}

/// Generate the list of written files.
fn generate_outputs_section(summary: &RunSummary) -> String {
    if summary.outputs.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Outputs\n\n");
    for path in &summary.outputs {
        section.push_str(&format!("- `{}`\n", path.display()));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by sales-etl v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Generate a JSON report.
pub fn generate_json_report(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, summarize_all};
    use crate::models::{DropReason, Order, RepairKind};
    use crate::pipeline::{Stage, StageRecord, StageStatus};
    use crate::transform::transform;
    use chrono::{NaiveDate, Utc};
    use std::path::PathBuf;

    fn create_test_summary() -> RunSummary {
        let orders = transform(&[
            Order {
                order_id: "O1".to_string(),
                product_name: "Laptop".to_string(),
                category: "Electronics".to_string(),
                quantity: 1,
                unit_price: Decimal::from(1200),
                total_amount: Decimal::from(1200),
                customer_id: "C1".to_string(),
                order_date: NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
                region: "North".to_string(),
            },
            Order {
                order_id: "O2".to_string(),
                product_name: "Mouse".to_string(),
                category: "Electronics".to_string(),
                quantity: 3,
                unit_price: Decimal::new(2500, 2),
                total_amount: Decimal::from(75),
                customer_id: "C2".to_string(),
                order_date: NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
                region: "South".to_string(),
            },
        ]);
        let summaries = summarize_all(&orders);

        let mut cleaning = CleaningReport {
            rows_in: 3,
            rows_out: 2,
            ..Default::default()
        };
        cleaning.record_drop(DropReason::Duplicate);
        cleaning.record_repair(RepairKind::TotalComputed);

        let now = Utc::now();
        RunSummary {
            input: PathBuf::from("sales.csv"),
            output_dir: PathBuf::from("output"),
            started_at: now,
            finished_at: now,
            duration_seconds: 0.25,
            dry_run: false,
            stages: vec![StageRecord {
                stage: Stage::Clean,
                status: StageStatus::Completed,
                duration_ms: 3,
                detail: "2 of 3 rows kept".to_string(),
            }],
            rows_extracted: 3,
            unreadable_rows: 0,
            cleaning,
            report: analyze(&orders, &summaries, 10),
            outputs: vec![PathBuf::from("cleaned_sales.csv")],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let summary = create_test_summary();
        let markdown = generate_markdown_report(&summary);

        assert!(markdown.contains("# Sales Analysis Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Data Quality"));
        assert!(markdown.contains("| duplicate order_id | 1 |"));
        assert!(markdown.contains("| Total revenue | 1275.00 |"));
        assert!(markdown.contains("### Top Products"));
        assert!(markdown.contains("| 1 | Laptop | 1 | 1 | 1200.00 | 1200.00 |"));
        assert!(markdown.contains("| clean | "));
        assert!(markdown.contains("- `cleaned_sales.csv`"));
    }

    #[test]
    fn test_trend_growth_column() {
        let summary = create_test_summary();
        let section = generate_trend_section(&summary.report.monthly_trend);

        assert!(section.contains("| 2024-01 | 1200.00 | 1 | - |"));
        assert!(section.contains("-93.75%"));
        assert!(section.contains("Best month: **2024-01**"));
    }

    #[test]
    fn test_empty_top_table() {
        let table = generate_top_table(GroupBy::Region, &[]);
        assert!(table.contains("### Top Regions"));
        assert!(table.contains("No data."));
    }

    #[test]
    fn test_dry_run_metadata() {
        let mut summary = create_test_summary();
        summary.dry_run = true;
        summary.outputs.clear();

        let markdown = generate_markdown_report(&summary);
        assert!(markdown.contains("Dry Run"));
        assert!(!markdown.contains("## Outputs"));
    }

    #[test]
    fn test_generate_json_report() {
        let summary = create_test_summary();
        let json = generate_json_report(&summary).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows_extracted"], 3);
        assert_eq!(value["stages"][0]["stage"], "clean");
        assert_eq!(value["cleaning"]["dropped_by_reason"]["duplicate"], 1);
        assert!(value["report"]["overview"].is_object());
    }
}
