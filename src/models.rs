//! Data models for the sales pipeline.
//!
//! This module contains the record types that flow through the pipeline:
//! raw input rows, validated orders, enriched orders with their segments,
//! grouped summaries and the final analysis report.

use chrono::{NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One input row as supplied by the extract step.
///
/// Every field is optional text. Nothing here has been validated; the
/// cleaner decides which rows become [`Order`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOrder {
    pub order_id: Option<String>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub total_amount: Option<String>,
    pub customer_id: Option<String>,
    pub order_date: Option<String>,
    pub region: Option<String>,
}

impl From<&Order> for RawOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: Some(order.order_id.clone()),
            product_name: Some(order.product_name.clone()),
            category: Some(order.category.clone()),
            quantity: Some(order.quantity.to_string()),
            unit_price: Some(order.unit_price.to_string()),
            total_amount: Some(order.total_amount.to_string()),
            customer_id: Some(order.customer_id.clone()),
            order_date: Some(order.order_date.format("%Y-%m-%d").to_string()),
            region: Some(order.region.clone()),
        }
    }
}

/// A validated order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub order_id: String,
    pub product_name: String,
    pub category: String,
    /// Number of units, always at least 1.
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Order total, consistent with `quantity * unit_price` within the
    /// cleaning tolerance.
    pub total_amount: Decimal,
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub region: String,
}

impl Order {
    /// Returns `quantity * unit_price`.
    pub fn expected_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Day of the week an order was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Saturday and Sunday.
    pub fn is_weekend(&self) -> bool {
        matches!(self, DayOfWeek::Saturday | DayOfWeek::Sunday)
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        };
        write!(f, "{}", name)
    }
}

/// Revenue bucket of an order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RevenueSegment {
    /// Below 100
    Low,
    /// 100 up to (not including) 500
    Medium,
    /// 500 up to (not including) 1000
    High,
    /// 1000 and above
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl RevenueSegment {
    pub const ALL: [RevenueSegment; 4] = [
        RevenueSegment::Low,
        RevenueSegment::Medium,
        RevenueSegment::High,
        RevenueSegment::VeryHigh,
    ];
}

impl fmt::Display for RevenueSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevenueSegment::Low => write!(f, "Low"),
            RevenueSegment::Medium => write!(f, "Medium"),
            RevenueSegment::High => write!(f, "High"),
            RevenueSegment::VeryHigh => write!(f, "Very High"),
        }
    }
}

/// Quantity bucket of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuantitySegment {
    /// Exactly 1
    Single,
    /// 2 to 5
    Small,
    /// 6 to 10
    Medium,
    /// More than 10
    Large,
}

impl QuantitySegment {
    pub const ALL: [QuantitySegment; 4] = [
        QuantitySegment::Single,
        QuantitySegment::Small,
        QuantitySegment::Medium,
        QuantitySegment::Large,
    ];
}

impl fmt::Display for QuantitySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantitySegment::Single => write!(f, "Single"),
            QuantitySegment::Small => write!(f, "Small"),
            QuantitySegment::Medium => write!(f, "Medium"),
            QuantitySegment::Large => write!(f, "Large"),
        }
    }
}

/// An order plus the fields derived from it by the transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// 1-4
    pub quarter: u32,
    /// `YYYY-MM`, the month grouping key.
    pub month_key: String,
    pub day_of_week: DayOfWeek,
    pub is_weekend: bool,
    pub revenue_segment: RevenueSegment,
    pub quantity_segment: QuantitySegment,
}

/// Dimension used to group orders into summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Product,
    Category,
    Month,
    Region,
    Customer,
}

impl GroupBy {
    pub const ALL: [GroupBy; 5] = [
        GroupBy::Product,
        GroupBy::Category,
        GroupBy::Month,
        GroupBy::Region,
        GroupBy::Customer,
    ];

    /// Name of the grouped column.
    pub fn key_name(&self) -> &'static str {
        match self {
            GroupBy::Product => "product_name",
            GroupBy::Category => "category",
            GroupBy::Month => "month",
            GroupBy::Region => "region",
            GroupBy::Customer => "customer_id",
        }
    }

    /// Base name used for files and tables holding this summary.
    pub fn table_name(&self) -> &'static str {
        match self {
            GroupBy::Product => "product_summary",
            GroupBy::Category => "category_summary",
            GroupBy::Month => "monthly_sales",
            GroupBy::Region => "region_summary",
            GroupBy::Customer => "customer_summary",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupBy::Product => write!(f, "Product"),
            GroupBy::Category => write!(f, "Category"),
            GroupBy::Month => write!(f, "Month"),
            GroupBy::Region => write!(f, "Region"),
            GroupBy::Customer => write!(f, "Customer"),
        }
    }
}

/// One row of a grouped aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Group key value (product name, category, `YYYY-MM`, region or customer id).
    pub key: String,
    pub order_count: usize,
    pub total_quantity: u64,
    /// Exact sum of `total_amount` over the group.
    pub total_revenue: Decimal,
    /// `total_revenue / order_count`, rounded to cents.
    pub avg_order_value: Decimal,
    pub unique_customers: usize,
    pub unique_products: usize,
}

/// The five summaries computed for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySet {
    pub products: Vec<SummaryRecord>,
    pub categories: Vec<SummaryRecord>,
    pub months: Vec<SummaryRecord>,
    pub regions: Vec<SummaryRecord>,
    pub customers: Vec<SummaryRecord>,
}

impl SummarySet {
    /// Returns the summary for one dimension.
    pub fn get(&self, group_by: GroupBy) -> &[SummaryRecord] {
        match group_by {
            GroupBy::Product => &self.products,
            GroupBy::Category => &self.categories,
            GroupBy::Month => &self.months,
            GroupBy::Region => &self.regions,
            GroupBy::Customer => &self.customers,
        }
    }

    /// Iterate all dimensions in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupBy, &[SummaryRecord])> {
        GroupBy::ALL.into_iter().map(move |g| (g, self.get(g)))
    }
}

/// Why the cleaner dropped a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingOrderId,
    MissingOrderDate,
    UnparsableDate,
    MissingAmounts,
    MalformedNumber,
    OutOfRange,
    UnderivableQuantity,
    UnderivablePrice,
    Duplicate,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::MissingOrderId => "missing order_id",
            DropReason::MissingOrderDate => "missing order_date",
            DropReason::UnparsableDate => "unparsable order_date",
            DropReason::MissingAmounts => "no quantity, unit_price or total_amount",
            DropReason::MalformedNumber => "non-numeric amount",
            DropReason::OutOfRange => "non-positive quantity or negative amount",
            DropReason::UnderivableQuantity => "quantity cannot be derived",
            DropReason::UnderivablePrice => "unit_price cannot be derived",
            DropReason::Duplicate => "duplicate order_id",
        };
        write!(f, "{}", text)
    }
}

/// What the cleaner repaired in a kept row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    QuantityDerived,
    UnitPriceDerived,
    TotalComputed,
    TotalCorrected,
    TextDefaulted,
}

impl fmt::Display for RepairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RepairKind::QuantityDerived => "quantity derived from total/unit_price",
            RepairKind::UnitPriceDerived => "unit_price derived from total/quantity",
            RepairKind::TotalComputed => "missing total_amount computed",
            RepairKind::TotalCorrected => "inconsistent total_amount corrected",
            RepairKind::TextDefaulted => "empty text field defaulted",
        };
        write!(f, "{}", text)
    }
}

/// Counts of dropped and repaired rows produced by one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_by_reason: BTreeMap<DropReason, usize>,
    /// Repairs are counted per row and kind; one row may have several.
    pub repairs_by_kind: BTreeMap<RepairKind, usize>,
}

impl CleaningReport {
    pub fn record_drop(&mut self, reason: DropReason) {
        *self.dropped_by_reason.entry(reason).or_insert(0) += 1;
    }

    pub fn record_repair(&mut self, kind: RepairKind) {
        *self.repairs_by_kind.entry(kind).or_insert(0) += 1;
    }

    /// Total rows dropped.
    pub fn dropped(&self) -> usize {
        self.dropped_by_reason.values().sum()
    }

    /// Total repairs applied.
    pub fn repaired(&self) -> usize {
        self.repairs_by_kind.values().sum()
    }

    /// Fraction of input rows dropped, 0.0 for empty input.
    pub fn drop_ratio(&self) -> f64 {
        if self.rows_in == 0 {
            0.0
        } else {
            self.dropped() as f64 / self.rows_in as f64
        }
    }
}

/// First and last order dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub first: NaiveDate,
    pub last: NaiveDate,
    /// Days between first and last.
    pub days: i64,
}

/// Whole-dataset totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub total_revenue: Decimal,
    pub total_orders: usize,
    pub total_quantity: u64,
    pub unique_customers: usize,
    pub unique_products: usize,
    pub unique_categories: usize,
    pub avg_order_value: Decimal,
    pub date_range: Option<DateRange>,
    /// By quantity sold.
    pub most_popular_product: Option<String>,
    /// By quantity sold.
    pub most_popular_category: Option<String>,
    /// By revenue.
    pub top_region: Option<String>,
}

/// One month of the revenue trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthPoint {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: Decimal,
    pub orders: usize,
    /// Percent change from the previous month; none for the first month.
    pub revenue_growth_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// Chronological.
    pub months: Vec<MonthPoint>,
    pub average_monthly_revenue: Decimal,
    pub average_monthly_orders: Decimal,
    pub best_month: Option<String>,
}

/// Orders and revenue falling into one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentBucket {
    pub segment: String,
    pub orders: usize,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMix {
    pub by_revenue: Vec<SegmentBucket>,
    pub by_quantity: Vec<SegmentBucket>,
    pub weekend_orders: usize,
    pub weekend_revenue: Decimal,
    pub weekday_orders: usize,
    pub weekday_revenue: Decimal,
}

/// Descriptive aggregates for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    pub overview: Overview,
    pub top_products: Vec<SummaryRecord>,
    pub top_categories: Vec<SummaryRecord>,
    pub top_months: Vec<SummaryRecord>,
    pub top_regions: Vec<SummaryRecord>,
    pub top_customers: Vec<SummaryRecord>,
    pub monthly_trend: MonthlyTrend,
    pub segments: SegmentMix,
}

impl SalesReport {
    /// Top-N list for one dimension.
    pub fn top(&self, group_by: GroupBy) -> &[SummaryRecord] {
        match group_by {
            GroupBy::Product => &self.top_products,
            GroupBy::Category => &self.top_categories,
            GroupBy::Month => &self.top_months,
            GroupBy::Region => &self.top_regions,
            GroupBy::Customer => &self.top_customers,
        }
    }
}
