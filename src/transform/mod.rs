//! Transformer: deriving calendar fields and segments from cleaned orders.
//!
//! Segment thresholds are fixed constants rather than quantiles of the
//! data, so the same order always lands in the same bucket across runs.
//! Lower bounds are inclusive: a total of exactly 100 is `Medium`.

use crate::models::{DayOfWeek, EnrichedOrder, Order, QuantitySegment, RevenueSegment};
use chrono::Datelike;
use rust_decimal::Decimal;
use tracing::info;

/// Lower bounds of the Medium, High and Very High revenue segments.
pub const REVENUE_SEGMENT_BOUNDS: [Decimal; 3] = [
    Decimal::from_parts(100, 0, 0, false, 0),
    Decimal::from_parts(500, 0, 0, false, 0),
    Decimal::from_parts(1000, 0, 0, false, 0),
];

/// Largest quantity in the Single, Small and Medium segments.
pub const QUANTITY_SEGMENT_UPPER: [u32; 3] = [1, 5, 10];

/// Enrich every order. Output has the same length and order as the input.
pub fn transform(orders: &[Order]) -> Vec<EnrichedOrder> {
    let enriched: Vec<EnrichedOrder> = orders.iter().map(enrich).collect();
    info!("Transformed {} orders", enriched.len());
    enriched
}

/// Derive the enriched copy of one order.
pub fn enrich(order: &Order) -> EnrichedOrder {
    let date = order.order_date;
    let day_of_week = DayOfWeek::from(date.weekday());

    EnrichedOrder {
        order: order.clone(),
        year: date.year(),
        month: date.month(),
        quarter: (date.month() - 1) / 3 + 1,
        month_key: format!("{:04}-{:02}", date.year(), date.month()),
        day_of_week,
        is_weekend: day_of_week.is_weekend(),
        revenue_segment: revenue_segment(order.total_amount),
        quantity_segment: quantity_segment(order.quantity),
    }
}

/// Bucket an order total.
pub fn revenue_segment(total: Decimal) -> RevenueSegment {
    let [medium, high, very_high] = REVENUE_SEGMENT_BOUNDS;
    if total >= very_high {
        RevenueSegment::VeryHigh
    } else if total >= high {
        RevenueSegment::High
    } else if total >= medium {
        RevenueSegment::Medium
    } else {
        RevenueSegment::Low
    }
}

/// Bucket an order quantity.
pub fn quantity_segment(quantity: u32) -> QuantitySegment {
    let [single, small, medium] = QUANTITY_SEGMENT_UPPER;
    if quantity <= single {
        QuantitySegment::Single
    } else if quantity <= small {
        QuantitySegment::Small
    } else if quantity <= medium {
        QuantitySegment::Medium
    } else {
        QuantitySegment::Large
    }
}
