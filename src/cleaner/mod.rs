//! Cleaner: validating and repairing raw order rows.
//!
//! The cleaner never fails on a bad row. It drops or repairs it and counts
//! what it did in a [`CleaningReport`]. The only hard failures are an empty
//! input and an input in which every row was rejected.

use crate::config::CleaningConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{CleaningReport, DropReason, Order, RawOrder, RepairKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Date-only formats, tried in order.
const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
];

/// Date-time formats; only the date part is kept.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Most decimal places kept on a derived unit price.
const MAX_PRICE_SCALE: u32 = 28;

/// Output of a cleaning pass.
#[derive(Debug, Clone)]
pub struct Cleaned {
    /// Valid orders in input order.
    pub orders: Vec<Order>,
    pub report: CleaningReport,
}

/// Clean a sequence of raw rows.
pub fn clean(rows: &[RawOrder], config: &CleaningConfig) -> PipelineResult<Cleaned> {
    if rows.is_empty() {
        return Err(PipelineError::EmptyInput("no rows to clean".to_string()));
    }

    let tolerance = config.tolerance();
    let mut report = CleaningReport {
        rows_in: rows.len(),
        ..Default::default()
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut orders = Vec::with_capacity(rows.len());

    for (idx, raw) in rows.iter().enumerate() {
        match clean_row(raw, tolerance, &config.unknown_label) {
            Ok((order, repairs)) => {
                if !seen.insert(order.order_id.clone()) {
                    debug!("Row {}: dropping duplicate order_id {}", idx, order.order_id);
                    report.record_drop(DropReason::Duplicate);
                    continue;
                }
                for kind in repairs {
                    debug!("Row {} ({}): {}", idx, order.order_id, kind);
                    report.record_repair(kind);
                }
                orders.push(order);
            }
            Err(reason) => {
                debug!("Row {}: dropped, {}", idx, reason);
                report.record_drop(reason);
            }
        }
    }

    report.rows_out = orders.len();

    if orders.is_empty() {
        return Err(PipelineError::AllRowsRejected { rows: rows.len() });
    }

    info!(
        "Cleaned {} rows: kept {}, dropped {}, repaired {}",
        report.rows_in,
        report.rows_out,
        report.dropped(),
        report.repaired()
    );
    for (reason, count) in &report.dropped_by_reason {
        warn!("Dropped {} rows: {}", count, reason);
    }
    for (kind, count) in &report.repairs_by_kind {
        info!("Repaired {} rows: {}", count, kind);
    }

    Ok(Cleaned { orders, report })
}

/// Validate and repair a single row.
fn clean_row(
    raw: &RawOrder,
    tolerance: Decimal,
    unknown_label: &str,
) -> Result<(Order, Vec<RepairKind>), DropReason> {
    let order_id = present(&raw.order_id).ok_or(DropReason::MissingOrderId)?;
    let date_text = present(&raw.order_date).ok_or(DropReason::MissingOrderDate)?;
    let order_date = parse_date(date_text).ok_or(DropReason::UnparsableDate)?;

    let quantity = present(&raw.quantity).map(parse_number).transpose()?;
    let unit_price = present(&raw.unit_price).map(parse_number).transpose()?;
    let total = present(&raw.total_amount).map(parse_number).transpose()?;

    if quantity.is_none() && unit_price.is_none() && total.is_none() {
        return Err(DropReason::MissingAmounts);
    }
    if let Some(q) = quantity {
        if !q.fract().is_zero() {
            return Err(DropReason::MalformedNumber);
        }
        if q <= Decimal::ZERO || q.to_u32().is_none() {
            return Err(DropReason::OutOfRange);
        }
    }
    if unit_price.is_some_and(|p| p.is_sign_negative() && !p.is_zero())
        || total.is_some_and(|t| t.is_sign_negative() && !t.is_zero())
    {
        return Err(DropReason::OutOfRange);
    }

    let mut repairs = Vec::new();
    let (quantity, unit_price, total_amount) = match (quantity, unit_price, total) {
        (Some(q), Some(p), Some(t)) => {
            let t = reconcile_total(q, p, t, tolerance, &mut repairs)?;
            (q, p, t)
        }
        (Some(q), Some(p), None) => {
            repairs.push(RepairKind::TotalComputed);
            (q, p, checked_total(q, p)?)
        }
        (None, Some(p), Some(t)) => {
            let q = derive_quantity(p, t, tolerance)?;
            repairs.push(RepairKind::QuantityDerived);
            (q, p, t)
        }
        (Some(q), None, Some(t)) => {
            let p = derive_unit_price(q, t, tolerance)?;
            repairs.push(RepairKind::UnitPriceDerived);
            (q, p, t)
        }
        (Some(_), None, None) => return Err(DropReason::UnderivablePrice),
        (None, _, _) => return Err(DropReason::UnderivableQuantity),
    };

    let quantity = quantity.to_u32().ok_or(DropReason::OutOfRange)?;

    let mut text = |value: &Option<String>| -> String {
        match present(value) {
            Some(s) => s.to_string(),
            None => {
                if !repairs.contains(&RepairKind::TextDefaulted) {
                    repairs.push(RepairKind::TextDefaulted);
                }
                unknown_label.to_string()
            }
        }
    };
    let product_name = text(&raw.product_name);
    let category = text(&raw.category);
    let customer_id = text(&raw.customer_id);
    let region = text(&raw.region);

    let order = Order {
        order_id: order_id.to_string(),
        product_name,
        category,
        quantity,
        unit_price,
        total_amount,
        customer_id,
        order_date,
        region,
    };

    Ok((order, repairs))
}

/// `quantity * price`, or `OutOfRange` when it does not fit a decimal.
fn checked_total(quantity: Decimal, price: Decimal) -> Result<Decimal, DropReason> {
    quantity.checked_mul(price).ok_or(DropReason::OutOfRange)
}

/// Keep `total` when it matches `quantity * price`, otherwise replace it.
fn reconcile_total(
    quantity: Decimal,
    price: Decimal,
    total: Decimal,
    tolerance: Decimal,
    repairs: &mut Vec<RepairKind>,
) -> Result<Decimal, DropReason> {
    let expected = checked_total(quantity, price)?;
    if (total - expected).abs() < tolerance {
        Ok(total)
    } else {
        repairs.push(RepairKind::TotalCorrected);
        Ok(expected)
    }
}

/// Quantity implied by `total / price`, if it is a positive whole number.
fn derive_quantity(
    price: Decimal,
    total: Decimal,
    tolerance: Decimal,
) -> Result<Decimal, DropReason> {
    if price.is_zero() {
        // 0 = 1 x 0, so the default quantity of one is consistent
        return if total.abs() < tolerance {
            Ok(Decimal::ONE)
        } else {
            Err(DropReason::UnderivableQuantity)
        };
    }

    let quantity = total
        .checked_div(price)
        .ok_or(DropReason::OutOfRange)?
        .round();
    if quantity < Decimal::ONE {
        return Err(DropReason::UnderivableQuantity);
    }
    if quantity.to_u32().is_none() {
        return Err(DropReason::OutOfRange);
    }
    if (total - checked_total(quantity, price)?).abs() < tolerance {
        Ok(quantity)
    } else {
        Err(DropReason::UnderivableQuantity)
    }
}

/// Unit price implied by `total / quantity`.
///
/// Cents are enough for most rows. When rounding to cents would move the
/// implied total out of tolerance, more places are kept so the supplied
/// total stays as it is.
fn derive_unit_price(
    quantity: Decimal,
    total: Decimal,
    tolerance: Decimal,
) -> Result<Decimal, DropReason> {
    let exact = total.checked_div(quantity).ok_or(DropReason::OutOfRange)?;
    for dp in (2..=MAX_PRICE_SCALE).step_by(2) {
        let price = exact.round_dp(dp);
        if (total - checked_total(quantity, price)?).abs() < tolerance {
            return Ok(price);
        }
    }
    Ok(exact)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an amount. A leading currency symbol and thousands separators
/// are accepted.
fn parse_number(s: &str) -> Result<Decimal, DropReason> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    Decimal::from_str(&cleaned).map_err(|_| DropReason::MalformedNumber)
}

/// Parse a date from the accepted formats.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}
