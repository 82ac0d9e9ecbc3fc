//! Order aggregation by dimension.
//!
//! This module groups enriched orders by product, category, month, region
//! or customer and computes one summary row per group.

use crate::models::{EnrichedOrder, GroupBy, SummaryRecord, SummarySet};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Key of an order for one dimension.
pub fn key_of(order: &EnrichedOrder, group_by: GroupBy) -> &str {
    match group_by {
        GroupBy::Product => &order.order.product_name,
        GroupBy::Category => &order.order.category,
        GroupBy::Month => &order.month_key,
        GroupBy::Region => &order.order.region,
        GroupBy::Customer => &order.order.customer_id,
    }
}

/// Group orders by a dimension.
pub fn group_orders(
    orders: &[EnrichedOrder],
    group_by: GroupBy,
) -> BTreeMap<&str, Vec<&EnrichedOrder>> {
    let mut grouped: BTreeMap<&str, Vec<&EnrichedOrder>> = BTreeMap::new();

    for order in orders {
        grouped.entry(key_of(order, group_by)).or_default().push(order);
    }

    grouped
}

/// Summarize orders by a dimension.
///
/// Rows are ordered by descending total revenue, ties by ascending key.
pub fn aggregate(orders: &[EnrichedOrder], group_by: GroupBy) -> Vec<SummaryRecord> {
    let mut summaries: Vec<SummaryRecord> = group_orders(orders, group_by)
        .into_iter()
        .map(|(key, group)| summarize_group(key, &group))
        .collect();

    sort_by_revenue(&mut summaries);
    debug!("{} summary: {} groups", group_by, summaries.len());

    summaries
}

/// Summarize all five dimensions.
pub fn summarize_all(orders: &[EnrichedOrder]) -> SummarySet {
    SummarySet {
        products: aggregate(orders, GroupBy::Product),
        categories: aggregate(orders, GroupBy::Category),
        months: aggregate(orders, GroupBy::Month),
        regions: aggregate(orders, GroupBy::Region),
        customers: aggregate(orders, GroupBy::Customer),
    }
}

fn summarize_group(key: &str, group: &[&EnrichedOrder]) -> SummaryRecord {
    let total_revenue: Decimal = group.iter().map(|o| o.order.total_amount).sum();
    let total_quantity: u64 = group.iter().map(|o| u64::from(o.order.quantity)).sum();
    let customers: HashSet<&str> = group.iter().map(|o| o.order.customer_id.as_str()).collect();
    let products: HashSet<&str> = group.iter().map(|o| o.order.product_name.as_str()).collect();

    SummaryRecord {
        key: key.to_string(),
        order_count: group.len(),
        total_quantity,
        total_revenue,
        avg_order_value: average(total_revenue, group.len()),
        unique_customers: customers.len(),
        unique_products: products.len(),
    }
}

/// `total / count` rounded to cents; zero when there is nothing to divide by.
pub fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(count)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sort summaries by revenue (highest first), then by key.
pub fn sort_by_revenue(summaries: &mut [SummaryRecord]) {
    summaries.sort_by(|a, b| {
        b.total_revenue
            .cmp(&a.total_revenue)
            .then_with(|| a.key.cmp(&b.key))
    });
}

/// Get the first N rows of an already sorted summary.
pub fn top_n(summaries: &[SummaryRecord], n: usize) -> Vec<SummaryRecord> {
    summaries.iter().take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Order;
    use crate::transform::enrich;
    use chrono::NaiveDate;

    fn create_test_order(id: &str, category: &str, customer: &str, revenue: i64) -> EnrichedOrder {
        enrich(&Order {
            order_id: id.to_string(),
            product_name: format!("Product {}", id),
            category: category.to_string(),
            quantity: 1,
            unit_price: Decimal::from(revenue),
            total_amount: Decimal::from(revenue),
            customer_id: customer.to_string(),
            order_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            region: "North".to_string(),
        })
    }

    #[test]
    fn test_category_summary() {
        let orders = vec![
            create_test_order("1", "Electronics", "C1", 100),
            create_test_order("2", "Electronics", "C2", 200),
            create_test_order("3", "Electronics", "C1", 300),
        ];

        let summary = aggregate(&orders, GroupBy::Category);

        assert_eq!(summary.len(), 1);
        let electronics = &summary[0];
        assert_eq!(electronics.key, "Electronics");
        assert_eq!(electronics.order_count, 3);
        assert_eq!(electronics.total_quantity, 3);
        assert_eq!(electronics.total_revenue, Decimal::from(600));
        assert_eq!(electronics.avg_order_value, Decimal::from(200));
        assert_eq!(electronics.unique_customers, 2);
        assert_eq!(electronics.unique_products, 3);
    }

    #[test]
    fn test_order_by_revenue_then_key() {
        let orders = vec![
            create_test_order("1", "Books", "C1", 50),
            create_test_order("2", "Toys", "C1", 300),
            create_test_order("3", "Garden", "C1", 300),
            create_test_order("4", "Home", "C1", 120),
        ];

        let keys: Vec<String> = aggregate(&orders, GroupBy::Category)
            .into_iter()
            .map(|s| s.key)
            .collect();

        assert_eq!(keys, vec!["Garden", "Toys", "Home", "Books"]);
    }

    #[test]
    fn test_every_dimension_sums_to_total_revenue() {
        let orders: Vec<EnrichedOrder> = (0..40)
            .map(|i| {
                let category = ["Books", "Toys", "Home"][i % 3];
                let customer = format!("C{}", i % 7);
                create_test_order(&i.to_string(), category, &customer, 13 + i as i64 * 17)
            })
            .collect();
        let expected: Decimal = orders.iter().map(|o| o.order.total_amount).sum();

        let set = summarize_all(&orders);

        for (group_by, summary) in set.iter() {
            let total: Decimal = summary.iter().map(|s| s.total_revenue).sum();
            let count: usize = summary.iter().map(|s| s.order_count).sum();
            assert_eq!(total, expected, "{} revenue", group_by);
            assert_eq!(count, orders.len(), "{} orders", group_by);
        }
    }

    #[test]
    fn test_average_rounding() {
        assert_eq!(average(Decimal::from(100), 3), Decimal::new(3333, 2));
        assert_eq!(average(Decimal::from(200), 3), Decimal::new(6667, 2));
        assert_eq!(average(Decimal::new(5, 2), 2), Decimal::new(3, 2));
        assert_eq!(average(Decimal::from(10), 0), Decimal::ZERO);
    }

    #[test]
    fn test_month_key_grouping() {
        let mut a = create_test_order("1", "Books", "C1", 10);
        let b = create_test_order("2", "Books", "C1", 20);
        a.month_key = "2023-12".to_string();

        let months = aggregate(&[a, b], GroupBy::Month);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].key, "2024-01");
    }

    #[test]
    fn test_top_n() {
        let orders = vec![
            create_test_order("1", "A", "C1", 10),
            create_test_order("2", "B", "C1", 20),
            create_test_order("3", "C", "C1", 30),
        ];
        let summary = aggregate(&orders, GroupBy::Category);

        let top = top_n(&summary, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "C");
        assert_eq!(top_n(&summary, 10).len(), 3);
    }
}
