//! Descriptive statistics for the dashboard report.

use super::aggregator::{average, top_n};
use crate::models::{
    DateRange, EnrichedOrder, GroupBy, MonthPoint, MonthlyTrend, Overview, QuantitySegment,
    RevenueSegment, SalesReport, SegmentBucket, SegmentMix, SummaryRecord, SummarySet,
};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;
use tracing::info;

/// Build the full report from the transformed orders and their summaries.
pub fn analyze(orders: &[EnrichedOrder], summaries: &SummarySet, n: usize) -> SalesReport {
    let report = SalesReport {
        overview: overview(orders, summaries),
        top_products: top_n(summaries.get(GroupBy::Product), n),
        top_categories: top_n(summaries.get(GroupBy::Category), n),
        top_months: top_n(summaries.get(GroupBy::Month), n),
        top_regions: top_n(summaries.get(GroupBy::Region), n),
        top_customers: top_n(summaries.get(GroupBy::Customer), n),
        monthly_trend: monthly_trend(summaries.get(GroupBy::Month)),
        segments: segment_mix(orders),
    };

    let overview = &report.overview;
    info!("Total revenue: {:.2}", overview.total_revenue);
    info!("Total orders: {}", overview.total_orders);
    info!("Average order value: {:.2}", overview.avg_order_value);
    if let Some(ref product) = overview.most_popular_product {
        info!("Most popular product: {}", product);
    }
    if let Some(ref region) = overview.top_region {
        info!("Top region: {}", region);
    }

    report
}

/// Whole-dataset totals.
pub fn overview(orders: &[EnrichedOrder], summaries: &SummarySet) -> Overview {
    let total_revenue: Decimal = orders.iter().map(|o| o.order.total_amount).sum();
    let total_quantity: u64 = orders.iter().map(|o| u64::from(o.order.quantity)).sum();

    let unique = |f: fn(&EnrichedOrder) -> &str| -> usize {
        orders.iter().map(f).collect::<HashSet<&str>>().len()
    };

    let date_range = match (
        orders.iter().map(|o| o.order.order_date).min(),
        orders.iter().map(|o| o.order.order_date).max(),
    ) {
        (Some(first), Some(last)) => Some(DateRange {
            first,
            last,
            days: (last - first).num_days(),
        }),
        _ => None,
    };

    Overview {
        total_revenue,
        total_orders: orders.len(),
        total_quantity,
        unique_customers: unique(|o| o.order.customer_id.as_str()),
        unique_products: unique(|o| o.order.product_name.as_str()),
        unique_categories: unique(|o| o.order.category.as_str()),
        avg_order_value: average(total_revenue, orders.len()),
        date_range,
        most_popular_product: most_sold(summaries.get(GroupBy::Product)),
        most_popular_category: most_sold(summaries.get(GroupBy::Category)),
        top_region: summaries.get(GroupBy::Region).first().map(|s| s.key.clone()),
    }
}

/// Key with the highest quantity sold; ties go to the smaller key.
fn most_sold(summaries: &[SummaryRecord]) -> Option<String> {
    summaries
        .iter()
        .max_by(|a, b| {
            a.total_quantity
                .cmp(&b.total_quantity)
                .then_with(|| b.key.cmp(&a.key))
        })
        .map(|s| s.key.clone())
}

/// Month-by-month revenue with growth rates.
pub fn monthly_trend(months: &[SummaryRecord]) -> MonthlyTrend {
    let mut chronological: Vec<&SummaryRecord> = months.iter().collect();
    chronological.sort_by(|a, b| a.key.cmp(&b.key));

    let mut points = Vec::with_capacity(chronological.len());
    let mut previous: Option<Decimal> = None;
    for month in &chronological {
        let growth = previous
            .filter(|prev| !prev.is_zero())
            .map(|prev| percent_change(prev, month.total_revenue));
        points.push(MonthPoint {
            month: month.key.clone(),
            revenue: month.total_revenue,
            orders: month.order_count,
            revenue_growth_pct: growth,
        });
        previous = Some(month.total_revenue);
    }

    let total_revenue: Decimal = chronological.iter().map(|m| m.total_revenue).sum();
    let total_orders: usize = chronological.iter().map(|m| m.order_count).sum();
    let best_month = chronological
        .iter()
        .rev()
        .max_by(|a, b| a.total_revenue.cmp(&b.total_revenue))
        .map(|m| m.key.clone());

    MonthlyTrend {
        months: points,
        average_monthly_revenue: average(total_revenue, chronological.len()),
        average_monthly_orders: average(Decimal::from(total_orders), chronological.len()),
        best_month,
    }
}

fn percent_change(previous: Decimal, current: Decimal) -> Decimal {
    ((current - previous) / previous * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Order counts and revenue per segment, plus the weekend split.
pub fn segment_mix(orders: &[EnrichedOrder]) -> SegmentMix {
    let bucket = |name: String, matches: &dyn Fn(&EnrichedOrder) -> bool| -> SegmentBucket {
        let selected: Vec<&EnrichedOrder> = orders.iter().filter(|o| matches(o)).collect();
        SegmentBucket {
            segment: name,
            orders: selected.len(),
            revenue: selected.iter().map(|o| o.order.total_amount).sum(),
        }
    };

    let by_revenue = RevenueSegment::ALL
        .iter()
        .map(|seg| bucket(seg.to_string(), &|o: &EnrichedOrder| o.revenue_segment == *seg))
        .collect();
    let by_quantity = QuantitySegment::ALL
        .iter()
        .map(|seg| bucket(seg.to_string(), &|o: &EnrichedOrder| o.quantity_segment == *seg))
        .collect();
    let weekend = bucket("Weekend".to_string(), &|o: &EnrichedOrder| o.is_weekend);
    let weekday = bucket("Weekday".to_string(), &|o: &EnrichedOrder| !o.is_weekend);

    SegmentMix {
        by_revenue,
        by_quantity,
        weekend_orders: weekend.orders,
        weekend_revenue: weekend.revenue,
        weekday_orders: weekday.orders,
        weekday_revenue: weekday.revenue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summarize_all;
    use crate::models::Order;
    use crate::transform::transform;
    use chrono::NaiveDate;

    fn order(
        id: &str,
        product: &str,
        region: &str,
        quantity: u32,
        price: i64,
        date: (i32, u32, u32),
    ) -> Order {
        Order {
            order_id: id.to_string(),
            product_name: product.to_string(),
            category: if product == "Laptop" { "Electronics" } else { "Office" }.to_string(),
            quantity,
            unit_price: Decimal::from(price),
            total_amount: Decimal::from(price) * Decimal::from(quantity),
            customer_id: format!("C-{}", id),
            order_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            region: region.to_string(),
        }
    }

    fn fixture() -> Vec<EnrichedOrder> {
        transform(&[
            order("1", "Laptop", "North", 1, 1200, (2024, 1, 6)),
            order("2", "Pen", "South", 12, 2, (2024, 1, 8)),
            order("3", "Laptop", "South", 1, 1200, (2024, 2, 10)),
            order("4", "Chair", "East", 2, 150, (2024, 3, 4)),
        ])
    }

    #[test]
    fn test_overview() {
        let orders = fixture();
        let summaries = summarize_all(&orders);
        let overview = overview(&orders, &summaries);

        assert_eq!(overview.total_revenue, Decimal::from(2724));
        assert_eq!(overview.total_orders, 4);
        assert_eq!(overview.total_quantity, 16);
        assert_eq!(overview.unique_customers, 4);
        assert_eq!(overview.unique_products, 3);
        assert_eq!(overview.unique_categories, 2);
        assert_eq!(overview.avg_order_value, Decimal::from(681));
        assert_eq!(overview.most_popular_product.as_deref(), Some("Pen"));
        assert_eq!(overview.most_popular_category.as_deref(), Some("Office"));
        assert_eq!(overview.top_region.as_deref(), Some("South"));

        let range = overview.date_range.unwrap();
        assert_eq!(range.first, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert_eq!(range.last, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(range.days, 58);
    }

    #[test]
    fn test_monthly_trend() {
        let orders = fixture();
        let summaries = summarize_all(&orders);
        let trend = monthly_trend(&summaries.months);

        let months: Vec<&str> = trend.months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(trend.months[0].revenue_growth_pct, None);
        // 1224 -> 1200
        assert_eq!(trend.months[1].revenue_growth_pct, Some(Decimal::new(-196, 2)));
        // 1200 -> 300
        assert_eq!(trend.months[2].revenue_growth_pct, Some(Decimal::from(-75)));
        assert_eq!(trend.best_month.as_deref(), Some("2024-01"));
        assert_eq!(trend.average_monthly_revenue, Decimal::from(908));
        assert_eq!(trend.average_monthly_orders, Decimal::new(133, 2));
    }

    #[test]
    fn test_segment_mix_lists_every_bucket() {
        let orders = fixture();
        let mix = segment_mix(&orders);

        assert_eq!(mix.by_revenue.len(), 4);
        assert_eq!(mix.by_quantity.len(), 4);

        let very_high = mix.by_revenue.iter().find(|b| b.segment == "Very High").unwrap();
        assert_eq!(very_high.orders, 2);
        assert_eq!(very_high.revenue, Decimal::from(2400));
        let medium = mix.by_quantity.iter().find(|b| b.segment == "Medium").unwrap();
        assert_eq!(medium.orders, 0);

        // 2024-01-06 and 2024-02-10 are Saturdays
        assert_eq!(mix.weekend_orders, 2);
        assert_eq!(mix.weekday_orders, 2);
        assert_eq!(mix.weekend_revenue + mix.weekday_revenue, Decimal::from(2724));
    }

    #[test]
    fn test_analyze_truncates_top_lists() {
        let orders = fixture();
        let summaries = summarize_all(&orders);
        let report = analyze(&orders, &summaries, 2);

        assert_eq!(report.top_products.len(), 2);
        assert_eq!(report.top_products[0].key, "Laptop");
        assert_eq!(report.top_regions.len(), 2);
        assert_eq!(report.top(GroupBy::Customer).len(), 2);
        assert_eq!(report.top_months[0].key, "2024-01");
    }
}
