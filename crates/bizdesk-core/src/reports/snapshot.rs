//! Monthly profit snapshot and the month-over-month growth series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::period::Period;
use crate::types::{AccountStatus, Payable, Sale};

/// Default length of the growth series: six past months plus the current one.
pub const GROWTH_WINDOW_MONTHS: u32 = 7;

/// Longest growth series a caller may ask for.
pub const MAX_GROWTH_WINDOW_MONTHS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinancialSnapshot {
    pub period: Period,
    /// Σ net total of finalized sales.
    pub revenue: Money,
    /// Σ amount of paid payables.
    pub expense: Money,
    pub net_profit: Money,
    /// net profit / revenue × 100; 0 when revenue is 0.
    pub profit_margin_pct: f64,
    pub sale_count: i64,
}

/// Revenue, expense and margin for one period.
///
/// Sales count when finalized and created inside the period; payables
/// count when paid with a paid date inside the period.
pub fn monthly_snapshot(period: Period, sales: &[Sale], payables: &[Payable]) -> FinancialSnapshot {
    let counted: Vec<&Sale> = sales
        .iter()
        .filter(|s| s.is_finalized() && period.contains(s.sale_date()))
        .collect();
    let revenue: Money = counted.iter().map(|s| s.net_total()).sum();

    let expense: Money = payables
        .iter()
        .filter(|p| p.status == AccountStatus::Paid)
        .filter(|p| p.paid_date.is_some_and(|d| period.contains(d)))
        .map(Payable::amount)
        .sum();

    let net_profit = revenue - expense;
    FinancialSnapshot {
        period,
        revenue,
        expense,
        net_profit,
        profit_margin_pct: net_profit.percent_of(revenue),
        sale_count: counted.len() as i64,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GrowthPoint {
    /// "YYYY-MM".
    pub label: String,
    pub period: Period,
    pub sale_count: i64,
    pub revenue: Money,
    pub count_growth_pct: f64,
    pub revenue_growth_pct: f64,
}

/// (current − previous) / previous × 100, or 0 when previous is 0.
///
/// ```rust
/// use bizdesk_core::reports::growth_pct;
///
/// assert_eq!(growth_pct(0, 500), 0.0);
/// assert_eq!(growth_pct(200, 300), 50.0);
/// ```
pub fn growth_pct(previous: i64, current: i64) -> f64 {
    if previous == 0 {
        0.0
    } else {
        (current - previous) as f64 / previous as f64 * 100.0
    }
}

/// Per-month finalized sale count and revenue for the `months` months
/// ending with the month of `today`, oldest first.
///
/// The first point has nothing before it, so its growth is 0.
pub fn growth_series(today: NaiveDate, months: u32, sales: &[Sale]) -> Vec<GrowthPoint> {
    let mut points: Vec<GrowthPoint> = Vec::with_capacity(months as usize);

    for period in Period::trailing_months(today, months) {
        let (count, revenue) = sales
            .iter()
            .filter(|s| s.is_finalized() && period.contains(s.sale_date()))
            .fold((0i64, Money::zero()), |(c, r), s| (c + 1, r + s.net_total()));

        let (count_growth_pct, revenue_growth_pct) = match points.last() {
            Some(prev) => (
                growth_pct(prev.sale_count, count),
                growth_pct(prev.revenue.cents(), revenue.cents()),
            ),
            None => (0.0, 0.0),
        };

        points.push(GrowthPoint {
            label: period.month_label(),
            period,
            sale_count: count,
            revenue,
            count_growth_pct,
            revenue_growth_pct,
        });
    }

    points
}
