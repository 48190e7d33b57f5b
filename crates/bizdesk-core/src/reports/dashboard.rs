//! Home-screen figures: low stock, activity, recent sales, open accounts.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::period::Period;
use crate::types::{AccountStatus, Payable, Product, Receivable, RecentSale, Sale, StockStatus};

// =============================================================================
// Low stock
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LowStockAlert {
    pub product: Product,
    pub status: StockStatus,
}

/// Active products at or below their minimum; emptiest first, then by name.
pub fn low_stock(products: &[Product]) -> Vec<LowStockAlert> {
    let mut alerts: Vec<LowStockAlert> = products
        .iter()
        .filter_map(|p| {
            p.stock_status().map(|status| LowStockAlert {
                product: p.clone(),
                status,
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.product
            .current_stock
            .cmp(&b.product.current_stock)
            .then_with(|| a.product.name.cmp(&b.product.name))
            .then_with(|| a.product.id.cmp(&b.product.id))
    });
    alerts
}

// =============================================================================
// Activity
// =============================================================================

/// Distinct customers with at least one finalized sale in `period`.
pub fn active_customer_count(sales: &[Sale], period: Period) -> i64 {
    sales
        .iter()
        .filter(|s| s.is_finalized() && period.contains(s.sale_date()))
        .map(|s| s.customer_id.as_str())
        .collect::<HashSet<_>>()
        .len() as i64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sale_count: i64,
    pub revenue: Money,
}

/// One bucket per day of `period` (empty days included), oldest first.
pub fn daily_sales(sales: &[Sale], period: Period) -> Vec<DailySales> {
    period
        .days()
        .map(|day| {
            let (sale_count, revenue) = sales
                .iter()
                .filter(|s| s.is_finalized() && s.sale_date() == day)
                .fold((0i64, Money::zero()), |(c, r), s| (c + 1, r + s.net_total()));
            DailySales {
                date: day,
                sale_count,
                revenue,
            }
        })
        .collect()
}

// =============================================================================
// Open accounts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Receivable,
    Payable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OpenAccount {
    pub id: String,
    pub kind: AccountKind,
    pub description: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    /// Whole days past the due date; 0 when not yet due.
    pub days_overdue: i64,
}

/// Pending receivables and payables, earliest due date first.
pub fn open_accounts(receivables: &[Receivable], payables: &[Payable], today: NaiveDate) -> Vec<OpenAccount> {
    let overdue = |due: NaiveDate| (today - due).num_days().max(0);

    let mut open: Vec<OpenAccount> = receivables
        .iter()
        .filter(|r| r.status == AccountStatus::Pending)
        .map(|r| OpenAccount {
            id: r.id.clone(),
            kind: AccountKind::Receivable,
            description: r.description.clone(),
            amount: r.amount(),
            due_date: r.due_date,
            days_overdue: overdue(r.due_date),
        })
        .chain(
            payables
                .iter()
                .filter(|p| p.status == AccountStatus::Pending)
                .map(|p| OpenAccount {
                    id: p.id.clone(),
                    kind: AccountKind::Payable,
                    description: p.description.clone(),
                    amount: p.amount(),
                    due_date: p.due_date,
                    days_overdue: overdue(p.due_date),
                }),
        )
        .collect();

    open.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
    open
}

// =============================================================================
// Dashboard
// =============================================================================

/// Rows the dashboard is computed from. `sales` must cover at least the
/// current month, the last 7 days and the active-customer window.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub sales: Vec<Sale>,
    pub products: Vec<Product>,
    pub recent_sales: Vec<RecentSale>,
    pub receivables: Vec<Receivable>,
    pub payables: Vec<Payable>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    #[ts(as = "String")]
    pub today: NaiveDate,
    pub month_revenue: Money,
    pub month_sale_count: i64,
    pub active_customers: i64,
    pub low_stock_count: i64,
    pub low_stock: Vec<LowStockAlert>,
    pub recent_sales: Vec<RecentSale>,
    /// Last 7 days, oldest first.
    pub daily_sales: Vec<DailySales>,
    pub open_accounts: Vec<OpenAccount>,
    pub receivables_open: Money,
    pub payables_open: Money,
}

pub fn dashboard(today: NaiveDate, data: &DashboardData, active_customer_months: u32) -> DashboardSummary {
    let month = Period::month_of(today);
    let (month_sale_count, month_revenue) = data
        .sales
        .iter()
        .filter(|s| s.is_finalized() && month.contains(s.sale_date()))
        .fold((0i64, Money::zero()), |(c, r), s| (c + 1, r + s.net_total()));

    let months = active_customer_months.max(1) as i32;
    let active_window = Period {
        start: Period::month_offset(today, 1 - months).start,
        end: month.end,
    };

    let low = low_stock(&data.products);
    let open = open_accounts(&data.receivables, &data.payables, today);
    let open_total = |kind: AccountKind| -> Money {
        open.iter().filter(|a| a.kind == kind).map(|a| a.amount).sum()
    };

    DashboardSummary {
        today,
        month_revenue,
        month_sale_count,
        active_customers: active_customer_count(&data.sales, active_window),
        low_stock_count: low.len() as i64,
        receivables_open: open_total(AccountKind::Receivable),
        payables_open: open_total(AccountKind::Payable),
        low_stock: low,
        recent_sales: data.recent_sales.clone(),
        daily_sales: daily_sales(&data.sales, Period::last_days(today, 7)),
        open_accounts: open,
    }
}
