//! # Financial Aggregation Engine
//!
//! Stateless functions from already-fetched rows to report figures.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   bizdesk-db repositories                                               │
//! │   sales · line items · products · receivables · payables               │
//! │                │ (plain Vec<Row>, filtered by tenant and period)        │
//! │                ▼                                                        │
//! │   ┌─────────────────┐ ┌─────────────┐ ┌────────────┐ ┌──────────────┐  │
//! │   │ snapshot        │ │ ranking     │ │ cash_flow  │ │ dashboard    │  │
//! │   │ monthly_snapshot│ │ top_products│ │ cash_flow  │ │ dashboard    │  │
//! │   │ growth_series   │ │ margins     │ │            │ │ low_stock    │  │
//! │   └─────────────────┘ └─────────────┘ └────────────┘ └──────────────┘  │
//! │                │                                                        │
//! │                ▼                                                        │
//! │   serializable DTOs for the presentation layer                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reports are recomputed from raw rows on every call; nothing here keeps
//! state between calls. Every function re-applies its own status and date
//! filters, so callers may pass supersets of the relevant rows. Ties in
//! sorted output are broken by name and then id so that identical inputs
//! always produce identical output.

pub mod cash_flow;
pub mod dashboard;
pub mod ranking;
pub mod snapshot;

pub use cash_flow::{cash_flow, CashDirection, CashFlowLedger, CashMovement, CashSource};
pub use dashboard::{
    active_customer_count, daily_sales, dashboard, low_stock, open_accounts, AccountKind,
    DailySales, DashboardData, DashboardSummary, LowStockAlert, OpenAccount,
};
pub use ranking::{product_margins, top_products, ProductMargin, ProductRanking, RankingMetric};
pub use snapshot::{growth_pct, growth_series, monthly_snapshot, FinancialSnapshot, GrowthPoint};

#[cfg(test)]
pub(crate) mod fixtures {
    //! Row builders shared by the report tests.

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use crate::types::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    pub fn sale(id: &str, created: DateTime<Utc>, net: i64, method: PaymentMethod) -> Sale {
        Sale {
            id: id.to_string(),
            tenant_id: "t".to_string(),
            sale_number: format!("V-{}", id),
            request_id: None,
            customer_id: "c1".to_string(),
            user_id: "u".to_string(),
            status: SaleStatus::Finalized,
            gross_total_cents: net,
            discount_cents: 0,
            net_total_cents: net,
            payment_method: method,
            due_date: None,
            payment_terms: None,
            notes: None,
            created_at: created,
            updated_at: created,
            cancelled_at: None,
        }
    }

    pub fn cancelled(mut sale: Sale) -> Sale {
        sale.status = SaleStatus::Cancelled;
        sale
    }

    pub fn for_customer(mut sale: Sale, customer_id: &str) -> Sale {
        sale.customer_id = customer_id.to_string();
        sale
    }

    pub fn item(sale_id: &str, product_id: &str, qty: i64, unit: i64) -> LineItem {
        LineItem {
            id: format!("{}-{}", sale_id, product_id),
            sale_id: sale_id.to_string(),
            product_id: product_id.to_string(),
            product_name: format!("snapshot {}", product_id),
            quantity: qty,
            unit_price_cents: unit,
            subtotal_cents: qty * unit,
            position: 0,
        }
    }

    pub fn product(id: &str, name: &str, cost: i64, price: i64, stock: i64, min: i64) -> Product {
        let now = at(2026, 1, 1);
        Product {
            id: id.to_string(),
            tenant_id: "t".to_string(),
            name: name.to_string(),
            code: None,
            description: None,
            unit: "un".to_string(),
            cost_price_cents: cost,
            sale_price_cents: price,
            current_stock: stock,
            min_stock: min,
            supplier_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn receivable(id: &str, amount: i64, due: NaiveDate, paid: Option<NaiveDate>) -> Receivable {
        let now = at(2026, 1, 1);
        Receivable {
            id: id.to_string(),
            tenant_id: "t".to_string(),
            customer_id: Some("c1".to_string()),
            sale_id: None,
            description: format!("receivable {}", id),
            amount_cents: amount,
            due_date: due,
            paid_date: paid,
            status: if paid.is_some() {
                AccountStatus::Paid
            } else {
                AccountStatus::Pending
            },
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn payable(id: &str, amount: i64, due: NaiveDate, paid: Option<NaiveDate>) -> Payable {
        let now = at(2026, 1, 1);
        Payable {
            id: id.to_string(),
            tenant_id: "t".to_string(),
            supplier_id: None,
            description: format!("payable {}", id),
            category: None,
            amount_cents: amount,
            due_date: due,
            paid_date: paid,
            status: if paid.is_some() {
                AccountStatus::Paid
            } else {
                AccountStatus::Pending
            },
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}
