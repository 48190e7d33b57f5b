//! # Domain Types
//!
//! Entity rows as they exist in the record store, plus their status enums.
//!
//! ## Entity Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌────────────┐   1    n ┌────────────┐ 1    n ┌────────────┐           │
//! │  │  Customer  │─────────►│    Sale    │───────►│  LineItem  │           │
//! │  └────────────┘          │ status     │ owns   │ qty × unit │           │
//! │        │                 │ gross/net  │        └─────┬──────┘           │
//! │        │                 └─────┬──────┘              │ product_id       │
//! │        │        0..1 (deferred)│                     ▼                  │
//! │        │                 ┌─────▼──────┐        ┌────────────┐           │
//! │        └────────────────►│ Receivable │        │  Product   │◄──┐       │
//! │                          └────────────┘        │ stock      │   │       │
//! │                                                └────────────┘   │       │
//! │  ┌────────────┐   1    n ┌────────────┐                         │       │
//! │  │  Supplier  │─────────►│  Payable   │          supplier_id ───┘       │
//! │  └────────────┘          └────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money columns are `*_cents: i64` so rows decode straight from SQLite;
//! accessor methods hand out [`Money`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Customer
// =============================================================================

/// Legal classification of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerKind {
    Individual,
    Organization,
}

impl Default for CustomerKind {
    fn default() -> Self {
        CustomerKind::Individual
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub kind: CustomerKind,
    /// National tax document (individual or company registration).
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub tax_id: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product with its inventory counters.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Optional business code shown next to the name.
    pub code: Option<String>,
    pub description: Option<String>,
    /// Unit of measure ("un", "kg", "box", ...).
    pub unit: String,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
    /// Units on hand. Never negative.
    pub current_stock: i64,
    /// At or below this the product is reported as low stock.
    pub min_stock: i64,
    pub supplier_id: Option<String>,
    /// Soft-delete flag.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Catalog sale price minus cost price.
    #[inline]
    pub fn unit_margin(&self) -> Money {
        self.sale_price() - self.cost_price()
    }

    /// `None` while stock is above the threshold or the product is inactive.
    pub fn stock_status(&self) -> Option<StockStatus> {
        if !self.is_active || self.current_stock > self.min_stock {
            return None;
        }
        if self.current_stock <= 0 {
            Some(StockStatus::Out)
        } else {
            Some(StockStatus::Low)
        }
    }
}

/// Low-stock classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// 0 < stock ≤ minimum.
    Low,
    /// Nothing on hand.
    Out,
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle of a sale.
///
/// ```text
///   create ──► Finalized ──cancel──► Cancelled (terminal)
///
///   Pending: reserved, never produced by the workflow
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Pending,
    Finalized,
    Cancelled,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Finalized => "finalized",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid at the counter (cash, instant transfer).
    Instant,
    CardCredit,
    CardDebit,
    /// Paid later; creates a receivable.
    Deferred,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Instant => "instant",
            PaymentMethod::CardCredit => "card_credit",
            PaymentMethod::CardDebit => "card_debit",
            PaymentMethod::Deferred => "deferred",
        }
    }

    #[inline]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, PaymentMethod::Deferred)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A persisted sale header.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    /// Display number, unique per tenant ("V000042").
    pub sale_number: String,
    /// Client-supplied idempotency key.
    pub request_id: Option<String>,
    pub customer_id: String,
    pub user_id: String,
    pub status: SaleStatus,
    pub gross_total_cents: i64,
    pub discount_cents: i64,
    pub net_total_cents: i64,
    pub payment_method: PaymentMethod,
    /// Set iff the payment method is deferred.
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn gross_total(&self) -> Money {
        Money::from_cents(self.gross_total_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn net_total(&self) -> Money {
        Money::from_cents(self.net_total_cents)
    }

    /// Calendar day (UTC) the sale belongs to for reporting.
    #[inline]
    pub fn sale_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.status == SaleStatus::Finalized
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product/quantity/price entry, owned by exactly one sale.
///
/// `unit_price_cents` and `product_name` are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LineItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Always `quantity × unit_price_cents`.
    pub subtotal_cents: i64,
    /// Order within the sale, starting at 0.
    pub position: i64,
}

impl LineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A sale with its line items and the customer's display name.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub customer_name: String,
    pub items: Vec<LineItem>,
}

/// Finalized sale row joined with its customer, for dashboard lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RecentSale {
    pub id: String,
    pub sale_number: String,
    pub customer_name: String,
    pub net_total_cents: i64,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Receivables / Payables
// =============================================================================

/// Status shared by receivables and payables.
///
/// `Pending → Paid` and `Pending → Cancelled`; both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Paid,
    Cancelled,
}

impl AccountStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Paid => "paid",
            AccountStatus::Cancelled => "cancelled",
        }
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, AccountStatus::Pending)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Money owed to the business.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Receivable {
    pub id: String,
    pub tenant_id: String,
    pub customer_id: Option<String>,
    /// Set when created by a deferred sale.
    pub sale_id: Option<String>,
    pub description: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub paid_date: Option<NaiveDate>,
    pub status: AccountStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Receivable {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Money the business owes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payable {
    pub id: String,
    pub tenant_id: String,
    pub supplier_id: Option<String>,
    pub description: String,
    /// Expense category ("rent", "utilities", ...).
    pub category: Option<String>,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub paid_date: Option<NaiveDate>,
    pub status: AccountStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Payable {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min: i64, active: bool) -> Product {
        let now = Utc::now();
        Product {
            id: "p".into(),
            tenant_id: "t".into(),
            name: "Widget".into(),
            code: None,
            description: None,
            unit: "un".into(),
            cost_price_cents: 600,
            sale_price_cents: 1000,
            current_stock: stock,
            min_stock: min,
            supplier_id: None,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(product(6, 5, true).stock_status(), None);
        assert_eq!(product(5, 5, true).stock_status(), Some(StockStatus::Low));
        assert_eq!(product(3, 5, true).stock_status(), Some(StockStatus::Low));
        assert_eq!(product(0, 5, true).stock_status(), Some(StockStatus::Out));
        assert_eq!(product(0, 0, true).stock_status(), Some(StockStatus::Out));
        assert_eq!(product(0, 5, false).stock_status(), None);
    }

    #[test]
    fn test_unit_margin() {
        assert_eq!(product(1, 0, true).unit_margin(), Money::from_cents(400));
    }

    #[test]
    fn test_status_strings_match_serde() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CardCredit).unwrap(),
            "\"card_credit\""
        );
        assert_eq!(SaleStatus::Cancelled.to_string(), "cancelled");
        assert!(AccountStatus::Paid.is_terminal());
        assert!(!AccountStatus::Pending.is_terminal());
    }
}
