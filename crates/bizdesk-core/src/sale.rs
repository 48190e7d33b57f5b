//! # Sale Drafts
//!
//! The pure half of the sale workflow: everything that can be decided
//! without touching the store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleDraft (from the form)                                              │
//! │      │                                                                  │
//! │      ▼  SaleDraft::plan(sale_date, default_due_days)                    │
//! │  ┌──────────────────────────────────────────────┐                      │
//! │  │ ids well-formed, 1..=MAX lines               │                      │
//! │  │ qty ≥ 1, unit price ≥ 0, discount ≥ 0        │  any failure ──►     │
//! │  │ gross = Σ qty × unit, net = gross − discount │  ValidationError     │
//! │  │ discount ≤ gross                             │  (nothing written)   │
//! │  │ due date iff deferred, defaulted if allowed  │                      │
//! │  └──────────────────────────────────────────────┘                      │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  SalePlan (totals + priced lines) ──► bizdesk-db workflow               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError, ValidationResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Sale, SaleStatus};
use crate::validation::{
    normalize_optional, validate_line_count, validate_non_negative_cents, validate_quantity,
    validate_uuid,
};

/// Longest accepted idempotency key.
pub const MAX_REQUEST_ID_LEN: usize = 100;

// =============================================================================
// Input
// =============================================================================

/// One requested line of a new sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItemDraft {
    pub product_id: String,
    pub quantity: i64,
    /// Price agreed at the counter; frozen into the line item.
    pub unit_price_cents: i64,
}

/// A proposed sale as submitted by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDraft {
    pub customer_id: String,
    pub items: Vec<LineItemDraft>,
    #[serde(default)]
    pub discount_cents: i64,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Resubmitting with the same key returns the sale created the first time.
    #[serde(default)]
    pub request_id: Option<String>,
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub gross: Money,
    pub discount: Money,
    pub net: Money,
}

impl SaleTotals {
    /// Sums `quantity × unit price` per line and applies the discount.
    ///
    /// ```rust
    /// use bizdesk_core::money::Money;
    /// use bizdesk_core::sale::SaleTotals;
    ///
    /// let t = SaleTotals::compute(&[(2, 1000), (1, 500)], 300).unwrap();
    /// assert_eq!(t.gross, Money::from_cents(2500));
    /// assert_eq!(t.net, Money::from_cents(2200));
    /// ```
    pub fn compute(lines: &[(i64, i64)], discount_cents: i64) -> ValidationResult<Self> {
        let mut gross = Money::zero();
        for &(qty, unit) in lines {
            gross = Money::from_cents(unit)
                .checked_multiply_quantity(qty)
                .and_then(|subtotal| gross.checked_add(subtotal))
                .ok_or_else(|| ValidationError::invalid("items", "total is too large"))?;
        }

        let discount = Money::from_cents(discount_cents);
        if discount > gross {
            return Err(ValidationError::DiscountExceedsTotal {
                discount_cents,
                gross_cents: gross.cents(),
            });
        }

        Ok(Self {
            gross,
            discount,
            net: gross - discount,
        })
    }
}

/// A validated line, priced and ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Everything the store-side workflow needs, already checked.
#[derive(Debug, Clone, PartialEq)]
pub struct SalePlan {
    pub customer_id: String,
    pub lines: Vec<PlannedLine>,
    pub totals: SaleTotals,
    pub payment_method: PaymentMethod,
    pub due_date: Option<NaiveDate>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    pub request_id: Option<String>,
}

// =============================================================================
// Planning
// =============================================================================

impl SaleDraft {
    /// Validates the draft and computes totals.
    ///
    /// `default_due_days` fills in a missing due date on deferred sales;
    /// `None` makes the due date mandatory.
    pub fn plan(&self, sale_date: NaiveDate, default_due_days: Option<u32>) -> ValidationResult<SalePlan> {
        validate_uuid("customer_id", &self.customer_id)?;
        validate_line_count(self.items.len())?;

        for item in &self.items {
            validate_uuid("product_id", &item.product_id)?;
            validate_quantity(item.quantity)?;
            validate_non_negative_cents("unit_price", item.unit_price_cents)?;
        }
        validate_non_negative_cents("discount", self.discount_cents)?;

        let request_id = normalize_optional(self.request_id.clone());
        if let Some(key) = &request_id {
            if key.len() > MAX_REQUEST_ID_LEN {
                return Err(ValidationError::TooLong {
                    field: "request_id".to_string(),
                    max: MAX_REQUEST_ID_LEN,
                });
            }
        }

        let pairs: Vec<(i64, i64)> = self
            .items
            .iter()
            .map(|i| (i.quantity, i.unit_price_cents))
            .collect();
        let totals = SaleTotals::compute(&pairs, self.discount_cents)?;

        let due_date = resolve_due_date(self.payment_method, self.due_date, sale_date, default_due_days)?;
        if self.payment_method.is_deferred() && !totals.net.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "net total".to_string(),
            });
        }

        let lines = self
            .items
            .iter()
            .map(|i| {
                let unit_price = Money::from_cents(i.unit_price_cents);
                PlannedLine {
                    product_id: i.product_id.clone(),
                    quantity: i.quantity,
                    unit_price,
                    subtotal: unit_price.multiply_quantity(i.quantity),
                }
            })
            .collect();

        Ok(SalePlan {
            customer_id: self.customer_id.clone(),
            lines,
            totals,
            payment_method: self.payment_method,
            due_date,
            payment_terms: normalize_optional(self.payment_terms.clone()),
            notes: normalize_optional(self.notes.clone()),
            request_id,
        })
    }
}

/// Due date is required iff the sale is deferred.
///
/// ```text
///   deferred + given            → given (must not precede the sale date)
///   deferred + missing + N days → sale date + N
///   deferred + missing + None   → Required
///   not deferred + given        → NotAllowed
/// ```
pub fn resolve_due_date(
    method: PaymentMethod,
    requested: Option<NaiveDate>,
    sale_date: NaiveDate,
    default_due_days: Option<u32>,
) -> ValidationResult<Option<NaiveDate>> {
    match (method.is_deferred(), requested) {
        (false, None) => Ok(None),
        (false, Some(_)) => Err(ValidationError::NotAllowed {
            field: "due_date".to_string(),
            allowed: vec!["deferred payment only".to_string()],
        }),
        (true, Some(due)) if due < sale_date => Err(ValidationError::invalid(
            "due_date",
            "must not be before the sale date",
        )),
        (true, Some(due)) => Ok(Some(due)),
        (true, None) => match default_due_days {
            Some(days) => sale_date
                .checked_add_days(Days::new(u64::from(days)))
                .map(Some)
                .ok_or_else(|| ValidationError::invalid("due_date", "out of range")),
            None => Err(ValidationError::required("due_date")),
        },
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Only finalized sales can be cancelled.
pub fn ensure_cancellable(sale: &Sale) -> CoreResult<()> {
    match sale.status {
        SaleStatus::Finalized => Ok(()),
        other => Err(CoreError::InvalidSaleStatus {
            sale_id: sale.id.clone(),
            current_status: other.to_string(),
            operation: "cancel".to_string(),
        }),
    }
}

/// Display number for the `seq`-th sale of a tenant.
///
/// ```rust
/// assert_eq!(bizdesk_core::sale::format_sale_number(42), "V000042");
/// ```
pub fn format_sale_number(seq: i64) -> String {
    format!("V{:06}", seq)
}

/// Description given to the receivable a deferred sale creates.
pub fn receivable_description(sale_number: &str) -> String {
    format!("Sale {}", sale_number)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMER: &str = "c0000000-0000-4000-8000-000000000001";
    const PRODUCT_A: &str = "a0000000-0000-4000-8000-000000000001";
    const PRODUCT_B: &str = "b0000000-0000-4000-8000-000000000001";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(method: PaymentMethod) -> SaleDraft {
        SaleDraft {
            customer_id: CUSTOMER.to_string(),
            items: vec![
                LineItemDraft {
                    product_id: PRODUCT_A.to_string(),
                    quantity: 2,
                    unit_price_cents: 1000,
                },
                LineItemDraft {
                    product_id: PRODUCT_B.to_string(),
                    quantity: 1,
                    unit_price_cents: 500,
                },
            ],
            discount_cents: 300,
            payment_method: method,
            due_date: None,
            payment_terms: None,
            notes: None,
            request_id: None,
        }
    }

    #[test]
    fn test_plan_totals() {
        let plan = draft(PaymentMethod::Instant).plan(date(2026, 10, 16), Some(30)).unwrap();
        assert_eq!(plan.totals.gross.cents(), 2500);
        assert_eq!(plan.totals.net.cents(), 2200);
        let line_sum: Money = plan.lines.iter().map(|l| l.subtotal).sum();
        assert_eq!(line_sum, plan.totals.gross);
        assert_eq!(plan.due_date, None);
    }

    #[test]
    fn test_discount_above_gross_rejected() {
        let mut d = draft(PaymentMethod::Instant);
        d.discount_cents = 2501;
        assert!(matches!(
            d.plan(date(2026, 10, 16), None),
            Err(ValidationError::DiscountExceedsTotal { gross_cents: 2500, .. })
        ));

        d.discount_cents = 2500;
        assert_eq!(d.plan(date(2026, 10, 16), None).unwrap().totals.net, Money::zero());
    }

    #[test]
    fn test_empty_and_bad_lines_rejected() {
        let today = date(2026, 10, 16);

        let mut d = draft(PaymentMethod::Instant);
        d.items.clear();
        assert!(matches!(d.plan(today, None), Err(ValidationError::Required { .. })));

        let mut d = draft(PaymentMethod::Instant);
        d.items[1].quantity = 0;
        assert!(matches!(d.plan(today, None), Err(ValidationError::MustBePositive { .. })));

        let mut d = draft(PaymentMethod::Instant);
        d.items[0].unit_price_cents = -1;
        assert!(d.plan(today, None).is_err());

        let mut d = draft(PaymentMethod::Instant);
        d.customer_id = "walk-in".to_string();
        assert!(matches!(d.plan(today, None), Err(ValidationError::InvalidFormat { .. })));
    }

    #[test]
    fn test_deferred_due_date_rules() {
        let today = date(2026, 10, 16);

        let plan = draft(PaymentMethod::Deferred).plan(today, Some(30)).unwrap();
        assert_eq!(plan.due_date, Some(date(2026, 11, 15)));

        assert!(matches!(
            draft(PaymentMethod::Deferred).plan(today, None),
            Err(ValidationError::Required { .. })
        ));

        let mut d = draft(PaymentMethod::Deferred);
        d.due_date = Some(date(2026, 12, 1));
        assert_eq!(d.plan(today, None).unwrap().due_date, Some(date(2026, 12, 1)));

        d.due_date = Some(date(2026, 10, 15));
        assert!(d.plan(today, None).is_err());

        let mut d = draft(PaymentMethod::CardDebit);
        d.due_date = Some(date(2026, 12, 1));
        assert!(matches!(d.plan(today, Some(30)), Err(ValidationError::NotAllowed { .. })));
    }

    #[test]
    fn test_deferred_zero_net_rejected() {
        let mut d = draft(PaymentMethod::Deferred);
        d.discount_cents = 2500;
        assert!(matches!(
            d.plan(date(2026, 10, 16), Some(30)),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_optional_strings_normalized() {
        let mut d = draft(PaymentMethod::Instant);
        d.notes = Some("   ".to_string());
        d.request_id = Some(" req-1 ".to_string());
        let plan = d.plan(date(2026, 10, 16), None).unwrap();
        assert_eq!(plan.notes, None);
        assert_eq!(plan.request_id.as_deref(), Some("req-1"));

        d.request_id = Some("x".repeat(MAX_REQUEST_ID_LEN + 1));
        assert!(d.plan(date(2026, 10, 16), None).is_err());
    }

    #[test]
    fn test_totals_overflow_is_validation_error() {
        assert!(SaleTotals::compute(&[(2, i64::MAX)], 0).is_err());
    }

    #[test]
    fn test_sale_number_format() {
        assert_eq!(format_sale_number(1), "V000001");
        assert_eq!(format_sale_number(1234567), "V1234567");
        assert_eq!(receivable_description("V000001"), "Sale V000001");
    }
}
