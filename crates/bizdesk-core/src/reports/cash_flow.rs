//! Cash-flow ledger: money that actually moved inside a period.
//!
//! ```text
//!   finalized sale, not deferred, created in period ──► inflow
//!   receivable paid, paid date in period            ──► inflow
//!   payable paid, paid date in period               ──► outflow
//! ```
//!
//! Deferred sales are left out on purpose: their cash arrives later, as
//! the paid receivable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::period::Period;
use crate::types::{AccountStatus, Payable, Receivable, Sale};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashDirection {
    Inflow,
    Outflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashSource {
    Sale,
    Receivable,
    Payable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashMovement {
    /// Id of the sale, receivable or payable row.
    pub id: String,
    pub source: CashSource,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    pub direction: CashDirection,
    /// Magnitude, always ≥ 0.
    pub amount: Money,
    /// Positive for inflows, negative for outflows.
    pub signed_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashFlowLedger {
    pub period: Period,
    /// Newest first.
    pub movements: Vec<CashMovement>,
    pub total_inflow: Money,
    pub total_outflow: Money,
    /// inflow − outflow.
    pub balance: Money,
}

fn movement(
    id: &str,
    source: CashSource,
    date: NaiveDate,
    description: String,
    category: String,
    direction: CashDirection,
    amount: Money,
) -> CashMovement {
    let signed_amount = match direction {
        CashDirection::Inflow => amount,
        CashDirection::Outflow => -amount,
    };
    CashMovement {
        id: id.to_string(),
        source,
        date,
        description,
        category,
        direction,
        amount,
        signed_amount,
    }
}

/// Builds the ledger for `period`, newest movement first.
pub fn cash_flow(
    period: Period,
    sales: &[Sale],
    receivables: &[Receivable],
    payables: &[Payable],
) -> CashFlowLedger {
    let mut movements = Vec::new();

    for s in sales
        .iter()
        .filter(|s| s.is_finalized() && !s.payment_method.is_deferred())
        .filter(|s| period.contains(s.sale_date()))
    {
        movements.push(movement(
            &s.id,
            CashSource::Sale,
            s.sale_date(),
            format!("Sale {}", s.sale_number),
            format!("Sale ({})", s.payment_method),
            CashDirection::Inflow,
            s.net_total(),
        ));
    }

    for r in receivables.iter().filter(|r| r.status == AccountStatus::Paid) {
        let Some(paid) = r.paid_date.filter(|d| period.contains(*d)) else {
            continue;
        };
        movements.push(movement(
            &r.id,
            CashSource::Receivable,
            paid,
            r.description.clone(),
            "Collection".to_string(),
            CashDirection::Inflow,
            r.amount(),
        ));
    }

    for p in payables.iter().filter(|p| p.status == AccountStatus::Paid) {
        let Some(paid) = p.paid_date.filter(|d| period.contains(*d)) else {
            continue;
        };
        movements.push(movement(
            &p.id,
            CashSource::Payable,
            paid,
            p.description.clone(),
            p.category.clone().unwrap_or_else(|| "Expense".to_string()),
            CashDirection::Outflow,
            p.amount(),
        ));
    }

    movements.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total_inflow: Money = movements
        .iter()
        .filter(|m| m.direction == CashDirection::Inflow)
        .map(|m| m.amount)
        .sum();
    let total_outflow: Money = movements
        .iter()
        .filter(|m| m.direction == CashDirection::Outflow)
        .map(|m| m.amount)
        .sum();

    CashFlowLedger {
        period,
        movements,
        total_inflow,
        total_outflow,
        balance: total_inflow - total_outflow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::*;
    use crate::types::PaymentMethod;

    #[test]
    fn test_inflow_outflow_balance() {
        let period = Period::month_of(date(2026, 10, 1));
        let sales = vec![sale("s1", at(2026, 10, 3), 10_000, PaymentMethod::Instant)];
        let receivables = vec![receivable("r1", 5_000, date(2026, 10, 1), Some(date(2026, 10, 8)))];
        let payables = vec![payable("p1", 3_000, date(2026, 10, 1), Some(date(2026, 10, 5)))];

        let ledger = cash_flow(period, &sales, &receivables, &payables);
        assert_eq!(ledger.total_inflow, Money::from_cents(15_000));
        assert_eq!(ledger.total_outflow, Money::from_cents(3_000));
        assert_eq!(ledger.balance, Money::from_cents(12_000));

        let dates: Vec<NaiveDate> = ledger.movements.iter().map(|m| m.date).collect();
        assert_eq!(dates, vec![date(2026, 10, 8), date(2026, 10, 5), date(2026, 10, 3)]);
        assert_eq!(ledger.movements[1].signed_amount, Money::from_cents(-3_000));
        assert_eq!(ledger.movements[1].category, "Expense");
        assert_eq!(ledger.movements[2].category, "Sale (instant)");
    }

    #[test]
    fn test_excluded_rows() {
        let period = Period::month_of(date(2026, 10, 1));
        let sales = vec![
            sale("deferred", at(2026, 10, 3), 10_000, PaymentMethod::Deferred),
            cancelled(sale("cancelled", at(2026, 10, 3), 10_000, PaymentMethod::Instant)),
            sale("september", at(2026, 9, 30), 10_000, PaymentMethod::CardCredit),
        ];
        let receivables = vec![
            receivable("open", 5_000, date(2026, 10, 1), None),
            receivable("early", 5_000, date(2026, 9, 1), Some(date(2026, 9, 30))),
        ];
        let payables = vec![payable("open", 3_000, date(2026, 10, 1), None)];

        let ledger = cash_flow(period, &sales, &receivables, &payables);
        assert!(ledger.movements.is_empty());
        assert_eq!(ledger.balance, Money::zero());
    }

    #[test]
    fn test_payable_category_kept() {
        let period = Period::day(date(2026, 10, 5));
        let mut p = payable("p1", 3_000, date(2026, 10, 1), Some(date(2026, 10, 5)));
        p.category = Some("Rent".to_string());

        let ledger = cash_flow(period, &[], &[], &[p]);
        assert_eq!(ledger.movements[0].category, "Rent");
        assert_eq!(ledger.movements[0].direction, CashDirection::Outflow);
        assert_eq!(ledger.balance, Money::from_cents(-3_000));
    }
}
