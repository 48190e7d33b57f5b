//! # Finance Commands
//!
//! Cash flow, accounts receivable and accounts payable.
//!
//! ## Cash-flow View
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compute_cash_flow(ctx, period)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CashFlowCache hit? ──yes──► ledger                                     │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  sales in period + receivables paid in period + payables paid in period │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reports::cash_flow ──► cache (unless written meanwhile) ──► ledger     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Receivables created by a deferred sale are managed by the sale; they can
//! be marked paid here but not edited or deleted.

use bizdesk_core::reports::{self, CashFlowLedger};
use bizdesk_core::{AccountStatus, Payable, Period, PeriodPreset, Receivable, TenantContext};
use bizdesk_db::{PayableInput, ReceivableInput};
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Cash flow
// =============================================================================

pub async fn compute_cash_flow(
    state: &AppState,
    ctx: &TenantContext,
    period: Period,
) -> Result<CashFlowLedger, ApiError> {
    let cache = state.cash_flow_cache();
    if let Some(ledger) = cache.get(&ctx.tenant_id, &period) {
        debug!(start = %period.start, end = %period.end, "Cash flow served from cache");
        return Ok(ledger);
    }

    debug!(start = %period.start, end = %period.end, "compute_cash_flow command");
    let revision = cache.revision(&ctx.tenant_id);

    let db = state.db();
    let sales = db.sales().list_in_period(ctx, &period).await?;
    let receivables = db.receivables().paid_in_period(ctx, &period).await?;
    let payables = db.payables().paid_in_period(ctx, &period).await?;

    let ledger = reports::cash_flow(period, &sales, &receivables, &payables);
    cache.insert(revision, &ctx.tenant_id, period, ledger.clone());
    Ok(ledger)
}

/// Today, last 7 days or current month, relative to `today`.
pub async fn compute_cash_flow_preset(
    state: &AppState,
    ctx: &TenantContext,
    preset: PeriodPreset,
    today: NaiveDate,
) -> Result<CashFlowLedger, ApiError> {
    compute_cash_flow(state, ctx, preset.resolve(today)).await
}

// =============================================================================
// Receivables
// =============================================================================

pub async fn create_receivable(
    state: &AppState,
    ctx: &TenantContext,
    input: ReceivableInput,
) -> Result<Receivable, ApiError> {
    debug!(amount = input.amount_cents, "create_receivable command");
    Ok(state.db().receivables().create(ctx, input).await?)
}

pub async fn list_receivables(
    state: &AppState,
    ctx: &TenantContext,
    status: Option<AccountStatus>,
) -> Result<Vec<Receivable>, ApiError> {
    debug!(?status, "list_receivables command");
    Ok(state.db().receivables().list(ctx, status).await?)
}

pub async fn update_receivable(
    state: &AppState,
    ctx: &TenantContext,
    id: &str,
    input: ReceivableInput,
) -> Result<Receivable, ApiError> {
    debug!(id = %id, "update_receivable command");
    Ok(state.db().receivables().update(ctx, id, input).await?)
}

pub async fn mark_receivable_paid(
    state: &AppState,
    ctx: &TenantContext,
    id: &str,
    paid_date: NaiveDate,
) -> Result<Receivable, ApiError> {
    let receivable = state.db().receivables().mark_paid(ctx, id, paid_date).await?;
    info!(id = %id, paid_date = %paid_date, "Receivable collected");
    Ok(receivable)
}

pub async fn delete_receivable(state: &AppState, ctx: &TenantContext, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_receivable command");
    Ok(state.db().receivables().delete(ctx, id).await?)
}

// =============================================================================
// Payables
// =============================================================================

pub async fn create_payable(state: &AppState, ctx: &TenantContext, input: PayableInput) -> Result<Payable, ApiError> {
    debug!(amount = input.amount_cents, "create_payable command");
    Ok(state.db().payables().create(ctx, input).await?)
}

pub async fn list_payables(
    state: &AppState,
    ctx: &TenantContext,
    status: Option<AccountStatus>,
) -> Result<Vec<Payable>, ApiError> {
    debug!(?status, "list_payables command");
    Ok(state.db().payables().list(ctx, status).await?)
}

pub async fn update_payable(
    state: &AppState,
    ctx: &TenantContext,
    id: &str,
    input: PayableInput,
) -> Result<Payable, ApiError> {
    debug!(id = %id, "update_payable command");
    Ok(state.db().payables().update(ctx, id, input).await?)
}

pub async fn mark_payable_paid(
    state: &AppState,
    ctx: &TenantContext,
    id: &str,
    paid_date: NaiveDate,
) -> Result<Payable, ApiError> {
    let payable = state.db().payables().mark_paid(ctx, id, paid_date).await?;
    info!(id = %id, paid_date = %paid_date, "Payable settled");
    Ok(payable)
}

pub async fn delete_payable(state: &AppState, ctx: &TenantContext, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_payable command");
    Ok(state.db().payables().delete(ctx, id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::create_sale;
    use crate::error::ErrorCode;
    use crate::state::test_support::*;
    use bizdesk_core::reports::CashSource;
    use bizdesk_core::{Money, PaymentMethod};
    use chrono::Utc;

    fn bill(amount_cents: i64, due_date: NaiveDate) -> PayableInput {
        PayableInput {
            supplier_id: None,
            description: "Restock".into(),
            category: Some("inventory".into()),
            amount_cents,
            due_date,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_cash_flow_balance() {
        let (state, ctx) = setup().await;
        let c = customer(&state, &ctx, "Ana").await;
        let p = product(&state, &ctx, "Coffee", 100, 0).await;
        let today = Utc::now().date_naive();

        create_sale(&state, &ctx, draft(&c.id, &p.id, 15, PaymentMethod::Instant)).await.unwrap();
        create_sale(&state, &ctx, draft(&c.id, &p.id, 4, PaymentMethod::Deferred)).await.unwrap();
        let payable = create_payable(&state, &ctx, bill(3_000, today)).await.unwrap();
        mark_payable_paid(&state, &ctx, &payable.id, today).await.unwrap();

        let ledger = compute_cash_flow_preset(&state, &ctx, PeriodPreset::Today, today).await.unwrap();
        assert_eq!(ledger.total_inflow, Money::from_cents(15_000));
        assert_eq!(ledger.total_outflow, Money::from_cents(3_000));
        assert_eq!(ledger.balance, Money::from_cents(12_000));
        // The deferred sale only shows up once collected.
        assert_eq!(ledger.movements.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_dropped_on_collection() {
        let (state, ctx) = setup().await;
        let c = customer(&state, &ctx, "Ana").await;
        let p = product(&state, &ctx, "Coffee", 100, 0).await;
        let today = Utc::now().date_naive();
        let period = Period::month_of(today);

        let sale = create_sale(&state, &ctx, draft(&c.id, &p.id, 2, PaymentMethod::Deferred))
            .await
            .unwrap();
        drain_change_feed(&state).await;

        let before = compute_cash_flow(&state, &ctx, period).await.unwrap();
        assert_eq!(before.total_inflow, Money::zero());
        assert_eq!(state.cash_flow_cache().len(), 1);

        let receivable = list_receivables(&state, &ctx, Some(AccountStatus::Pending)).await.unwrap();
        assert_eq!(receivable.len(), 1);
        assert_eq!(receivable[0].sale_id.as_deref(), Some(sale.id.as_str()));
        mark_receivable_paid(&state, &ctx, &receivable[0].id, today).await.unwrap();
        drain_change_feed(&state).await;
        assert!(state.cash_flow_cache().is_empty());

        let after = compute_cash_flow(&state, &ctx, period).await.unwrap();
        assert_eq!(after.total_inflow, Money::from_cents(2_000));
        assert_eq!(after.movements[0].source, CashSource::Receivable);
    }

    #[tokio::test]
    async fn test_cash_flow_reflects_sale_right_away() {
        let (state, ctx) = setup().await;
        let c = customer(&state, &ctx, "Ana").await;
        let p = product(&state, &ctx, "Coffee", 100, 0).await;
        let period = Period::month_of(Utc::now().date_naive());

        let before = compute_cash_flow(&state, &ctx, period).await.unwrap();
        assert_eq!(before.total_inflow, Money::zero());

        // No waiting on the listener task between the write and the read.
        create_sale(&state, &ctx, draft(&c.id, &p.id, 3, PaymentMethod::Instant)).await.unwrap();
        let after = compute_cash_flow(&state, &ctx, period).await.unwrap();
        assert_eq!(after.total_inflow, Money::from_cents(3_000));

        let rent = create_payable(&state, &ctx, bill(500, period.start)).await.unwrap();
        mark_payable_paid(&state, &ctx, &rent.id, period.start).await.unwrap();
        let settled = compute_cash_flow(&state, &ctx, period).await.unwrap();
        assert_eq!(settled.balance, Money::from_cents(2_500));
    }

    #[tokio::test]
    async fn test_account_rules() {
        let (state, ctx) = setup().await;
        let today = Utc::now().date_naive();

        let payable = create_payable(&state, &ctx, bill(1_000, today)).await.unwrap();
        let payable = update_payable(&state, &ctx, &payable.id, bill(1_200, today)).await.unwrap();
        assert_eq!(payable.amount_cents, 1_200);
        mark_payable_paid(&state, &ctx, &payable.id, today).await.unwrap();

        let err = mark_payable_paid(&state, &ctx, &payable.id, today).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StateConflict);
        assert_eq!(list_payables(&state, &ctx, Some(AccountStatus::Pending)).await.unwrap().len(), 0);

        let receivable = create_receivable(
            &state,
            &ctx,
            ReceivableInput {
                customer_id: None,
                description: "Consulting".into(),
                amount_cents: 0,
                due_date: today,
                notes: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(receivable.code, ErrorCode::ValidationFailed);

        let missing = delete_payable(&state, &ctx, "00000000-0000-4000-8000-000000000000")
            .await
            .unwrap_err();
        assert_eq!(missing.code, ErrorCode::NotFound);
    }
}
