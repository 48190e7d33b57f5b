//! # Sale Commands
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(draft)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleWorkflow (one transaction)                                         │
//! │    header + items ─► receivable (deferred only) ─► stock decrement      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sale { status: finalized, sale_number: "V000042" }                     │
//! │                                                                         │
//! │  cancel_sale(id)                                                        │
//! │    finalized ─► cancelled, stock restored, pending receivable cancelled │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;

use bizdesk_core::sale::SaleDraft;
use bizdesk_core::{Period, Sale, SaleDetail, TenantContext};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Records a finalized sale and its side effects.
///
/// Resubmitting a draft with the same `request_id` returns the sale
/// created the first time.
pub async fn create_sale(state: &AppState, ctx: &TenantContext, draft: SaleDraft) -> Result<Sale, ApiError> {
    debug!(
        customer_id = %draft.customer_id,
        items = draft.items.len(),
        method = %draft.payment_method,
        "create_sale command"
    );
    let start = Instant::now();

    let sale = state.sale_workflow().create_sale(ctx, &draft).await?;

    info!(
        sale_number = %sale.sale_number,
        net_total = %state.config().store.format_currency(sale.net_total_cents),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Sale recorded"
    );
    Ok(sale)
}

/// Cancels a finalized sale, restoring stock and dropping its pending
/// receivable.
pub async fn cancel_sale(state: &AppState, ctx: &TenantContext, sale_id: &str) -> Result<Sale, ApiError> {
    debug!(sale_id = %sale_id, "cancel_sale command");

    let sale = state.sale_workflow().cancel_sale(ctx, sale_id).await?;

    info!(sale_number = %sale.sale_number, "Sale cancelled");
    Ok(sale)
}

pub async fn get_sale(state: &AppState, ctx: &TenantContext, sale_id: &str) -> Result<SaleDetail, ApiError> {
    debug!(sale_id = %sale_id, "get_sale command");
    Ok(state.db().sales().detail(ctx, sale_id).await?)
}

/// Sales created inside `period`, newest first, cancelled ones included.
pub async fn list_sales(state: &AppState, ctx: &TenantContext, period: Period) -> Result<Vec<Sale>, ApiError> {
    debug!(start = %period.start, end = %period.end, "list_sales command");
    Ok(state.db().sales().list_in_period(ctx, &period).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::ErrorCode;
    use crate::state::test_support::*;
    use bizdesk_core::{PaymentMethod, SaleStatus};
    use bizdesk_db::{Database, DbConfig};
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_get_cancel() {
        let (state, ctx) = setup().await;
        let c = customer(&state, &ctx, "Ana").await;
        let p = product(&state, &ctx, "Coffee", 10, 2).await;

        let sale = create_sale(&state, &ctx, draft(&c.id, &p.id, 3, PaymentMethod::Instant))
            .await
            .unwrap();
        assert_eq!(sale.net_total_cents, 3_000);

        let detail = get_sale(&state, &ctx, &sale.id).await.unwrap();
        assert_eq!(detail.customer_name, "Ana");
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].product_name, "Coffee");

        let cancelled = cancel_sale(&state, &ctx, &sale.id).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(state.db().products().get(&ctx, &p.id).await.unwrap().current_stock, 10);

        let again = cancel_sale(&state, &ctx, &sale.id).await.unwrap_err();
        assert_eq!(again.code, ErrorCode::StateConflict);

        let today = Period::day(Utc::now().date_naive());
        assert_eq!(list_sales(&state, &ctx, today).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_errors_carry_codes() {
        let (state, ctx) = setup().await;
        let c = customer(&state, &ctx, "Ana").await;
        let p = product(&state, &ctx, "Coffee", 1, 0).await;

        let missing = get_sale(&state, &ctx, "00000000-0000-4000-8000-000000000000").await.unwrap_err();
        assert_eq!(missing.code, ErrorCode::NotFound);

        let short = create_sale(&state, &ctx, draft(&c.id, &p.id, 2, PaymentMethod::Instant))
            .await
            .unwrap_err();
        assert_eq!(short.code, ErrorCode::StateConflict);
        assert!(short.completed_steps.is_empty());

        let empty = create_sale(&state, &ctx, draft(&c.id, &p.id, 0, PaymentMethod::Instant))
            .await
            .unwrap_err();
        assert_eq!(empty.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_due_date_required_when_default_disabled() {
        let mut config = AppConfig::default();
        config.finance.default_due_days = 0;
        let ctx = config.tenant_context().unwrap();
        let state = AppState::new(Database::new(DbConfig::in_memory()).await.unwrap(), config);
        let c = customer(&state, &ctx, "Ana").await;
        let p = product(&state, &ctx, "Coffee", 5, 0).await;

        let err = create_sale(&state, &ctx, draft(&c.id, &p.id, 1, PaymentMethod::Deferred))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let mut with_due = draft(&c.id, &p.id, 1, PaymentMethod::Deferred);
        with_due.due_date = Some(Utc::now().date_naive());
        let sale = create_sale(&state, &ctx, with_due).await.unwrap();
        assert_eq!(state.db().receivables().for_sale(&ctx, &sale.id).await.unwrap().len(), 1);
    }
}
