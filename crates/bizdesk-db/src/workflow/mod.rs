//! # Sale Workflow
//!
//! Creates and cancels sales together with their stock and receivable side
//! effects, each inside one SQLite transaction.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleDraft::plan()          validation + totals, no I/O                 │
//! │       │ ValidationError ──────────────────────────► ValidationFailed    │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE           write lock up front                          │
//! │   ├─ check_request_id      same key seen? ─► return that sale           │
//! │   ├─ verify_customer       tenant-scoped                                │
//! │   ├─ verify_products       exist + active, name snapshot                │
//! │   ├─ allocate_number       sale_counters += 1 ─► "V000042"              │
//! │   ├─ insert_header         status = finalized                           │
//! │   ├─ insert_items                                                       │
//! │   ├─ insert_receivable     deferred only, amount = net                  │
//! │   └─ decrement_stock       per line, floor at 0                         │
//! │  COMMIT ──► ChangeFeed events                                           │
//! │                                                                         │
//! │  any step fails ─► ROLLBACK ─► clean error                              │
//! │  ROLLBACK or COMMIT fails ─► PartialFailure { completed, failed_at }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancel
//! ```text
//!  BEGIN IMMEDIATE ─► load_sale ─► mark_cancelled ─► restore_stock
//!        ─► cancel_receivables (pending only) ─► COMMIT
//! ```
//!
//! Every step runs on the transaction's connection. Nothing here touches
//! the pool while a transaction is open. Workflows take the write lock when
//! they begin, so two concurrent sales run one after the other: the second
//! waits on the busy timeout and then sees the first one's stock and
//! request id.

mod error;

pub use error::{Operation, Step, StepLog, WorkflowError, WorkflowResult};

use bizdesk_core::sale::{
    ensure_cancellable, format_sale_number, receivable_description, SaleDraft, SalePlan,
};
use bizdesk_core::{
    AccountStatus, CoreError, LineItem, Receivable, Sale, SaleStatus, TenantContext, ValidationError,
};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::notify::{ChangeEvent, ChangeFeed, ChangeKind, Table};
use crate::repository::product::StockUpdate;
use crate::repository::{product, receivable, sale};

/// Orchestrates sale creation and cancellation.
#[derive(Debug, Clone)]
pub struct SaleWorkflow {
    pool: SqlitePool,
    feed: ChangeFeed,
    default_due_days: Option<u32>,
}

enum CreateOutcome {
    Created { sale: Sale, events: Vec<ChangeEvent> },
    Replayed(Sale),
    /// Another request with the same key committed first.
    RequestIdTaken,
}

impl SaleWorkflow {
    pub fn new(pool: SqlitePool, feed: ChangeFeed, default_due_days: Option<u32>) -> Self {
        SaleWorkflow {
            pool,
            feed,
            default_due_days,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    pub async fn create_sale(&self, ctx: &TenantContext, draft: &SaleDraft) -> WorkflowResult<Sale> {
        self.create_sale_at(ctx, draft, Utc::now()).await
    }

    /// [`Self::create_sale`] with an explicit clock.
    pub async fn create_sale_at(
        &self,
        ctx: &TenantContext,
        draft: &SaleDraft,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Sale> {
        let plan = draft.plan(now.date_naive(), self.default_due_days)?;

        debug!(
            customer_id = %plan.customer_id,
            lines = plan.lines.len(),
            net = plan.totals.net.cents(),
            method = %plan.payment_method,
            "Creating sale"
        );

        let mut log = StepLog::new(Operation::CreateSale);
        let mut tx = self.begin().await?;

        let outcome = self.create_steps(&mut tx, ctx, &plan, now, &mut log).await;

        match outcome {
            Ok(CreateOutcome::Created { sale, events }) => {
                log.enter(Step::Commit);
                if let Err(e) = tx.commit().await {
                    error!(error = %e, sale_id = %sale.id, "Commit failed while creating sale");
                    return Err(log.partial_failure(e.to_string()));
                }

                info!(sale_id = %sale.id, number = %sale.sale_number, net = sale.net_total_cents, "Sale created");
                self.feed.publish_all(events);
                Ok(sale)
            }
            Ok(CreateOutcome::Replayed(sale)) => {
                self.rollback(tx, &log, None).await?;
                info!(sale_id = %sale.id, "Duplicate request, returning existing sale");
                Ok(sale)
            }
            Ok(CreateOutcome::RequestIdTaken) => {
                self.rollback(tx, &log, None).await?;
                info!(request_id = ?plan.request_id, "Request id taken meanwhile, returning that sale");
                self.replay(ctx, &plan).await
            }
            Err(err) => {
                warn!(error = %err, step = %log.current, "Sale creation aborted");
                self.rollback(tx, &log, Some(&err.to_string())).await?;
                Err(err)
            }
        }
    }

    async fn create_steps(
        &self,
        conn: &mut SqliteConnection,
        ctx: &TenantContext,
        plan: &SalePlan,
        now: DateTime<Utc>,
        log: &mut StepLog,
    ) -> WorkflowResult<CreateOutcome> {
        let tenant_id = ctx.tenant_id.as_str();

        log.enter(Step::CheckRequestId);
        if let Some(key) = &plan.request_id {
            if let Some(existing) = sale::find_by_request_id_in(conn, tenant_id, key).await? {
                return Ok(CreateOutcome::Replayed(existing));
            }
        }

        log.enter(Step::VerifyCustomer);
        let customer_exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM customers WHERE id = ?1 AND tenant_id = ?2")
                .bind(&plan.customer_id)
                .bind(tenant_id)
                .fetch_optional(&mut *conn)
                .await?;
        if customer_exists.is_none() {
            return Err(CoreError::CustomerNotFound(plan.customer_id.clone()).into());
        }

        log.enter(Step::VerifyProducts);
        let mut product_names = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            let product = product::find_in(conn, tenant_id, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            if !product.is_active {
                return Err(WorkflowError::StateConflict(format!(
                    "Product {} is inactive",
                    product.name
                )));
            }
            product_names.push(product.name);
        }

        log.enter(Step::AllocateNumber);
        let sequence = sale::next_sale_sequence(conn, tenant_id).await?;

        log.enter(Step::InsertHeader);
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            sale_number: format_sale_number(sequence),
            request_id: plan.request_id.clone(),
            customer_id: plan.customer_id.clone(),
            user_id: ctx.user_id.clone(),
            status: SaleStatus::Finalized,
            gross_total_cents: plan.totals.gross.cents(),
            discount_cents: plan.totals.discount.cents(),
            net_total_cents: plan.totals.net.cents(),
            payment_method: plan.payment_method,
            due_date: plan.due_date,
            payment_terms: plan.payment_terms.clone(),
            notes: plan.notes.clone(),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };
        match sale::insert_header(conn, &sale).await {
            Ok(()) => {}
            Err(err) if is_request_id_conflict(&err) => return Ok(CreateOutcome::RequestIdTaken),
            Err(err) => return Err(err.into()),
        }

        let mut events = vec![ChangeEvent::new(tenant_id, Table::Sales, ChangeKind::Insert, &sale.id)];

        log.enter(Step::InsertItems);
        for (position, (line, name)) in plan.lines.iter().zip(product_names).enumerate() {
            let item = LineItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                product_name: name,
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                subtotal_cents: line.subtotal.cents(),
                position: position as i64,
            };
            sale::insert_item(conn, &item).await?;
            events.push(ChangeEvent::new(tenant_id, Table::SaleItems, ChangeKind::Insert, &item.id));
        }

        if plan.payment_method.is_deferred() {
            log.enter(Step::InsertReceivable);
            let due_date = plan.due_date.ok_or_else(|| ValidationError::required("due_date"))?;
            let receivable = Receivable {
                id: Uuid::new_v4().to_string(),
                tenant_id: ctx.tenant_id.clone(),
                customer_id: Some(plan.customer_id.clone()),
                sale_id: Some(sale.id.clone()),
                description: receivable_description(&sale.sale_number),
                amount_cents: sale.net_total_cents,
                due_date,
                paid_date: None,
                status: AccountStatus::Pending,
                notes: plan.payment_terms.clone(),
                created_at: now,
                updated_at: now,
            };
            receivable::insert(conn, &receivable).await?;
            events.push(ChangeEvent::new(tenant_id, Table::Receivables, ChangeKind::Insert, &receivable.id));
        }

        log.enter(Step::DecrementStock);
        for line in &plan.lines {
            match product::decrement_stock(conn, tenant_id, &line.product_id, line.quantity, now).await? {
                StockUpdate::Applied => {}
                StockUpdate::Insufficient {
                    product_name,
                    available,
                } => {
                    return Err(CoreError::InsufficientStock {
                        product: product_name,
                        available,
                        requested: line.quantity,
                    }
                    .into());
                }
                StockUpdate::NotFound => {
                    return Err(CoreError::ProductNotFound(line.product_id.clone()).into());
                }
            }
            events.push(ChangeEvent::new(tenant_id, Table::Products, ChangeKind::Update, &line.product_id));
        }

        Ok(CreateOutcome::Created { sale, events })
    }

    /// Loads the sale that won a request-id race.
    async fn replay(&self, ctx: &TenantContext, plan: &SalePlan) -> WorkflowResult<Sale> {
        let key = plan
            .request_id
            .as_deref()
            .ok_or_else(|| WorkflowError::StateConflict("duplicate sale".to_string()))?;
        let mut conn = self.pool.acquire().await?;
        sale::find_by_request_id_in(&mut conn, &ctx.tenant_id, key)
            .await?
            .ok_or_else(|| WorkflowError::StateConflict(format!("request {key} is in flight")))
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    pub async fn cancel_sale(&self, ctx: &TenantContext, sale_id: &str) -> WorkflowResult<Sale> {
        self.cancel_sale_at(ctx, sale_id, Utc::now()).await
    }

    /// [`Self::cancel_sale`] with an explicit clock.
    pub async fn cancel_sale_at(
        &self,
        ctx: &TenantContext,
        sale_id: &str,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Sale> {
        debug!(sale_id = %sale_id, "Cancelling sale");

        let mut log = StepLog::new(Operation::CancelSale);
        let mut tx = self.begin().await?;

        match self.cancel_steps(&mut tx, ctx, sale_id, now, &mut log).await {
            Ok((sale, events)) => {
                log.enter(Step::Commit);
                if let Err(e) = tx.commit().await {
                    error!(error = %e, sale_id = %sale_id, "Commit failed while cancelling sale");
                    return Err(log.partial_failure(e.to_string()));
                }

                info!(sale_id = %sale.id, number = %sale.sale_number, "Sale cancelled");
                self.feed.publish_all(events);
                Ok(sale)
            }
            Err(err) => {
                warn!(error = %err, step = %log.current, "Sale cancellation aborted");
                self.rollback(tx, &log, Some(&err.to_string())).await?;
                Err(err)
            }
        }
    }

    async fn cancel_steps(
        &self,
        conn: &mut SqliteConnection,
        ctx: &TenantContext,
        sale_id: &str,
        now: DateTime<Utc>,
        log: &mut StepLog,
    ) -> WorkflowResult<(Sale, Vec<ChangeEvent>)> {
        let tenant_id = ctx.tenant_id.as_str();

        log.enter(Step::LoadSale);
        let current = sale::find_in(conn, tenant_id, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        ensure_cancellable(&current)?;
        let items = sale::items_in(conn, sale_id).await?;

        log.enter(Step::MarkCancelled);
        if !sale::mark_cancelled(conn, tenant_id, sale_id, now).await? {
            // Lost a race with another cancel.
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale_id.to_string(),
                current_status: SaleStatus::Cancelled.to_string(),
                operation: "cancel".to_string(),
            }
            .into());
        }
        let mut events = vec![ChangeEvent::new(tenant_id, Table::Sales, ChangeKind::Update, sale_id)];

        log.enter(Step::RestoreStock);
        for item in &items {
            product::increment_stock(conn, tenant_id, &item.product_id, item.quantity, now).await?;
            events.push(ChangeEvent::new(tenant_id, Table::Products, ChangeKind::Update, &item.product_id));
        }

        if current.payment_method.is_deferred() {
            log.enter(Step::CancelReceivables);
            let touched = receivable::cancel_for_sale(conn, tenant_id, sale_id, now).await?;
            if !touched.kept_paid.is_empty() {
                warn!(
                    sale_id = %sale_id,
                    paid = touched.kept_paid.len(),
                    "Cancelled sale has paid receivables; refund outside the system"
                );
            }
            events.extend(
                touched
                    .cancelled
                    .iter()
                    .map(|id| ChangeEvent::new(tenant_id, Table::Receivables, ChangeKind::Update, id)),
            );
        }

        let cancelled = sale::find_in(conn, tenant_id, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        Ok((cancelled, events))
    }

    // =========================================================================
    // Transaction plumbing
    // =========================================================================

    async fn begin(&self) -> WorkflowResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| WorkflowError::StoreUnavailable(DbError::from(e).to_string()))
    }

    /// A failed rollback turns any failure into a partial one.
    async fn rollback(
        &self,
        tx: Transaction<'static, Sqlite>,
        log: &StepLog,
        cause: Option<&str>,
    ) -> WorkflowResult<()> {
        if let Err(e) = tx.rollback().await {
            error!(error = %e, step = %log.current, "Rollback failed");
            let reason = match cause {
                Some(cause) => format!("{cause}; rollback failed: {e}"),
                None => format!("rollback failed: {e}"),
            };
            return Err(log.partial_failure(reason));
        }
        Ok(())
    }
}

/// `UNIQUE (tenant_id, request_id)` on `sales` was hit.
fn is_request_id_conflict(err: &DbError) -> bool {
    matches!(err, DbError::UniqueViolation { field, .. } if field.contains("request_id"))
}

// =============================================================================
// Unit Tests
// =============================================================================
