//! # Receivable Repository
//!
//! Manual receivables are fully editable while pending. Receivables created
//! by a deferred sale belong to that sale: they can be marked paid, but only
//! the sale workflow may cancel them, and they cannot be edited or deleted.

use bizdesk_core::validation::{normalize_optional, validate_amount_cents, validate_name};
use bizdesk_core::{AccountStatus, Period, Receivable, TenantContext};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeEvent, ChangeFeed, ChangeKind, Table};

const RECEIVABLE_COLUMNS: &str = "id, tenant_id, customer_id, sale_id, description, amount_cents, \
     due_date, paid_date, status, notes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivableInput {
    pub customer_id: Option<String>,
    pub description: String,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReceivableInput {
    fn validate(mut self) -> DbResult<Self> {
        self.description = validate_name("description", &self.description)?;
        validate_amount_cents(self.amount_cents)?;
        self.customer_id = normalize_optional(self.customer_id);
        self.notes = normalize_optional(self.notes);
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct ReceivableRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ReceivableRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ReceivableRepository { pool, feed }
    }

    pub async fn create(&self, ctx: &TenantContext, input: ReceivableInput) -> DbResult<Receivable> {
        let input = input.validate()?;
        let now = Utc::now();
        let receivable = Receivable {
            id: Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            customer_id: input.customer_id,
            sale_id: None,
            description: input.description,
            amount_cents: input.amount_cents,
            due_date: input.due_date,
            paid_date: None,
            status: AccountStatus::Pending,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %receivable.id, amount = receivable.amount_cents, "Inserting receivable");

        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, &receivable).await?;

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Receivables, ChangeKind::Insert, &receivable.id));
        Ok(receivable)
    }

    pub async fn find(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Receivable>> {
        let sql = format!("SELECT {RECEIVABLE_COLUMNS} FROM receivables WHERE id = ?1 AND tenant_id = ?2");
        let receivable = sqlx::query_as::<_, Receivable>(&sql)
            .bind(id)
            .bind(&ctx.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(receivable)
    }

    pub async fn get(&self, ctx: &TenantContext, id: &str) -> DbResult<Receivable> {
        self.find(ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Receivable", id))
    }

    /// Ordered by due date; `status` narrows the list.
    pub async fn list(&self, ctx: &TenantContext, status: Option<AccountStatus>) -> DbResult<Vec<Receivable>> {
        let sql = format!(
            "SELECT {RECEIVABLE_COLUMNS} FROM receivables \
             WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2) \
             ORDER BY due_date, description, id"
        );
        let receivables = sqlx::query_as::<_, Receivable>(&sql)
            .bind(&ctx.tenant_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(receivables)
    }

    pub async fn list_open(&self, ctx: &TenantContext) -> DbResult<Vec<Receivable>> {
        self.list(ctx, Some(AccountStatus::Pending)).await
    }

    /// Receivables settled inside the period, by paid date.
    pub async fn paid_in_period(&self, ctx: &TenantContext, period: &Period) -> DbResult<Vec<Receivable>> {
        let sql = format!(
            "SELECT {RECEIVABLE_COLUMNS} FROM receivables \
             WHERE tenant_id = ?1 AND status = 'paid' AND paid_date >= ?2 AND paid_date < ?3 \
             ORDER BY paid_date, id"
        );
        let receivables = sqlx::query_as::<_, Receivable>(&sql)
            .bind(&ctx.tenant_id)
            .bind(period.start)
            .bind(period.end)
            .fetch_all(&self.pool)
            .await?;

        Ok(receivables)
    }

    pub async fn for_sale(&self, ctx: &TenantContext, sale_id: &str) -> DbResult<Vec<Receivable>> {
        let sql = format!(
            "SELECT {RECEIVABLE_COLUMNS} FROM receivables \
             WHERE tenant_id = ?1 AND sale_id = ?2 ORDER BY created_at, id"
        );
        let receivables = sqlx::query_as::<_, Receivable>(&sql)
            .bind(&ctx.tenant_id)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(receivables)
    }

    /// Pending, manual receivables only.
    pub async fn update(&self, ctx: &TenantContext, id: &str, input: ReceivableInput) -> DbResult<Receivable> {
        let input = input.validate()?;
        let current = self.get(ctx, id).await?;
        if current.sale_id.is_some() {
            return Err(DbError::conflict("Receivable", id, "created by a sale"));
        }

        let result = sqlx::query(
            r#"
            UPDATE receivables SET
                customer_id = ?1,
                description = ?2,
                amount_cents = ?3,
                due_date = ?4,
                notes = ?5,
                updated_at = ?6
            WHERE id = ?7 AND tenant_id = ?8 AND status = 'pending'
            "#,
        )
        .bind(input.customer_id)
        .bind(input.description)
        .bind(input.amount_cents)
        .bind(input.due_date)
        .bind(input.notes)
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Receivable", id, format!("status is {}", current.status)));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Receivables, ChangeKind::Update, id));
        self.get(ctx, id).await
    }

    /// Pending → paid.
    pub async fn mark_paid(&self, ctx: &TenantContext, id: &str, paid_date: NaiveDate) -> DbResult<Receivable> {
        debug!(id = %id, paid_date = %paid_date, "Marking receivable paid");

        let result = sqlx::query(
            r#"
            UPDATE receivables SET status = 'paid', paid_date = ?1, updated_at = ?2
            WHERE id = ?3 AND tenant_id = ?4 AND status = 'pending'
            "#,
        )
        .bind(paid_date)
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get(ctx, id).await?;
            return Err(DbError::conflict("Receivable", id, format!("status is {}", current.status)));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Receivables, ChangeKind::Update, id));
        self.get(ctx, id).await
    }

    /// Manual receivables only.
    pub async fn delete(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        let current = self.get(ctx, id).await?;
        if current.sale_id.is_some() {
            return Err(DbError::conflict("Receivable", id, "created by a sale"));
        }

        sqlx::query("DELETE FROM receivables WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(&ctx.tenant_id)
            .execute(&self.pool)
            .await?;

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Receivables, ChangeKind::Delete, id));
        Ok(())
    }
}

// =============================================================================
// Transaction-scoped operations (sale workflow only)
// =============================================================================

pub(crate) async fn insert(conn: &mut SqliteConnection, receivable: &Receivable) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO receivables (
            id, tenant_id, customer_id, sale_id, description, amount_cents,
            due_date, paid_date, status, notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&receivable.id)
    .bind(&receivable.tenant_id)
    .bind(&receivable.customer_id)
    .bind(&receivable.sale_id)
    .bind(&receivable.description)
    .bind(receivable.amount_cents)
    .bind(receivable.due_date)
    .bind(receivable.paid_date)
    .bind(receivable.status)
    .bind(&receivable.notes)
    .bind(receivable.created_at)
    .bind(receivable.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Ids touched by [`cancel_for_sale`].
#[derive(Debug, Default)]
pub(crate) struct CancelledReceivables {
    pub cancelled: Vec<String>,
    /// Already paid; left as they are.
    pub kept_paid: Vec<String>,
}

/// Cancels the sale's pending receivables. Paid ones are terminal and stay
/// paid.
pub(crate) async fn cancel_for_sale(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    sale_id: &str,
    now: DateTime<Utc>,
) -> DbResult<CancelledReceivables> {
    let linked: Vec<(String, AccountStatus)> = sqlx::query_as(
        "SELECT id, status FROM receivables WHERE tenant_id = ?1 AND sale_id = ?2",
    )
    .bind(tenant_id)
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut outcome = CancelledReceivables::default();
    for (id, status) in linked {
        match status {
            AccountStatus::Pending => {
                sqlx::query(
                    "UPDATE receivables SET status = 'cancelled', updated_at = ?1 WHERE id = ?2 AND status = 'pending'",
                )
                .bind(now)
                .bind(&id)
                .execute(&mut *conn)
                .await?;
                outcome.cancelled.push(id);
            }
            AccountStatus::Paid => {
                warn!(sale_id = %sale_id, receivable_id = %id, "Receivable already paid, left unchanged");
                outcome.kept_paid.push(id);
            }
            AccountStatus::Cancelled => {}
        }
    }

    Ok(outcome)
}
