//! # Payable Repository
//!
//! Bills the business owes. Editable while pending; paid is terminal.

use bizdesk_core::validation::{normalize_optional, validate_amount_cents, validate_name};
use bizdesk_core::{AccountStatus, Payable, Period, TenantContext};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeEvent, ChangeFeed, ChangeKind, Table};

const PAYABLE_COLUMNS: &str = "id, tenant_id, supplier_id, description, category, amount_cents, \
     due_date, paid_date, status, notes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayableInput {
    #[serde(default)]
    pub supplier_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PayableInput {
    fn validate(mut self) -> DbResult<Self> {
        self.description = validate_name("description", &self.description)?;
        validate_amount_cents(self.amount_cents)?;
        self.supplier_id = normalize_optional(self.supplier_id);
        self.category = normalize_optional(self.category);
        self.notes = normalize_optional(self.notes);
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct PayableRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl PayableRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        PayableRepository { pool, feed }
    }

    pub async fn create(&self, ctx: &TenantContext, input: PayableInput) -> DbResult<Payable> {
        let input = input.validate()?;
        let now = Utc::now();
        let payable = Payable {
            id: Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            supplier_id: input.supplier_id,
            description: input.description,
            category: input.category,
            amount_cents: input.amount_cents,
            due_date: input.due_date,
            paid_date: None,
            status: AccountStatus::Pending,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %payable.id, amount = payable.amount_cents, "Inserting payable");

        sqlx::query(
            r#"
            INSERT INTO payables (
                id, tenant_id, supplier_id, description, category, amount_cents,
                due_date, paid_date, status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&payable.id)
        .bind(&payable.tenant_id)
        .bind(&payable.supplier_id)
        .bind(&payable.description)
        .bind(&payable.category)
        .bind(payable.amount_cents)
        .bind(payable.due_date)
        .bind(payable.paid_date)
        .bind(payable.status)
        .bind(&payable.notes)
        .bind(payable.created_at)
        .bind(payable.updated_at)
        .execute(&self.pool)
        .await?;

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Payables, ChangeKind::Insert, &payable.id));
        Ok(payable)
    }

    pub async fn find(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Payable>> {
        let sql = format!("SELECT {PAYABLE_COLUMNS} FROM payables WHERE id = ?1 AND tenant_id = ?2");
        let payable = sqlx::query_as::<_, Payable>(&sql)
            .bind(id)
            .bind(&ctx.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payable)
    }

    pub async fn get(&self, ctx: &TenantContext, id: &str) -> DbResult<Payable> {
        self.find(ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Payable", id))
    }

    pub async fn list(&self, ctx: &TenantContext, status: Option<AccountStatus>) -> DbResult<Vec<Payable>> {
        let sql = format!(
            "SELECT {PAYABLE_COLUMNS} FROM payables \
             WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2) \
             ORDER BY due_date, description, id"
        );
        let payables = sqlx::query_as::<_, Payable>(&sql)
            .bind(&ctx.tenant_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(payables)
    }

    pub async fn list_open(&self, ctx: &TenantContext) -> DbResult<Vec<Payable>> {
        self.list(ctx, Some(AccountStatus::Pending)).await
    }

    pub async fn paid_in_period(&self, ctx: &TenantContext, period: &Period) -> DbResult<Vec<Payable>> {
        let sql = format!(
            "SELECT {PAYABLE_COLUMNS} FROM payables \
             WHERE tenant_id = ?1 AND status = 'paid' AND paid_date >= ?2 AND paid_date < ?3 \
             ORDER BY paid_date, id"
        );
        let payables = sqlx::query_as::<_, Payable>(&sql)
            .bind(&ctx.tenant_id)
            .bind(period.start)
            .bind(period.end)
            .fetch_all(&self.pool)
            .await?;

        Ok(payables)
    }

    pub async fn update(&self, ctx: &TenantContext, id: &str, input: PayableInput) -> DbResult<Payable> {
        let input = input.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE payables SET
                supplier_id = ?1,
                description = ?2,
                category = ?3,
                amount_cents = ?4,
                due_date = ?5,
                notes = ?6,
                updated_at = ?7
            WHERE id = ?8 AND tenant_id = ?9 AND status = 'pending'
            "#,
        )
        .bind(input.supplier_id)
        .bind(input.description)
        .bind(input.category)
        .bind(input.amount_cents)
        .bind(input.due_date)
        .bind(input.notes)
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get(ctx, id).await?;
            return Err(DbError::conflict("Payable", id, format!("status is {}", current.status)));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Payables, ChangeKind::Update, id));
        self.get(ctx, id).await
    }

    pub async fn mark_paid(&self, ctx: &TenantContext, id: &str, paid_date: NaiveDate) -> DbResult<Payable> {
        debug!(id = %id, paid_date = %paid_date, "Marking payable paid");

        let result = sqlx::query(
            r#"
            UPDATE payables SET status = 'paid', paid_date = ?1, updated_at = ?2
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
            return Err(DbError::conflict("Payable", id, format!("status is {}", current.status)));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Payables, ChangeKind::Update, id));
        self.get(ctx, id).await
    }

    pub async fn delete(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM payables WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(&ctx.tenant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payable", id));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Payables, ChangeKind::Delete, id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn rent(amount_cents: i64) -> PayableInput {
        PayableInput {
            supplier_id: None,
            description: "Shop rent".into(),
            category: Some("rent".into()),
            amount_cents,
            due_date: date(2026, 3, 10),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_update_then_pay() {
        let (db, ctx) = setup().await;
        let repo = db.payables();
        let mut feed = db.change_feed().subscribe();

        let bill = repo.create(&ctx, rent(150_000)).await.unwrap();
        let bill = repo.update(&ctx, &bill.id, rent(160_000)).await.unwrap();
        assert_eq!(bill.amount_cents, 160_000);

        let paid = repo.mark_paid(&ctx, &bill.id, date(2026, 3, 9)).await.unwrap();
        assert_eq!(paid.status, AccountStatus::Paid);
        assert!(matches!(
            repo.update(&ctx, &bill.id, rent(1)).await,
            Err(DbError::Conflict { .. })
        ));

        let event = feed.recv().await.unwrap();
        assert_eq!(event.table, Table::Payables);
        assert_eq!(event.kind, ChangeKind::Insert);
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_touch() {
        let (db, ctx) = setup().await;
        let bill = db.payables().create(&ctx, rent(5_000)).await.unwrap();
        let other = other_tenant();

        assert!(matches!(
            db.payables().mark_paid(&other, &bill.id, date(2026, 3, 9)).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.payables().delete(&other, &bill.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert_eq!(db.payables().list_open(&ctx).await.unwrap().len(), 1);
    }
}
