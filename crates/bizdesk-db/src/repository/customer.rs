//! # Customer Repository
//!
//! Identity fields (name, kind, tax id) freeze once a sale references the
//! customer; contact fields stay editable.

use bizdesk_core::validation::{normalize_optional, validate_email, validate_name};
use bizdesk_core::{Customer, CustomerKind, TenantContext};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeEvent, ChangeFeed, ChangeKind, Table};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub kind: CustomerKind,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Replaces all contact fields; `None` clears one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUpdate {
    pub name: String,
    pub kind: CustomerKind,
    pub tax_id: Option<String>,
}

fn checked_email(email: Option<String>) -> DbResult<Option<String>> {
    let email = normalize_optional(email);
    if let Some(e) = &email {
        validate_email(e)?;
    }
    Ok(email)
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        CustomerRepository { pool, feed }
    }

    pub async fn create(&self, ctx: &TenantContext, input: NewCustomer) -> DbResult<Customer> {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            name: validate_name("name", &input.name)?,
            kind: input.kind,
            tax_id: normalize_optional(input.tax_id),
            email: checked_email(input.email)?,
            phone: normalize_optional(input.phone),
            address: normalize_optional(input.address),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, tenant_id, name, kind, tax_id, email, phone, address,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.tenant_id)
        .bind(&customer.name)
        .bind(customer.kind)
        .bind(&customer.tax_id)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Customers, ChangeKind::Insert, &customer.id));
        Ok(customer)
    }

    pub async fn find(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, tenant_id, name, kind, tax_id, email, phone, address,
                   created_at, updated_at
            FROM customers
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(&ctx.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get(&self, ctx: &TenantContext, id: &str) -> DbResult<Customer> {
        self.find(ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Customers ordered by name, optionally filtered by a name fragment.
    pub async fn list(&self, ctx: &TenantContext, search: Option<&str>) -> DbResult<Vec<Customer>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        debug!(search = ?pattern, "Listing customers");

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, tenant_id, name, kind, tax_id, email, phone, address,
                   created_at, updated_at
            FROM customers
            WHERE tenant_id = ?1 AND (?2 IS NULL OR name LIKE ?2)
            ORDER BY name, id
            "#,
        )
        .bind(&ctx.tenant_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// True when any sale or receivable points at the customer.
    pub async fn is_referenced(&self, ctx: &TenantContext, id: &str) -> DbResult<bool> {
        let referenced: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM sales WHERE customer_id = ?1 AND tenant_id = ?2)
                OR EXISTS (SELECT 1 FROM receivables WHERE customer_id = ?1 AND tenant_id = ?2)
            "#,
        )
        .bind(id)
        .bind(&ctx.tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(referenced != 0)
    }

    /// Always allowed.
    pub async fn update_contact(&self, ctx: &TenantContext, id: &str, input: ContactUpdate) -> DbResult<Customer> {
        debug!(id = %id, "Updating customer contact");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                email = ?1,
                phone = ?2,
                address = ?3,
                updated_at = ?4
            WHERE id = ?5 AND tenant_id = ?6
            "#,
        )
        .bind(checked_email(input.email)?)
        .bind(normalize_optional(input.phone))
        .bind(normalize_optional(input.address))
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Customers, ChangeKind::Update, id));
        self.get(ctx, id).await
    }

    /// Rejected with `Conflict` once the customer appears on a sale.
    pub async fn update_identity(&self, ctx: &TenantContext, id: &str, input: IdentityUpdate) -> DbResult<Customer> {
        let name = validate_name("name", &input.name)?;
        // Existence first, so a missing row reports NotFound.
        self.get(ctx, id).await?;
        if self.is_referenced(ctx, id).await? {
            return Err(DbError::conflict("Customer", id, "referenced by sales"));
        }

        debug!(id = %id, "Updating customer identity");

        sqlx::query(
            r#"
            UPDATE customers SET
                name = ?1,
                kind = ?2,
                tax_id = ?3,
                updated_at = ?4
            WHERE id = ?5 AND tenant_id = ?6
            "#,
        )
        .bind(name)
        .bind(input.kind)
        .bind(normalize_optional(input.tax_id))
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Customers, ChangeKind::Update, id));
        self.get(ctx, id).await
    }

    pub async fn delete(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        if self.is_referenced(ctx, id).await? {
            return Err(DbError::conflict("Customer", id, "referenced by sales or receivables"));
        }

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(&ctx.tenant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        debug!(id = %id, "Deleted customer");
        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Customers, ChangeKind::Delete, id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_create_get_list() {
        let (db, ctx) = setup().await;
        let repo = db.customers();

        let ana = repo
            .create(
                &ctx,
                NewCustomer {
                    name: "  Ana Lima ".into(),
                    email: Some("ana@example.com".into()),
                    phone: Some("".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ana.name, "Ana Lima");
        assert_eq!(ana.phone, None);
        assert_eq!(ana.kind, CustomerKind::Individual);

        repo.create(
            &ctx,
            NewCustomer {
                name: "Acme Ltd".into(),
                kind: CustomerKind::Organization,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let fetched = repo.get(&ctx, &ana.id).await.unwrap();
        assert_eq!(fetched.email.as_deref(), Some("ana@example.com"));

        let all = repo.list(&ctx, None).await.unwrap();
        assert_eq!(all.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["Acme Ltd", "Ana Lima"]);
        assert_eq!(repo.list(&ctx, Some("lim")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let (db, ctx) = setup().await;
        let err = db
            .customers()
            .create(
                &ctx,
                NewCustomer {
                    name: "Ana".into(),
                    email: Some("not-an-email".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(db.customers().list(&ctx, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_tenant_is_not_found() {
        let (db, ctx) = setup().await;
        let customer = create_customer(&db, &ctx, "Ana").await;

        let other = other_tenant();
        assert!(matches!(
            db.customers().get(&other, &customer.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(db.customers().list(&other, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_frozen_once_referenced() {
        let (db, ctx) = setup().await;
        let customer = create_customer(&db, &ctx, "Ana").await;
        let product = create_product(&db, &ctx, "Widget", 10, 0).await;

        // Unreferenced: identity edit allowed.
        let renamed = db
            .customers()
            .update_identity(
                &ctx,
                &customer.id,
                IdentityUpdate {
                    name: "Ana L.".into(),
                    kind: CustomerKind::Individual,
                    tax_id: Some("123".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ana L.");

        sell(&db, &ctx, &customer.id, &product.id, 1).await;

        let err = db
            .customers()
            .update_identity(
                &ctx,
                &customer.id,
                IdentityUpdate {
                    name: "Someone Else".into(),
                    kind: CustomerKind::Organization,
                    tax_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // Contact details stay editable.
        let updated = db
            .customers()
            .update_contact(
                &ctx,
                &customer.id,
                ContactUpdate {
                    phone: Some("555-0100".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert_eq!(updated.name, "Ana L.");

        assert!(matches!(
            db.customers().delete(&ctx, &customer.id).await,
            Err(DbError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_unreferenced() {
        let (db, ctx) = setup().await;
        let customer = create_customer(&db, &ctx, "Ana").await;
        db.customers().delete(&ctx, &customer.id).await.unwrap();
        assert!(db.customers().find(&ctx, &customer.id).await.unwrap().is_none());
        assert!(matches!(
            db.customers().delete(&ctx, &customer.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
