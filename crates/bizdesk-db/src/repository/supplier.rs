//! # Supplier Repository
//!
//! Deleting a supplier unlinks its products and payables (ON DELETE SET NULL).

use bizdesk_core::validation::{normalize_optional, validate_email, validate_name};
use bizdesk_core::{Supplier, TenantContext};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeEvent, ChangeFeed, ChangeKind, Table};

/// Create and full-replace payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub tax_id: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

struct CleanSupplier {
    name: String,
    tax_id: Option<String>,
    contact_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
}

impl SupplierInput {
    fn clean(self) -> DbResult<CleanSupplier> {
        let email = normalize_optional(self.email);
        if let Some(e) = &email {
            validate_email(e)?;
        }
        Ok(CleanSupplier {
            name: validate_name("name", &self.name)?,
            tax_id: normalize_optional(self.tax_id),
            contact_name: normalize_optional(self.contact_name),
            email,
            phone: normalize_optional(self.phone),
            address: normalize_optional(self.address),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        SupplierRepository { pool, feed }
    }

    pub async fn create(&self, ctx: &TenantContext, input: SupplierInput) -> DbResult<Supplier> {
        let clean = input.clean()?;
        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            name: clean.name,
            tax_id: clean.tax_id,
            contact_name: clean.contact_name,
            email: clean.email,
            phone: clean.phone,
            address: clean.address,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %supplier.id, name = %supplier.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, tenant_id, name, tax_id, contact_name, email, phone, address,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.tenant_id)
        .bind(&supplier.name)
        .bind(&supplier.tax_id)
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Suppliers, ChangeKind::Insert, &supplier.id));
        Ok(supplier)
    }

    pub async fn find(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, tenant_id, name, tax_id, contact_name, email, phone, address,
                   created_at, updated_at
            FROM suppliers
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(&ctx.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn get(&self, ctx: &TenantContext, id: &str) -> DbResult<Supplier> {
        self.find(ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn list(&self, ctx: &TenantContext) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, tenant_id, name, tax_id, contact_name, email, phone, address,
                   created_at, updated_at
            FROM suppliers
            WHERE tenant_id = ?1
            ORDER BY name, id
            "#,
        )
        .bind(&ctx.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    pub async fn update(&self, ctx: &TenantContext, id: &str, input: SupplierInput) -> DbResult<Supplier> {
        let clean = input.clean()?;

        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?1,
                tax_id = ?2,
                contact_name = ?3,
                email = ?4,
                phone = ?5,
                address = ?6,
                updated_at = ?7
            WHERE id = ?8 AND tenant_id = ?9
            "#,
        )
        .bind(clean.name)
        .bind(clean.tax_id)
        .bind(clean.contact_name)
        .bind(clean.email)
        .bind(clean.phone)
        .bind(clean.address)
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Suppliers, ChangeKind::Update, id));
        self.get(ctx, id).await
    }

    pub async fn delete(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(&ctx.tenant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Suppliers, ChangeKind::Delete, id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::ProductInput;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_crud_and_unlink_on_delete() {
        let (db, ctx) = setup().await;
        let repo = db.suppliers();

        let supplier = repo
            .create(
                &ctx,
                SupplierInput {
                    name: "Distribuidora Sul".into(),
                    contact_name: Some("Rita".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let updated = repo
            .update(
                &ctx,
                &supplier.id,
                SupplierInput {
                    name: "Distribuidora Sul Ltda".into(),
                    email: Some("vendas@sul.example".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Distribuidora Sul Ltda");
        assert_eq!(updated.contact_name, None);

        let product = db
            .products()
            .create(
                &ctx,
                ProductInput {
                    name: "Widget".into(),
                    supplier_id: Some(supplier.id.clone()),
                    ..ProductInput::default()
                },
            )
            .await
            .unwrap();

        repo.delete(&ctx, &supplier.id).await.unwrap();
        assert!(repo.list(&ctx).await.unwrap().is_empty());

        let product = db.products().get(&ctx, &product.id).await.unwrap();
        assert_eq!(product.supplier_id, None);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (db, ctx) = setup().await;
        let err = db
            .suppliers()
            .update(
                &ctx,
                "00000000-0000-4000-8000-00000000dead",
                SupplierInput {
                    name: "X".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
