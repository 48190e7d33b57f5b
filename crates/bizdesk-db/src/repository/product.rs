//! # Product Repository
//!
//! Catalog CRUD through the pool, plus the stock counters the sale workflow
//! moves inside its own transaction.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrement_stock(conn, product, q)                                      │
//! │                                                                         │
//! │    UPDATE products SET current_stock = current_stock - q                │
//! │    WHERE id = ? AND tenant_id = ? AND current_stock >= q                │
//! │                                                                         │
//! │    1 row  ─► Applied                                                    │
//! │    0 rows ─► re-read: row missing ─► NotFound                           │
//! │                       row present ─► Insufficient { available }         │
//! │                                                                         │
//! │  Read and write are one statement, so two concurrent sales can never   │
//! │  both take the last unit.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bizdesk_core::validation::{
    normalize_optional, validate_name, validate_non_negative_cents, validate_product_code,
    validate_stock,
};
use bizdesk_core::{Product, TenantContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeEvent, ChangeFeed, ChangeKind, Table};

const PRODUCT_COLUMNS: &str = "id, tenant_id, name, code, description, unit, cost_price_cents, \
     sale_price_cents, current_stock, min_stock, supplier_id, is_active, created_at, updated_at";

/// Catalog fields for create and full update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductInput {
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: String,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
    /// Inventory count; an update overwrites it (stock take).
    pub current_stock: i64,
    pub min_stock: i64,
    pub supplier_id: Option<String>,
    pub is_active: bool,
}

impl Default for ProductInput {
    fn default() -> Self {
        ProductInput {
            name: String::new(),
            code: None,
            description: None,
            unit: "un".to_string(),
            cost_price_cents: 0,
            sale_price_cents: 0,
            current_stock: 0,
            min_stock: 0,
            supplier_id: None,
            is_active: true,
        }
    }
}

impl ProductInput {
    fn validate(mut self) -> DbResult<Self> {
        self.name = validate_name("name", &self.name)?;
        self.code = normalize_optional(self.code);
        if let Some(code) = &self.code {
            validate_product_code(code)?;
        }
        self.description = normalize_optional(self.description);
        self.unit = match normalize_optional(Some(self.unit)) {
            Some(unit) => unit,
            None => "un".to_string(),
        };
        validate_non_negative_cents("cost_price", self.cost_price_cents)?;
        validate_non_negative_cents("sale_price", self.sale_price_cents)?;
        validate_stock("current_stock", self.current_stock)?;
        validate_stock("min_stock", self.min_stock)?;
        self.supplier_id = normalize_optional(self.supplier_id);
        Ok(self)
    }
}

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockUpdate {
    Applied,
    Insufficient { product_name: String, available: i64 },
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ProductRepository { pool, feed }
    }

    pub async fn create(&self, ctx: &TenantContext, input: ProductInput) -> DbResult<Product> {
        let input = input.validate()?;
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            name: input.name,
            code: input.code,
            description: input.description,
            unit: input.unit,
            cost_price_cents: input.cost_price_cents,
            sale_price_cents: input.sale_price_cents,
            current_stock: input.current_stock,
            min_stock: input.min_stock,
            supplier_id: input.supplier_id,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, code, description, unit,
                cost_price_cents, sale_price_cents, current_stock, min_stock,
                supplier_id, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(&product.code)
        .bind(&product.description)
        .bind(&product.unit)
        .bind(product.cost_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.current_stock)
        .bind(product.min_stock)
        .bind(&product.supplier_id)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Products, ChangeKind::Insert, &product.id));
        Ok(product)
    }

    pub async fn find(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(&ctx.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    pub async fn get(&self, ctx: &TenantContext, id: &str) -> DbResult<Product> {
        self.find(ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Products ordered by name; inactive ones only when asked for.
    pub async fn list(&self, ctx: &TenantContext, include_inactive: bool) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE tenant_id = ?1 AND (?2 OR is_active = 1) \
             ORDER BY name, id"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&ctx.tenant_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Active products at or below their minimum, emptiest first.
    pub async fn low_stock(&self, ctx: &TenantContext) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE tenant_id = ?1 AND is_active = 1 AND current_stock <= min_stock \
             ORDER BY current_stock, name, id"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&ctx.tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    pub async fn update(&self, ctx: &TenantContext, id: &str, input: ProductInput) -> DbResult<Product> {
        let input = input.validate()?;
        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?1,
                code = ?2,
                description = ?3,
                unit = ?4,
                cost_price_cents = ?5,
                sale_price_cents = ?6,
                current_stock = ?7,
                min_stock = ?8,
                supplier_id = ?9,
                is_active = ?10,
                updated_at = ?11
            WHERE id = ?12 AND tenant_id = ?13
            "#,
        )
        .bind(input.name)
        .bind(input.code)
        .bind(input.description)
        .bind(input.unit)
        .bind(input.cost_price_cents)
        .bind(input.sale_price_cents)
        .bind(input.current_stock)
        .bind(input.min_stock)
        .bind(input.supplier_id)
        .bind(input.is_active)
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Products, ChangeKind::Update, id));
        self.get(ctx, id).await
    }

    /// Soft delete. Past line items keep pointing at the row.
    pub async fn deactivate(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND tenant_id = ?3",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(&ctx.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.feed.publish(ChangeEvent::new(&ctx.tenant_id, Table::Products, ChangeKind::Update, id));
        Ok(())
    }
}

// =============================================================================
// Transaction-scoped operations (sale workflow only)
// =============================================================================

pub(crate) async fn find_in(conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

pub(crate) async fn decrement_stock(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<StockUpdate> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET current_stock = current_stock - ?1, updated_at = ?2
        WHERE id = ?3 AND tenant_id = ?4 AND current_stock >= ?1
        "#,
    )
    .bind(quantity)
    .bind(now)
    .bind(product_id)
    .bind(tenant_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(StockUpdate::Applied);
    }

    match find_in(conn, tenant_id, product_id).await? {
        Some(p) => Ok(StockUpdate::Insufficient {
            product_name: p.name,
            available: p.current_stock,
        }),
        None => Ok(StockUpdate::NotFound),
    }
}

pub(crate) async fn increment_stock(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET current_stock = current_stock + ?1, updated_at = ?2
        WHERE id = ?3 AND tenant_id = ?4
        "#,
    )
    .bind(quantity)
    .bind(now)
    .bind(product_id)
    .bind(tenant_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }

    Ok(())
}
