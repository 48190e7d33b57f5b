//! # Sale Repository
//!
//! Read side of sales. Headers, line items and the stock they move are
//! written only by [`crate::workflow::SaleWorkflow`], which uses the
//! `pub(crate)` transaction helpers at the bottom of this file.

use bizdesk_core::{LineItem, Period, RecentSale, Sale, SaleDetail, TenantContext};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

const SALE_COLUMNS: &str = "id, tenant_id, sale_number, request_id, customer_id, user_id, status, \
     gross_total_cents, discount_cents, net_total_cents, payment_method, due_date, \
     payment_terms, notes, created_at, updated_at, cancelled_at";

const ITEM_COLUMNS: &str =
    "sale_items.id, sale_items.sale_id, sale_items.product_id, sale_items.product_name, \
     sale_items.quantity, sale_items.unit_price_cents, sale_items.subtotal_cents, sale_items.position";

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn find(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1 AND tenant_id = ?2");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .bind(&ctx.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    pub async fn get(&self, ctx: &TenantContext, id: &str) -> DbResult<Sale> {
        self.find(ctx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    pub async fn find_by_request_id(&self, ctx: &TenantContext, request_id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE request_id = ?1 AND tenant_id = ?2");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(request_id)
            .bind(&ctx.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Line items of one sale, in entry order.
    pub async fn items(&self, ctx: &TenantContext, sale_id: &str) -> DbResult<Vec<LineItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items \
             JOIN sales ON sales.id = sale_items.sale_id \
             WHERE sale_items.sale_id = ?1 AND sales.tenant_id = ?2 \
             ORDER BY sale_items.position"
        );
        let items = sqlx::query_as::<_, LineItem>(&sql)
            .bind(sale_id)
            .bind(&ctx.tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Header, customer name and line items.
    pub async fn detail(&self, ctx: &TenantContext, id: &str) -> DbResult<SaleDetail> {
        let sale = self.get(ctx, id).await?;

        let customer_name: String = sqlx::query_scalar(
            "SELECT name FROM customers WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(&sale.customer_id)
        .bind(&ctx.tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .unwrap_or_default();

        let items = self.items(ctx, id).await?;

        Ok(SaleDetail {
            sale,
            customer_name,
            items,
        })
    }

    /// Every sale (any status) created inside the period, newest first.
    pub async fn list_in_period(&self, ctx: &TenantContext, period: &Period) -> DbResult<Vec<Sale>> {
        debug!(start = %period.start, end = %period.end, "Listing sales in period");

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE tenant_id = ?1 AND created_at >= ?2 AND created_at < ?3 \
             ORDER BY created_at DESC, id"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(&ctx.tenant_id)
            .bind(period.start_instant())
            .bind(period.end_instant())
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Line items of every sale created inside the period.
    pub async fn items_in_period(&self, ctx: &TenantContext, period: &Period) -> DbResult<Vec<LineItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items \
             JOIN sales ON sales.id = sale_items.sale_id \
             WHERE sales.tenant_id = ?1 AND sales.created_at >= ?2 AND sales.created_at < ?3 \
             ORDER BY sale_items.sale_id, sale_items.position"
        );
        let items = sqlx::query_as::<_, LineItem>(&sql)
            .bind(&ctx.tenant_id)
            .bind(period.start_instant())
            .bind(period.end_instant())
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Line items for an explicit set of sales. Ids from other tenants are
    /// silently skipped.
    pub async fn items_for_sales(&self, ctx: &TenantContext, sale_ids: &[String]) -> DbResult<Vec<LineItem>> {
        if sale_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items \
             JOIN sales ON sales.id = sale_items.sale_id \
             WHERE sales.tenant_id = "
        ));
        qb.push_bind(&ctx.tenant_id);
        qb.push(" AND sale_items.sale_id IN (");
        let mut ids = qb.separated(", ");
        for id in sale_ids {
            ids.push_bind(id);
        }
        ids.push_unseparated(") ORDER BY sale_items.sale_id, sale_items.position");

        let items = qb.build_query_as::<LineItem>().fetch_all(&self.pool).await?;
        Ok(items)
    }

    /// Latest finalized sales with their customer's name.
    pub async fn recent_finalized(&self, ctx: &TenantContext, limit: u32) -> DbResult<Vec<RecentSale>> {
        let recent = sqlx::query_as::<_, RecentSale>(
            r#"
            SELECT sales.id, sales.sale_number, customers.name AS customer_name,
                   sales.net_total_cents, sales.payment_method, sales.created_at
            FROM sales
            JOIN customers ON customers.id = sales.customer_id
            WHERE sales.tenant_id = ?1 AND sales.status = 'finalized'
            ORDER BY sales.created_at DESC, sales.id
            LIMIT ?2
            "#,
        )
        .bind(&ctx.tenant_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(recent)
    }
}

// =============================================================================
// Transaction-scoped operations (sale workflow only)
// =============================================================================

pub(crate) async fn find_in(conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1 AND tenant_id = ?2");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

pub(crate) async fn find_by_request_id_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    request_id: &str,
) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE request_id = ?1 AND tenant_id = ?2");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(request_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

pub(crate) async fn items_in(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<LineItem>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_items.sale_id = ?1 ORDER BY sale_items.position"
    );
    let items = sqlx::query_as::<_, LineItem>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

/// Bumps the tenant's display counter and returns the new value.
pub(crate) async fn next_sale_sequence(conn: &mut SqliteConnection, tenant_id: &str) -> DbResult<i64> {
    let next: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sale_counters (tenant_id, last_value) VALUES (?1, 1)
        ON CONFLICT (tenant_id) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(tenant_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(next)
}

pub(crate) async fn insert_header(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, tenant_id, sale_number, request_id, customer_id, user_id, status,
            gross_total_cents, discount_cents, net_total_cents, payment_method,
            due_date, payment_terms, notes, created_at, updated_at, cancelled_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.tenant_id)
    .bind(&sale.sale_number)
    .bind(&sale.request_id)
    .bind(&sale.customer_id)
    .bind(&sale.user_id)
    .bind(sale.status)
    .bind(sale.gross_total_cents)
    .bind(sale.discount_cents)
    .bind(sale.net_total_cents)
    .bind(sale.payment_method)
    .bind(sale.due_date)
    .bind(&sale.payment_terms)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .bind(sale.cancelled_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &LineItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, product_name, quantity,
            unit_price_cents, subtotal_cents, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.subtotal_cents)
    .bind(item.position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Finalized → cancelled. Returns false when the sale was no longer
/// finalized.
pub(crate) async fn mark_cancelled(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    sale_id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sales
        SET status = 'cancelled', cancelled_at = ?1, updated_at = ?1
        WHERE id = ?2 AND tenant_id = ?3 AND status = 'finalized'
        "#,
    )
    .bind(now)
    .bind(sale_id)
    .bind(tenant_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
