//! # bizdesk-db: Database Layer for BizDesk
//!
//! SQLite storage for the back-office: tenant-scoped repositories, the sale
//! workflow, embedded migrations and an in-process change feed.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BizDesk Data Flow                                │
//! │                                                                         │
//! │  backoffice command (create_sale, compute_cash_flow, ...)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    bizdesk-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐    │   │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations  │    │   │
//! │  │   │   (pool.rs)   │   │  customer      │   │  (embedded)  │    │   │
//! │  │   │               │◄──│  product, sale │   │ 001_init.sql │    │   │
//! │  │   │  SqlitePool   │   │  receivable... │   └──────────────┘    │   │
//! │  │   │  ChangeFeed   │   ├────────────────┤                       │   │
//! │  │   │               │◄──│  SaleWorkflow  │  one tx per sale      │   │
//! │  │   └───────────────┘   └────────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (path from backoffice config)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-entity repositories
//! - [`workflow`] - Sale create/cancel orchestration
//! - [`notify`] - Change notifications for cache invalidation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bizdesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("bizdesk.db")).await?;
//! let sale = db.sale_workflow(Some(30)).create_sale(&ctx, &draft).await?;
//! let low = db.products().low_stock(&ctx).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod notify;
pub mod pool;
pub mod repository;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use notify::{ChangeEvent, ChangeFeed, ChangeKind, Table};
pub use pool::{Database, DbConfig};
pub use workflow::{SaleWorkflow, StepLog, WorkflowError, WorkflowResult};

// Repository re-exports for convenience
pub use repository::customer::{ContactUpdate, CustomerRepository, IdentityUpdate, NewCustomer};
pub use repository::payable::{PayableInput, PayableRepository};
pub use repository::product::{ProductInput, ProductRepository};
pub use repository::receivable::{ReceivableInput, ReceivableRepository};
pub use repository::sale::SaleRepository;
pub use repository::supplier::{SupplierInput, SupplierRepository};

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use bizdesk_core::sale::{LineItemDraft, SaleDraft};
    use bizdesk_core::{Customer, PaymentMethod, Product, Sale, TenantContext, DEFAULT_TENANT_ID};
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::repository::customer::NewCustomer;
    use crate::repository::product::ProductInput;
    use crate::{Database, DbConfig};

    pub async fn setup() -> (Database, TenantContext) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ctx = TenantContext::new(DEFAULT_TENANT_ID, Uuid::new_v4().to_string()).unwrap();
        (db, ctx)
    }

    pub fn other_tenant() -> TenantContext {
        TenantContext::new(Uuid::new_v4().to_string(), Uuid::new_v4().to_string()).unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub async fn create_customer(db: &Database, ctx: &TenantContext, name: &str) -> Customer {
        db.customers()
            .create(
                ctx,
                NewCustomer {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    /// Costs 6.00, sells for 10.00.
    pub async fn create_product(db: &Database, ctx: &TenantContext, name: &str, stock: i64, min: i64) -> Product {
        db.products()
            .create(
                ctx,
                ProductInput {
                    name: name.to_string(),
                    cost_price_cents: 600,
                    sale_price_cents: 1000,
                    current_stock: stock,
                    min_stock: min,
                    ..ProductInput::default()
                },
            )
            .await
            .unwrap()
    }

    async fn sell_with(
        db: &Database,
        ctx: &TenantContext,
        customer_id: &str,
        product_id: &str,
        quantity: i64,
        method: PaymentMethod,
    ) -> Sale {
        let product = db.products().get(ctx, product_id).await.unwrap();
        let draft = SaleDraft {
            customer_id: customer_id.to_string(),
            items: vec![LineItemDraft {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents: product.sale_price_cents,
            }],
            discount_cents: 0,
            payment_method: method,
            due_date: None,
            payment_terms: None,
            notes: None,
            request_id: None,
        };
        db.sale_workflow(Some(30)).create_sale(ctx, &draft).await.unwrap()
    }

    /// Instant-payment sale at catalog price.
    pub async fn sell(db: &Database, ctx: &TenantContext, customer_id: &str, product_id: &str, quantity: i64) -> Sale {
        sell_with(db, ctx, customer_id, product_id, quantity, PaymentMethod::Instant).await
    }

    /// Deferred sale due in 30 days.
    pub async fn sell_deferred(
        db: &Database,
        ctx: &TenantContext,
        customer_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Sale {
        sell_with(db, ctx, customer_id, product_id, quantity, PaymentMethod::Deferred).await
    }
}
