//! # Repository Module
//!
//! One repository per table family, each a cheap handle over the pool.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  command(ctx, input)                                                    │
//! │       │   db.customers().create(&ctx, input)                            │
//! │       ▼                                                                 │
//! │  XRepository                                                            │
//! │  ├── validate input (bizdesk-core::validation)  → DbError::Validation   │
//! │  ├── SQL with `tenant_id = ?` on every statement                        │
//! │  ├── rows decoded into typed entities (FromRow)                         │
//! │  └── ChangeFeed::publish after the write                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales have no write methods here: sale headers, line items, stock and
//! sale-linked receivables only change through [`crate::workflow`].
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`]
//! - [`supplier::SupplierRepository`]
//! - [`product::ProductRepository`]
//! - [`sale::SaleRepository`] (read-only)
//! - [`receivable::ReceivableRepository`]
//! - [`payable::PayableRepository`]

pub mod customer;
pub mod payable;
pub mod product;
pub mod receivable;
pub mod sale;
pub mod supplier;
