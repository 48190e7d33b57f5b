//! # Commands
//!
//! The functions the presentation layer calls.
//!
//! ## Command Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sale.rs      create_sale, cancel_sale, get_sale, list_sales            │
//! │  report.rs    compute_monthly_snapshot, compute_growth_series,          │
//! │               compute_top_products, compute_product_margins,            │
//! │               list_low_stock, dashboard                                 │
//! │  finance.rs   compute_cash_flow (cached), receivables, payables         │
//! │  catalog.rs   customers, suppliers, products                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command takes the shared [`AppState`](crate::state::AppState) and
//! an explicit [`TenantContext`](bizdesk_core::TenantContext), and returns
//! `Result<T, ApiError>`.

pub mod catalog;
pub mod finance;
pub mod report;
pub mod sale;
