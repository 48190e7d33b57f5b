//! # bizdesk-core: Pure Business Logic for BizDesk
//!
//! Domain types and every rule that can be decided without I/O: money
//! arithmetic, input validation, sale totals and status rules, reporting
//! periods, and the financial aggregation engine.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BizDesk Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Presentation (TypeScript, out of tree)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   apps/backoffice: commands, config, cached cash-flow view      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   bizdesk-db: SQLite repositories, sale workflow, change feed   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bizdesk-core (THIS CRATE) ★                     │   │
//! │  │   types · money · validation · sale · period · reports          │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity rows (Customer, Product, Sale, LineItem, ...)
//! - [`money`] - Integer-cents money type
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level input checks
//! - [`sale`] - Sale drafts, totals, due dates, cancel rules
//! - [`period`] - Half-open date ranges for reports
//! - [`tenant`] - Explicit tenant/user context
//! - [`reports`] - Snapshot, growth, rankings, cash flow, dashboard
//!
//! ## Example
//!
//! ```rust
//! use bizdesk_core::sale::SaleTotals;
//!
//! // 2 × 10.00 + 1 × 5.00, minus 3.00 discount
//! let totals = SaleTotals::compute(&[(2, 1000), (1, 500)], 300).unwrap();
//! assert_eq!(totals.gross.cents(), 2500);
//! assert_eq!(totals.net.cents(), 2200);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod period;
pub mod reports;
pub mod sale;
pub mod tenant;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError, ValidationResult};
pub use money::Money;
pub use period::{Period, PeriodPreset};
pub use tenant::TenantContext;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by single-company installs.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum line items in a single sale.
pub const MAX_LINE_ITEMS: usize = 200;

/// Maximum quantity on a single line.
///
/// Catches typos like 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;
