//! # backoffice: BizDesk Command Layer
//!
//! What the presentation layer talks to: configuration, shared state,
//! command functions and the error type they return.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. init_tracing()            RUST_LOG or "info,bizdesk=debug,..."      │
//! │  2. AppConfig::load()         defaults → bizdesk.toml → BIZDESK_* env   │
//! │  3. AppState::open()          SQLite file, migrations, change feed      │
//! │  4. commands::*               called with (&AppState, &TenantContext)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod state;

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages everywhere
/// - `RUST_LOG=bizdesk_db=trace` - Trace the store only
/// - Default: INFO, with DEBUG for the bizdesk crates and the command layer
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bizdesk=debug,backoffice=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
