//! # State Module
//!
//! Everything a command needs, shared behind one cheap-to-clone handle.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           AppState                                      │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌────────────────────────┐    │
//! │  │   Database   │  │    AppConfig     │  │    CashFlowCache       │    │
//! │  │  (SQLite     │  │  finance windows │  │  Arc<Mutex<HashMap>>   │    │
//! │  │   pool +     │  │  due-day default │  │  keyed (tenant, period)│    │
//! │  │   feed)      │  │  store display   │  │                        │    │
//! │  └──────┬───────┘  └──────────────────┘  └───────────▲────────────┘    │
//! │         │ ChangeFeed                                 │                  │
//! │         └──────────► invalidator task ───────────────┘                  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database: internal connection pool                                  │
//! │  • AppConfig: read-only after startup                                  │
//! │  • CashFlowCache: Mutex, held only for map operations                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cache;

pub use cache::{CashFlowCache, Invalidator};

use std::sync::Arc;

use bizdesk_db::{Database, DbConfig, SaleWorkflow};
use tracing::info;

use crate::config::AppConfig;
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    config: Arc<AppConfig>,
    cash_flow: CashFlowCache,
    /// Listener stops when the last clone of this state is dropped.
    _invalidator: Arc<Invalidator>,
}

impl AppState {
    /// Wires the cache to the database's change feed.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(db: Database, config: AppConfig) -> Self {
        let cash_flow = CashFlowCache::new(db.change_feed().clone());
        let invalidator = cash_flow.spawn_invalidator();

        AppState {
            db,
            config: Arc::new(config),
            cash_flow,
            _invalidator: Arc::new(invalidator),
        }
    }

    /// Opens the configured database, applying migrations.
    pub async fn open(config: AppConfig) -> Result<Self, ApiError> {
        let path = config.database_path()?;
        info!(?path, "Opening database");

        let db = Database::new(DbConfig::new(path).max_connections(config.database.max_connections)).await?;
        Ok(Self::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cash_flow_cache(&self) -> &CashFlowCache {
        &self.cash_flow
    }

    /// Sale orchestration with the configured due-date default.
    pub fn sale_workflow(&self) -> SaleWorkflow {
        self.db.sale_workflow(self.config.finance.due_days())
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================
