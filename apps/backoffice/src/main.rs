//! Prints the dashboard and the low-stock list of the configured business
//! as JSON.
//!
//! ```bash
//! backoffice                      # <config dir>/bizdesk.toml if present
//! backoffice ./bizdesk.toml       # explicit config file
//! BIZDESK_DB_PATH=./bizdesk_dev.db backoffice
//! ```

use std::path::PathBuf;

use anyhow::Context;
use backoffice::commands::report;
use backoffice::{init_tracing, AppConfig, AppState};
use chrono::Utc;
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("loading configuration")?;
    let ctx = config.tenant_context()?;
    info!(store = %config.store.name, tenant_id = %ctx.tenant_id, "Starting back-office");

    let state = AppState::open(config).await.context("opening database")?;
    let today = Utc::now().date_naive();

    let summary = report::dashboard(&state, &ctx, today).await?;
    let low_stock = report::list_low_stock(&state, &ctx).await?;

    let output = json!({
        "store": state.config().store.name,
        "monthRevenue": state.config().store.format_currency(summary.month_revenue.cents()),
        "dashboard": summary,
        "lowStock": low_stock,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    state.db().close().await;
    Ok(())
}
