//! # Back-office Configuration
//!
//! Settings for one back-office install, loaded once at startup.
//!
//! ## Load Order (later overrides earlier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults          AppConfig::default()                              │
//! │  2. Config file       explicit path, or <config dir>/bizdesk.toml       │
//! │  3. Environment       BIZDESK_* variables                               │
//! │  4. Validation        ids are UUIDs, windows are non-zero               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Config File
//! ```toml
//! [database]
//! path = "/var/lib/bizdesk/bizdesk.db"
//! max_connections = 5
//!
//! [tenant]
//! tenant_id = "00000000-0000-0000-0000-000000000001"
//! user_id = "5b0c1f7e-2f7a-4a53-9d62-8a1f3c7e9b10"
//!
//! [finance]
//! default_due_days = 30      # 0: deferred sales need an explicit due date
//! growth_window_months = 7
//! recent_sales_limit = 5
//! active_customer_months = 3
//!
//! [store]
//! name = "Corner Shop"
//! currency_symbol = "$"
//! ```

use std::path::{Path, PathBuf};

use bizdesk_core::reports::snapshot::{GROWTH_WINDOW_MONTHS, MAX_GROWTH_WINDOW_MONTHS};
use bizdesk_core::{TenantContext, DEFAULT_TENANT_ID};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const CONFIG_FILE_NAME: &str = "bizdesk.toml";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Could not determine the {0} directory")]
    NoPlatformDir(&'static str),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Unset means `<data dir>/bizdesk.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Whose data this install works on, and who is at the keyboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSettings {
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,

    /// Recorded on every sale. Generated when not configured.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

fn default_user_id() -> String {
    Uuid::new_v4().to_string()
}

impl Default for TenantSettings {
    fn default() -> Self {
        TenantSettings {
            tenant_id: default_tenant_id(),
            user_id: default_user_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceSettings {
    /// Days added to the sale date when a deferred sale has no due date.
    /// 0 turns the default off.
    #[serde(default = "default_due_days")]
    pub default_due_days: u32,

    #[serde(default = "default_growth_window")]
    pub growth_window_months: u32,

    #[serde(default = "default_recent_sales")]
    pub recent_sales_limit: u32,

    #[serde(default = "default_active_customer_months")]
    pub active_customer_months: u32,
}

fn default_due_days() -> u32 {
    30
}

fn default_growth_window() -> u32 {
    GROWTH_WINDOW_MONTHS
}

fn default_recent_sales() -> u32 {
    5
}

fn default_active_customer_months() -> u32 {
    3
}

impl Default for FinanceSettings {
    fn default() -> Self {
        FinanceSettings {
            default_due_days: default_due_days(),
            growth_window_months: default_growth_window(),
            recent_sales_limit: default_recent_sales(),
            active_customer_months: default_active_customer_months(),
        }
    }
}

impl FinanceSettings {
    /// `None` when deferred sales must carry their own due date.
    pub fn due_days(&self) -> Option<u32> {
        (self.default_due_days > 0).then_some(self.default_due_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "My Business".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl StoreSettings {
    /// Formats cents for display, e.g. `-$12.05`.
    pub fn format_currency(&self, cents: i64) -> String {
        format!(
            "{}{}{}.{:02}",
            if cents < 0 { "-" } else { "" },
            self.currency_symbol,
            (cents / 100).abs(),
            (cents % 100).abs()
        )
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub tenant: TenantSettings,

    #[serde(default)]
    pub finance: FinanceSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let path = match config_path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_config_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                Self::from_toml(&contents)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `BIZDESK_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("BIZDESK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(v) = lookup("BIZDESK_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_number("BIZDESK_DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(id) = lookup("BIZDESK_TENANT_ID") {
            debug!(tenant_id = %id, "Overriding tenant from environment");
            self.tenant.tenant_id = id;
        }
        if let Some(id) = lookup("BIZDESK_USER_ID") {
            self.tenant.user_id = id;
        }
        if let Some(v) = lookup("BIZDESK_DEFAULT_DUE_DAYS") {
            self.finance.default_due_days = parse_number("BIZDESK_DEFAULT_DUE_DAYS", &v)?;
        }
        if let Some(v) = lookup("BIZDESK_GROWTH_WINDOW_MONTHS") {
            self.finance.growth_window_months = parse_number("BIZDESK_GROWTH_WINDOW_MONTHS", &v)?;
        }
        if let Some(name) = lookup("BIZDESK_STORE_NAME") {
            self.store.name = name;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        TenantContext::new(&self.tenant.tenant_id, &self.tenant.user_id)
            .map_err(|e| ConfigError::invalid("tenant", e.to_string()))?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid("database.max_connections", "must be greater than 0"));
        }
        if !(1..=MAX_GROWTH_WINDOW_MONTHS).contains(&self.finance.growth_window_months) {
            return Err(ConfigError::invalid(
                "finance.growth_window_months",
                format!("must be between 1 and {MAX_GROWTH_WINDOW_MONTHS}"),
            ));
        }
        if self.finance.recent_sales_limit == 0 {
            return Err(ConfigError::invalid("finance.recent_sales_limit", "must be greater than 0"));
        }
        if self.finance.active_customer_months == 0 {
            return Err(ConfigError::invalid("finance.active_customer_months", "must be greater than 0"));
        }
        Ok(())
    }

    /// The context every command of this install runs under.
    pub fn tenant_context(&self) -> ConfigResult<TenantContext> {
        TenantContext::new(&self.tenant.tenant_id, &self.tenant.user_id)
            .map_err(|e| ConfigError::invalid("tenant", e.to_string()))
    }

    /// Resolves the database file, creating its directory if needed.
    ///
    /// ## Platform-Specific Defaults
    /// - **macOS**: `~/Library/Application Support/com.bizdesk.backoffice/bizdesk.db`
    /// - **Windows**: `%APPDATA%\bizdesk\backoffice\data\bizdesk.db`
    /// - **Linux**: `~/.local/share/backoffice/bizdesk.db`
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::NoPlatformDir("data"))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::CreateDir {
            path: data_dir.to_path_buf(),
            source,
        })?;
        Ok(data_dir.join("bizdesk.db"))
    }

    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "bizdesk", "backoffice")
}

fn parse_number(key: &str, value: &str) -> ConfigResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a number", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.tenant.tenant_id, DEFAULT_TENANT_ID);
        assert_eq!(config.finance.due_days(), Some(30));
        assert_eq!(config.finance.growth_window_months, 7);
        assert_eq!(config.finance.recent_sales_limit, 5);
        assert_eq!(config.finance.active_customer_months, 3);
        assert!(config.validate().is_ok());
        assert!(config.tenant_context().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [finance]
            default_due_days = 0

            [store]
            name = "Corner Shop"
            "#,
        )
        .unwrap();

        assert_eq!(config.finance.due_days(), None);
        assert_eq!(config.finance.growth_window_months, 7);
        assert_eq!(config.store.name, "Corner Shop");
        assert_eq!(config.store.currency_symbol, "$");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(matches!(
            AppConfig::from_toml("[finance]\ndefault_due_days = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("BIZDESK_DB_PATH", "/tmp/other.db"),
                ("BIZDESK_DEFAULT_DUE_DAYS", "15"),
                ("BIZDESK_STORE_NAME", "Night Shop"),
            ]))
            .unwrap();

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/other.db")));
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/other.db"));
        assert_eq!(config.finance.due_days(), Some(15));
        assert_eq!(config.store.name, "Night Shop");
    }

    #[test]
    fn test_bad_env_number_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(env(&[("BIZDESK_GROWTH_WINDOW_MONTHS", "seven")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.tenant.tenant_id = "acme".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.finance.growth_window_months = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_currency() {
        let store = StoreSettings::default();
        assert_eq!(store.format_currency(0), "$0.00");
        assert_eq!(store.format_currency(123_456), "$1234.56");
        assert_eq!(store.format_currency(-1_205), "-$12.05");
        assert_eq!(store.format_currency(-5), "-$0.05");
    }
}
