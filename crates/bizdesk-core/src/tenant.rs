//! # Tenant Context
//!
//! Every repository, workflow and report call takes a `&TenantContext`
//! explicitly. There is no ambient "current company".

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationResult;
use crate::validation::validate_uuid;
use crate::DEFAULT_TENANT_ID;

/// Who is acting, and on whose data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenantContext {
    /// Scopes every read and write.
    pub tenant_id: String,
    /// Recorded on sales as the acting user.
    pub user_id: String,
}

impl TenantContext {
    /// Builds a context after checking both ids are UUIDs.
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> ValidationResult<Self> {
        let tenant_id = tenant_id.into();
        let user_id = user_id.into();
        validate_uuid("tenant_id", &tenant_id)?;
        validate_uuid("user_id", &user_id)?;
        Ok(Self { tenant_id, user_id })
    }

    /// Single-tenant installs run everything under [`DEFAULT_TENANT_ID`].
    pub fn default_tenant(user_id: impl Into<String>) -> ValidationResult<Self> {
        Self::new(DEFAULT_TENANT_ID, user_id)
    }
}
