//! # Catalog Commands
//!
//! Customers, suppliers and products.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  customers   contact edits always allowed; name/kind/tax id and delete  │
//! │              only while no sale or receivable points at the customer    │
//! │  suppliers   delete unlinks products and payables                       │
//! │  products    deactivated, never deleted (sales keep pointing at them)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bizdesk_core::{Customer, Product, Supplier, TenantContext};
use bizdesk_db::{ContactUpdate, IdentityUpdate, NewCustomer, ProductInput, SupplierInput};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Customers
// =============================================================================

pub async fn create_customer(state: &AppState, ctx: &TenantContext, input: NewCustomer) -> Result<Customer, ApiError> {
    debug!(name = %input.name, "create_customer command");
    Ok(state.db().customers().create(ctx, input).await?)
}

/// All customers, or those whose name matches `search`.
pub async fn list_customers(
    state: &AppState,
    ctx: &TenantContext,
    search: Option<&str>,
) -> Result<Vec<Customer>, ApiError> {
    debug!(?search, "list_customers command");
    Ok(state.db().customers().list(ctx, search).await?)
}

pub async fn get_customer(state: &AppState, ctx: &TenantContext, id: &str) -> Result<Customer, ApiError> {
    Ok(state.db().customers().get(ctx, id).await?)
}

pub async fn update_customer_contact(
    state: &AppState,
    ctx: &TenantContext,
    id: &str,
    input: ContactUpdate,
) -> Result<Customer, ApiError> {
    debug!(id = %id, "update_customer_contact command");
    Ok(state.db().customers().update_contact(ctx, id, input).await?)
}

pub async fn update_customer_identity(
    state: &AppState,
    ctx: &TenantContext,
    id: &str,
    input: IdentityUpdate,
) -> Result<Customer, ApiError> {
    debug!(id = %id, "update_customer_identity command");
    Ok(state.db().customers().update_identity(ctx, id, input).await?)
}

pub async fn delete_customer(state: &AppState, ctx: &TenantContext, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_customer command");
    Ok(state.db().customers().delete(ctx, id).await?)
}

// =============================================================================
// Suppliers
// =============================================================================

pub async fn create_supplier(state: &AppState, ctx: &TenantContext, input: SupplierInput) -> Result<Supplier, ApiError> {
    debug!(name = %input.name, "create_supplier command");
    Ok(state.db().suppliers().create(ctx, input).await?)
}

pub async fn list_suppliers(state: &AppState, ctx: &TenantContext) -> Result<Vec<Supplier>, ApiError> {
    Ok(state.db().suppliers().list(ctx).await?)
}

pub async fn update_supplier(
    state: &AppState,
    ctx: &TenantContext,
    id: &str,
    input: SupplierInput,
) -> Result<Supplier, ApiError> {
    debug!(id = %id, "update_supplier command");
    Ok(state.db().suppliers().update(ctx, id, input).await?)
}

pub async fn delete_supplier(state: &AppState, ctx: &TenantContext, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "delete_supplier command");
    Ok(state.db().suppliers().delete(ctx, id).await?)
}

// =============================================================================
// Products
// =============================================================================

pub async fn create_product(state: &AppState, ctx: &TenantContext, input: ProductInput) -> Result<Product, ApiError> {
    debug!(name = %input.name, code = ?input.code, "create_product command");
    Ok(state.db().products().create(ctx, input).await?)
}

pub async fn list_products(
    state: &AppState,
    ctx: &TenantContext,
    include_inactive: bool,
) -> Result<Vec<Product>, ApiError> {
    debug!(include_inactive, "list_products command");
    Ok(state.db().products().list(ctx, include_inactive).await?)
}

pub async fn get_product(state: &AppState, ctx: &TenantContext, id: &str) -> Result<Product, ApiError> {
    Ok(state.db().products().get(ctx, id).await?)
}

/// Replaces every editable field, stock included. Past sale lines keep
/// the name and price they were sold at.
pub async fn update_product(
    state: &AppState,
    ctx: &TenantContext,
    id: &str,
    input: ProductInput,
) -> Result<Product, ApiError> {
    debug!(id = %id, "update_product command");
    Ok(state.db().products().update(ctx, id, input).await?)
}

pub async fn deactivate_product(state: &AppState, ctx: &TenantContext, id: &str) -> Result<(), ApiError> {
    debug!(id = %id, "deactivate_product command");
    Ok(state.db().products().deactivate(ctx, id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::create_sale;
    use crate::error::ErrorCode;
    use crate::state::test_support::*;
    use bizdesk_core::{CustomerKind, PaymentMethod};

    #[tokio::test]
    async fn test_customer_identity_locked_after_sale() {
        let (state, ctx) = setup().await;
        let ana = create_customer(
            &state,
            &ctx,
            NewCustomer {
                name: "Ana Lima".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let p = product(&state, &ctx, "Coffee", 5, 0).await;

        let renamed = update_customer_identity(
            &state,
            &ctx,
            &ana.id,
            IdentityUpdate {
                name: "Ana L. Lima".into(),
                kind: CustomerKind::Individual,
                tax_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Ana L. Lima");

        create_sale(&state, &ctx, draft(&ana.id, &p.id, 1, PaymentMethod::Instant)).await.unwrap();

        let locked = update_customer_identity(
            &state,
            &ctx,
            &ana.id,
            IdentityUpdate {
                name: "Someone Else".into(),
                kind: CustomerKind::Organization,
                tax_id: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(locked.code, ErrorCode::StateConflict);

        let contact = update_customer_contact(
            &state,
            &ctx,
            &ana.id,
            ContactUpdate {
                phone: Some("555-0101".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(contact.phone.as_deref(), Some("555-0101"));

        let err = delete_customer(&state, &ctx, &ana.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StateConflict);
        assert_eq!(list_customers(&state, &ctx, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_supplier_and_product_lifecycle() {
        let (state, ctx) = setup().await;
        let supplier = create_supplier(
            &state,
            &ctx,
            SupplierInput {
                name: "Laticínios Serra".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let milk = create_product(
            &state,
            &ctx,
            ProductInput {
                name: "Milk 1L".into(),
                code: Some("LEI-1L".into()),
                cost_price_cents: 420,
                sale_price_cents: 699,
                current_stock: 10,
                min_stock: 4,
                supplier_id: Some(supplier.id.clone()),
                ..ProductInput::default()
            },
        )
        .await
        .unwrap();

        let dup = create_product(
            &state,
            &ctx,
            ProductInput {
                name: "Other milk".into(),
                code: Some("LEI-1L".into()),
                ..ProductInput::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(dup.code, ErrorCode::ValidationFailed);

        delete_supplier(&state, &ctx, &supplier.id).await.unwrap();
        assert!(list_suppliers(&state, &ctx).await.unwrap().is_empty());
        assert_eq!(get_product(&state, &ctx, &milk.id).await.unwrap().supplier_id, None);

        deactivate_product(&state, &ctx, &milk.id).await.unwrap();
        assert!(list_products(&state, &ctx, false).await.unwrap().is_empty());
        assert_eq!(list_products(&state, &ctx, true).await.unwrap().len(), 1);
    }
}
