//! Cart endpoints, including the purchase workflow.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use checkout::{CheckoutError, StockIssue};
use common::{CartId, ProductId, UserId};
use domain::{Cart, CartItem, OrderWithItems};
use serde::{Deserialize, Serialize};
use store::Store;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

#[derive(Deserialize)]
pub struct AddItemQuery {
    pub quantity: Option<u32>,
}

#[derive(Deserialize)]
pub struct PurchaseQuery {
    pub user_id: Uuid,
}

/// Purchase outcome. Business failures (empty cart, stock shortfalls)
/// come back as `success: false` with details rather than an error
/// status; the client is expected to correct the cart and retry.
#[derive(Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderWithItems>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_purchased: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<StockIssue>>,
}

/// GET /carts — list all carts.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Cart>>, ApiError> {
    Ok(Json(state.store.list_carts().await?))
}

/// GET /carts/:cart_id — fetch a cart with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<CartView>, ApiError> {
    let cart_id = CartId::from_uuid(cart_id);
    let cart = state
        .store
        .get_cart(cart_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cart {cart_id} not found")))?;
    let items = state.store.get_cart_items(cart_id).await?;
    Ok(Json(CartView { cart, items }))
}

/// GET /carts/user/:user_id — the user's cart joined with the catalog:
/// product names, unit prices, line totals, and the cart total.
#[tracing::instrument(skip(state))]
pub async fn for_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<checkout::CartSnapshot>, ApiError> {
    let user_id = UserId::from_uuid(user_id);
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))?;
    let snapshot = state.snapshots.build(user_id).await?;
    Ok(Json(snapshot))
}

/// POST /carts/:cart_id/:product_id?quantity= — add a product to a
/// cart, merging with any existing line.
#[tracing::instrument(skip(state, query))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((cart_id, product_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<AddItemQuery>,
) -> Result<Json<CartItem>, ApiError> {
    let cart_id = CartId::from_uuid(cart_id);
    let product_id = ProductId::from_uuid(product_id);
    let quantity = query.quantity.unwrap_or(1);

    if quantity == 0 {
        return Err(ApiError::BadRequest(
            "quantity must be at least 1".to_string(),
        ));
    }

    state
        .store
        .get_cart(cart_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cart {cart_id} not found")))?;
    let product = state
        .store
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {product_id} not found")))?;

    // Advisory pre-check against the merged line quantity; checkout
    // re-validates against live stock anyway. Saturating add keeps a
    // hostile quantity from wrapping past the stock check.
    let existing = state
        .store
        .get_cart_items(cart_id)
        .await?
        .into_iter()
        .find(|item| item.product_id == product_id)
        .map(|item| item.quantity)
        .unwrap_or(0);
    let merged = existing.saturating_add(quantity);
    if merged > product.stock {
        return Err(ApiError::BadRequest(format!(
            "Insufficient stock for {}: requested {}, available {}",
            product.name, merged, product.stock
        )));
    }

    let item = state
        .store
        .add_cart_item(cart_id, product_id, quantity)
        .await?;
    Ok(Json(item))
}

/// DELETE /carts/:cart_id/:product_id — remove a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((cart_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CartItem>, ApiError> {
    let cart_id = CartId::from_uuid(cart_id);
    let product_id = ProductId::from_uuid(product_id);
    let removed = state
        .store
        .remove_cart_item(cart_id, product_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Product {product_id} is not in cart {cart_id}"))
        })?;
    Ok(Json(removed))
}

/// POST /carts/purchase?user_id= — purchase the user's cart.
#[tracing::instrument(skip(state, query))]
pub async fn purchase<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<PurchaseQuery>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let user_id = UserId::from_uuid(query.user_id);
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id} not found")))?;

    match state.orchestrator.execute(user_id).await {
        Ok(receipt) => Ok(Json(PurchaseResponse {
            success: true,
            message: "Purchase completed successfully".to_string(),
            items_purchased: Some(receipt.items_purchased),
            total_amount_cents: Some(receipt.total_amount.cents()),
            order: Some(receipt.order),
            details: None,
        })),
        Err(err) => {
            let details = match &err {
                CheckoutError::InsufficientStock { issues } => Some(issues.clone()),
                CheckoutError::StockReduceFailed { issue } => Some(vec![issue.clone()]),
                _ => None,
            };
            match err {
                CheckoutError::EmptyCart
                | CheckoutError::InsufficientStock { .. }
                | CheckoutError::StockReduceFailed { .. }
                | CheckoutError::InvalidTotal { .. } => Ok(Json(PurchaseResponse {
                    success: false,
                    message: err.to_string(),
                    order: None,
                    items_purchased: None,
                    total_amount_cents: None,
                    details,
                })),
                other => Err(other.into()),
            }
        }
    }
}
