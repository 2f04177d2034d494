//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, UserId};
use domain::{Order, OrderWithItems};
use serde::Serialize;
use store::Store;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct OrderTotalResponse {
    pub order_id: OrderId,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub order: Order,
    pub items_restored: usize,
}

/// GET /orders — list all order headers.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.store.list_orders().await?))
}

/// GET /orders/user/:user_id — list a user's orders.
#[tracing::instrument(skip(state))]
pub async fn for_user<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let user_id = UserId::from_uuid(user_id);
    Ok(Json(state.store.list_orders_for_user(user_id).await?))
}

/// GET /orders/:id — fetch an order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;
    let items = state.store.get_order_items(order_id).await?;
    Ok(Json(OrderWithItems { order, items }))
}

/// GET /orders/:id/total — the stored order total.
#[tracing::instrument(skip(state))]
pub async fn total<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderTotalResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;
    Ok(Json(OrderTotalResponse {
        order_id,
        total_cents: order.total.cents(),
    }))
}

/// POST /orders/:id/cancel — cancel an order and restore its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let cancellation = state.factory.cancel(order_id).await?;
    Ok(Json(CancelResponse {
        message: format!("Order {order_id} cancelled successfully and stock restored"),
        order: cancellation.order,
        items_restored: cancellation.items_restored,
    }))
}
