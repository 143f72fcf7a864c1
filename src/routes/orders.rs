use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::extract::{AdminAccess, Identity, RequireUser, ValidatedJson};
use super::{ListParams, PaginatedResponse};
use crate::domain::aggregates::{NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, ShippingAddress};
use crate::error::AppResult;
use crate::services::OrderUpdate;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_price: Decimal,
    pub total: Decimal,
    #[validate]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Used only when the request carries no identity header.
    #[validate(length(min = 1, max = 128))]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub id: String,
    pub total: Decimal,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_url: Option<String>,
}

pub async fn create_order(
    State(s): State<AppState>,
    Identity(caller): Identity,
    ValidatedJson(r): ValidatedJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<CreateOrderResponse>)> {
    let user_id = caller.or(r.user_id).unwrap_or_else(|| format!("guest-{}", Uuid::new_v4()));
    let placed = s.orders().create(NewOrder {
        user_id,
        items: r.items,
        shipping_price: r.shipping_price,
        total: r.total,
        shipping_address: r.shipping_address,
        payment_method: r.payment_method,
    }).await?;
    Ok((StatusCode::CREATED, Json(CreateOrderResponse {
        id: placed.order.id().to_string(),
        total: placed.order.total(),
        status: placed.order.status(),
        whatsapp_url: placed.whatsapp_url,
    })))
}

pub async fn list_orders(State(s): State<AppState>, _: AdminAccess, Query(p): Query<ListParams>) -> AppResult<Json<PaginatedResponse<Order>>> {
    let page = p.page();
    Ok(Json(PaginatedResponse::new(s.orders().list(page).await?, page)))
}

pub async fn my_orders(State(s): State<AppState>, RequireUser(user_id): RequireUser) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(s.orders().list_for_user(&user_id).await?))
}

pub async fn get_order(State(s): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Order>> {
    Ok(Json(s.orders().get(&id).await?))
}

pub async fn delete_order(State(s): State<AppState>, _: AdminAccess, Path(id): Path<String>) -> AppResult<StatusCode> {
    s.orders().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn apply(s: &AppState, id: &str, update: OrderUpdate) -> AppResult<Json<Order>> {
    Ok(Json(s.orders().update(id, update).await?))
}

pub async fn confirm_order(State(s): State<AppState>, _: AdminAccess, Path(id): Path<String>) -> AppResult<Json<Order>> {
    Ok(Json(s.orders().confirm_by_whatsapp(&id).await?))
}

pub async fn pay_order(State(s): State<AppState>, _: AdminAccess, Path(id): Path<String>) -> AppResult<Json<Order>> {
    Ok(Json(s.orders().mark_paid(&id).await?))
}

pub async fn ship_order(State(s): State<AppState>, _: AdminAccess, Path(id): Path<String>) -> AppResult<Json<Order>> {
    apply(&s, &id, OrderUpdate::Ship).await
}

pub async fn deliver_order(State(s): State<AppState>, _: AdminAccess, Path(id): Path<String>) -> AppResult<Json<Order>> {
    Ok(Json(s.orders().mark_delivered(&id).await?))
}

pub async fn cancel_order(State(s): State<AppState>, _: AdminAccess, Path(id): Path<String>) -> AppResult<Json<Order>> {
    apply(&s, &id, OrderUpdate::Cancel).await
}
