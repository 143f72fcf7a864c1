//! HTTP surface.

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::state::AppState;
use crate::storage::Page;

pub mod catalog;
pub mod checkout;
pub mod extract;
pub mod orders;
pub mod sync;
pub mod user;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "handicraft-storefront"})) }))
        .route("/api/user/shipping-address", get(user::get_shipping_address).put(user::save_shipping_address))
        .route("/api/user/payment-method", get(user::get_payment_method).put(user::save_payment_method))
        .route("/api/checkout/validate", post(checkout::validate))
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/mine", get(orders::my_orders))
        .route("/api/orders/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/api/orders/:id/confirm", put(orders::confirm_order))
        .route("/api/orders/:id/pay", put(orders::pay_order))
        .route("/api/orders/:id/ship", put(orders::ship_order))
        .route("/api/orders/:id/deliver", put(orders::deliver_order))
        .route("/api/orders/:id/cancel", put(orders::cancel_order))
        .route("/api/products", get(catalog::list_products).post(catalog::create_product))
        .route("/api/products/:id", get(catalog::get_product).put(catalog::update_product).delete(catalog::delete_product))
        .route("/api/products/:id/reviews", get(catalog::list_reviews).post(catalog::create_review))
        .route("/api/reviews/:id", delete(catalog::delete_review))
        .route("/api/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/api/categories/:id", get(catalog::get_category).delete(catalog::delete_category))
        .route("/api/sync/events", get(sync::events))
        .route("/api/sync/stream", get(sync::stream))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[derive(Debug, Default, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32>, pub category: Option<Uuid>, pub search: Option<String> }
#[derive(Debug, Serialize)] #[serde(rename_all = "camelCase")] pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: u64, pub page: u32, pub per_page: u32 }

impl ListParams {
    pub fn page(&self) -> Page { Page::new(self.page, self.per_page) }
}

impl<T> PaginatedResponse<T> {
    pub fn new((data, total): (Vec<T>, u64), page: Page) -> Self {
        Self { data, total, page: page.page, per_page: page.per_page }
    }
}
