use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::extract::{AdminAccess, RequireUser, ValidatedJson};
use super::{ListParams, PaginatedResponse};
use crate::domain::aggregates::{Category, Product, ProductDraft, ProductStatus, Review};
use crate::error::AppResult;
use crate::services::{NewCategory, NewReview};
use crate::state::AppState;
use crate::storage::ProductFilter;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub count_in_stock: u32,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub status: ProductStatus,
}

impl From<ProductRequest> for ProductDraft {
    fn from(r: ProductRequest) -> Self {
        Self {
            name: r.name, description: r.description, price: r.price, category_id: r.category_id,
            images: r.images, count_in_stock: r.count_in_stock, is_featured: r.is_featured, status: r.status,
        }
    }
}

pub async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> AppResult<Json<PaginatedResponse<Product>>> {
    let page = p.page();
    let filter = ProductFilter { category_id: p.category, search: p.search, include_hidden: false };
    Ok(Json(PaginatedResponse::new(s.catalog().list_products(&filter, page).await?, page)))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Product>> {
    Ok(Json(s.catalog().get_product(id).await?))
}

pub async fn create_product(State(s): State<AppState>, _: AdminAccess, ValidatedJson(r): ValidatedJson<ProductRequest>) -> AppResult<(StatusCode, Json<Product>)> {
    Ok((StatusCode::CREATED, Json(s.catalog().create_product(r.into()).await?)))
}

pub async fn update_product(State(s): State<AppState>, _: AdminAccess, Path(id): Path<Uuid>, ValidatedJson(r): ValidatedJson<ProductRequest>) -> AppResult<Json<Product>> {
    Ok(Json(s.catalog().update_product(id, r.into()).await?))
}

pub async fn delete_product(State(s): State<AppState>, _: AdminAccess, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    s.catalog().delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

pub async fn list_categories(State(s): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(s.catalog().list_categories().await?))
}

pub async fn get_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Category>> {
    Ok(Json(s.catalog().get_category(id).await?))
}

pub async fn create_category(State(s): State<AppState>, _: AdminAccess, ValidatedJson(r): ValidatedJson<CategoryRequest>) -> AppResult<(StatusCode, Json<Category>)> {
    let category = s.catalog().create_category(NewCategory {
        name: r.name, description: r.description, parent_id: r.parent_id, image_url: r.image_url,
    }).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(State(s): State<AppState>, _: AdminAccess, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    s.catalog().delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: u8,
    #[validate(length(min = 1, max = 2000, message = "comment is required"))]
    pub comment: String,
    #[validate(length(min = 1, max = 80))]
    pub author_name: Option<String>,
}

pub async fn list_reviews(State(s): State<AppState>, Path(product_id): Path<Uuid>) -> AppResult<Json<Vec<Review>>> {
    Ok(Json(s.catalog().reviews_for(product_id).await?))
}

pub async fn create_review(
    State(s): State<AppState>,
    RequireUser(user_id): RequireUser,
    Path(product_id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<ReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let author_name = r.author_name.unwrap_or_else(|| user_id.clone());
    let review = s.catalog().add_review(product_id, NewReview { user_id, author_name, rating: r.rating, comment: r.comment }).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn delete_review(State(s): State<AppState>, _: AdminAccess, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    s.catalog().delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
