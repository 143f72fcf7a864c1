//! Persistence for every aggregate.
//!
//! Each aggregate has one repository trait. Two backends implement all of
//! them: [`postgres::PgStore`] when `DATABASE_URL` is configured, otherwise
//! [`file::FileStore`], which keeps one JSON array per entity under the data
//! directory and rewrites the whole file on each mutation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Category, Order, PaymentMethod, Product, Review, ShippingAddress};
use crate::domain::value_objects::OrderId;

pub mod file;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("Corrupt document {path}: {source}")]
    Corrupt { path: String, #[source] source: serde_json::Error },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid stored value: {0}")]
    InvalidRow(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(20).clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(self) -> usize {
        ((self.page - 1) as usize) * self.per_page as usize
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    /// Include draft and archived products (admin views).
    pub include_hidden: bool,
}

impl ProductFilter {
    pub fn accepts(&self, product: &Product) -> bool {
        (self.include_hidden || product.is_visible())
            && self.category_id.map_or(true, |c| product.category_id == Some(c))
            && self.search.as_deref().map_or(true, |s| product.matches(s))
    }
}

/// Saved checkout data for one user.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<PaymentMethod>,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> StorageResult<()>;
    async fn get(&self, id: &OrderId) -> StorageResult<Option<Order>>;
    /// Newest first, with the total count.
    async fn list(&self, page: Page) -> StorageResult<(Vec<Order>, u64)>;
    async fn list_for_user(&self, user_id: &str) -> StorageResult<Vec<Order>>;
    /// Returns false when no order has that id.
    async fn update(&self, order: &Order) -> StorageResult<bool>;
    /// Returns false when no order has that id.
    async fn delete(&self, id: &OrderId) -> StorageResult<bool>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter, page: Page) -> StorageResult<(Vec<Product>, u64)>;
    async fn get_product(&self, id: Uuid) -> StorageResult<Option<Product>>;
    async fn insert_product(&self, product: &Product) -> StorageResult<()>;
    async fn update_product(&self, product: &Product) -> StorageResult<bool>;
    async fn delete_product(&self, id: Uuid) -> StorageResult<bool>;
    async fn list_categories(&self) -> StorageResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> StorageResult<Option<Category>>;
    async fn insert_category(&self, category: &Category) -> StorageResult<()>;
    async fn delete_category(&self, id: Uuid) -> StorageResult<bool>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn list_for_product(&self, product_id: Uuid) -> StorageResult<Vec<Review>>;
    async fn insert(&self, review: &Review) -> StorageResult<()>;
    async fn delete(&self, id: Uuid) -> StorageResult<bool>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> StorageResult<Option<UserProfile>>;
    async fn save_shipping_address(&self, user_id: &str, address: &ShippingAddress) -> StorageResult<()>;
    async fn save_payment_method(&self, user_id: &str, method: PaymentMethod) -> StorageResult<()>;
}

/// The repositories handed to request handlers.
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: S) -> Self
    where
        S: OrderRepository + CatalogRepository + ReviewRepository + ProfileRepository + 'static,
    {
        let store = Arc::new(store);
        Self {
            orders: store.clone(),
            catalog: store.clone(),
            reviews: store.clone(),
            profiles: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(Page::new(Some(0), Some(500)), Page { page: 1, per_page: 100 });
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
        assert_eq!(Page::default().per_page, 20);
    }
}
