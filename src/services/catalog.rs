//! Products, categories and reviews.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::aggregates::{Category, Product, ProductDraft, Review};
use crate::domain::events::{Action, DomainEvent, Topic};
use crate::domain::value_objects::Rating;
use crate::error::{AppError, AppResult};
use crate::storage::{CatalogRepository, Page, ProductFilter, ReviewRepository};
use crate::sync::SyncRelay;

#[derive(Clone, Debug)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewReview {
    pub user_id: String,
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    reviews: Arc<dyn ReviewRepository>,
    relay: Arc<SyncRelay>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, reviews: Arc<dyn ReviewRepository>, relay: Arc<SyncRelay>) -> Self {
        Self { catalog, reviews, relay }
    }

    fn notify(&self, topic: Topic, action: Action, id: Uuid) {
        self.relay.publish(DomainEvent::new(topic, action, id.to_string()));
    }

    pub async fn list_products(&self, filter: &ProductFilter, page: Page) -> AppResult<(Vec<Product>, u64)> {
        Ok(self.catalog.list_products(filter, page).await?)
    }

    pub async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        self.catalog.get_product(id).await?.ok_or_else(|| AppError::NotFound(format!("product {id}")))
    }

    pub async fn create_product(&self, draft: ProductDraft) -> AppResult<Product> {
        self.ensure_category(draft.category_id).await?;
        let product = Product::create(draft)?;
        self.catalog.insert_product(&product).await?;
        self.notify(Topic::Product, Action::Created, product.id);
        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: Uuid, draft: ProductDraft) -> AppResult<Product> {
        self.ensure_category(draft.category_id).await?;
        let mut product = self.get_product(id).await?;
        product.apply(draft)?;
        if !self.catalog.update_product(&product).await? {
            return Err(AppError::NotFound(format!("product {id}")));
        }
        self.notify(Topic::Product, Action::Updated, id);
        Ok(product)
    }

    pub async fn delete_product(&self, id: Uuid) -> AppResult<()> {
        if !self.catalog.delete_product(id).await? {
            return Err(AppError::NotFound(format!("product {id}")));
        }
        self.notify(Topic::Product, Action::Deleted, id);
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    async fn ensure_category(&self, category_id: Option<Uuid>) -> AppResult<()> {
        match category_id {
            Some(id) if self.catalog.get_category(id).await?.is_none() => {
                Err(AppError::Validation(format!("Unknown category {id}")))
            }
            _ => Ok(()),
        }
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.catalog.list_categories().await?)
    }

    pub async fn get_category(&self, id: Uuid) -> AppResult<Category> {
        self.catalog.get_category(id).await?.ok_or_else(|| AppError::NotFound(format!("category {id}")))
    }

    pub async fn create_category(&self, new: NewCategory) -> AppResult<Category> {
        self.ensure_category(new.parent_id).await?;
        let category = Category::create(&new.name, new.description, new.parent_id, new.image_url)?;
        self.catalog.insert_category(&category).await?;
        self.notify(Topic::Category, Action::Created, category.id);
        Ok(category)
    }

    pub async fn delete_category(&self, id: Uuid) -> AppResult<()> {
        if !self.catalog.delete_category(id).await? {
            return Err(AppError::NotFound(format!("category {id}")));
        }
        self.notify(Topic::Category, Action::Deleted, id);
        Ok(())
    }

    pub async fn reviews_for(&self, product_id: Uuid) -> AppResult<Vec<Review>> {
        self.get_product(product_id).await?;
        Ok(self.reviews.list_for_product(product_id).await?)
    }

    pub async fn add_review(&self, product_id: Uuid, new: NewReview) -> AppResult<Review> {
        self.get_product(product_id).await?;
        let rating = Rating::new(new.rating)?;
        let review = Review::create(product_id, new.user_id, new.author_name, rating, new.comment);
        self.reviews.insert(&review).await?;
        self.notify(Topic::Review, Action::Created, review.id);
        // Listing pages show review counts.
        self.notify(Topic::Product, Action::Updated, product_id);
        Ok(review)
    }

    pub async fn delete_review(&self, id: Uuid) -> AppResult<()> {
        if !self.reviews.delete(id).await? {
            return Err(AppError::NotFound(format!("review {id}")));
        }
        self.notify(Topic::Review, Action::Deleted, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductStatus;
    use crate::storage::file::FileStore;
    use crate::storage::Repositories;
    use rust_decimal::Decimal;

    async fn service(dir: &std::path::Path) -> (CatalogService, Arc<SyncRelay>) {
        let repos = Repositories::from_store(FileStore::open(dir).await.unwrap());
        let relay = SyncRelay::new(64, None);
        (CatalogService::new(repos.catalog, repos.reviews, relay.clone()), relay)
    }

    fn draft(name: &str, category_id: Option<Uuid>) -> ProductDraft {
        ProductDraft {
            name: name.into(), description: "Hand woven".into(), price: Decimal::new(2499, 2), category_id,
            images: vec!["/img/basket.jpg".into()], count_in_stock: 4, is_featured: true, status: ProductStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_product_in_unknown_category_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, relay) = service(dir.path()).await;
        let err = catalog.create_product(draft("Basket", Some(Uuid::now_v7()))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(relay.latest(), 0);
    }

    #[tokio::test]
    async fn test_catalog_flow_publishes_events() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, relay) = service(dir.path()).await;
        let baskets = catalog
            .create_category(NewCategory { name: "Baskets".into(), description: None, parent_id: None, image_url: None })
            .await
            .unwrap();
        let product = catalog.create_product(draft("Market Basket", Some(baskets.id))).await.unwrap();

        let filter = ProductFilter { category_id: Some(baskets.id), ..Default::default() };
        let (found, total) = catalog.list_products(&filter, Page::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, product.id);

        catalog.delete_product(product.id).await.unwrap();
        assert!(matches!(catalog.get_product(product.id).await, Err(AppError::NotFound(_))));

        let topics: Vec<_> = relay.since(0).events.iter().map(|e| (e.topic, e.action)).collect();
        assert_eq!(
            topics,
            vec![(Topic::Category, Action::Created), (Topic::Product, Action::Created), (Topic::Product, Action::Deleted)]
        );
    }

    #[tokio::test]
    async fn test_reviews_require_product_and_valid_rating() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, _) = service(dir.path()).await;
        let review = |rating| NewReview { user_id: "u1".into(), author_name: "Amina".into(), rating, comment: "Lovely".into() };

        assert!(matches!(catalog.add_review(Uuid::now_v7(), review(5)).await, Err(AppError::NotFound(_))));

        let product = catalog.create_product(draft("Vase", None)).await.unwrap();
        assert!(matches!(catalog.add_review(product.id, review(6)).await, Err(AppError::Validation(_))));

        let saved = catalog.add_review(product.id, review(4)).await.unwrap();
        let listed = catalog.reviews_for(product.id).await.unwrap();
        assert_eq!(listed, vec![saved.clone()]);

        catalog.delete_review(saved.id).await.unwrap();
        assert!(catalog.reviews_for(product.id).await.unwrap().is_empty());
    }
}
