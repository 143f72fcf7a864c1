//! JSON document store: one array per entity under the data directory.
//!
//! Every mutation reads the whole file, edits it in memory and writes it
//! back through a temp file + rename. A per-collection async mutex
//! serializes read-modify-write cycles inside this process; separate
//! processes sharing a directory are still last-write-wins.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    CatalogRepository, OrderRepository, Page, ProductFilter, ProfileRepository, ReviewRepository, StorageError,
    StorageResult, UserProfile,
};
use crate::domain::aggregates::{Category, Order, PaymentMethod, Product, Review, ShippingAddress};
use crate::domain::value_objects::OrderId;

struct Collection<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn new(dir: &Path, file: &str) -> Self {
        Self { path: dir.join(file), lock: Mutex::new(()), _marker: PhantomData }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    async fn read(&self) -> StorageResult<Vec<T>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R + Send) -> StorageResult<R> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let result = f(&mut items);
        self.store(&items).await?;
        Ok(result)
    }

    async fn load(&self) -> StorageResult<Vec<T>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Io { path: self.display(), source }),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt { path: self.display(), source })
    }

    async fn store(&self, items: &[T]) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(items).map_err(|source| StorageError::Corrupt { path: self.display(), source })?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| StorageError::Io { path: tmp.display().to_string(), source })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StorageError::Io { path: self.display(), source })
    }
}

pub struct FileStore {
    orders: Collection<Order>,
    products: Collection<Product>,
    categories: Collection<Category>,
    reviews: Collection<Review>,
    profiles: Collection<UserProfile>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StorageError::Io { path: dir.display().to_string(), source })?;
        tracing::info!(data_dir = %dir.display(), "Using JSON file store");
        Ok(Self {
            orders: Collection::new(dir, "orders.json"),
            products: Collection::new(dir, "products.json"),
            categories: Collection::new(dir, "categories.json"),
            reviews: Collection::new(dir, "reviews.json"),
            profiles: Collection::new(dir, "profiles.json"),
        })
    }
}

fn paginate<T>(items: Vec<T>, page: Page) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let data = items.into_iter().skip(page.offset()).take(page.per_page as usize).collect();
    (data, total)
}

fn replace_by<T>(items: &mut [T], replacement: &T, same: impl Fn(&T) -> bool) -> bool
where
    T: Clone,
{
    match items.iter_mut().find(|i| same(i)) {
        Some(slot) => {
            *slot = replacement.clone();
            true
        }
        None => false,
    }
}

fn remove_by<T>(items: &mut Vec<T>, same: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|i| !same(i));
    items.len() != before
}

#[async_trait]
impl OrderRepository for FileStore {
    async fn insert(&self, order: &Order) -> StorageResult<()> {
        let order = order.clone();
        self.orders.mutate(move |items| items.push(order)).await
    }

    async fn get(&self, id: &OrderId) -> StorageResult<Option<Order>> {
        Ok(self.orders.read().await?.into_iter().find(|o| o.id() == id))
    }

    async fn list(&self, page: Page) -> StorageResult<(Vec<Order>, u64)> {
        let mut orders = self.orders.read().await?;
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(paginate(orders, page))
    }

    async fn list_for_user(&self, user_id: &str) -> StorageResult<Vec<Order>> {
        let mut orders: Vec<Order> = self.orders.read().await?.into_iter().filter(|o| o.user_id() == user_id).collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn update(&self, order: &Order) -> StorageResult<bool> {
        let order = order.clone();
        self.orders.mutate(move |items| replace_by(items, &order, |o| o.id() == order.id())).await
    }

    async fn delete(&self, id: &OrderId) -> StorageResult<bool> {
        let id = id.clone();
        self.orders.mutate(move |items| remove_by(items, |o| o.id() == &id)).await
    }
}

#[async_trait]
impl CatalogRepository for FileStore {
    async fn list_products(&self, filter: &ProductFilter, page: Page) -> StorageResult<(Vec<Product>, u64)> {
        let mut products: Vec<Product> = self.products.read().await?.into_iter().filter(|p| filter.accepts(p)).collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(products, page))
    }

    async fn get_product(&self, id: Uuid) -> StorageResult<Option<Product>> {
        Ok(self.products.read().await?.into_iter().find(|p| p.id == id))
    }

    async fn insert_product(&self, product: &Product) -> StorageResult<()> {
        let product = product.clone();
        self.products.mutate(move |items| items.push(product)).await
    }

    async fn update_product(&self, product: &Product) -> StorageResult<bool> {
        let product = product.clone();
        self.products.mutate(move |items| replace_by(items, &product, |p| p.id == product.id)).await
    }

    async fn delete_product(&self, id: Uuid) -> StorageResult<bool> {
        self.products.mutate(move |items| remove_by(items, |p| p.id == id)).await
    }

    async fn list_categories(&self) -> StorageResult<Vec<Category>> {
        let mut categories = self.categories.read().await?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> StorageResult<Option<Category>> {
        Ok(self.categories.read().await?.into_iter().find(|c| c.id == id))
    }

    async fn insert_category(&self, category: &Category) -> StorageResult<()> {
        let category = category.clone();
        self.categories.mutate(move |items| items.push(category)).await
    }

    async fn delete_category(&self, id: Uuid) -> StorageResult<bool> {
        self.categories.mutate(move |items| remove_by(items, |c| c.id == id)).await
    }
}

#[async_trait]
impl ReviewRepository for FileStore {
    async fn list_for_product(&self, product_id: Uuid) -> StorageResult<Vec<Review>> {
        let mut reviews: Vec<Review> = self.reviews.read().await?.into_iter().filter(|r| r.product_id == product_id).collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn insert(&self, review: &Review) -> StorageResult<()> {
        let review = review.clone();
        self.reviews.mutate(move |items| items.push(review)).await
    }

    async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        self.reviews.mutate(move |items| remove_by(items, |r| r.id == id)).await
    }
}

#[async_trait]
impl ProfileRepository for FileStore {
    async fn get(&self, user_id: &str) -> StorageResult<Option<UserProfile>> {
        Ok(self.profiles.read().await?.into_iter().find(|p| p.user_id == user_id))
    }

    async fn save_shipping_address(&self, user_id: &str, address: &ShippingAddress) -> StorageResult<()> {
        let (user_id, address) = (user_id.to_string(), address.clone());
        self.profiles
            .mutate(move |items| profile_entry(items, &user_id).shipping_address = Some(address))
            .await
    }

    async fn save_payment_method(&self, user_id: &str, method: PaymentMethod) -> StorageResult<()> {
        let user_id = user_id.to_string();
        self.profiles.mutate(move |items| profile_entry(items, &user_id).payment_method = Some(method)).await
    }
}

fn profile_entry<'a>(items: &'a mut Vec<UserProfile>, user_id: &str) -> &'a mut UserProfile {
    let index = match items.iter().position(|p| p.user_id == user_id) {
        Some(index) => index,
        None => {
            items.push(UserProfile { user_id: user_id.to_string(), ..UserProfile::default() });
            items.len() - 1
        }
    };
    &mut items[index]
}
