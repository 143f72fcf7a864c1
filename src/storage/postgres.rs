//! `PostgreSQL` backend. Selected when `DATABASE_URL` is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    CatalogRepository, OrderRepository, Page, ProductFilter, ProfileRepository, ReviewRepository, StorageError,
    StorageResult, UserProfile,
};
use crate::domain::aggregates::{
    Category, Order, OrderItem, OrderStatus, PaymentMethod, Product, ProductStatus, Review, ShippingAddress,
};
use crate::domain::value_objects::{OrderId, Rating, Slug};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    /// Connect and apply pending migrations.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let db = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;
        tracing::info!("Using PostgreSQL store");
        Ok(Self { db })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    items: Json<Vec<OrderItem>>,
    items_price: Decimal,
    shipping_price: Decimal,
    total: Decimal,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    status: String,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StorageError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::parse(&row.id).map_err(|e| StorageError::InvalidRow(format!("order id {}: {e}", row.id)))?,
            user_id: row.user_id,
            items: row.items.0,
            items_price: row.items_price,
            shipping_price: row.shipping_price,
            total: row.total,
            shipping_address: row.shipping_address.0,
            payment_method: PaymentMethod::parse(&row.payment_method)
                .ok_or_else(|| StorageError::InvalidRow(format!("payment method {}", row.payment_method)))?,
            status: OrderStatus::parse(&row.status).ok_or_else(|| StorageError::InvalidRow(format!("order status {}", row.status)))?,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            is_delivered: row.is_delivered,
            delivered_at: row.delivered_at,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            events: Vec::new(),
        })
    }
}

fn orders_from(rows: Vec<OrderRow>) -> StorageResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    category_id: Option<Uuid>,
    images: Vec<String>,
    count_in_stock: i32,
    is_featured: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StorageError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            slug: Slug::from_name(&row.slug).map_err(|e| StorageError::InvalidRow(format!("product slug: {e}")))?,
            name: row.name,
            description: row.description,
            price: row.price,
            category_id: row.category_id,
            images: row.images,
            count_in_stock: u32::try_from(row.count_in_stock).unwrap_or(0),
            is_featured: row.is_featured,
            status: ProductStatus::parse(&row.status).ok_or_else(|| StorageError::InvalidRow(format!("product status {}", row.status)))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    parent_id: Option<Uuid>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = StorageError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Category {
            id: row.id,
            slug: Slug::from_name(&row.slug).map_err(|e| StorageError::InvalidRow(format!("category slug: {e}")))?,
            name: row.name,
            description: row.description,
            parent_id: row.parent_id,
            image_url: row.image_url,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    product_id: Uuid,
    user_id: String,
    author_name: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StorageError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = u8::try_from(row.rating)
            .ok()
            .and_then(|r| Rating::new(r).ok())
            .ok_or_else(|| StorageError::InvalidRow(format!("review rating {}", row.rating)))?;
        Ok(Review {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            author_name: row.author_name,
            rating,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    shipping_address: Option<Json<ShippingAddress>>,
    payment_method: Option<String>,
}

const ORDER_COLUMNS: &str = "id, user_id, items, items_price, shipping_price, total, shipping_address, payment_method, status, is_paid, paid_at, is_delivered, delivered_at, confirmed_at, created_at, updated_at";

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert(&self, o: &Order) -> StorageResult<()> {
        sqlx::query(&format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"))
            .bind(o.id.as_str()).bind(&o.user_id).bind(Json(&o.items)).bind(o.items_price).bind(o.shipping_price).bind(o.total)
            .bind(Json(&o.shipping_address)).bind(o.payment_method.as_str()).bind(o.status.as_str()).bind(o.is_paid).bind(o.paid_at)
            .bind(o.is_delivered).bind(o.delivered_at).bind(o.confirmed_at).bind(o.created_at).bind(o.updated_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> StorageResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_str()).fetch_optional(&self.db).await?
            .map(Order::try_from).transpose()
    }

    async fn list(&self, page: Page) -> StorageResult<(Vec<Order>, u64)> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2"))
            .bind(i64::from(page.per_page)).bind(page.offset() as i64).fetch_all(&self.db).await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&self.db).await?;
        Ok((orders_from(rows)?, total.0.max(0) as u64))
    }

    async fn list_for_user(&self, user_id: &str) -> StorageResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"))
            .bind(user_id).fetch_all(&self.db).await?;
        orders_from(rows)
    }

    async fn update(&self, o: &Order) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $2, is_paid = $3, paid_at = $4, is_delivered = $5, delivered_at = $6, confirmed_at = $7, updated_at = $8 WHERE id = $1")
            .bind(o.id.as_str()).bind(o.status.as_str()).bind(o.is_paid).bind(o.paid_at).bind(o.is_delivered).bind(o.delivered_at)
            .bind(o.confirmed_at).bind(o.updated_at)
            .execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &OrderId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id.as_str()).execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }
}

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, category_id, images, count_in_stock, is_featured, status, created_at, updated_at";
const PRODUCT_FILTER: &str = "($1 OR status = 'active') AND ($2::uuid IS NULL OR category_id = $2) AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%' OR description ILIKE '%' || $3 || '%')";

#[async_trait]
impl CatalogRepository for PgStore {
    async fn list_products(&self, filter: &ProductFilter, page: Page) -> StorageResult<(Vec<Product>, u64)> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {PRODUCT_FILTER} ORDER BY created_at DESC LIMIT $4 OFFSET $5"))
            .bind(filter.include_hidden).bind(filter.category_id).bind(filter.search.as_deref())
            .bind(i64::from(page.per_page)).bind(page.offset() as i64)
            .fetch_all(&self.db).await?;
        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products WHERE {PRODUCT_FILTER}"))
            .bind(filter.include_hidden).bind(filter.category_id).bind(filter.search.as_deref())
            .fetch_one(&self.db).await?;
        let products = rows.into_iter().map(Product::try_from).collect::<StorageResult<Vec<_>>>()?;
        Ok((products, total.0.max(0) as u64))
    }

    async fn get_product(&self, id: Uuid) -> StorageResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.db).await?
            .map(Product::try_from).transpose()
    }

    async fn insert_product(&self, p: &Product) -> StorageResult<()> {
        sqlx::query(&format!("INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"))
            .bind(p.id).bind(&p.name).bind(p.slug.as_str()).bind(&p.description).bind(p.price).bind(p.category_id).bind(&p.images)
            .bind(i32::try_from(p.count_in_stock).unwrap_or(i32::MAX)).bind(p.is_featured).bind(p.status.as_str()).bind(p.created_at).bind(p.updated_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn update_product(&self, p: &Product) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE products SET name = $2, slug = $3, description = $4, price = $5, category_id = $6, images = $7, count_in_stock = $8, is_featured = $9, status = $10, updated_at = $11 WHERE id = $1")
            .bind(p.id).bind(&p.name).bind(p.slug.as_str()).bind(&p.description).bind(p.price).bind(p.category_id).bind(&p.images)
            .bind(i32::try_from(p.count_in_stock).unwrap_or(i32::MAX)).bind(p.is_featured).bind(p.status.as_str()).bind(p.updated_at)
            .execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> StorageResult<Vec<Category>> {
        sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug, description, parent_id, image_url, created_at FROM categories ORDER BY name")
            .fetch_all(&self.db).await?
            .into_iter().map(Category::try_from).collect()
    }

    async fn get_category(&self, id: Uuid) -> StorageResult<Option<Category>> {
        sqlx::query_as::<_, CategoryRow>("SELECT id, name, slug, description, parent_id, image_url, created_at FROM categories WHERE id = $1")
            .bind(id).fetch_optional(&self.db).await?
            .map(Category::try_from).transpose()
    }

    async fn insert_category(&self, c: &Category) -> StorageResult<()> {
        sqlx::query("INSERT INTO categories (id, name, slug, description, parent_id, image_url, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(c.id).bind(&c.name).bind(c.slug.as_str()).bind(&c.description).bind(c.parent_id).bind(&c.image_url).bind(c.created_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReviewRepository for PgStore {
    async fn list_for_product(&self, product_id: Uuid) -> StorageResult<Vec<Review>> {
        sqlx::query_as::<_, ReviewRow>("SELECT id, product_id, user_id, author_name, rating, comment, created_at FROM reviews WHERE product_id = $1 ORDER BY created_at DESC")
            .bind(product_id).fetch_all(&self.db).await?
            .into_iter().map(Review::try_from).collect()
    }

    async fn insert(&self, r: &Review) -> StorageResult<()> {
        sqlx::query("INSERT INTO reviews (id, product_id, user_id, author_name, rating, comment, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(r.id).bind(r.product_id).bind(&r.user_id).bind(&r.author_name).bind(i16::from(r.rating.value())).bind(&r.comment).bind(r.created_at)
            .execute(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(&self.db).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn get(&self, user_id: &str) -> StorageResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT user_id, shipping_address, payment_method FROM user_profiles WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.db).await?;
        row.map(|r| -> StorageResult<UserProfile> {
            let payment_method = match r.payment_method {
                Some(m) => Some(PaymentMethod::parse(&m).ok_or_else(|| StorageError::InvalidRow(format!("payment method {m}")))?),
                None => None,
            };
            Ok(UserProfile { user_id: r.user_id, shipping_address: r.shipping_address.map(|a| a.0), payment_method })
        })
        .transpose()
    }

    async fn save_shipping_address(&self, user_id: &str, address: &ShippingAddress) -> StorageResult<()> {
        sqlx::query("INSERT INTO user_profiles (user_id, shipping_address, updated_at) VALUES ($1, $2, NOW()) ON CONFLICT (user_id) DO UPDATE SET shipping_address = EXCLUDED.shipping_address, updated_at = NOW()")
            .bind(user_id).bind(Json(address)).execute(&self.db).await?;
        Ok(())
    }

    async fn save_payment_method(&self, user_id: &str, method: PaymentMethod) -> StorageResult<()> {
        sqlx::query("INSERT INTO user_profiles (user_id, payment_method, updated_at) VALUES ($1, $2, NOW()) ON CONFLICT (user_id) DO UPDATE SET payment_method = EXCLUDED.payment_method, updated_at = NOW()")
            .bind(user_id).bind(method.as_str()).execute(&self.db).await?;
        Ok(())
    }
}
