//! Catalog aggregates: products, categories and customer reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Rating, Slug, SlugError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub images: Vec<String>,
    pub count_in_stock: u32,
    pub is_featured: bool,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus { Draft, #[default] Active, Archived }

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self { Self::Draft => "draft", Self::Active => "active", Self::Archived => "archived" }
    }
    pub fn parse(value: &str) -> Option<Self> {
        match value { "draft" => Some(Self::Draft), "active" => Some(Self::Active), "archived" => Some(Self::Archived), _ => None }
    }
}

/// Editable product fields, shared by create and full update.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub images: Vec<String>,
    pub count_in_stock: u32,
    pub is_featured: bool,
    pub status: ProductStatus,
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::now_v7(), name: String::new(), slug: Slug::from_name("product")?, description: String::new(),
            price: Decimal::ZERO, category_id: None, images: vec![], count_in_stock: 0, is_featured: false,
            status: ProductStatus::Active, created_at: now, updated_at: now,
        };
        product.apply(draft)?;
        Ok(product)
    }

    pub fn apply(&mut self, draft: ProductDraft) -> Result<(), ProductError> {
        if draft.price.is_sign_negative() { return Err(ProductError::NegativePrice); }
        self.slug = Slug::from_name(&draft.name)?;
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.price = draft.price;
        self.category_id = draft.category_id;
        self.images = draft.images;
        self.count_in_stock = draft.count_in_stock;
        self.is_featured = draft.is_featured;
        self.status = draft.status;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_in_stock(&self) -> bool { self.count_in_stock > 0 }
    pub fn is_visible(&self) -> bool { self.status == ProductStatus::Active }

    /// Case-insensitive match on name and description.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.description.to_lowercase().contains(&needle)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: &str, description: Option<String>, parent_id: Option<Uuid>, image_url: Option<String>) -> Result<Self, ProductError> {
        Ok(Self {
            id: Uuid::now_v7(), name: name.trim().to_string(), slug: Slug::from_name(name)?,
            description, parent_id, image_url, created_at: Utc::now(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: String,
    pub author_name: String,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn create(product_id: Uuid, user_id: impl Into<String>, author_name: impl Into<String>, rating: Rating, comment: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(), product_id, user_id: user_id.into(), author_name: author_name.into(),
            rating, comment: comment.into(), created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { NegativePrice, InvalidName(SlugError) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::NegativePrice => write!(f, "Price cannot be negative"), Self::InvalidName(e) => write!(f, "Invalid name: {e}") }
    }
}
impl From<SlugError> for ProductError {
    fn from(e: SlugError) -> Self { Self::InvalidName(e) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, price: Decimal) -> ProductDraft {
        ProductDraft {
            name: name.into(), description: "Hand-thrown terracotta".into(), price, category_id: None,
            images: vec![], count_in_stock: 3, is_featured: false, status: ProductStatus::Active,
        }
    }

    #[test]
    fn test_product_create() {
        let p = Product::create(draft("Terracotta Vase", Decimal::new(1999, 2))).unwrap();
        assert_eq!(p.slug.as_str(), "terracotta-vase");
        assert!(p.is_in_stock() && p.is_visible());
        assert!(p.matches("TERRACOTTA"));
    }

    #[test]
    fn test_product_rejects_bad_input() {
        assert_eq!(Product::create(draft("Vase", Decimal::new(-1, 0))).unwrap_err(), ProductError::NegativePrice);
        assert!(matches!(Product::create(draft("  ", Decimal::ONE)), Err(ProductError::InvalidName(_))));
    }

    #[test]
    fn test_update_reslugs() {
        let mut p = Product::create(draft("Vase", Decimal::ONE)).unwrap();
        p.apply(draft("Tall Vase", Decimal::TWO)).unwrap();
        assert_eq!(p.slug.as_str(), "tall-vase");
        assert_eq!(p.price, Decimal::TWO);
    }
}
