//! Value Objects for the storefront

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order identifier of the form `ORD-<unix-millis>-<8 hex>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(format!("ORD-{}-{:08x}", now.timestamp_millis(), rand::random::<u32>()))
    }

    pub fn parse(value: &str) -> Result<Self, OrderIdError> {
        let mut parts = value.splitn(3, '-');
        let (Some("ORD"), Some(ts), Some(suffix)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(OrderIdError::Malformed);
        };
        if ts.is_empty() || !ts.bytes().all(|b| b.is_ascii_digit()) { return Err(OrderIdError::Malformed); }
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) { return Err(OrderIdError::Malformed); }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderIdError { Malformed }
impl std::error::Error for OrderIdError {}
impl fmt::Display for OrderIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Malformed order id") }
}

/// URL slug derived from a display name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(name.len());
        let mut pending_dash = false;
        for c in name.trim().chars().flat_map(char::to_lowercase) {
            if c.is_alphanumeric() {
                if pending_dash && !slug.is_empty() { slug.push('-'); }
                pending_dash = false;
                slug.push(c);
            } else {
                pending_dash = true;
            }
        }
        if slug.is_empty() { return Err(SlugError::Empty); }
        if slug.len() > 120 { return Err(SlugError::TooLong); }
        Ok(Self(slug))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SlugError { Empty, TooLong }
impl std::error::Error for SlugError {}
impl fmt::Display for SlugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "Name has no usable characters"), Self::TooLong => write!(f, "Name too long") }
    }
}

/// Review rating, 1 to 5 stars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (1..=5).contains(&value) { Ok(Self(value)) } else { Err(RatingError::OutOfRange(value)) }
    }
    pub fn value(self) -> u8 { self.0 }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;
    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self { r.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum RatingError { OutOfRange(u8) }
impl std::error::Error for RatingError {}
impl fmt::Display for RatingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::OutOfRange(v) => write!(f, "Rating {v} is outside 1..=5") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_order_id_shape() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let id = OrderId::at(now);
        assert!(id.as_str().starts_with("ORD-1700000000123-"));
        assert_eq!(id.as_str().len(), "ORD-1700000000123-".len() + 8);
        assert_eq!(OrderId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn test_order_id_parse_rejects_garbage() {
        assert_eq!(OrderId::parse("ORD-abc-1234"), Err(OrderIdError::Malformed));
        assert_eq!(OrderId::parse("INV-1-2"), Err(OrderIdError::Malformed));
        assert_eq!(OrderId::parse("ORD-12"), Err(OrderIdError::Malformed));
    }

    #[test]
    fn test_slug() {
        assert_eq!(Slug::from_name("  Hand-Woven  Baskets & Mats ").unwrap().as_str(), "hand-woven-baskets-mats");
        assert_eq!(Slug::from_name("!!!"), Err(SlugError::Empty));
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert!(serde_json::from_str::<Rating>("6").is_err());
    }
}
