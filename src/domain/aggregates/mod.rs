//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartError, CartItem};
pub use order::{NewOrder, Order, OrderError, OrderItem, OrderStatus, PaymentMethod, ShippingAddress};
pub use product::{Category, Product, ProductDraft, ProductError, ProductStatus, Review};
