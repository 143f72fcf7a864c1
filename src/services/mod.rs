//! Application services: domain rules plus persistence plus sync fan-out.

pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod profile;

pub use catalog::{CatalogService, NewCategory, NewReview};
pub use checkout::{CheckoutOutcome, CheckoutService};
pub use orders::{OrderService, OrderUpdate, PlacedOrder};
pub use profile::ProfileService;
