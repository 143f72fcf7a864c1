//! Domain layer: aggregates, value objects, events and the checkout tracker.
pub mod aggregates;
pub mod checkout;
pub mod events;
pub mod value_objects;
