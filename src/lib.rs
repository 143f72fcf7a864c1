//! Handicraft Storefront Backend
//!
//! Catalog, checkout gating and order records for a small handicraft shop
//! that confirms orders by WhatsApp instead of taking card payments.
//!
//! ## Features
//! - Product catalog with categories and customer reviews
//! - Saved shipping address and payment method per user
//! - Server-side checkout step gate with signed progress tokens
//! - Order records with admin status transitions
//! - Sync relay (poll, SSE, optional NATS) for connected clients

pub mod checkout_token;
pub mod config;
pub mod domain;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod sync;
pub mod whatsapp;

pub use config::{Config, ConfigError, LogFormat};
pub use error::{AppError, AppResult};
pub use routes::router;
pub use state::AppState;
