//! Application state shared across handlers.

use std::sync::Arc;

use crate::checkout_token::CheckoutTokens;
use crate::config::Config;
use crate::services::{CatalogService, CheckoutService, OrderService, ProfileService};
use crate::storage::file::FileStore;
use crate::storage::postgres::PgStore;
use crate::storage::{Repositories, StorageError};
use crate::sync::{NatsSink, SyncRelay};
use crate::whatsapp::WhatsApp;

/// Built once in `main` and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub relay: Arc<SyncRelay>,
    pub tokens: CheckoutTokens,
    pub whatsapp: Option<WhatsApp>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    /// Wire the state from configuration. Optional integrations turn on
    /// when their settings are present and stay off (with a log line) otherwise.
    pub async fn from_config(config: &Config) -> Result<Self, StorageError> {
        let repos = match &config.database_url {
            Some(url) => Repositories::from_store(PgStore::connect(url).await?),
            None => Repositories::from_store(FileStore::open(&config.data_dir).await?),
        };

        let nats = match &config.nats {
            Some(nats) => match async_nats::connect(nats.url.as_str()).await {
                Ok(client) => {
                    tracing::info!(url = %nats.url, "Publishing sync events to NATS");
                    Some(NatsSink::new(client, nats.subject_prefix.clone()))
                }
                Err(e) => {
                    tracing::warn!(error = %e, url = %nats.url, "NATS unavailable, sync events stay local");
                    None
                }
            },
            None => None,
        };

        Ok(Self::new(repos, SyncRelay::new(config.sync_buffer, nats), config))
    }

    pub fn new(repos: Repositories, relay: Arc<SyncRelay>, config: &Config) -> Self {
        if config.whatsapp.is_none() {
            tracing::info!("WHATSAPP_NUMBER not set, orders are created without a confirmation link");
        }
        if config.admin_token.is_none() {
            tracing::warn!("ADMIN_TOKEN not set, admin routes are unprotected");
        }
        Self {
            repos,
            relay,
            tokens: CheckoutTokens::new(config.checkout_secret.clone()),
            whatsapp: config.whatsapp.as_ref().map(WhatsApp::new),
            admin_token: config.admin_token.as_deref().map(Arc::from),
        }
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.repos.orders.clone(), self.relay.clone(), self.whatsapp.clone())
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.repos.catalog.clone(), self.repos.reviews.clone(), self.relay.clone())
    }

    pub fn profiles(&self) -> ProfileService {
        ProfileService::new(self.repos.profiles.clone(), self.relay.clone())
    }

    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(self.repos.profiles.clone(), self.repos.orders.clone(), self.tokens.clone())
    }
}
