//! Saved checkout data per user.

use std::sync::Arc;

use crate::domain::aggregates::{PaymentMethod, ShippingAddress};
use crate::domain::events::{Action, DomainEvent, Topic};
use crate::error::AppResult;
use crate::storage::{ProfileRepository, UserProfile};
use crate::sync::SyncRelay;

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
    relay: Arc<SyncRelay>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileRepository>, relay: Arc<SyncRelay>) -> Self {
        Self { profiles, relay }
    }

    /// A user who never saved anything gets an empty profile.
    pub async fn get(&self, user_id: &str) -> AppResult<UserProfile> {
        Ok(self.profiles.get(user_id).await?.unwrap_or_else(|| UserProfile {
            user_id: user_id.to_string(),
            ..Default::default()
        }))
    }

    pub async fn shipping_address(&self, user_id: &str) -> AppResult<Option<ShippingAddress>> {
        Ok(self.get(user_id).await?.shipping_address)
    }

    pub async fn save_shipping_address(&self, user_id: &str, address: &ShippingAddress) -> AppResult<()> {
        self.profiles.save_shipping_address(user_id, address).await?;
        self.relay.publish(DomainEvent::new(Topic::User, Action::Updated, user_id));
        tracing::info!(user_id, "Shipping address saved");
        Ok(())
    }

    pub async fn payment_method(&self, user_id: &str) -> AppResult<Option<PaymentMethod>> {
        Ok(self.get(user_id).await?.payment_method)
    }

    pub async fn save_payment_method(&self, user_id: &str, method: PaymentMethod) -> AppResult<()> {
        self.profiles.save_payment_method(user_id, method).await?;
        self.relay.publish(DomainEvent::new(Topic::User, Action::Updated, user_id));
        tracing::info!(user_id, method = method.as_str(), "Payment method saved");
        Ok(())
    }
}
