//! Server side of the checkout step gate.
//!
//! The address prerequisite is read from the profile store on every call
//! rather than trusted from the token. A failed read counts as "no address".
//! Tokens are tied to the user's order count, so placing an order ends the
//! checkout it came from.

use std::sync::Arc;

use serde::Serialize;

use crate::checkout_token::CheckoutTokens;
use crate::domain::checkout::{CheckoutState, CheckoutStep, Prerequisites, Redirect, Transition};
use crate::storage::{OrderRepository, ProfileRepository};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CheckoutOutcome {
    #[serde(rename_all = "camelCase")]
    Proceed {
        step: CheckoutStep,
        state: CheckoutState,
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    Redirect {
        redirect_to: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<CheckoutStep>,
    },
}

#[derive(Clone)]
pub struct CheckoutService {
    profiles: Arc<dyn ProfileRepository>,
    orders: Arc<dyn OrderRepository>,
    tokens: CheckoutTokens,
}

impl CheckoutService {
    pub fn new(profiles: Arc<dyn ProfileRepository>, orders: Arc<dyn OrderRepository>, tokens: CheckoutTokens) -> Self {
        Self { profiles, orders, tokens }
    }

    async fn orders_placed(&self, user_id: Option<&str>) -> Option<u64> {
        let Some(user_id) = user_id else {
            return Some(0);
        };
        match self.orders.list_for_user(user_id).await {
            Ok(orders) => Some(orders.len() as u64),
            Err(e) => {
                tracing::warn!(error = %e, user_id, "Order lookup failed, discarding checkout progress");
                None
            }
        }
    }

    async fn prerequisites(&self, user_id: Option<&str>) -> Prerequisites {
        let Some(user_id) = user_id else {
            return Prerequisites::default();
        };
        match self.profiles.get(user_id).await {
            Ok(Some(profile)) => Prerequisites {
                has_shipping_address: profile.shipping_address.is_some(),
                has_payment_method: profile.payment_method.is_some(),
            },
            Ok(None) => Prerequisites::default(),
            Err(e) => {
                tracing::warn!(error = %e, user_id, "Profile lookup failed, treating checkout data as absent");
                Prerequisites::default()
            }
        }
    }

    pub async fn validate(&self, user_id: Option<&str>, target: CheckoutStep, token: Option<&str>) -> CheckoutOutcome {
        let owner = user_id.unwrap_or_default();
        let orders_placed = self.orders_placed(user_id).await;
        let mut state = token
            .zip(orders_placed)
            .and_then(|(t, placed)| self.tokens.verify(owner, placed, t))
            .unwrap_or_default();
        let prerequisites = self.prerequisites(user_id).await;

        match state.validate_and_proceed(target, user_id.is_some(), prerequisites) {
            Transition::Proceed(step) => {
                let token = self.tokens.issue(owner, orders_placed, &state);
                CheckoutOutcome::Proceed { step, state, token }
            }
            Transition::Redirect(redirect) => {
                tracing::debug!(target_step = %target, redirect = %redirect.href(), "Checkout step gated");
                let step = match &redirect {
                    Redirect::Step(step) => Some(*step),
                    Redirect::SignIn { .. } => None,
                };
                CheckoutOutcome::Redirect { redirect_to: redirect.href(), step }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::{address, new_order};
    use crate::domain::aggregates::{Order, PaymentMethod, ShippingAddress};
    use crate::storage::file::FileStore;
    use crate::storage::{Repositories, StorageError, StorageResult, UserProfile};
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    struct BrokenProfiles;

    #[async_trait]
    impl ProfileRepository for BrokenProfiles {
        async fn get(&self, _: &str) -> StorageResult<Option<UserProfile>> {
            Err(StorageError::InvalidRow("unreachable backend".into()))
        }
        async fn save_shipping_address(&self, _: &str, _: &ShippingAddress) -> StorageResult<()> {
            Ok(())
        }
        async fn save_payment_method(&self, _: &str, _: PaymentMethod) -> StorageResult<()> {
            Ok(())
        }
    }

    fn tokens() -> CheckoutTokens {
        CheckoutTokens::new(b"checkout-test-secret".to_vec())
    }

    async fn service(dir: &std::path::Path) -> (CheckoutService, Repositories) {
        let repos = Repositories::from_store(FileStore::open(dir).await.unwrap());
        repos.profiles.save_shipping_address("u1", &address()).await.unwrap();
        (CheckoutService::new(repos.profiles.clone(), repos.orders.clone(), tokens()), repos)
    }

    fn token_of(outcome: &CheckoutOutcome) -> String {
        match outcome {
            CheckoutOutcome::Proceed { token, .. } => token.clone(),
            CheckoutOutcome::Redirect { redirect_to, .. } => panic!("unexpected redirect to {redirect_to}"),
        }
    }

    #[tokio::test]
    async fn test_full_walk_with_saved_address() {
        let dir = tempfile::tempdir().unwrap();
        let (checkout, _) = service(dir.path()).await;

        let mut token: Option<String> = None;
        for step in CheckoutStep::ALL {
            let outcome = checkout.validate(Some("u1"), step, token.as_deref()).await;
            token = Some(token_of(&outcome));
        }
        let CheckoutOutcome::Proceed { state, .. } = checkout.validate(Some("u1"), CheckoutStep::PaymentProcessing, token.as_deref()).await else {
            panic!("expected proceed");
        };
        assert_eq!(state.completed_steps.len(), 4);
    }

    #[tokio::test]
    async fn test_storage_failure_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let repos = Repositories::from_store(FileStore::open(dir.path()).await.unwrap());
        let checkout = CheckoutService::new(Arc::new(BrokenProfiles), repos.orders, tokens());
        let outcome = checkout.validate(Some("u1"), CheckoutStep::Payment, None).await;
        assert_eq!(
            outcome,
            CheckoutOutcome::Redirect { redirect_to: "/shipping".into(), step: Some(CheckoutStep::Shipping) }
        );
    }

    #[tokio::test]
    async fn test_anonymous_redirects_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let repos = Repositories::from_store(FileStore::open(dir.path()).await.unwrap());
        let checkout = CheckoutService::new(Arc::new(BrokenProfiles), repos.orders, tokens());
        let outcome = checkout.validate(None, CheckoutStep::Shipping, None).await;
        assert_eq!(
            outcome,
            CheckoutOutcome::Redirect { redirect_to: "/login?callbackUrl=%2Fshipping".into(), step: None }
        );
    }

    #[tokio::test]
    async fn test_foreign_token_starts_over() {
        let dir = tempfile::tempdir().unwrap();
        let (checkout, _) = service(dir.path()).await;

        let u1_token = token_of(&checkout.validate(Some("u1"), CheckoutStep::PlaceOrder, None).await);
        let outcome = checkout.validate(Some("u2"), CheckoutStep::PaymentProcessing, Some(&u1_token)).await;
        assert!(matches!(outcome, CheckoutOutcome::Redirect { step: Some(CheckoutStep::Shipping), .. }));
    }

    #[tokio::test]
    async fn test_token_from_finished_checkout_cannot_be_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let (checkout, repos) = service(dir.path()).await;

        let mut token: Option<String> = None;
        for step in CheckoutStep::ALL {
            token = Some(token_of(&checkout.validate(Some("u1"), step, token.as_deref()).await));
        }
        let mut input = new_order(Decimal::new(11498, 2));
        input.user_id = "u1".into();
        repos.orders.insert(&Order::place(input).unwrap()).await.unwrap();

        let replay = checkout.validate(Some("u1"), CheckoutStep::PaymentProcessing, token.as_deref()).await;
        assert_eq!(
            replay,
            CheckoutOutcome::Redirect { redirect_to: "/shipping".into(), step: Some(CheckoutStep::Shipping) }
        );
    }
}
