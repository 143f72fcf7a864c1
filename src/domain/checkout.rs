//! Checkout step tracker.
//!
//! The checkout is a fixed pipeline:
//!
//! ```text
//! cart → shipping → payment → place-order → payment-processing
//! ```
//!
//! A step is reachable only when its prerequisites hold. A failed
//! prerequisite is not an error: the shopper is sent back to the earliest
//! unmet step, or to sign-in when there is no identity.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckoutStep {
    Cart,
    Shipping,
    Payment,
    PlaceOrder,
    PaymentProcessing,
}

impl CheckoutStep {
    pub const ALL: [CheckoutStep; 5] = [
        Self::Cart,
        Self::Shipping,
        Self::Payment,
        Self::PlaceOrder,
        Self::PaymentProcessing,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Cart => 0,
            Self::Shipping => 1,
            Self::Payment => 2,
            Self::PlaceOrder => 3,
            Self::PaymentProcessing => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::PlaceOrder => "place-order",
            Self::PaymentProcessing => "payment-processing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Storefront path of the screen for this step.
    pub fn path(self) -> String {
        format!("/{}", self.as_str())
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one shopper through the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutState {
    pub has_shipping_address: bool,
    pub has_payment_method: bool,
    pub current_step_index: usize,
    pub completed_steps: BTreeSet<CheckoutStep>,
    pub last_validated_step: Option<CheckoutStep>,
}

/// Facts re-derived from persisted data before each transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prerequisites {
    pub has_shipping_address: bool,
    pub has_payment_method: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Redirect {
    SignIn { callback_url: String },
    Step(CheckoutStep),
}

impl Redirect {
    pub fn href(&self) -> String {
        match self {
            Self::SignIn { callback_url } => {
                format!("/login?callbackUrl={}", urlencoding::encode(callback_url))
            }
            Self::Step(step) => step.path(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Proceed(CheckoutStep),
    Redirect(Redirect),
}

impl Transition {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed(_))
    }
}

impl CheckoutState {
    pub fn is_completed(&self, step: CheckoutStep) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Gate a move to `target`. Only a `Proceed` outcome mutates the
    /// completed set; the prerequisite flags are always refreshed.
    pub fn validate_and_proceed(
        &mut self,
        target: CheckoutStep,
        authenticated: bool,
        prerequisites: Prerequisites,
    ) -> Transition {
        self.has_shipping_address = prerequisites.has_shipping_address;
        self.has_payment_method = prerequisites.has_payment_method;

        if !authenticated && target != CheckoutStep::Cart {
            return Transition::Redirect(Redirect::SignIn {
                callback_url: target.path(),
            });
        }

        let completes = match target {
            CheckoutStep::Cart => None,
            CheckoutStep::Shipping => Some(CheckoutStep::Cart),
            CheckoutStep::Payment => {
                if !self.has_shipping_address {
                    return Transition::Redirect(Redirect::Step(CheckoutStep::Shipping));
                }
                Some(CheckoutStep::Shipping)
            }
            // Payment method is not required: orders are confirmed over WhatsApp.
            CheckoutStep::PlaceOrder => {
                if !self.has_shipping_address {
                    return Transition::Redirect(Redirect::Step(CheckoutStep::Shipping));
                }
                Some(CheckoutStep::Payment)
            }
            CheckoutStep::PaymentProcessing => {
                if !self.has_shipping_address || !self.is_completed(CheckoutStep::Shipping) {
                    return Transition::Redirect(Redirect::Step(CheckoutStep::Shipping));
                }
                if !self.is_completed(CheckoutStep::Payment) {
                    return Transition::Redirect(Redirect::Step(CheckoutStep::Payment));
                }
                Some(CheckoutStep::PlaceOrder)
            }
        };

        if let Some(step) = completes {
            self.completed_steps.insert(step);
        }
        self.current_step_index = target.index();
        self.last_validated_step = Some(target);
        Transition::Proceed(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const READY: Prerequisites = Prerequisites {
        has_shipping_address: true,
        has_payment_method: false,
    };
    const NO_ADDRESS: Prerequisites = Prerequisites {
        has_shipping_address: false,
        has_payment_method: false,
    };

    #[test]
    fn test_happy_path_in_order() {
        let mut state = CheckoutState::default();
        let mut previous = 0;
        for step in CheckoutStep::ALL {
            assert_eq!(state.validate_and_proceed(step, true, READY), Transition::Proceed(step));
            assert!(state.completed_steps.len() >= previous);
            previous = state.completed_steps.len();
            assert_eq!(state.last_validated_step, Some(step));
            assert_eq!(state.current_step_index, step.index());
        }
        assert_eq!(
            state.completed_steps.iter().copied().collect::<Vec<_>>(),
            vec![
                CheckoutStep::Cart,
                CheckoutStep::Shipping,
                CheckoutStep::Payment,
                CheckoutStep::PlaceOrder
            ]
        );
    }

    #[test]
    fn test_anonymous_is_sent_to_sign_in() {
        let mut state = CheckoutState::default();
        assert!(state.validate_and_proceed(CheckoutStep::Cart, false, NO_ADDRESS).is_proceed());

        let outcome = state.validate_and_proceed(CheckoutStep::Payment, false, READY);
        let Transition::Redirect(redirect) = outcome else {
            panic!("expected redirect");
        };
        assert_eq!(redirect.href(), "/login?callbackUrl=%2Fpayment");
        assert!(state.completed_steps.is_empty());
    }

    #[test]
    fn test_place_order_ignores_payment_method() {
        let mut state = CheckoutState::default();
        let outcome = state.validate_and_proceed(CheckoutStep::PlaceOrder, true, READY);
        assert_eq!(outcome, Transition::Proceed(CheckoutStep::PlaceOrder));
        assert!(state.is_completed(CheckoutStep::Payment));
    }

    #[test]
    fn test_processing_needs_shipping_and_payment_done() {
        let mut state = CheckoutState::default();
        assert_eq!(
            state.validate_and_proceed(CheckoutStep::PaymentProcessing, true, READY),
            Transition::Redirect(Redirect::Step(CheckoutStep::Shipping))
        );
        state.validate_and_proceed(CheckoutStep::Payment, true, READY);
        assert_eq!(
            state.validate_and_proceed(CheckoutStep::PaymentProcessing, true, READY),
            Transition::Redirect(Redirect::Step(CheckoutStep::Payment))
        );
        state.validate_and_proceed(CheckoutStep::PlaceOrder, true, READY);
        assert!(state
            .validate_and_proceed(CheckoutStep::PaymentProcessing, true, READY)
            .is_proceed());
    }

    #[test]
    fn test_step_names_round_trip() {
        for step in CheckoutStep::ALL {
            assert_eq!(CheckoutStep::parse(step.as_str()), Some(step));
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
        assert_eq!(CheckoutStep::parse("review"), None);
    }

    fn any_step() -> impl Strategy<Value = CheckoutStep> {
        (0usize..5).prop_map(|i| CheckoutStep::ALL[i])
    }

    proptest! {
        #[test]
        fn missing_address_always_redirects_to_shipping(
            warmup in proptest::collection::vec(any_step(), 0..8),
            target in (2usize..5).prop_map(|i| CheckoutStep::ALL[i]),
        ) {
            let mut state = CheckoutState::default();
            for step in warmup {
                state.validate_and_proceed(step, true, READY);
            }
            let outcome = state.validate_and_proceed(target, true, NO_ADDRESS);
            prop_assert_eq!(outcome, Transition::Redirect(Redirect::Step(CheckoutStep::Shipping)));
        }

        #[test]
        fn completed_steps_never_shrink(
            calls in proptest::collection::vec((any_step(), any::<bool>(), any::<bool>()), 0..20),
        ) {
            let mut state = CheckoutState::default();
            for (step, authenticated, has_address) in calls {
                let before = state.completed_steps.clone();
                let prerequisites = Prerequisites { has_shipping_address: has_address, has_payment_method: false };
                state.validate_and_proceed(step, authenticated, prerequisites);
                prop_assert!(before.is_subset(&state.completed_steps));
            }
        }
    }
}
