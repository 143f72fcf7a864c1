//! Signed checkout progress tokens.
//!
//! The checkout state travels with the client but cannot be forged: the
//! token is `base64url(json) "." base64url(hmac-sha256(json))`, and the
//! payload is bound to the user it was issued for.
//!
//! A token also records when it was issued and how many orders the user had
//! placed at the time. It stops verifying once it is older than the TTL or
//! the user places another order, so a finished checkout cannot be replayed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::checkout::CheckoutState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    user_id: String,
    /// `None` when the count could not be read; such a token never verifies.
    orders_placed: Option<u64>,
    issued_at: i64,
    state: CheckoutState,
}

#[derive(Clone)]
pub struct CheckoutTokens {
    key: Vec<u8>,
    ttl: Duration,
}

impl CheckoutTokens {
    pub const DEFAULT_TTL_MINUTES: i64 = 120;

    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into(), ttl: Duration::minutes(Self::DEFAULT_TTL_MINUTES) }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
    }

    pub fn issue(&self, user_id: &str, orders_placed: Option<u64>, state: &CheckoutState) -> String {
        self.issue_at(user_id, orders_placed, state, Utc::now())
    }

    fn issue_at(&self, user_id: &str, orders_placed: Option<u64>, state: &CheckoutState, now: DateTime<Utc>) -> String {
        let payload = Payload { user_id: user_id.to_string(), orders_placed, issued_at: now.timestamp(), state: state.clone() };
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        let mut mac = self.mac();
        mac.update(&json);
        let signature = mac.finalize().into_bytes();
        format!("{}.{}", URL_SAFE_NO_PAD.encode(&json), URL_SAFE_NO_PAD.encode(signature))
    }

    /// The state carried by `token`, or `None` when it is malformed, forged,
    /// expired, issued to someone else, or predates the user's latest order.
    pub fn verify(&self, user_id: &str, orders_placed: u64, token: &str) -> Option<CheckoutState> {
        self.verify_at(user_id, orders_placed, token, Utc::now())
    }

    fn verify_at(&self, user_id: &str, orders_placed: u64, token: &str, now: DateTime<Utc>) -> Option<CheckoutState> {
        let (body, signature) = token.split_once('.')?;
        let json = URL_SAFE_NO_PAD.decode(body).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(&json);
        mac.verify_slice(&signature).ok()?;
        let payload: Payload = serde_json::from_slice(&json).ok()?;
        let issued_at = DateTime::<Utc>::from_timestamp(payload.issued_at, 0)?;
        let fresh = issued_at <= now && now - issued_at <= self.ttl;
        let current = payload.orders_placed == Some(orders_placed);
        (payload.user_id == user_id && fresh && current).then_some(payload.state)
    }
}
