use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use super::extract::{Identity, ValidatedJson};
use crate::domain::checkout::CheckoutStep;
use crate::services::CheckoutOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateStepRequest {
    pub target_step: CheckoutStep,
    #[validate(length(max = 4096))]
    pub token: Option<String>,
}

/// Redirects are answers, not errors: both outcomes are 200.
pub async fn validate(
    State(s): State<AppState>,
    Identity(caller): Identity,
    ValidatedJson(r): ValidatedJson<ValidateStepRequest>,
) -> Json<CheckoutOutcome> {
    Json(s.checkout().validate(caller.as_deref(), r.target_step, r.token.as_deref()).await)
}
