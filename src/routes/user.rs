use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::extract::{RequireUser, ValidatedJson};
use crate::domain::aggregates::{PaymentMethod, ShippingAddress};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodBody {
    pub payment_method: PaymentMethod,
}

pub async fn get_shipping_address(State(s): State<AppState>, RequireUser(user_id): RequireUser) -> AppResult<Json<ShippingAddress>> {
    s.profiles().shipping_address(&user_id).await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("shipping address".to_string()))
}

pub async fn save_shipping_address(
    State(s): State<AppState>,
    RequireUser(user_id): RequireUser,
    ValidatedJson(address): ValidatedJson<ShippingAddress>,
) -> AppResult<Json<ShippingAddress>> {
    s.profiles().save_shipping_address(&user_id, &address).await?;
    Ok(Json(address))
}

pub async fn get_payment_method(State(s): State<AppState>, RequireUser(user_id): RequireUser) -> AppResult<Json<PaymentMethodBody>> {
    s.profiles().payment_method(&user_id).await?
        .map(|payment_method| Json(PaymentMethodBody { payment_method }))
        .ok_or_else(|| AppError::NotFound("payment method".to_string()))
}

pub async fn save_payment_method(
    State(s): State<AppState>,
    RequireUser(user_id): RequireUser,
    ValidatedJson(body): ValidatedJson<PaymentMethodBody>,
) -> AppResult<Json<PaymentMethodBody>> {
    s.profiles().save_payment_method(&user_id, body.payment_method).await?;
    Ok(Json(body))
}
