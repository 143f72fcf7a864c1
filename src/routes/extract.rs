//! Request extractors: caller identity, admin gate, validated JSON bodies.
//!
//! Sessions are issued elsewhere; this service only reads the opaque user id
//! the gateway forwards in `x-user-id`.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The caller, if any.
#[derive(Clone, Debug, Default)]
pub struct Identity(pub Option<String>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(header(parts, USER_ID_HEADER).map(str::to_string)))
    }
}

/// A signed-in caller; 401 otherwise.
#[derive(Clone, Debug)]
pub struct RequireUser(pub String);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header(parts, USER_ID_HEADER)
            .map(|id| Self(id.to_string()))
            .ok_or_else(|| AppError::Unauthorized("sign in required".to_string()))
    }
}

/// Admin gate. Only enforced when `ADMIN_TOKEN` is configured.
#[derive(Clone, Copy, Debug)]
pub struct AdminAccess;

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Ok(Self);
        };
        match header(parts, ADMIN_TOKEN_HEADER) {
            Some(given) if given == expected => Ok(Self),
            _ => {
                tracing::warn!(path = %parts.uri.path(), "Rejected admin request");
                Err(AppError::Unauthorized("admin credential required".to_string()))
            }
        }
    }
}

/// `Json<T>` followed by `validator` checks. Both failures are 400s.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
