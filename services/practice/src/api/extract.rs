//! Request extractors: the authenticated caller and JSON bodies.
//!
//! # Key invariants
//! - A missing, malformed or unverifiable bearer token is rejected with 401
//!   before the handler body runs.
//! - An unreachable identity backend is a 500, not a 401.
//! - Any JSON body axum cannot decode is a 400 `validation_error`, including
//!   a missing `Content-Type`.
use crate::api::error::{ApiError, api_internal, api_unauthorized};
use crate::app::AppState;
use crate::auth::extract_bearer;
use crate::auth::principal::Identity;
use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

/// Verified identity of the caller, required by every protected route.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            extract_bearer(&parts.headers).ok_or_else(|| api_unauthorized("missing bearer token"))?;
        match state.identity.verify_token(token).await {
            Ok(Some(identity)) => Ok(Caller(identity)),
            Ok(None) => Err(api_unauthorized("invalid or expired token")),
            Err(err) => Err(api_internal("identity verification failed", &err)),
        }
    }
}

/// JSON request body whose rejections use the API error shape.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
