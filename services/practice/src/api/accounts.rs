//! Sign-up and sign-in handlers.
use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::types::{SignUpRequest, TokenRequest};
use crate::app::AppState;
use crate::model::{Account, Session};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

#[utoipa::path(
    post,
    path = "/signup",
    tag = "accounts",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignUpRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state
        .accounts
        .sign_up(body.email, body.password, body.data)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    post,
    path = "/token",
    tag = "accounts",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Session issued", body = Session),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TokenRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state.accounts.sign_in(body.email, body.password).await?;
    Ok(Json(session))
}
