//! Admin bootstrap handlers.
//!
//! # Purpose
//! Provision and move the practice owner's account without going through the
//! public sign-up flow.
//!
//! # Security
//! - Both routes return 404 `not_enabled` when bootstrap is switched off.
//! - When a bootstrap token is configured, `X-Bootstrap-Token` must match it
//!   (constant-time compare).
//! - Provisioned accounts are tagged `role: admin` but gain no rights from
//!   it; admin rights come from the allowlist.
use crate::api::error::{ApiError, api_not_enabled, api_unauthorized};
use crate::api::extract::ApiJson;
use crate::api::types::{
    CreateAdminRequest, CreateAdminResponse, UpdateAdminRequest, UpdateAdminResponse,
};
use crate::app::AppState;
use crate::service::accounts::AdminProvisioning;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

pub const BOOTSTRAP_TOKEN_HEADER: &str = "X-Bootstrap-Token";

#[utoipa::path(
    post,
    path = "/create-admin",
    tag = "bootstrap",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin account created", body = CreateAdminResponse),
        (status = 200, description = "Account already exists", body = CreateAdminResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid bootstrap token"),
        (status = 404, description = "Not enabled")
    )
)]
pub async fn create_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<CreateAdminRequest>,
) -> Result<(StatusCode, Json<CreateAdminResponse>), ApiError> {
    ensure_bootstrap_authorized(&state, &headers)?;
    let outcome = state
        .accounts
        .create_admin_account(body.email, body.password, body.name)
        .await?;
    Ok(match outcome {
        AdminProvisioning::Created(account) => (
            StatusCode::CREATED,
            Json(CreateAdminResponse {
                status: "created".to_string(),
                account: Some(account),
                email: None,
            }),
        ),
        AdminProvisioning::AlreadyExists { email } => (
            StatusCode::OK,
            Json(CreateAdminResponse {
                status: "already_exists".to_string(),
                account: None,
                email: Some(email),
            }),
        ),
    })
}

#[utoipa::path(
    put,
    path = "/update-admin",
    tag = "bootstrap",
    request_body = UpdateAdminRequest,
    responses(
        (status = 200, description = "Admin credentials updated", body = UpdateAdminResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid bootstrap token"),
        (status = 404, description = "Not enabled, or no account with oldEmail"),
        (status = 409, description = "newEmail belongs to another account")
    )
)]
pub async fn update_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<UpdateAdminRequest>,
) -> Result<Json<UpdateAdminResponse>, ApiError> {
    ensure_bootstrap_authorized(&state, &headers)?;
    let account = state
        .accounts
        .update_admin_account(body.old_email, body.new_email, body.new_password)
        .await?;
    Ok(Json(UpdateAdminResponse {
        message: "admin account updated".to_string(),
        new_email: account.email,
    }))
}

fn ensure_bootstrap_authorized(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if !state.bootstrap.enabled {
        return Err(api_not_enabled("bootstrap not enabled"));
    }
    let Some(expected) = state.bootstrap.token.as_deref() else {
        return Ok(());
    };
    let token = match headers.get(BOOTSTRAP_TOKEN_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| api_unauthorized("invalid bootstrap token"))?,
        None => return Err(api_unauthorized("missing bootstrap token")),
    };
    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(api_unauthorized("invalid bootstrap token"));
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_compares_length_and_content() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret-longer"));
    }
}
