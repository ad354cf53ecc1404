//! HTTP API request/response types.
//!
//! # Purpose
//! Payload shapes for the REST API and OpenAPI schema generation. Request
//! fields are optional where the service layer reports missing values as
//! validation errors.
use crate::model::Account;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub version: String,
    pub storage: String,
    pub durable: bool,
    pub identity: String,
    pub notifications: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct SignUpRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    /// Free-form profile metadata, conventionally `{ "name": ... }`.
    #[schema(value_type = Option<Object>)]
    pub data: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct BookingStatusRequest {
    /// One of `pending`, `confirmed`, `cancelled`.
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct CreateAdminRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// `status` is `created` (with `account`) or `already_exists` (with `email`).
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateAdminResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdminRequest {
    pub old_email: Option<String>,
    pub new_email: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdminResponse {
    pub message: String,
    pub new_email: String,
}
