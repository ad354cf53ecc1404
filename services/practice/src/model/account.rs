//! User account records owned by the identity backend.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Metadata `role` value written on admin-provisioned accounts. Informational
/// only; authorization comes from the configured allowlist.
pub const ADMIN_ROLE_HINT: &str = "admin";

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// `metadata.name` when present, otherwise the email.
    pub fn display_name(&self) -> String {
        self.metadata
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.email.clone())
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: Account,
}
