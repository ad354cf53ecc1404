//! Verified caller identity.
//!
//! # Purpose
//! Carries the token-derived view of the caller that services use for
//! ownership checks and role resolution.
use crate::model::Account;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Identity {
    /// Name to show on records: `metadata.name`, then email, then id.
    pub fn display_name(&self) -> String {
        self.metadata
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: Some(account.email.clone()),
            metadata: account.metadata.clone(),
        }
    }
}
