//! Account sign-up, sign-in and admin bootstrap provisioning.
//!
//! # Key invariants
//! - Accounts are created pre-confirmed; there is no verification step.
//! - A duplicate email on sign-up is [`ServiceError::AlreadyExists`], distinct
//!   from every other failure.
//! - `create_admin_account` is idempotent and never hands back credentials
//!   for an account that already existed.
//! - The `role: "admin"` metadata tag is informational. Admin rights come
//!   only from the configured allowlist.
use super::{ServiceError, ServiceResult, required};
use crate::identity::{IdentityError, IdentityProvider};
use crate::model::{ADMIN_ROLE_HINT, Account, AccountUpdate, NewAccount, Session};
use crate::notify::{NotificationDispatcher, templates};
use serde_json::{Map, Value};
use std::sync::Arc;

const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// Outcome of [`AccountService::create_admin_account`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdminProvisioning {
    Created(Account),
    AlreadyExists { email: String },
}

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    notifications: NotificationDispatcher,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityProvider>, notifications: NotificationDispatcher) -> Self {
        Self {
            identity,
            notifications,
        }
    }

    pub async fn sign_up(
        &self,
        email: Option<String>,
        password: Option<String>,
        metadata: Option<Map<String, Value>>,
    ) -> ServiceResult<Account> {
        let email = required("email", email)?;
        let password = required("password", password)?;
        let account = self
            .identity
            .create_account(NewAccount {
                email,
                password,
                metadata: metadata.unwrap_or_default(),
            })
            .await
            .map_err(log_unexpected("sign up"))?;
        tracing::info!(user_id = %account.id, "account created");

        self.notifications
            .dispatch(templates::welcome(&account.email, &account.display_name()));
        Ok(account)
    }

    pub async fn sign_in(
        &self,
        email: Option<String>,
        password: Option<String>,
    ) -> ServiceResult<Session> {
        let email = required("email", email)?;
        let password = required("password", password)?;
        self.identity
            .sign_in(&email, &password)
            .await
            .map_err(log_unexpected("sign in"))
    }

    pub async fn create_admin_account(
        &self,
        email: Option<String>,
        password: Option<String>,
        name: Option<String>,
    ) -> ServiceResult<AdminProvisioning> {
        let email = required("email", email)?;
        let password = required("password", password)?;
        if self
            .identity
            .find_account_by_email(&email)
            .await
            .map_err(log_unexpected("look up admin"))?
            .is_some()
        {
            return Ok(AdminProvisioning::AlreadyExists { email });
        }

        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string());
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), Value::String(name));
        metadata.insert(
            "role".to_string(),
            Value::String(ADMIN_ROLE_HINT.to_string()),
        );
        match self
            .identity
            .create_account(NewAccount {
                email: email.clone(),
                password,
                metadata,
            })
            .await
        {
            Ok(account) => {
                tracing::info!(user_id = %account.id, "admin account provisioned");
                Ok(AdminProvisioning::Created(account))
            }
            Err(IdentityError::AlreadyExists(_)) => Ok(AdminProvisioning::AlreadyExists { email }),
            Err(err) => Err(log_unexpected("create admin")(err)),
        }
    }

    /// Move an admin account to a new email and password, keeping its id.
    pub async fn update_admin_account(
        &self,
        old_email: Option<String>,
        new_email: Option<String>,
        new_password: Option<String>,
    ) -> ServiceResult<Account> {
        let old_email = required("oldEmail", old_email)?;
        let new_email = required("newEmail", new_email)?;
        let new_password = required("newPassword", new_password)?;

        let account = self
            .identity
            .find_account_by_email(&old_email)
            .await
            .map_err(log_unexpected("look up admin"))?
            .ok_or_else(|| ServiceError::NotFound(format!("no account with email {old_email}")))?;

        let mut metadata = account.metadata.clone();
        metadata.insert(
            "role".to_string(),
            Value::String(ADMIN_ROLE_HINT.to_string()),
        );
        let updated = self
            .identity
            .update_account(
                &account.id,
                AccountUpdate {
                    email: Some(new_email),
                    password: Some(new_password),
                    metadata: Some(metadata),
                },
            )
            .await
            .map_err(log_unexpected("update admin"))?;
        tracing::info!(user_id = %updated.id, "admin account updated");
        Ok(updated)
    }
}

/// Convert an identity error, logging the upstream detail of unexpected ones.
fn log_unexpected(action: &'static str) -> impl Fn(IdentityError) -> ServiceError {
    move |err| {
        if let IdentityError::Upstream(message) = &err {
            tracing::error!(action, error = %message, "identity backend failure");
        }
        ServiceError::from(err)
    }
}
