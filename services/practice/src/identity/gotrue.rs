//! GoTrue (Supabase Auth) identity backend.
//!
//! # Purpose
//! Verifies user access tokens and manages accounts through the GoTrue REST
//! API, the identity system the practice website signs users in with.
//!
//! # Key invariants
//! - User-facing calls (`/user`, `/token`) authenticate with the anon key;
//!   admin calls (`/admin/users`) use the service-role key. The service key is
//!   never logged.
//! - Accounts are created with `email_confirm: true`; there is no
//!   verification mail step.
//! - A duplicate-email rejection (HTTP 422 with `email_exists`, or the older
//!   "already been registered" message) maps to
//!   [`IdentityError::AlreadyExists`] so callers can tell it apart.
use super::{IdentityError, IdentityProvider, IdentityResult};
use crate::auth::principal::Identity;
use crate::model::{Account, AccountUpdate, NewAccount, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;

const ADMIN_PAGE_SIZE: usize = 200;
const ADMIN_MAX_PAGES: usize = 50;

#[derive(Debug, Clone)]
pub struct GoTrueIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Map<String, Value>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl GoTrueUser {
    fn into_account(self) -> Account {
        Account {
            id: self.id,
            email: self.email.unwrap_or_default(),
            metadata: self.user_metadata,
            email_confirmed: self.email_confirmed_at.is_some(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }

    fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.filter(|email| !email.is_empty()),
            metadata: self.user_metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AdminUserPage {
    #[serde(default)]
    users: Vec<GoTrueUser>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
    user: GoTrueUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Error body fields across GoTrue versions.
#[derive(Debug)]
struct UpstreamFailure {
    status: StatusCode,
    code: Option<String>,
    message: String,
}

impl UpstreamFailure {
    async fn read(response: reqwest::Response) -> Self {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let text = |field: &str| body.get(field).and_then(Value::as_str).map(str::to_string);
        Self {
            status,
            code: text("error_code").or_else(|| text("error")),
            message: text("msg")
                .or_else(|| text("message"))
                .or_else(|| text("error_description"))
                .unwrap_or_else(|| status.to_string()),
        }
    }

    fn is_duplicate_email(&self) -> bool {
        self.code.as_deref() == Some("email_exists")
            || self.message.contains("already been registered")
    }

    fn into_error(self, action: &str) -> IdentityError {
        IdentityError::Upstream(format!(
            "{action} failed with {}: {}",
            self.status, self.message
        ))
    }
}

fn transport(action: &str, err: reqwest::Error) -> IdentityError {
    IdentityError::Upstream(format!("{action}: {err}"))
}

impl GoTrueIdentityProvider {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> IdentityResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| transport("build http client", err))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_key: service_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn admin(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn list_users_page(&self, page: usize) -> IdentityResult<Vec<GoTrueUser>> {
        let response = self
            .admin(self.client.get(self.url("/admin/users")))
            .query(&[("page", page), ("per_page", ADMIN_PAGE_SIZE)])
            .send()
            .await
            .map_err(|err| transport("list users", err))?;
        if !response.status().is_success() {
            return Err(UpstreamFailure::read(response).await.into_error("list users"));
        }
        let page: AdminUserPage = response
            .json()
            .await
            .map_err(|err| transport("decode user page", err))?;
        Ok(page.users)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    async fn verify_token(&self, token: &str) -> IdentityResult<Option<Identity>> {
        let response = self
            .client
            .get(self.url("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| transport("verify token", err))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::NOT_FOUND
        {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(UpstreamFailure::read(response).await.into_error("verify token"));
        }
        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|err| transport("decode user", err))?;
        Ok(Some(user.into_identity()))
    }

    async fn create_account(&self, account: NewAccount) -> IdentityResult<Account> {
        let response = self
            .admin(self.client.post(self.url("/admin/users")))
            .json(&json!({
                "email": account.email,
                "password": account.password,
                "user_metadata": account.metadata,
                "email_confirm": true,
            }))
            .send()
            .await
            .map_err(|err| transport("create user", err))?;
        if !response.status().is_success() {
            let failure = UpstreamFailure::read(response).await;
            if failure.is_duplicate_email() {
                return Err(IdentityError::AlreadyExists(account.email));
            }
            return Err(failure.into_error("create user"));
        }
        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|err| transport("decode created user", err))?;
        Ok(user.into_account())
    }

    async fn find_account_by_email(&self, email: &str) -> IdentityResult<Option<Account>> {
        for page in 1..=ADMIN_MAX_PAGES {
            let users = self.list_users_page(page).await?;
            let last_page = users.len() < ADMIN_PAGE_SIZE;
            if let Some(user) = users
                .into_iter()
                .find(|user| user.email.as_deref() == Some(email))
            {
                return Ok(Some(user.into_account()));
            }
            if last_page {
                return Ok(None);
            }
        }
        // Past the page cap an existing account reads as absent. Creating it
        // then fails upstream with `email_exists`, which maps to
        // `AlreadyExists`, so admin provisioning stays idempotent.
        tracing::warn!(
            pages = ADMIN_MAX_PAGES,
            "stopped paging identity users before the last page"
        );
        Ok(None)
    }

    async fn update_account(&self, id: &str, update: AccountUpdate) -> IdentityResult<Account> {
        let mut body = Map::new();
        if let Some(email) = update.email.as_ref() {
            body.insert("email".to_string(), Value::String(email.clone()));
            body.insert("email_confirm".to_string(), Value::Bool(true));
        }
        if let Some(password) = update.password {
            body.insert("password".to_string(), Value::String(password));
        }
        if let Some(metadata) = update.metadata {
            body.insert("user_metadata".to_string(), Value::Object(metadata));
        }
        let response = self
            .admin(self.client.put(self.url(&format!("/admin/users/{id}"))))
            .json(&body)
            .send()
            .await
            .map_err(|err| transport("update user", err))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(IdentityError::NotFound(id.to_string()));
        }
        if !response.status().is_success() {
            let failure = UpstreamFailure::read(response).await;
            if failure.is_duplicate_email() {
                return Err(IdentityError::AlreadyExists(
                    update.email.unwrap_or_default(),
                ));
            }
            return Err(failure.into_error("update user"));
        }
        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|err| transport("decode updated user", err))?;
        Ok(user.into_account())
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Session> {
        let response = self
            .client
            .post(self.url("/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|err| transport("sign in", err))?;
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(IdentityError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(UpstreamFailure::read(response).await.into_error("sign in"));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| transport("decode session", err))?;
        Ok(Session {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            user: token.user.into_account(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "gotrue"
    }
}
