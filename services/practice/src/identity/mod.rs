//! Identity backends: token verification and account provisioning.
//!
//! # Purpose
//! Abstracts the system that owns user accounts. Services ask it who a bearer
//! token belongs to, create and update accounts, and exchange credentials for
//! a session.
//!
//! # Backends
//! - [`local::LocalIdentityProvider`]: in-process accounts with argon2 hashes
//!   and HS256 tokens. Not durable; meant for development and tests.
//! - [`gotrue::GoTrueIdentityProvider`]: a hosted GoTrue (Supabase Auth)
//!   instance reached over HTTP with a service-role key.
//!
//! # Key invariants
//! - `verify_token` never errors on a bad token; it returns `Ok(None)`. Errors
//!   are reserved for the backend being unreachable or misbehaving.
//! - Email uniqueness is enforced by the backend and reported as
//!   [`IdentityError::AlreadyExists`].
use crate::auth::principal::Identity;
use crate::model::{Account, AccountUpdate, NewAccount, Session};
use async_trait::async_trait;
use thiserror::Error;

pub mod gotrue;
pub mod local;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("an account with email {0} already exists")]
    AlreadyExists(String),
    #[error("account not found: {0}")]
    NotFound(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("identity backend error: {0}")]
    Upstream(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the identity it was issued for.
    async fn verify_token(&self, token: &str) -> IdentityResult<Option<Identity>>;

    /// Create a pre-confirmed account.
    async fn create_account(&self, account: NewAccount) -> IdentityResult<Account>;

    async fn find_account_by_email(&self, email: &str) -> IdentityResult<Option<Account>>;

    /// Apply every field present in `update` to the account `id`.
    async fn update_account(&self, id: &str, update: AccountUpdate) -> IdentityResult<Account>;

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Session>;

    fn backend_name(&self) -> &'static str;
}
