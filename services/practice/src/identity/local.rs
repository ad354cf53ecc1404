//! In-process identity backend.
//!
//! # Purpose
//! Keeps accounts in memory, hashes passwords with argon2 and issues HS256
//! bearer tokens, so the service runs end to end without a hosted identity
//! provider.
//!
//! # Key invariants
//! - Passwords are only ever stored as PHC-format argon2 hashes.
//! - Tokens carry `iss = practice-local` and `aud = practice`; anything else is
//!   rejected.
//! - A token resolves against the current account record, so email or
//!   metadata changes are visible immediately and deleted accounts stop
//!   resolving.
//!
//! # Operational notes
//! Hashing is CPU bound and runs on the blocking pool.
use super::{IdentityError, IdentityProvider, IdentityResult};
use crate::auth::principal::Identity;
use crate::model::{Account, AccountUpdate, NewAccount, Session};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const TOKEN_ISSUER: &str = "practice-local";
const TOKEN_AUDIENCE: &str = "practice";

#[derive(Debug, Serialize, Deserialize)]
struct LocalClaims {
    sub: String,
    email: String,
    iss: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    password_hash: String,
}

#[derive(Clone)]
pub struct LocalIdentityProvider {
    accounts: Arc<RwLock<HashMap<String, StoredAccount>>>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl LocalIdentityProvider {
    pub fn new(token_secret: &str, token_ttl: Duration) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            encoding_key: EncodingKey::from_secret(token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(token_secret.as_bytes()),
            token_ttl,
        }
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    fn issue_token(&self, account: &Account) -> IdentityResult<String> {
        let iat = Utc::now().timestamp().max(0) as u64;
        let claims = LocalClaims {
            sub: account.id.clone(),
            email: account.email.clone(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat,
            exp: iat + self.token_ttl.as_secs(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| IdentityError::Upstream(format!("sign token: {err}")))
    }

    fn decode_token(&self, token: &str) -> Option<LocalClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[TOKEN_ISSUER]);
        match jsonwebtoken::decode::<LocalClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                tracing::debug!(error = %err, "rejected local bearer token");
                None
            }
        }
    }
}

async fn hash_password(password: String) -> IdentityResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| IdentityError::Upstream(format!("hash password: {err}")))
    })
    .await
    .map_err(|err| IdentityError::Upstream(format!("hash task failed: {err}")))?
}

async fn verify_password(password: String, hash: String) -> IdentityResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|err| IdentityError::Upstream(format!("stored hash unreadable: {err}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|err| IdentityError::Upstream(format!("verify task failed: {err}")))?
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn verify_token(&self, token: &str) -> IdentityResult<Option<Identity>> {
        let Some(claims) = self.decode_token(token) else {
            return Ok(None);
        };
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(&claims.sub)
            .map(|stored| Identity::from(&stored.account)))
    }

    async fn create_account(&self, account: NewAccount) -> IdentityResult<Account> {
        let password_hash = hash_password(account.password).await?;
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|stored| stored.account.email == account.email)
        {
            return Err(IdentityError::AlreadyExists(account.email));
        }
        let created = Account {
            id: uuid::Uuid::new_v4().to_string(),
            email: account.email,
            metadata: account.metadata,
            email_confirmed: true,
            created_at: Utc::now(),
        };
        accounts.insert(
            created.id.clone(),
            StoredAccount {
                account: created.clone(),
                password_hash,
            },
        );
        Ok(created)
    }

    async fn find_account_by_email(&self, email: &str) -> IdentityResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|stored| stored.account.email == email)
            .map(|stored| stored.account.clone()))
    }

    async fn update_account(&self, id: &str, update: AccountUpdate) -> IdentityResult<Account> {
        let password_hash = match update.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };
        let mut accounts = self.accounts.write().await;
        if let Some(email) = update.email.as_deref() {
            let taken = accounts
                .values()
                .any(|stored| stored.account.email == email && stored.account.id != id);
            if taken {
                return Err(IdentityError::AlreadyExists(email.to_string()));
            }
        }
        let stored = accounts
            .get_mut(id)
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        if let Some(email) = update.email {
            stored.account.email = email;
        }
        if let Some(metadata) = update.metadata {
            stored.account.metadata = metadata;
        }
        if let Some(password_hash) = password_hash {
            stored.password_hash = password_hash;
        }
        Ok(stored.account.clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Session> {
        let stored = {
            let accounts = self.accounts.read().await;
            accounts
                .values()
                .find(|stored| stored.account.email == email)
                .cloned()
        };
        let Some(stored) = stored else {
            return Err(IdentityError::InvalidCredentials);
        };
        if !verify_password(password.to_string(), stored.password_hash).await? {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(Session {
            access_token: self.issue_token(&stored.account)?,
            token_type: "bearer".to_string(),
            expires_in: self.token_ttl.as_secs(),
            user: stored.account,
        })
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    fn provider() -> LocalIdentityProvider {
        LocalIdentityProvider::new("test-secret", Duration::from_secs(3600))
    }

    fn new_account(email: &str, password: &str) -> NewAccount {
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), Value::String("Ula".to_string()));
        NewAccount {
            email: email.to_string(),
            password: password.to_string(),
            metadata,
        }
    }

    #[tokio::test]
    async fn created_accounts_are_confirmed_and_unique_by_email() {
        let identity = provider();
        let account = identity
            .create_account(new_account("u1@example.com", "pw-1"))
            .await
            .expect("create");
        assert!(account.email_confirmed);

        let err = identity
            .create_account(new_account("u1@example.com", "other"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, IdentityError::AlreadyExists(email) if email == "u1@example.com"));
        assert_eq!(identity.account_count().await, 1);
    }

    #[tokio::test]
    async fn sign_in_issues_a_token_that_verifies() {
        let identity = provider();
        let account = identity
            .create_account(new_account("u1@example.com", "pw-1"))
            .await
            .expect("create");

        let session = identity
            .sign_in("u1@example.com", "pw-1")
            .await
            .expect("sign in");
        assert_eq!(session.token_type, "bearer");
        assert_eq!(session.user.id, account.id);

        let verified = identity
            .verify_token(&session.access_token)
            .await
            .expect("verify")
            .expect("identity");
        assert_eq!(verified.id, account.id);
        assert_eq!(verified.email.as_deref(), Some("u1@example.com"));
        assert_eq!(verified.display_name(), "Ula");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_invalid_credentials() {
        let identity = provider();
        identity
            .create_account(new_account("u1@example.com", "pw-1"))
            .await
            .expect("create");
        assert!(matches!(
            identity.sign_in("u1@example.com", "nope").await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            identity.sign_in("ghost@example.com", "pw-1").await,
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn foreign_or_garbage_tokens_resolve_to_nothing() {
        let identity = provider();
        identity
            .create_account(new_account("u1@example.com", "pw-1"))
            .await
            .expect("create");
        let other = LocalIdentityProvider::new("other-secret", Duration::from_secs(3600));
        let account = other
            .create_account(new_account("u1@example.com", "pw-1"))
            .await
            .expect("create");
        let foreign = other.issue_token(&account).expect("token");

        assert!(identity.verify_token(&foreign).await.expect("verify").is_none());
        assert!(identity.verify_token("not-a-jwt").await.expect("verify").is_none());
    }

    #[tokio::test]
    async fn update_changes_email_and_password() {
        let identity = provider();
        let account = identity
            .create_account(new_account("old@example.com", "old-pw"))
            .await
            .expect("create");
        identity
            .create_account(new_account("taken@example.com", "pw"))
            .await
            .expect("create other");

        let err = identity
            .update_account(
                &account.id,
                AccountUpdate {
                    email: Some("taken@example.com".to_string()),
                    ..AccountUpdate::default()
                },
            )
            .await
            .expect_err("conflict");
        assert!(matches!(err, IdentityError::AlreadyExists(_)));

        let updated = identity
            .update_account(
                &account.id,
                AccountUpdate {
                    email: Some("new@example.com".to_string()),
                    password: Some("new-pw".to_string()),
                    metadata: None,
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.metadata, account.metadata);
        identity
            .sign_in("new@example.com", "new-pw")
            .await
            .expect("sign in with new credentials");
        assert!(
            identity
                .find_account_by_email("old@example.com")
                .await
                .expect("find")
                .is_none()
        );

        let missing = identity
            .update_account("missing", AccountUpdate::default())
            .await
            .expect_err("missing");
        assert!(matches!(missing, IdentityError::NotFound(_)));
    }
}
