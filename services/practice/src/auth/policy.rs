//! Role resolution from a static admin allowlist.
//!
//! # Key invariants
//! - The role is a pure function of the verified identity; nothing is read
//!   from storage.
//! - Email comparison is exact (case-sensitive), matching how addresses are
//!   stored by the identity backend.
//! - The allowlist is fixed for the process lifetime; changing it means a
//!   redeploy.
use crate::auth::principal::Identity;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Guest,
    Authenticated,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: Arc<[String]>,
}

impl AdminAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.iter().any(|allowed| allowed == email)
    }

    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn resolve_role(&self, identity: Option<&Identity>) -> Role {
        match identity {
            None => Role::Guest,
            Some(identity) => match identity.email.as_deref() {
                Some(email) if self.contains(email) => Role::Admin,
                _ => Role::Authenticated,
            },
        }
    }
}
