//! Business operations for bookings, accounts and articles.
//!
//! # Purpose
//! Services own validation, authorization decisions and persistence. They
//! take the verified caller identity (or `None` for an anonymous caller) and
//! never see HTTP types.
//!
//! # Error model
//! Every operation returns [`ServiceResult`]. Notification failures never
//! appear here; they are handled inside the detached dispatch task.
use crate::identity::IdentityError;
use crate::model::BookingStatus;
use crate::store::StoreError;
use thiserror::Error;

pub mod accounts;
pub mod articles;
pub mod bookings;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("account provisioning failed: {0}")]
    ProvisioningFailed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::AlreadyExists(email) => {
                ServiceError::AlreadyExists(format!("email {email} is already registered"))
            }
            IdentityError::NotFound(id) => ServiceError::NotFound(format!("account {id} not found")),
            IdentityError::InvalidCredentials => ServiceError::Unauthenticated,
            IdentityError::Upstream(message) => ServiceError::ProvisioningFailed(message),
        }
    }
}

/// Non-blank value of a required text field.
pub(crate) fn required(field: &str, value: Option<String>) -> ServiceResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ServiceError::InvalidInput(format!("{field} is required"))),
    }
}
