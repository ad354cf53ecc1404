//! Booking records and the booking status state machine.
//!
//! # Purpose
//! Defines the persisted booking shape, the client request used to create one,
//! and the allowed status transitions.
//!
//! # Key invariants
//! - `status` starts at `pending`.
//! - Allowed edges: `pending -> confirmed`, `pending -> cancelled`,
//!   `confirmed -> cancelled`, plus self-transitions. Nothing returns to
//!   `pending` and `cancelled` is terminal.
//! - `user_*` fields are a snapshot of the requester and are never refreshed.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Key namespace for booking records in the key-value store.
pub const BOOKING_PREFIX: &str = "booking_";

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether an admin may move a booking from `self` to `next`.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled)
            )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: String,
    pub date: DateTime<Utc>,
    pub service_type: String,
    #[serde(default)]
    pub note: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Client payload for a new booking. Fields stay optional so that missing
/// values surface as validation errors instead of JSON rejections.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub date: Option<String>,
    pub service_type: Option<String>,
    pub note: Option<String>,
}
