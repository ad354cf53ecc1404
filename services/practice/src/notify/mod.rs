//! Best-effort email notifications.
//!
//! # Purpose
//! Renders and sends the transactional emails around bookings and sign-up.
//!
//! # Key invariants
//! - Sending never participates in the caller's result. [`NotificationDispatcher::dispatch`]
//!   spawns a detached task; failures are logged and counted, nothing else.
//! - There is no retry and no queue. A failed send is gone.
//!
//! # Observability
//! Every attempt increments `practice_notifications_total{kind, outcome}`
//! with `outcome` one of `sent` or `failed`.
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

pub mod recording;
pub mod resend;
pub mod templates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    BookingReceived,
    BookingConfirmed,
    BookingCancelled,
    AdminNewBooking,
    Welcome,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookingReceived => "booking_received",
            Self::BookingConfirmed => "booking_confirmed",
            Self::BookingCancelled => "booking_cancelled",
            Self::AdminNewBooking => "admin_new_booking",
            Self::Welcome => "welcome",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub kind: NotificationKind,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email service not configured")]
    NotConfigured,
    #[error("email provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("email transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
    fn backend_name(&self) -> &'static str;
}

/// Used when no email provider is configured. Every send fails with
/// [`NotifyError::NotConfigured`], which the dispatcher logs and drops.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn backend_name(&self) -> &'static str {
        self.notifier.backend_name()
    }

    /// Send `notification` on a detached task.
    ///
    /// The handle is only useful to tests; request paths drop it.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let kind = notification.kind.as_str();
            match notifier.send(&notification).await {
                Ok(()) => {
                    metrics::counter!("practice_notifications_total", "kind" => kind, "outcome" => "sent")
                        .increment(1);
                    tracing::debug!(kind, "notification sent");
                }
                Err(err) => {
                    metrics::counter!("practice_notifications_total", "kind" => kind, "outcome" => "failed")
                        .increment(1);
                    tracing::warn!(kind, error = %err, "notification failed");
                }
            }
        })
    }
}
