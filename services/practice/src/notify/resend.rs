//! Resend email API client.
//!
//! Sends `POST {api_url}/emails` with the API key as a bearer token and a
//! `{from, to, subject, html}` body. Non-2xx responses become
//! [`NotifyError::Rejected`] carrying the provider's `message`.
use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.resend.com";

#[derive(Debug, Clone)]
pub struct ResendNotifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ResendNotifier {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&SendEmailRequest {
                from: &self.from,
                to: &notification.to,
                subject: &notification.subject,
                html: &notification.html,
            })
            .send()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ResendErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.to_string());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let body: SendEmailResponse = response
            .json()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        tracing::debug!(email_id = body.id.as_deref().unwrap_or(""), "email accepted");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "resend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router, extract::State};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockResend {
        received: Arc<Mutex<Vec<Value>>>,
    }

    async fn emails(
        State(mock): State<MockResend>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Response {
        if crate::auth::extract_bearer(&headers) != Some("re_test") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"statusCode": 401, "message": "API key is invalid"})),
            )
                .into_response();
        }
        mock.received.lock().expect("lock").push(body);
        Json(json!({"id": "email-1"})).into_response()
    }

    async fn spawn_mock() -> (String, MockResend) {
        let mock = MockResend::default();
        let router = Router::new()
            .route("/emails", post(emails))
            .with_state(mock.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router.into_make_service()).await;
        });
        (format!("http://{addr}"), mock)
    }

    fn notification() -> Notification {
        Notification {
            to: "u1@example.com".to_string(),
            subject: "Booking received".to_string(),
            html: "<p>thanks</p>".to_string(),
            kind: NotificationKind::BookingReceived,
        }
    }

    #[tokio::test]
    async fn posts_message_with_sender_and_bearer_key() {
        let (url, mock) = spawn_mock().await;
        let notifier = ResendNotifier::new(
            url,
            "re_test",
            "Practice <noreply@example.com>",
            Duration::from_secs(2),
        )
        .expect("notifier");
        notifier.send(&notification()).await.expect("send");

        let received = mock.received.lock().expect("lock").clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["from"], "Practice <noreply@example.com>");
        assert_eq!(received[0]["to"], "u1@example.com");
        assert_eq!(received[0]["subject"], "Booking received");
    }

    #[tokio::test]
    async fn provider_rejection_carries_status_and_message() {
        let (url, _mock) = spawn_mock().await;
        let notifier = ResendNotifier::new(url, "wrong", "from@example.com", Duration::from_secs(2))
            .expect("notifier");
        let err = notifier.send(&notification()).await.expect_err("rejected");
        match err {
            NotifyError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "API key is invalid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
