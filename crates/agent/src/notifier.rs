//! Webhook notification delivery.
//!
//! [`WebhookNotifier`] POSTs a Slack-compatible JSON body to an incoming
//! webhook URL. There is no retry here: a failed delivery is reported to the
//! poll cycle, which leaves the alert gate untouched so the next poll tries
//! again.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

/// HTTP request timeout for a single delivery attempt.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

const BOT_USERNAME: &str = "GPU Monitor";
const BOT_ICON_EMOJI: &str = ":desktop_computer:";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Anything that can deliver a text message to a webhook URL.
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        message: &str,
        webhook_url: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Body sent to the webhook. Slack reads `text`; the other fields set the
/// bot's display name and avatar.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
    username: &'static str,
    icon_emoji: &'static str,
}

impl<'a> WebhookPayload<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            username: BOT_USERNAME,
            icon_emoji: BOT_ICON_EMOJI,
        }
    }
}

// ---------------------------------------------------------------------------
// WebhookNotifier
// ---------------------------------------------------------------------------

pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Build a notifier whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Use a pre-built client (tests use this to bypass system proxies).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str, webhook_url: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(webhook_url)
            .json(&WebhookPayload::new(message))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use assert_matches::assert_matches;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    use super::*;

    type Received = Arc<Mutex<Vec<Value>>>;

    /// Start a webhook receiver on an ephemeral port that records every JSON
    /// body and answers with `status` after `delay`.
    async fn spawn_receiver(status: StatusCode, delay: Duration) -> (String, Received) {
        async fn hook(
            State((received, status, delay)): State<(Received, StatusCode, Duration)>,
            Json(body): Json<Value>,
        ) -> StatusCode {
            received.lock().unwrap().push(body);
            tokio::time::sleep(delay).await;
            status
        }

        let received: Received = Arc::default();
        let app = Router::new()
            .route("/hook", post(hook))
            .with_state((received.clone(), status, delay));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), received)
    }

    fn notifier(timeout: Duration) -> WebhookNotifier {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .unwrap();
        WebhookNotifier::with_client(client)
    }

    #[tokio::test]
    async fn posts_text_payload() {
        let (url, received) = spawn_receiver(StatusCode::OK, Duration::ZERO).await;
        notifier(DEFAULT_WEBHOOK_TIMEOUT)
            .notify("⚠️ High temperature: 88°C", &url)
            .await
            .expect("delivery");

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["text"], "⚠️ High temperature: 88°C");
        assert_eq!(bodies[0]["username"], "GPU Monitor");
        assert_eq!(bodies[0]["icon_emoji"], ":desktop_computer:");
    }

    #[tokio::test]
    async fn non_2xx_is_an_error() {
        let (url, received) = spawn_receiver(StatusCode::BAD_GATEWAY, Duration::ZERO).await;
        let err = notifier(DEFAULT_WEBHOOK_TIMEOUT)
            .notify("hello", &url)
            .await
            .unwrap_err();
        assert_matches!(err, NotifyError::HttpStatus(502));
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let (url, _received) = spawn_receiver(StatusCode::OK, Duration::from_secs(5)).await;
        let err = notifier(Duration::from_millis(200))
            .notify("hello", &url)
            .await
            .unwrap_err();
        assert_matches!(err, NotifyError::Request(ref e) if e.is_timeout());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = notifier(DEFAULT_WEBHOOK_TIMEOUT)
            .notify("hello", &format!("http://{addr}/hook"))
            .await
            .unwrap_err();
        assert_matches!(err, NotifyError::Request(_));
    }

    #[test]
    fn new_does_not_panic() {
        let _notifier = WebhookNotifier::new(DEFAULT_WEBHOOK_TIMEOUT).unwrap();
    }

    #[test]
    fn notify_error_display_http_status() {
        let err = NotifyError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }
}
