//! Outbound email through the SendGrid v3 API.
//!
//! All transactional email goes through [`EmailClient`]. Without
//! `SENDGRID_API_KEY` the client is inert: `send` returns `false` and makes
//! no network call.

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod templates;

pub use templates::RenderedEmail;

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const SENDER_NAME: &str = "DiversIA";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SENDGRID_API_KEY is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SendGrid rejected the message (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// A rendered email addressed to one recipient.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub content: RenderedEmail,
}

#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

impl<'a> SendGridRequest<'a> {
    fn new(from: &'a str, email: &'a OutboundEmail) -> Self {
        SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &email.to,
                    name: email.to_name.as_deref(),
                }],
            }],
            from: Address {
                email: from,
                name: Some(SENDER_NAME),
            },
            subject: &email.content.subject,
            // SendGrid requires text/plain before text/html
            content: vec![
                Content {
                    content_type: "text/plain",
                    value: &email.content.text,
                },
                Content {
                    content_type: "text/html",
                    value: &email.content.html,
                },
            ],
        }
    }
}

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: Option<String>,
    from: String,
    endpoint: String,
}

impl EmailClient {
    pub fn new(api_key: Option<String>, from: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            from,
            endpoint: SENDGRID_API_URL.to_string(),
        }
    }

    /// Points the client at another SendGrid-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends one email. Returns `true` only when SendGrid accepted it; every
    /// failure is logged and reported as `false`.
    pub async fn send(&self, email: &OutboundEmail) -> bool {
        match self.try_send(email).await {
            Ok(()) => {
                info!("Email '{}' sent to {}", email.content.subject, email.to);
                true
            }
            Err(EmailError::NotConfigured) => {
                debug!("Email to {} not sent: no API key configured", email.to);
                false
            }
            Err(e) => {
                warn!("Email to {} failed: {e}", email.to);
                false
            }
        }
    }

    pub async fn try_send(&self, email: &OutboundEmail) -> Result<(), EmailError> {
        let api_key = self.api_key.as_deref().ok_or(EmailError::NotConfigured)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&SendGridRequest::new(&self.from, email))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;

    /// Serves a fake SendGrid on a random local port, recording request bodies.
    pub(crate) async fn fake_sendgrid(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let app = Router::new().route(
            "/v3/mail/send",
            post(move |Json(body): Json<Value>| {
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push(body);
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v3/mail/send"), seen)
    }
}
