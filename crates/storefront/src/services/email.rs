//! Transactional email over the Resend HTTP API.
//!
//! Bodies are askama templates under `templates/emails/`. Marketing
//! campaigns are out of scope; this client only sends one-off messages.

use askama::Template;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use lavistique_core::{ConversationId, Email};

use crate::config::EmailConfig;

/// Resend send endpoint.
const SEND_URL: &str = "https://api.resend.com/emails";

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rendering the body failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// The API key cannot be sent as a header.
    #[error("Invalid API key format: {0}")]
    InvalidHeader(String),
}

// =============================================================================
// Templates
// =============================================================================

/// Staff reply to a support ticket.
#[derive(Template)]
#[template(path = "emails/support_reply.html")]
pub struct SupportReplyEmail<'a> {
    pub reply: &'a str,
    pub site_url: &'a str,
    pub conversation_id: ConversationId,
}

/// Portrait preview ready for approval.
#[derive(Template)]
#[template(path = "emails/preview_ready.html")]
pub struct PreviewReadyEmail<'a> {
    pub customer_name: &'a str,
    pub preview_url: &'a str,
    pub order_id: &'a str,
}

/// Newsletter welcome, optionally with a discount code.
#[derive(Template)]
#[template(path = "emails/welcome.html")]
pub struct WelcomeEmail<'a> {
    pub discount_code: Option<&'a str>,
    pub site_url: &'a str,
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Resend acknowledgement.
#[derive(Debug, Deserialize)]
pub struct SendReceipt {
    pub id: String,
}

/// Resend API client.
#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    from: String,
    site_url: String,
}

impl EmailClient {
    /// Create a new email client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &EmailConfig, site_url: &str) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| EmailError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            from: config.from.clone(),
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }

    /// Email the customer a staff reply to their support ticket.
    ///
    /// # Errors
    ///
    /// Returns error if rendering or sending fails.
    #[instrument(skip(self, reply), fields(to = %to))]
    pub async fn send_support_reply(
        &self,
        to: &Email,
        subject: &str,
        reply: &str,
        conversation_id: ConversationId,
    ) -> Result<SendReceipt, EmailError> {
        let html = SupportReplyEmail {
            reply,
            site_url: &self.site_url,
            conversation_id,
        }
        .render()?;
        self.send(to, &reply_subject(subject), &html).await
    }

    /// Tell the customer their portrait preview is ready.
    ///
    /// # Errors
    ///
    /// Returns error if rendering or sending fails.
    #[instrument(skip(self, preview_url), fields(to = %to, order_id = %order_id))]
    pub async fn send_preview_ready(
        &self,
        to: &Email,
        customer_name: &str,
        preview_url: &str,
        order_id: &str,
    ) -> Result<SendReceipt, EmailError> {
        let html = PreviewReadyEmail {
            customer_name,
            preview_url,
            order_id,
        }
        .render()?;
        self.send(to, "Your Pet Portrait Preview is Ready!", &html)
            .await
    }

    /// Welcome a new newsletter subscriber.
    ///
    /// # Errors
    ///
    /// Returns error if rendering or sending fails.
    #[instrument(skip(self), fields(to = %to))]
    pub async fn send_welcome(
        &self,
        to: &Email,
        discount_code: Option<&str>,
    ) -> Result<SendReceipt, EmailError> {
        let html = WelcomeEmail {
            discount_code,
            site_url: &self.site_url,
        }
        .render()?;
        self.send(to, "Welcome to La Vistique! 🐾", &html).await
    }

    async fn send(&self, to: &Email, subject: &str, html: &str) -> Result<SendReceipt, EmailError> {
        let body = SendRequest {
            from: &self.from,
            to: [to.as_str()],
            subject,
            html,
        };

        let response = self.client.post(SEND_URL).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let receipt: SendReceipt = response.json().await?;
        tracing::info!(email_id = %receipt.id, "Email sent");
        Ok(receipt)
    }
}

/// Subject line for a reply, without stacking `Re:` prefixes.
#[must_use]
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"))
    {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}
