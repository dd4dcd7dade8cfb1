//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use lavistique_core::wizard::WizardOptions;

use crate::config::StorefrontConfig;
use crate::services::{ChatClient, ChatError, EmailClient, EmailError};
use crate::shopify::StorefrontClient;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("chat client: {0}")]
    Chat(#[from] ChatError),
    #[error("email client: {0}")]
    Email(#[from] EmailError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    storefront: StorefrontClient,
    chat: Option<ChatClient>,
    email: Option<EmailClient>,
    wizard_options: WizardOptions,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Chat and email clients are built only when their API keys are
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let storefront = StorefrontClient::new(&config.shopify);

        let chat = config
            .chat
            .as_ref()
            .map(|chat| ChatClient::new(chat, &config.base_url))
            .transpose()?;

        let email = config
            .email
            .as_ref()
            .map(|email| EmailClient::new(email, &config.base_url))
            .transpose()?;

        if chat.is_none() {
            tracing::warn!("OPENROUTER_API_KEY not set, chat answers with canned replies");
        }
        if email.is_none() {
            tracing::warn!("RESEND_API_KEY not set, emails are skipped");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storefront,
                chat,
                email,
                wizard_options: WizardOptions::default(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Shopify Storefront API client.
    #[must_use]
    pub fn storefront(&self) -> &StorefrontClient {
        &self.inner.storefront
    }

    /// Chat completion client, when configured.
    #[must_use]
    pub fn chat(&self) -> Option<&ChatClient> {
        self.inner.chat.as_ref()
    }

    /// Email client, when configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailClient> {
        self.inner.email.as_ref()
    }

    /// Costume, size, and frame choices for the configurator.
    #[must_use]
    pub fn wizard_options(&self) -> &WizardOptions {
        &self.inner.wizard_options
    }
}
