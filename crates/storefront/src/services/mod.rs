//! Outbound integrations besides Shopify.
//!
//! - [`chat`] - `OpenRouter` completions for the support assistant
//! - [`email`] - transactional email through Resend
//!
//! Both are optional: without an API key the storefront answers chat with
//! canned replies and skips email.

pub mod chat;
pub mod email;

pub use chat::{ChatClient, ChatError, ChatMessage, ChatRole};
pub use email::{EmailClient, EmailError};
