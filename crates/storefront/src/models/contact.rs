//! CRM contacts, mailing lists, and tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lavistique_core::{ContactId, ContactStatus, ListId, TagId};

/// A newsletter / customer contact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    /// Lowercase, unique.
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub shopify_customer_id: Option<String>,
    /// Where the contact signed up (e.g. `signup_form`, `footer`).
    pub source: String,
    pub status: ContactStatus,
    pub consented_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named mailing list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingList {
    pub id: ListId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A colored label for segmenting contacts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Contact with its list memberships and tags.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetail {
    #[serde(flatten)]
    pub contact: Contact,
    pub lists: Vec<MailingList>,
    pub tags: Vec<Tag>,
}

/// Outcome of a newsletter signup.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResult {
    pub contact_id: ContactId,
    pub is_new: bool,
}

/// Filter for the staff contact listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<ContactStatus>,
    /// Case-insensitive substring of email, first name, or last name.
    pub search: Option<String>,
}

/// Partial contact update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<ContactStatus>,
    pub metadata: Option<serde_json::Value>,
}
