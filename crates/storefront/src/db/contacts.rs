//! Database operations for CRM contacts, mailing lists, and tags.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use lavistique_core::{ContactId, ContactStatus, Email, ListId, TagId};

use super::{RepositoryError, conflict_on_unique, parse_column};
use crate::models::{
    Contact, ContactDetail, ContactFilter, ContactUpdate, MailingList, Page, SubscribeResult, Tag,
    clamp_limit,
};

/// Default tag color (indigo).
pub const DEFAULT_TAG_COLOR: &str = "#6366f1";

/// Default signup source.
pub const DEFAULT_SOURCE: &str = "signup_form";

const CONTACT_COLUMNS: &str = "id, email, first_name, last_name, phone, shopify_customer_id, \
     source, status, consented_at, metadata, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    shopify_customer_id: Option<String>,
    source: String,
    status: String,
    consented_at: Option<DateTime<Utc>>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = RepositoryError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ContactId::from_uuid(row.id),
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            shopify_customer_id: row.shopify_customer_id,
            source: row.source,
            status: parse_column("status", &row.status)?,
            consented_at: row.consented_at,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ListRow> for MailingList {
    fn from(row: ListRow) -> Self {
        Self {
            id: ListId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: Uuid,
    name: String,
    color: String,
    created_at: DateTime<Utc>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Self {
            id: TagId::from_uuid(row.id),
            name: row.name,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for contacts and their list/tag memberships.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an email to the newsletter.
    ///
    /// Existing unsubscribed contacts are re-subscribed; other existing
    /// contacts are left as they are. When `list_id` is given the contact is
    /// added to that list (idempotent).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, email), fields(email = %email))]
    pub async fn subscribe(
        &self,
        email: &Email,
        first_name: Option<&str>,
        last_name: Option<&str>,
        source: Option<&str>,
        list_id: Option<ListId>,
    ) -> Result<SubscribeResult, RepositoryError> {
        let source = source.unwrap_or(DEFAULT_SOURCE);
        let mut tx = self.pool.begin().await?;

        // A single upsert, so concurrent first signups for one address can't
        // race. The conflict branch only fires for unsubscribed contacts;
        // `xmax = 0` holds only for a freshly inserted row.
        let upserted: Option<(Uuid, bool)> = sqlx::query_as(
            r"
            INSERT INTO storefront.contact AS c
                (id, email, first_name, last_name, source, status, consented_at)
            VALUES ($1, $2, $3, $4, $5, 'subscribed', NOW())
            ON CONFLICT (email) DO UPDATE
            SET status = 'subscribed',
                consented_at = NOW(),
                source = EXCLUDED.source,
                updated_at = NOW()
            WHERE c.status = 'unsubscribed'
            RETURNING id, (xmax = 0) AS is_new
            ",
        )
        .bind(ContactId::new())
        .bind(email.as_str())
        .bind(first_name)
        .bind(last_name)
        .bind(source)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match upserted {
            Some((id, is_new)) => SubscribeResult {
                contact_id: ContactId::from_uuid(id),
                is_new,
            },
            // Already subscribed (or bounced/cleaned): left as it is.
            None => {
                let id: Uuid =
                    sqlx::query_scalar("SELECT id FROM storefront.contact WHERE email = $1")
                        .bind(email.as_str())
                        .fetch_one(&mut *tx)
                        .await?;
                SubscribeResult {
                    contact_id: ContactId::from_uuid(id),
                    is_new: false,
                }
            }
        };

        if let Some(list_id) = list_id {
            sqlx::query(
                r"
                INSERT INTO storefront.contact_list (contact_id, list_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(result.contact_id)
            .bind(list_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(result)
    }

    /// Mark a contact as unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no contact has this email.
    pub async fn unsubscribe(&self, email: &Email) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.contact
            SET status = 'unsubscribed', updated_at = NOW()
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Look up a contact (with lists and tags) by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<ContactDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM storefront.contact WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_memberships(row.try_into()?).await?)),
            None => Ok(None),
        }
    }

    /// Look up a contact (with lists and tags) by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_id(&self, id: ContactId) -> Result<Option<ContactDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM storefront.contact WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_memberships(row.try_into()?).await?)),
            None => Ok(None),
        }
    }

    async fn with_memberships(&self, contact: Contact) -> Result<ContactDetail, RepositoryError> {
        let lists = sqlx::query_as::<_, ListRow>(
            r"
            SELECT l.id, l.name, l.description, l.created_at
            FROM storefront.list l
            JOIN storefront.contact_list cl ON cl.list_id = l.id
            WHERE cl.contact_id = $1
            ORDER BY l.name
            ",
        )
        .bind(contact.id)
        .fetch_all(self.pool)
        .await?;

        let tags = sqlx::query_as::<_, TagRow>(
            r"
            SELECT t.id, t.name, t.color, t.created_at
            FROM storefront.tag t
            JOIN storefront.contact_tag ct ON ct.tag_id = t.id
            WHERE ct.contact_id = $1
            ORDER BY t.name
            ",
        )
        .bind(contact.id)
        .fetch_all(self.pool)
        .await?;

        Ok(ContactDetail {
            contact,
            lists: lists.into_iter().map(Into::into).collect(),
            tags: tags.into_iter().map(Into::into).collect(),
        })
    }

    /// List contacts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: &ContactFilter) -> Result<Page<Contact>, RepositoryError> {
        let limit = clamp_limit(filter.limit);
        let offset = filter.offset.unwrap_or(0).max(0);
        let status = filter.status.map(ContactStatus::as_str);
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let rows = sqlx::query_as::<_, ContactRow>(&format!(
            r"
            SELECT {CONTACT_COLUMNS}
            FROM storefront.contact
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR email ILIKE $2 OR first_name ILIKE $2 OR last_name ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(status)
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM storefront.contact
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR email ILIKE $2 OR first_name ILIKE $2 OR last_name ILIKE $2)
            ",
        )
        .bind(status)
        .bind(search.as_deref())
        .fetch_one(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total, offset))
    }

    /// Apply a partial update to a contact.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the contact doesn't exist.
    pub async fn update(
        &self,
        id: ContactId,
        update: &ContactUpdate,
    ) -> Result<Contact, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            r"
            UPDATE storefront.contact
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                status = COALESCE($5, status),
                metadata = COALESCE($6, metadata),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CONTACT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.status.map(ContactStatus::as_str))
        .bind(update.metadata.as_ref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Record the Shopify customer a contact corresponds to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the contact doesn't exist.
    pub async fn link_shopify_customer(
        &self,
        id: ContactId,
        shopify_customer_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.contact
            SET shopify_customer_id = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(shopify_customer_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Memberships
    // =========================================================================

    /// Add a contact to a list (idempotent).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the contact or list doesn't exist.
    pub async fn add_to_list(
        &self,
        contact: ContactId,
        list: ListId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.contact_list (contact_id, list_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(contact)
        .bind(list)
        .execute(self.pool)
        .await
        .map_err(not_found_on_foreign_key)?;
        Ok(())
    }

    /// Remove a contact from a list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_from_list(
        &self,
        contact: ContactId,
        list: ListId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.contact_list WHERE contact_id = $1 AND list_id = $2")
            .bind(contact)
            .bind(list)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Tag a contact (idempotent).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the contact or tag doesn't exist.
    pub async fn add_tag(&self, contact: ContactId, tag: TagId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.contact_tag (contact_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(contact)
        .bind(tag)
        .execute(self.pool)
        .await
        .map_err(not_found_on_foreign_key)?;
        Ok(())
    }

    /// Remove a tag from a contact.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_tag(&self, contact: ContactId, tag: TagId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.contact_tag WHERE contact_id = $1 AND tag_id = $2")
            .bind(contact)
            .bind(tag)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Lists & Tags
    // =========================================================================

    /// Create a mailing list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create_list(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<MailingList, RepositoryError> {
        let row = sqlx::query_as::<_, ListRow>(
            r"
            INSERT INTO storefront.list (id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_at
            ",
        )
        .bind(ListId::new())
        .bind(name)
        .bind(description)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// All mailing lists, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lists(&self) -> Result<Vec<MailingList>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListRow>(
            "SELECT id, name, description, created_at FROM storefront.list ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a tag with this name exists.
    pub async fn create_tag(
        &self,
        name: &str,
        color: Option<&str>,
    ) -> Result<Tag, RepositoryError> {
        let row = sqlx::query_as::<_, TagRow>(
            r"
            INSERT INTO storefront.tag (id, name, color)
            VALUES ($1, $2, $3)
            RETURNING id, name, color, created_at
            ",
        )
        .bind(TagId::new())
        .bind(name)
        .bind(color.unwrap_or(DEFAULT_TAG_COLOR))
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "tag name already exists"))?;
        Ok(row.into())
    }

    /// All tags, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, color, created_at FROM storefront.tag ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

fn not_found_on_foreign_key(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(e)
}

/// Escape `ILIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("anna"), "anna");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
