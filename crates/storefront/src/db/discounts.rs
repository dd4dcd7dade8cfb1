//! Database operations for promo code rules.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use lavistique_core::discount::{DiscountRule, normalize_code};
use lavistique_core::{DiscountKind, DiscountRuleId, DiscountScope};

use super::{RepositoryError, conflict_on_unique, parse_column};

const RULE_COLUMNS: &str = "id, shopify_discount_id, code, title, type, value, applies_to, \
     target_ids, target_name, minimum_purchase, usage_limit, usage_count, starts_at, ends_at, \
     is_active, synced_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct DiscountRuleRow {
    id: Uuid,
    shopify_discount_id: Option<String>,
    code: String,
    title: String,
    #[sqlx(rename = "type")]
    kind: String,
    value: i64,
    applies_to: String,
    target_ids: Option<Json<Vec<String>>>,
    target_name: Option<String>,
    minimum_purchase: Option<i64>,
    usage_limit: Option<i64>,
    usage_count: i64,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    is_active: bool,
    synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DiscountRuleRow> for DiscountRule {
    type Error = RepositoryError;

    fn try_from(row: DiscountRuleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DiscountRuleId::from_uuid(row.id),
            shopify_discount_id: row.shopify_discount_id,
            code: row.code,
            title: row.title,
            kind: parse_column("type", &row.kind)?,
            value: row.value,
            scope: parse_column("applies_to", &row.applies_to)?,
            target_ids: row.target_ids.map(|Json(ids)| ids),
            target_name: row.target_name,
            minimum_purchase: row.minimum_purchase,
            usage_limit: row.usage_limit,
            usage_count: row.usage_count,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            is_active: row.is_active,
            synced_at: row.synced_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for creating a discount rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiscountRule {
    pub shopify_discount_id: Option<String>,
    pub code: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: i64,
    #[serde(rename = "appliesTo", default)]
    pub scope: DiscountScope,
    pub target_ids: Option<Vec<String>>,
    pub target_name: Option<String>,
    pub minimum_purchase: Option<i64>,
    pub usage_limit: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Partial update of a discount rule; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiscountRule {
    pub code: Option<String>,
    pub title: Option<String>,
    pub value: Option<i64>,
    #[serde(rename = "appliesTo")]
    pub scope: Option<DiscountScope>,
    pub target_ids: Option<Vec<String>>,
    pub target_name: Option<String>,
    pub minimum_purchase: Option<i64>,
    pub is_active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i64>,
}

/// Repository for promo code rules.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a rule by code regardless of its dates or usage.
    ///
    /// Callers decide redeemability with [`DiscountRule::availability`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<DiscountRule>, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM storefront.discount_rule WHERE code = $1"
        ))
        .bind(normalize_code(code))
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Rules that are active and inside their date window right now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<DiscountRule>, RepositoryError> {
        let rows = sqlx::query_as::<_, DiscountRuleRow>(&format!(
            r"
            SELECT {RULE_COLUMNS}
            FROM storefront.discount_rule
            WHERE is_active
              AND (starts_at IS NULL OR starts_at <= NOW())
              AND (ends_at IS NULL OR ends_at >= NOW())
            ORDER BY created_at DESC
            "
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create a rule. The code is stored uppercase.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already in use.
    pub async fn create(&self, rule: &NewDiscountRule) -> Result<DiscountRule, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRuleRow>(&format!(
            r"
            INSERT INTO storefront.discount_rule
                (id, shopify_discount_id, code, title, type, value, applies_to, target_ids,
                 target_name, minimum_purchase, usage_limit, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {RULE_COLUMNS}
            "
        ))
        .bind(DiscountRuleId::new())
        .bind(rule.shopify_discount_id.as_deref())
        .bind(normalize_code(&rule.code))
        .bind(&rule.title)
        .bind(rule.kind.as_str())
        .bind(rule.value)
        .bind(rule.scope.as_str())
        .bind(rule.target_ids.as_ref().map(Json))
        .bind(rule.target_name.as_deref())
        .bind(rule.minimum_purchase)
        .bind(rule.usage_limit)
        .bind(rule.starts_at)
        .bind(rule.ends_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "discount code already exists"))?;

        row.try_into()
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rule doesn't exist, or
    /// `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(
        &self,
        id: DiscountRuleId,
        update: &UpdateDiscountRule,
    ) -> Result<DiscountRule, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRuleRow>(&format!(
            r"
            UPDATE storefront.discount_rule
            SET code = COALESCE($2, code),
                title = COALESCE($3, title),
                value = COALESCE($4, value),
                is_active = COALESCE($5, is_active),
                starts_at = COALESCE($6, starts_at),
                ends_at = COALESCE($7, ends_at),
                usage_limit = COALESCE($8, usage_limit),
                applies_to = COALESCE($9, applies_to),
                target_ids = COALESCE($10, target_ids),
                target_name = COALESCE($11, target_name),
                minimum_purchase = COALESCE($12, minimum_purchase),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RULE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.code.as_deref().map(normalize_code))
        .bind(update.title.as_deref())
        .bind(update.value)
        .bind(update.is_active)
        .bind(update.starts_at)
        .bind(update.ends_at)
        .bind(update.usage_limit)
        .bind(update.scope.map(DiscountScope::as_str))
        .bind(update.target_ids.as_ref().map(Json))
        .bind(update.target_name.as_deref())
        .bind(update.minimum_purchase)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "discount code already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete a rule.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rule doesn't exist.
    pub async fn delete(&self, id: DiscountRuleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.discount_rule WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count one redemption of a code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no rule has this code.
    pub async fn increment_usage(&self, code: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.discount_rule
            SET usage_count = usage_count + 1, updated_at = NOW()
            WHERE code = $1
            ",
        )
        .bind(normalize_code(code))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
