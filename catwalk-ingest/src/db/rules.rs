//! Learned keyword rules and versioned filter rule sets

use catwalk_common::{time, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{Row, SqlitePool};

use crate::filter::FilterRules;

/// Rule type recorded for keywords that should reject future candidates
pub const RULE_EXCLUDE_KEYWORD: &str = "exclude_keyword";

/// Record a learned keyword. Returns false if it was already known.
pub async fn record_learned_rule(
    pool: &SqlitePool,
    rule_type: &str,
    keyword: &str,
    reason: Option<&str>,
    image_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO learned_rules (rule_type, keyword, reason, image_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(rule_type, keyword) DO NOTHING
        "#,
    )
    .bind(rule_type)
    .bind(keyword)
    .bind(reason)
    .bind(image_id)
    .bind(time::to_db(&now))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Learned keywords of one rule type, in the order they were learned
pub async fn learned_keywords(pool: &SqlitePool, rule_type: &str) -> Result<Vec<String>> {
    let keywords =
        sqlx::query_scalar("SELECT keyword FROM learned_rules WHERE rule_type = ? ORDER BY id")
            .bind(rule_type)
            .fetch_all(pool)
            .await?;
    Ok(keywords)
}

/// Store a compiled rule set under the next version number.
///
/// The version inside `rules` is overwritten with the stored one.
pub async fn save_filter_rules<'e, E>(
    executor: E,
    rules: &FilterRules,
    now: DateTime<Utc>,
) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    // The stored body carries version 0; the column is authoritative
    let mut rules = rules.clone();
    rules.version = 0;
    let body = serde_json::to_string(&rules)?;

    let version: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO filter_rules (version, rules, compiled_at)
        VALUES ((SELECT COALESCE(MAX(version), 0) + 1 FROM filter_rules), ?, ?)
        RETURNING version
        "#,
    )
    .bind(body)
    .bind(time::to_db(&now))
    .fetch_one(executor)
    .await?;

    Ok(version)
}

/// Highest stored rule set with its compile time
pub async fn latest_filter_rules(
    pool: &SqlitePool,
) -> Result<Option<(FilterRules, DateTime<Utc>)>> {
    let row = sqlx::query(
        "SELECT version, rules, compiled_at FROM filter_rules ORDER BY version DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut rules: FilterRules = serde_json::from_str(&row.get::<String, _>("rules"))?;
    rules.version = row.get("version");
    let compiled_at = time::from_db(&row.get::<String, _>("compiled_at"))?;

    Ok(Some((rules, compiled_at)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catwalk_common::db::init_memory_database;

    #[tokio::test]
    async fn test_learned_rule_is_unique_per_type() {
        let pool = init_memory_database().await.unwrap();
        let now = time::now();

        let reason = Some("poster_campaign");
        assert!(record_learned_rule(&pool, RULE_EXCLUDE_KEYWORD, "poster", reason, Some(1), now)
            .await
            .unwrap());
        assert!(!record_learned_rule(&pool, RULE_EXCLUDE_KEYWORD, "poster", None, Some(2), now)
            .await
            .unwrap());
        assert!(record_learned_rule(&pool, "other", "poster", None, None, now).await.unwrap());

        let keywords = learned_keywords(&pool, RULE_EXCLUDE_KEYWORD).await.unwrap();
        assert_eq!(keywords, vec!["poster".to_string()]);
    }

    #[tokio::test]
    async fn test_filter_rule_versions_increase() {
        let pool = init_memory_database().await.unwrap();
        assert!(latest_filter_rules(&pool).await.unwrap().is_none());

        let mut rules = FilterRules::default();
        assert_eq!(save_filter_rules(&pool, &rules, time::now()).await.unwrap(), 1);

        rules.exclude_keywords.push("trailer".to_string());
        assert_eq!(save_filter_rules(&pool, &rules, time::now()).await.unwrap(), 2);

        let (latest, _) = latest_filter_rules(&pool).await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert!(latest.exclude_keywords.contains(&"trailer".to_string()));
    }
}
