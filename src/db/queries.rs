use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::audit::AuditRecord;

/// Persist one audit record into `scrape_logs`.
pub async fn insert_scrape_log(pool: &PgPool, record: &AuditRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO scrape_logs
            (job_id, success, message, num_docs, docs, time_taken, team_id,
             mode, url, page_options, origin, extractor_mode, num_tokens)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(record.job_id)
    .bind(record.success)
    .bind(&record.message)
    .bind(record.num_docs)
    .bind(&record.docs)
    .bind(record.time_taken)
    .bind(&record.team_id)
    .bind(&record.mode)
    .bind(&record.url)
    .bind(&record.page_options)
    .bind(&record.origin)
    .bind(&record.extractor_mode)
    .bind(record.num_tokens)
    .execute(pool)
    .await?;

    Ok(())
}

/// Stored shape of an audit record, as read back from `scrape_logs`.
#[derive(Debug, Clone)]
pub struct ScrapeLog {
    pub job_id: Uuid,
    pub success: bool,
    pub message: Option<String>,
    pub num_docs: i32,
    pub time_taken: f64,
    pub team_id: String,
    pub mode: String,
    pub url: String,
    pub num_tokens: i64,
    pub created_at: DateTime<Utc>,
}

/// Most recent audit records for a team, newest first. Used by the
/// live-infrastructure tests and operational queries.
pub async fn recent_scrape_logs(
    pool: &PgPool,
    team_id: &str,
    limit: i64,
) -> Result<Vec<ScrapeLog>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT job_id, success, message, num_docs, time_taken, team_id,
               mode, url, num_tokens, created_at
        FROM scrape_logs
        WHERE team_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(team_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(ScrapeLog {
                job_id: r.try_get("job_id")?,
                success: r.try_get("success")?,
                message: r.try_get("message")?,
                num_docs: r.try_get("num_docs")?,
                time_taken: r.try_get("time_taken")?,
                team_id: r.try_get("team_id")?,
                mode: r.try_get("mode")?,
                url: r.try_get("url")?,
                num_tokens: r.try_get("num_tokens")?,
                created_at: r.try_get("created_at")?,
            })
        })
        .collect()
}
