use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Ensure the audit schema exists. Idempotent, run at startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scrape_logs (
            id BIGSERIAL PRIMARY KEY,
            job_id UUID NOT NULL,
            success BOOLEAN NOT NULL,
            message TEXT,
            num_docs INTEGER NOT NULL,
            docs JSONB,
            time_taken DOUBLE PRECISION NOT NULL,
            team_id TEXT NOT NULL,
            mode TEXT NOT NULL,
            url TEXT NOT NULL,
            page_options JSONB,
            origin TEXT,
            extractor_mode TEXT,
            num_tokens BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS scrape_logs_team_created_idx
        ON scrape_logs (team_id, created_at)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub mod queries;
