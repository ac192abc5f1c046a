//! Database module
//!
//! Connection and schema checks. The schema itself lives in raw SQL files
//! under `migrations/`.

use sqlx::PgPool;

/// Tables the ledger cannot run without
const REQUIRED_TABLES: &[&str] = &["accounts", "transfers"];

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES.iter().copied() {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    let has_version: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = 'accounts' AND column_name = 'version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !has_version {
        tracing::error!("accounts.version column missing; optimistic concurrency unavailable");
        return Ok(false);
    }

    Ok(true)
}
