use anyhow::Context;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

/// Opens the pool and brings the schema up to date.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let db = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;
    migrate(&db).await?;
    info!(backend = scheme(database_url), "database ready");
    Ok(db)
}

/// The part of a connection URL that is safe to log.
fn scheme(database_url: &str) -> &str {
    database_url
        .split_once(':')
        .map_or("unknown", |(scheme, _)| scheme)
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run database migrations")?;
    Ok(())
}
