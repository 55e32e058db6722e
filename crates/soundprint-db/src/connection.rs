//! Pooled PostgreSQL sessions for the fingerprint store

use anyhow::Context;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

pub type DbPool = Pool;

/// Build a pool of at most `max_connections` sessions
///
/// No connection is opened until the first checkout. Scan workers each
/// check out their own session.
pub fn create_pool(
    host: &str,
    port: u16,
    database: &str,
    user: &str,
    password: &str,
    max_connections: u32,
) -> anyhow::Result<DbPool> {
    let mut cfg = Config::new();
    cfg.host = Some(host.to_string());
    cfg.port = Some(port);
    cfg.dbname = Some(database.to_string());
    cfg.user = Some(user.to_string());
    cfg.password = Some(password.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(max_connections.max(1) as usize));

    let pool = cfg
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .with_context(|| format!("Invalid pool settings for {}:{}/{}", host, port, database))?;

    log::debug!(
        "Pool for {}@{}:{}/{} with up to {} sessions",
        user,
        host,
        port,
        database,
        max_connections.max(1)
    );

    Ok(pool)
}

/// Check out one session and make sure the server answers
pub async fn check_connection(pool: &DbPool) -> anyhow::Result<()> {
    let client = pool
        .get()
        .await
        .context("Cannot check out a database session")?;
    let row = client
        .query_one("SHOW server_version", &[])
        .await
        .context("Server did not answer")?;
    let version: String = row.get(0);
    log::info!("Connected to PostgreSQL {}", version);
    Ok(())
}
