use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::AppError;

/// Embedded schema migrations, applied in order.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init",
    include_str!("../migrations/0001_init.sql"),
)];

pub fn create_pool(cfg: &DbConfig) -> Result<Pool, AppError> {
    let pg_config: tokio_postgres::Config = cfg
        .database_url
        .parse()
        .map_err(|e| AppError::Config(format!("DATABASE_URL: {e}")))?;

    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );

    Pool::builder(manager)
        .max_size(cfg.max_connections)
        .runtime(Runtime::Tokio1)
        .create_timeout(Some(Duration::from_secs(cfg.connect_timeout_secs)))
        .wait_timeout(Some(Duration::from_secs(cfg.connect_timeout_secs)))
        .build()
        .map_err(|e| AppError::StartServer(format!("db pool: {e}")))
}

/// Builds the pool, verifies connectivity and applies pending migrations.
pub async fn init_pool(cfg: &DbConfig) -> Result<Pool, AppError> {
    let pool = create_pool(cfg)?;
    tokio::time::timeout(Duration::from_secs(cfg.connect_timeout_secs), async {
        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok::<(), AppError>(())
    })
    .await
    .map_err(|_| AppError::StartServer("database connection verification timeout".into()))??;
    info!(max_connections = cfg.max_connections, "database pool ready");
    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<(), AppError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS _schema_migrations (
                version TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .await?;

    for (version, sql) in MIGRATIONS {
        let tx = client.transaction().await?;
        // Serialise concurrent boots on the same database.
        tx.execute("LOCK TABLE _schema_migrations IN EXCLUSIVE MODE", &[])
            .await?;
        let applied = tx
            .query_opt(
                "SELECT 1 FROM _schema_migrations WHERE version = $1",
                &[version],
            )
            .await?
            .is_some();
        if applied {
            debug!(version, "migration already applied");
            continue;
        }
        tx.batch_execute(sql).await?;
        tx.execute(
            "INSERT INTO _schema_migrations (version) VALUES ($1)",
            &[version],
        )
        .await?;
        tx.commit().await?;
        info!(version, "migration applied");
    }
    Ok(())
}
