use crate::config::{Config, DatabaseConfig};
use crate::database::postgres_repository::PostgresRepository;
use crate::service::auth::Authenticator;
use rocket::fairing::AdHoc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

pub async fn init_pool(db_config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.acquire_timeout))
        .idle_timeout(Duration::from_secs(30))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_config.url)
        .await?;

    if db_config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(pool)
}

/// Connect to Postgres and manage an [`Authenticator`] backed by it.
pub fn stage_db(config: Config) -> AdHoc {
    AdHoc::try_on_ignite("Postgres (sqlx)", |rocket| async move {
        let pool = match init_pool(&config.database).await {
            Ok(pool) => pool,
            Err(e) => {
                tracing::error!("Failed to initialize database pool: {}", e);
                return Err(rocket);
            }
        };
        tracing::info!("Database pool initialized successfully");

        let repo = Arc::new(PostgresRepository { pool });
        match Authenticator::from_config(repo, &config) {
            Ok(authenticator) => Ok(rocket.manage(authenticator)),
            Err(e) => {
                tracing::error!(error = ?e, "Failed to build authenticator");
                Err(rocket)
            }
        }
    })
}
