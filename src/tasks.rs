use crate::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::db::init_pool;
use crate::service::password::PasswordHasher;
use crate::service::provisioning::{ProvisionOutcome, admin_request_from_config, provision_admin};

/// Deployment-time admin bootstrap against the configured database.
pub async fn provision_admin_from_config(config: &Config) -> Result<ProvisionOutcome, String> {
    let request = admin_request_from_config(&config.provisioning).map_err(|err| err.to_string())?;
    let hasher = PasswordHasher::new(config.password.hash_cost).map_err(|err| format!("Failed to build password hasher: {err:?}"))?;

    let pool = init_pool(&config.database)
        .await
        .map_err(|err| format!("Failed to initialize database pool: {err}"))?;

    let repo = PostgresRepository { pool: pool.clone() };
    let result = provision_admin(&repo, &hasher, &request)
        .await
        .map_err(|err| format!("Failed to provision admin account: {err:?}"));

    pool.close().await;

    result
}
