use crate::config::ProvisioningConfig;
use crate::database::account::AccountStore;
use crate::error::app_error::AppError;
use crate::models::account::{Account, NewAccount, Role};
use crate::models::audit::audit_events;
use crate::service::audit::record_security_event;
use crate::service::password::PasswordHasher;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created(Uuid),
    AlreadyProvisioned,
}

/// Create the first admin account unless one already exists.
///
/// Safe to run on every deploy: once any admin exists this is a no-op.
pub async fn provision_admin(store: &dyn AccountStore, hasher: &PasswordHasher, request: &NewAccount) -> Result<ProvisionOutcome, AppError> {
    if store.admin_exists().await? {
        tracing::info!("admin account already present, skipping provisioning");
        return Ok(ProvisionOutcome::AlreadyProvisioned);
    }

    let request = NewAccount {
        role: Role::Admin,
        ..request.clone()
    };
    let hasher = hasher.clone();
    let account = tokio::task::spawn_blocking(move || Account::create(&request, &hasher, Utc::now()))
        .await
        .map_err(|e| AppError::password_hash("Password hashing task failed", e))??;
    store.insert_account(&account).await?;

    record_security_event(
        Some(&account.id),
        audit_events::ADMIN_PROVISIONED,
        true,
        None,
        Some(json!({ "email": &account.email })),
    );

    Ok(ProvisionOutcome::Created(account.id))
}

/// Build the admin request from configuration; every field but the phone is required.
pub fn admin_request_from_config(config: &ProvisioningConfig) -> Result<NewAccount, AppError> {
    let required = |value: &Option<String>, key: &str| {
        value
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::configuration(format!("provisioning.{} is required", key)))
    };

    Ok(NewAccount {
        name: required(&config.admin_name, "admin_name")?,
        email: required(&config.admin_email, "admin_email")?,
        phone: config.admin_phone.clone().filter(|p| !p.trim().is_empty()),
        password: required(&config.admin_password, "admin_password")?,
        role: Role::Admin,
    })
}
