use crate::database::account::AccountStore;
use crate::error::app_error::AppError;
use crate::models::account::{Account, Role};
use crate::service::lockout::{FailedAttempt, LockState, LockoutPolicy, is_locked, register_failure};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process account store. Every operation runs under one mutex, which
/// gives the per-account atomicity the login flow relies on.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &Uuid) -> Option<Account> {
        self.accounts.lock().await.get(id).cloned()
    }

    /// Overwrite a stored account as-is, for seeding fixtures.
    pub async fn put(&self, account: Account) {
        self.accounts.lock().await.insert(account.id, account);
    }
}

#[async_trait::async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email_or_phone(&self, identifier: &str) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.lock().await;

        let found = accounts
            .values()
            .find(|account| account.matches_email(identifier))
            .or_else(|| accounts.values().find(|account| account.matches_phone(identifier)));

        Ok(found.cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().await;

        let collides = accounts.values().any(|existing| {
            existing.id == account.id || existing.email == account.email || (account.phone.is_some() && existing.phone == account.phone)
        });
        if collides {
            return Err(AppError::AccountAlreadyExists(account.email.clone()));
        }

        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, AppError> {
        Ok(self.accounts.lock().await.values().any(|account| account.role == Role::Admin))
    }

    async fn record_failed_attempt(&self, id: &Uuid, now: DateTime<Utc>, policy: &LockoutPolicy) -> Result<FailedAttempt, AppError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| AppError::StoreUnavailable(format!("account {} vanished during login attempt", id)))?;

        let attempt = register_failure(
            LockState {
                failed_attempt_count: account.failed_attempt_count,
                locked_until: account.locked_until,
            },
            now,
            policy,
        );
        account.failed_attempt_count = attempt.failed_attempt_count;
        account.locked_until = attempt.locked_until;

        Ok(attempt)
    }

    async fn record_successful_login(&self, id: &Uuid, now: DateTime<Utc>, rehashed: Option<&str>) -> Result<Option<Account>, AppError> {
        let mut accounts = self.accounts.lock().await;
        let Some(account) = accounts.get_mut(id) else {
            return Ok(None);
        };
        if is_locked(account.locked_until, now) {
            return Ok(None);
        }

        account.failed_attempt_count = 0;
        account.locked_until = None;
        account.last_login_at = Some(now);
        if let Some(hash) = rehashed {
            account.password_hash = hash.to_string();
        }

        Ok(Some(account.clone()))
    }
}
