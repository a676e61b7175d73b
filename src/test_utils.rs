use crate::database::account::AccountStore;
use crate::database::memory::MemoryAccountStore;
use crate::error::app_error::AppError;
use crate::models::account::{Account, NewAccount, Role};
use crate::service::lockout::{FailedAttempt, LockoutPolicy};
use crate::service::password::PasswordHasher;
use argon2::Params;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Argon2 with minimal memory and one pass, so tests stay fast.
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::with_params(Params::new(1024, 1, 1, None).expect("valid test params")).expect("test hasher")
}

pub fn sample_new_account() -> NewAccount {
    NewAccount {
        name: "Gallery Curator".to_string(),
        email: "curator@showroom.test".to_string(),
        phone: Some("5550100200".to_string()),
        password: "Walnut-Sideboard-47".to_string(),
        role: Role::Editor,
    }
}

/// An active editor with a unique email and phone, hashed with `password`.
pub fn sample_account(hasher: &PasswordHasher, password: &str) -> Account {
    let id = Uuid::new_v4();
    Account {
        id,
        name: "Gallery Curator".to_string(),
        email: format!("curator-{}@showroom.test", id.simple()),
        phone: Some(format!("{:010}", id.as_u128() % 10_000_000_000)),
        password_hash: hasher.hash(password).expect("hash sample password"),
        role: Role::Editor,
        is_active: true,
        failed_attempt_count: 0,
        locked_until: None,
        last_login_at: None,
        created_at: Utc::now(),
    }
}

/// Memory store whose writes can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryAccountStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FlakyStore {
    fn check(flag: &AtomicBool) -> Result<(), AppError> {
        if flag.load(Ordering::SeqCst) {
            Err(AppError::StoreUnavailable("simulated store outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl AccountStore for FlakyStore {
    async fn find_by_email_or_phone(&self, identifier: &str) -> Result<Option<Account>, AppError> {
        Self::check(&self.fail_reads)?;
        self.inner.find_by_email_or_phone(identifier).await
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        Self::check(&self.fail_writes)?;
        self.inner.insert_account(account).await
    }

    async fn admin_exists(&self) -> Result<bool, AppError> {
        Self::check(&self.fail_reads)?;
        self.inner.admin_exists().await
    }

    async fn record_failed_attempt(&self, id: &Uuid, now: DateTime<Utc>, policy: &LockoutPolicy) -> Result<FailedAttempt, AppError> {
        Self::check(&self.fail_writes)?;
        self.inner.record_failed_attempt(id, now, policy).await
    }

    async fn record_successful_login(&self, id: &Uuid, now: DateTime<Utc>, rehashed: Option<&str>) -> Result<Option<Account>, AppError> {
        Self::check(&self.fail_writes)?;
        self.inner.record_successful_login(id, now, rehashed).await
    }
}
