// src/service/auth.rs

use crate::Config;
use crate::database::account::AccountStore;
use crate::error::app_error::AppError;
use crate::models::account::{Account, AccountResponse};
use crate::models::audit::audit_events;
use crate::service::audit::record_security_event;
use crate::service::lockout::{LockoutPolicy, is_locked, remaining};
use crate::service::password::PasswordHasher;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

/// What happened during a login attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Success(AccountResponse),
    /// Unknown identifier or wrong password; the two are not distinguished.
    CredentialsInvalid,
    AccountInactive,
    AccountLocked { locked_until: DateTime<Utc>, retry_after: Duration },
}

/// Verifies credentials and applies the lockout policy.
pub struct Authenticator {
    store: Arc<dyn AccountStore>,
    hasher: PasswordHasher,
    policy: LockoutPolicy,
}

impl Authenticator {
    pub fn new(store: Arc<dyn AccountStore>, hasher: PasswordHasher, policy: LockoutPolicy) -> Self {
        Self { store, hasher, policy }
    }

    pub fn from_config(store: Arc<dyn AccountStore>, config: &Config) -> Result<Self, AppError> {
        let hasher = PasswordHasher::new(config.password.hash_cost)?;
        Ok(Self::new(store, hasher, LockoutPolicy::from(&config.login)))
    }

    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<AuthOutcome, AppError> {
        self.authenticate_at(identifier, password, None, Utc::now()).await
    }

    pub async fn authenticate_at(&self, identifier: &str, password: &str, client_ip: Option<&str>, now: DateTime<Utc>) -> Result<AuthOutcome, AppError> {
        let Some(account) = self.store.find_by_email_or_phone(identifier).await? else {
            self.hasher.dummy_verify_blocking(password).await;
            record_security_event(
                None,
                audit_events::LOGIN_FAILED,
                false,
                client_ip,
                Some(json!({ "reason": "unknown_identifier" })),
            );
            return Ok(AuthOutcome::CredentialsInvalid);
        };

        if !account.is_active {
            record_security_event(Some(&account.id), audit_events::LOGIN_INACTIVE, false, client_ip, None);
            return Ok(AuthOutcome::AccountInactive);
        }

        if is_locked(account.locked_until, now) {
            return self.refuse_locked(&account, client_ip, now).await;
        }

        let password_matches = self
            .hasher
            .verify_blocking(password, &account.password_hash)
            .await
            .inspect_err(|e| {
                error!(account_id = %account.id, error = ?e, "stored password hash could not be verified");
            })?;

        if !password_matches {
            let attempt = self.store.record_failed_attempt(&account.id, now, &self.policy).await?;
            if attempt.lock_engaged {
                record_security_event(
                    Some(&account.id),
                    audit_events::ACCOUNT_LOCKED,
                    false,
                    client_ip,
                    Some(json!({
                        "failed_attempts": attempt.failed_attempt_count,
                        "locked_until": attempt.locked_until,
                    })),
                );
            }
            record_security_event(
                Some(&account.id),
                audit_events::LOGIN_FAILED,
                false,
                client_ip,
                Some(json!({ "reason": "wrong_password", "failed_attempts": attempt.failed_attempt_count })),
            );
            return Ok(AuthOutcome::CredentialsInvalid);
        }

        let rehashed = self.upgraded_hash(&account, password).await;
        match self.store.record_successful_login(&account.id, now, rehashed.as_deref()).await? {
            Some(updated) => {
                if rehashed.is_some() {
                    record_security_event(Some(&account.id), audit_events::PASSWORD_REHASHED, true, client_ip, None);
                }
                record_security_event(Some(&account.id), audit_events::LOGIN_SUCCESS, true, client_ip, None);
                Ok(AuthOutcome::Success(AccountResponse::from(&updated)))
            }
            // A concurrent attempt engaged the lock after our read.
            None => self.refuse_locked(&account, client_ip, now).await,
        }
    }

    async fn refuse_locked(&self, account: &Account, client_ip: Option<&str>, now: DateTime<Utc>) -> Result<AuthOutcome, AppError> {
        let attempt = self.store.record_failed_attempt(&account.id, now, &self.policy).await?;

        match attempt.locked_until.filter(|until| *until > now) {
            Some(locked_until) => {
                record_security_event(
                    Some(&account.id),
                    audit_events::LOGIN_LOCKED_OUT,
                    false,
                    client_ip,
                    Some(json!({ "failed_attempts": attempt.failed_attempt_count, "locked_until": locked_until })),
                );
                Ok(AuthOutcome::AccountLocked {
                    locked_until,
                    retry_after: remaining(locked_until, now),
                })
            }
            // The lock lapsed between read and write; the attempt was counted as a fresh failure.
            None => Ok(AuthOutcome::CredentialsInvalid),
        }
    }

    async fn upgraded_hash(&self, account: &Account, password: &str) -> Option<String> {
        if !self.hasher.needs_rehash(&account.password_hash) {
            return None;
        }

        match self.hasher.hash_blocking(password).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(account_id = %account.id, error = ?e, "password rehash failed, keeping existing hash");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryAccountStore;
    use crate::test_utils::{FlakyStore, sample_account, test_hasher};
    use std::sync::atomic::Ordering;

    const PASSWORD: &str = "Gallery-Curator-88";

    fn authenticator(store: Arc<dyn AccountStore>) -> Authenticator {
        Authenticator::new(store, test_hasher(), LockoutPolicy::default())
    }

    async fn seeded(account: Account) -> (Arc<MemoryAccountStore>, Authenticator) {
        let store = Arc::new(MemoryAccountStore::new());
        store.put(account).await;
        let auth = authenticator(store.clone());
        (store, auth)
    }

    #[tokio::test]
    async fn correct_password_succeeds_and_stamps_last_login() {
        let account = sample_account(&test_hasher(), PASSWORD);
        let (store, auth) = seeded(account.clone()).await;
        let now = Utc::now();

        let outcome = auth.authenticate_at(&account.email, PASSWORD, None, now).await.unwrap();

        let AuthOutcome::Success(response) = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(response.id, account.id);
        assert_eq!(response.last_login_at, Some(now));
        assert_eq!(store.get(&account.id).await.unwrap().last_login_at, Some(now));
    }

    #[tokio::test]
    async fn phone_number_is_an_identifier() {
        let account = sample_account(&test_hasher(), PASSWORD);
        let (_store, auth) = seeded(account.clone()).await;

        let outcome = auth.authenticate(account.phone.as_deref().unwrap(), PASSWORD).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Success(_)));
    }

    #[tokio::test]
    async fn success_resets_counter() {
        let mut account = sample_account(&test_hasher(), PASSWORD);
        account.failed_attempt_count = 3;
        let (store, auth) = seeded(account.clone()).await;

        auth.authenticate(&account.email, PASSWORD).await.unwrap();

        let stored = store.get(&account.id).await.unwrap();
        assert_eq!(stored.failed_attempt_count, 0);
        assert!(stored.locked_until.is_none());
    }

    #[tokio::test]
    async fn fourth_failure_then_fifth_locks_without_revealing_it() {
        let mut account = sample_account(&test_hasher(), PASSWORD);
        account.failed_attempt_count = 4;
        let (store, auth) = seeded(account.clone()).await;
        let now = Utc::now();

        let outcome = auth.authenticate_at(&account.email, "wrong-password", None, now).await.unwrap();
        assert_eq!(outcome, AuthOutcome::CredentialsInvalid);

        let stored = store.get(&account.id).await.unwrap();
        assert_eq!(stored.failed_attempt_count, 5);
        assert_eq!(stored.locked_until, Some(now + Duration::hours(2)));
    }

    #[tokio::test]
    async fn locked_account_refuses_correct_password_and_keeps_expiry() {
        let account = sample_account(&test_hasher(), PASSWORD);
        let (store, auth) = seeded(account.clone()).await;
        let start = Utc::now();

        for _ in 0..5 {
            let outcome = auth.authenticate_at(&account.email, "wrong-password", None, start).await.unwrap();
            assert_eq!(outcome, AuthOutcome::CredentialsInvalid);
        }
        let locked_until = store.get(&account.id).await.unwrap().locked_until.unwrap();

        let later = start + Duration::minutes(90);
        let outcome = auth.authenticate_at(&account.email, PASSWORD, None, later).await.unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::AccountLocked {
                locked_until,
                retry_after: Duration::minutes(30),
            }
        );

        let stored = store.get(&account.id).await.unwrap();
        assert_eq!(stored.failed_attempt_count, 6);
        assert_eq!(stored.locked_until, Some(locked_until));
        assert!(stored.last_login_at.is_none());
    }

    #[tokio::test]
    async fn expired_lock_gives_a_fresh_budget() {
        let now = Utc::now();
        let mut account = sample_account(&test_hasher(), PASSWORD);
        account.failed_attempt_count = 5;
        account.locked_until = Some(now - Duration::seconds(1));
        let (store, auth) = seeded(account.clone()).await;

        let outcome = auth.authenticate_at(&account.email, "wrong-password", None, now).await.unwrap();
        assert_eq!(outcome, AuthOutcome::CredentialsInvalid);
        let stored = store.get(&account.id).await.unwrap();
        assert_eq!(stored.failed_attempt_count, 1);
        assert!(stored.locked_until.is_none());

        let outcome = auth.authenticate_at(&account.email, PASSWORD, None, now).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Success(_)));
        assert_eq!(store.get(&account.id).await.unwrap().failed_attempt_count, 0);
    }

    #[tokio::test]
    async fn unknown_identifier_looks_like_wrong_password_and_mutates_nothing() {
        let account = sample_account(&test_hasher(), PASSWORD);
        let (store, auth) = seeded(account.clone()).await;

        let unknown = auth.authenticate("nobody@showroom.test", PASSWORD).await.unwrap();
        assert_eq!(unknown, AuthOutcome::CredentialsInvalid);
        assert_eq!(store.get(&account.id).await.unwrap(), account);

        let wrong = auth.authenticate(&account.email, "wrong-password").await.unwrap();
        assert_eq!(unknown, wrong);

        let stored = store.get(&account.id).await.unwrap();
        assert_eq!(stored.failed_attempt_count, 1);
    }

    #[tokio::test]
    async fn inactive_account_is_refused_without_mutation() {
        let mut account = sample_account(&test_hasher(), PASSWORD);
        account.is_active = false;
        account.failed_attempt_count = 2;
        let (store, auth) = seeded(account.clone()).await;

        let outcome = auth.authenticate(&account.email, PASSWORD).await.unwrap();
        assert_eq!(outcome, AuthOutcome::AccountInactive);
        assert_eq!(store.get(&account.id).await.unwrap(), account);
    }

    #[tokio::test]
    async fn concurrent_failures_are_all_counted() {
        let account = sample_account(&test_hasher(), PASSWORD);
        let (store, auth) = seeded(account.clone()).await;
        let auth = Arc::new(auth);
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let auth = auth.clone();
            let email = account.email.clone();
            handles.push(tokio::spawn(async move { auth.authenticate_at(&email, "wrong-password", None, now).await }));
        }
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert!(matches!(outcome, AuthOutcome::CredentialsInvalid | AuthOutcome::AccountLocked { .. }));
        }

        let stored = store.get(&account.id).await.unwrap();
        assert_eq!(stored.failed_attempt_count, 12);
        assert_eq!(stored.locked_until, Some(now + Duration::hours(2)));
    }

    #[tokio::test]
    async fn concurrent_failures_engage_the_lock_once() {
        let account = sample_account(&test_hasher(), PASSWORD);
        let store = Arc::new(MemoryAccountStore::new());
        store.put(account.clone()).await;
        let policy = LockoutPolicy::default();
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let id = account.id;
            handles.push(tokio::spawn(async move { store.record_failed_attempt(&id, now, &policy).await }));
        }

        let mut engaged = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().lock_engaged {
                engaged += 1;
            }
        }
        assert_eq!(engaged, 1);
        assert_eq!(store.get(&account.id).await.unwrap().failed_attempt_count, 20);
    }

    #[tokio::test]
    async fn store_outage_surfaces_without_partial_mutation() {
        let account = sample_account(&test_hasher(), PASSWORD);
        let store = Arc::new(FlakyStore::default());
        store.inner.put(account.clone()).await;
        let auth = authenticator(store.clone());

        store.fail_writes.store(true, Ordering::SeqCst);
        let result = auth.authenticate(&account.email, "wrong-password").await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
        let result = auth.authenticate(&account.email, PASSWORD).await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
        assert_eq!(store.inner.get(&account.id).await.unwrap(), account);

        store.fail_reads.store(true, Ordering::SeqCst);
        let result = auth.authenticate(&account.email, PASSWORD).await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn corrupt_hash_is_an_error_not_a_failed_attempt() {
        let mut account = sample_account(&test_hasher(), PASSWORD);
        account.password_hash = "corrupted".to_string();
        let (store, auth) = seeded(account.clone()).await;

        let result = auth.authenticate(&account.email, PASSWORD).await;
        assert!(matches!(result, Err(AppError::PasswordHash { .. })));
        assert_eq!(store.get(&account.id).await.unwrap().failed_attempt_count, 0);
    }

    #[tokio::test]
    async fn legacy_bcrypt_hash_is_upgraded_on_login() {
        let mut account = sample_account(&test_hasher(), PASSWORD);
        account.password_hash = bcrypt::hash(PASSWORD, 4).unwrap();
        let (store, auth) = seeded(account.clone()).await;

        let outcome = auth.authenticate(&account.email, PASSWORD).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Success(_)));

        let stored = store.get(&account.id).await.unwrap();
        assert!(stored.password_hash.starts_with("$argon2id$"));
        assert!(test_hasher().verify(PASSWORD, &stored.password_hash).unwrap());
    }
}
