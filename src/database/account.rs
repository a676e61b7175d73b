use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::account::Account;
use crate::service::lockout::{FailedAttempt, LockState, LockoutPolicy, register_failure};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, password_hash, role, is_active, failed_attempt_count, locked_until, last_login_at, created_at";

/// Persistence for admin-console accounts.
///
/// The two `record_*` methods are the only writes the login flow performs,
/// and each must be atomic per account: concurrent attempts against one
/// account may not lose counter updates.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Email match (case-insensitive) wins over a phone match.
    async fn find_by_email_or_phone(&self, identifier: &str) -> Result<Option<Account>, AppError>;

    async fn insert_account(&self, account: &Account) -> Result<(), AppError>;

    async fn admin_exists(&self) -> Result<bool, AppError>;

    /// Apply [`register_failure`] to the stored state and persist the result.
    async fn record_failed_attempt(&self, id: &Uuid, now: DateTime<Utc>, policy: &LockoutPolicy) -> Result<FailedAttempt, AppError>;

    /// Reset the counter, clear the lock and stamp `last_login_at`, optionally
    /// replacing the password hash. Applies only while the account is not
    /// locked at `now`; returns `None` when a concurrent attempt locked it.
    async fn record_successful_login(&self, id: &Uuid, now: DateTime<Utc>, rehashed: Option<&str>) -> Result<Option<Account>, AppError>;
}

#[async_trait::async_trait]
impl AccountStore for PostgresRepository {
    async fn find_by_email_or_phone(&self, identifier: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM admin_account
            WHERE email = lower(trim($1)) OR phone = trim($1)
            ORDER BY (email = lower(trim($1))) DESC
            LIMIT 1
            "#
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to look up account", e))?;

        Ok(account)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO admin_account (id, name, email, phone, password_hash, role, is_active, failed_attempt_count, locked_until, last_login_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.password_hash)
        .bind(account.role)
        .bind(account.is_active)
        .bind(account.failed_attempt_count)
        .bind(account.locked_until)
        .bind(account.last_login_at)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::AccountAlreadyExists(account.email.clone()),
            other => AppError::store("Failed to insert account", other),
        })?;

        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM admin_account WHERE role = 'admin')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::store("Failed to check for admin accounts", e))?;

        Ok(exists)
    }

    async fn record_failed_attempt(&self, id: &Uuid, now: DateTime<Utc>, policy: &LockoutPolicy) -> Result<FailedAttempt, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent attempts on the same account.
        let row = sqlx::query_as::<_, (i32, Option<DateTime<Utc>>)>(
            r#"
            SELECT failed_attempt_count, locked_until
            FROM admin_account
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::store("Failed to lock account row", e))?;

        let Some((failed_attempt_count, locked_until)) = row else {
            return Err(AppError::StoreUnavailable(format!("account {} vanished during login attempt", id)));
        };

        let attempt = register_failure(
            LockState {
                failed_attempt_count,
                locked_until,
            },
            now,
            policy,
        );

        sqlx::query(
            r#"
            UPDATE admin_account
            SET failed_attempt_count = $2, locked_until = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempt.failed_attempt_count)
        .bind(attempt.locked_until)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::store("Failed to record failed login attempt", e))?;

        tx.commit().await.map_err(|e| AppError::store("Failed to commit failed login attempt", e))?;

        Ok(attempt)
    }

    async fn record_successful_login(&self, id: &Uuid, now: DateTime<Utc>, rehashed: Option<&str>) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE admin_account
            SET failed_attempt_count = 0,
                locked_until = NULL,
                last_login_at = $2,
                password_hash = COALESCE($3, password_hash),
                updated_at = $2
            WHERE id = $1
              AND (locked_until IS NULL OR locked_until <= $2)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(now)
        .bind(rehashed)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to record successful login", e))?;

        Ok(account)
    }
}
