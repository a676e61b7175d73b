use crate::error::app_error::AppError;
use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};

const DECOY_PASSWORD: &str = "showroom-decoy-never-matches";

/// Argon2id password hashing with a configurable time cost.
///
/// Hashes imported from the previous backend are bcrypt; they still verify,
/// and [`PasswordHasher::needs_rehash`] flags them for upgrade.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    decoy_hash: String,
}

impl PasswordHasher {
    /// Build a hasher whose Argon2 time cost is `cost` iterations.
    pub fn new(cost: u32) -> Result<Self, AppError> {
        let params = Params::new(Params::DEFAULT_M_COST, cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| AppError::password_hash("Invalid password hash cost", e))?;
        Self::with_params(params)
    }

    pub(crate) fn with_params(params: Params) -> Result<Self, AppError> {
        let mut hasher = Self {
            params,
            decoy_hash: String::new(),
        };
        // A real hash at the configured cost, so decoy verification costs the same as a real one.
        hasher.decoy_hash = hasher.hash(DECOY_PASSWORD)?;
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` only for a genuine mismatch; malformed hashes are errors.
    pub fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AppError> {
        if is_legacy_bcrypt(stored_hash) {
            return Ok(bcrypt::verify(password, stored_hash)?);
        }

        let parsed = PasswordHash::new(stored_hash).map_err(|e| AppError::password_hash("Failed to parse stored password hash", e))?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::password_hash("Password verification failed", e)),
        }
    }

    /// True when the stored hash is weaker than what this hasher produces.
    /// Never true for a hash that is stronger than the configured cost.
    pub fn needs_rehash(&self, stored_hash: &str) -> bool {
        if is_legacy_bcrypt(stored_hash) {
            return true;
        }

        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return true;
        }

        match Params::try_from(&parsed) {
            Ok(params) => params.t_cost() < self.params.t_cost() || params.m_cost() < self.params.m_cost(),
            Err(_) => false,
        }
    }

    /// Throwaway verification so unknown identifiers cost as much as known ones.
    pub fn dummy_verify(&self, password: &str) {
        let _ = self.verify(password, &self.decoy_hash);
    }

    /// [`PasswordHasher::hash`] on the blocking pool.
    pub async fn hash_blocking(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        self.run_blocking(move |hasher| hasher.hash(&password)).await
    }

    /// [`PasswordHasher::verify`] on the blocking pool.
    pub async fn verify_blocking(&self, password: &str, stored_hash: &str) -> Result<bool, AppError> {
        let (password, stored_hash) = (password.to_owned(), stored_hash.to_owned());
        self.run_blocking(move |hasher| hasher.verify(&password, &stored_hash)).await
    }

    /// [`PasswordHasher::dummy_verify`] on the blocking pool.
    pub async fn dummy_verify_blocking(&self, password: &str) {
        let password = password.to_owned();
        let _ = self
            .run_blocking(move |hasher| {
                hasher.dummy_verify(&password);
                Ok(())
            })
            .await;
    }

    // Argon2 at production cost takes long enough to stall an executor thread.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(PasswordHasher) -> Result<T, AppError> + Send + 'static,
    {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || work(hasher))
            .await
            .map_err(|e| AppError::password_hash("Password hashing task failed", e))?
    }
}

fn is_legacy_bcrypt(stored_hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|prefix| stored_hash.starts_with(prefix))
}
