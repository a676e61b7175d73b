use crate::config::LoginConfig;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: i32,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from(&LoginConfig::default())
    }
}

impl From<&LoginConfig> for LockoutPolicy {
    fn from(config: &LoginConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            lock_duration: i64::try_from(config.lock_duration_ms)
                .ok()
                .and_then(Duration::try_milliseconds)
                .unwrap_or(Duration::MAX),
        }
    }
}

/// The lockout-relevant slice of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    pub failed_attempt_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Result of recording one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub failed_attempt_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
    /// This attempt is the one that engaged the lock.
    pub lock_engaged: bool,
}

pub fn is_locked(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(locked_until, Some(until) if until > now)
}

/// Time left on an active lock, or zero.
pub fn remaining(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (locked_until - now).max(Duration::zero())
}

/// Next state after a failed attempt.
///
/// An active lock keeps its expiry and only the counter moves. An expired
/// lock is discarded and counting restarts from zero before this attempt
/// is added.
pub fn register_failure(state: LockState, now: DateTime<Utc>, policy: &LockoutPolicy) -> FailedAttempt {
    if is_locked(state.locked_until, now) {
        return FailedAttempt {
            failed_attempt_count: state.failed_attempt_count.saturating_add(1),
            locked_until: state.locked_until,
            lock_engaged: false,
        };
    }

    let previous = if state.locked_until.is_some() { 0 } else { state.failed_attempt_count };
    let failed_attempt_count = previous.saturating_add(1);

    if failed_attempt_count >= policy.max_attempts {
        FailedAttempt {
            failed_attempt_count,
            locked_until: Some(now.checked_add_signed(policy.lock_duration).unwrap_or(DateTime::<Utc>::MAX_UTC)),
            lock_engaged: true,
        }
    } else {
        FailedAttempt {
            failed_attempt_count,
            locked_until: None,
            lock_engaged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::default()
    }

    #[test]
    fn default_policy_is_five_attempts_for_two_hours() {
        let policy = policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.lock_duration, Duration::hours(2));
    }

    #[test]
    fn fifth_failure_engages_lock() {
        let now = Utc::now();
        let state = LockState {
            failed_attempt_count: 4,
            locked_until: None,
        };

        let attempt = register_failure(state, now, &policy());
        assert_eq!(attempt.failed_attempt_count, 5);
        assert_eq!(attempt.locked_until, Some(now + Duration::hours(2)));
        assert!(attempt.lock_engaged);
    }

    #[test]
    fn failures_under_threshold_do_not_lock() {
        let now = Utc::now();
        let state = LockState {
            failed_attempt_count: 2,
            locked_until: None,
        };

        let attempt = register_failure(state, now, &policy());
        assert_eq!(attempt.failed_attempt_count, 3);
        assert!(attempt.locked_until.is_none());
        assert!(!attempt.lock_engaged);
    }

    #[test]
    fn active_lock_counts_without_extending() {
        let now = Utc::now();
        let until = now + Duration::minutes(30);
        let state = LockState {
            failed_attempt_count: 5,
            locked_until: Some(until),
        };

        let attempt = register_failure(state, now, &policy());
        assert_eq!(attempt.failed_attempt_count, 6);
        assert_eq!(attempt.locked_until, Some(until));
        assert!(!attempt.lock_engaged);
    }

    #[test]
    fn expired_lock_restarts_budget() {
        let now = Utc::now();
        let state = LockState {
            failed_attempt_count: 7,
            locked_until: Some(now - Duration::seconds(1)),
        };

        let attempt = register_failure(state, now, &policy());
        assert_eq!(attempt.failed_attempt_count, 1);
        assert!(attempt.locked_until.is_none());
    }

    #[test]
    fn lock_boundary_is_exclusive() {
        let now = Utc::now();
        assert!(!is_locked(Some(now), now));
        assert!(is_locked(Some(now + Duration::milliseconds(1)), now));
        assert!(!is_locked(None, now));
        assert_eq!(remaining(now - Duration::seconds(5), now), Duration::zero());
    }

    proptest! {
        #[test]
        fn counter_advances_by_one_unless_lock_expired(count in 0i32..50, offset_secs in -10_000i64..10_000, has_lock in any::<bool>()) {
            let now = Utc::now();
            let locked_until = has_lock.then(|| now + Duration::seconds(offset_secs));
            let state = LockState { failed_attempt_count: count, locked_until };

            let attempt = register_failure(state, now, &policy());

            if has_lock && !is_locked(locked_until, now) {
                prop_assert_eq!(attempt.failed_attempt_count, 1);
            } else {
                prop_assert_eq!(attempt.failed_attempt_count, count + 1);
            }
        }

        #[test]
        fn lock_engages_only_from_unlocked_state_at_threshold(count in 0i32..20, max_attempts in 1i32..10) {
            let now = Utc::now();
            let policy = LockoutPolicy { max_attempts, lock_duration: Duration::hours(2) };
            let state = LockState { failed_attempt_count: count, locked_until: None };

            let attempt = register_failure(state, now, &policy);

            prop_assert_eq!(attempt.lock_engaged, count + 1 >= max_attempts);
            prop_assert_eq!(attempt.locked_until.is_some(), attempt.lock_engaged);
        }

        #[test]
        fn active_lock_expiry_is_fixed(count in 0i32..50, remaining_secs in 1i64..7_200) {
            let now = Utc::now();
            let until = now + Duration::seconds(remaining_secs);
            let state = LockState { failed_attempt_count: count, locked_until: Some(until) };

            let attempt = register_failure(state, now, &policy());

            prop_assert_eq!(attempt.locked_until, Some(until));
            prop_assert!(!attempt.lock_engaged);
        }
    }
}
