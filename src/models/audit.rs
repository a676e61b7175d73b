/// Event types for the security audit trail
pub mod audit_events {
    // Authentication events
    pub const LOGIN_SUCCESS: &str = "login_success";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGIN_LOCKED_OUT: &str = "login_locked_out";
    pub const LOGIN_INACTIVE: &str = "login_inactive";

    // Account state events
    pub const ACCOUNT_LOCKED: &str = "account_locked";
    pub const PASSWORD_REHASHED: &str = "password_rehashed";
    pub const ADMIN_PROVISIONED: &str = "admin_provisioned";
}
