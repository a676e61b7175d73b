pub mod audit;
pub mod auth;
pub mod lockout;
pub mod password;
pub mod provisioning;
