use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Emit a security audit event.
///
/// Audit events share the `audit` category so they can be routed to a
/// dedicated sink by the subscriber. Failures are logged at `warn`.
pub fn record_security_event(account_id: Option<&Uuid>, event_type: &str, success: bool, ip_address: Option<&str>, metadata: Option<JsonValue>) {
    let account = account_id.map(|id| id.to_string());
    let metadata = metadata.map(|m| m.to_string());

    if success {
        tracing::info!(
            category = "audit",
            event_type = event_type,
            success = success,
            account_id = account.as_deref().unwrap_or("-"),
            ip = ip_address.unwrap_or("-"),
            metadata = metadata.as_deref().unwrap_or("-"),
            "security audit event"
        );
    } else {
        tracing::warn!(
            category = "audit",
            event_type = event_type,
            success = success,
            account_id = account.as_deref().unwrap_or("-"),
            ip = ip_address.unwrap_or("-"),
            metadata = metadata.as_deref().unwrap_or("-"),
            "security audit event (failure)"
        );
    }
}
