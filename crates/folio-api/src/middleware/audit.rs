//! Security audit logging
//!
//! Structured entries under the `audit` tracing target for:
//! - Authentication failures
//! - Rate limit violations
//! - Rejected uploads
//! - Stored uploads

use crate::utils::request_context::RequestContext;
use serde::Serialize;

/// Audit event types for categorization
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    AuthenticationFailure,
    RateLimitExceeded,
    UploadRejected,
    FileUploaded,
}

/// Structured audit log entry
#[derive(Debug, Serialize)]
pub struct AuditLogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    /// Authenticated username (if known at the time of the event)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
    /// Event details (JSON object)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditLogEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            username: None,
            client_ip: None,
            request_id: None,
            request_path: None,
            details: None,
            success: true,
            error_message: None,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn with_client_ip(mut self, client_ip: String) -> Self {
        self.client_ip = Some(client_ip);
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_request_path(mut self, path: String) -> Self {
        self.request_path = Some(path);
        self
    }

    /// Copy requester fields from a request context.
    pub fn with_context(self, ctx: &RequestContext) -> Self {
        self.with_username(ctx.username().map(str::to_string))
            .with_client_ip(ctx.client_ip.clone())
            .with_request_id(ctx.request_id.clone())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failure
    pub fn with_failure(mut self, error_message: String) -> Self {
        self.success = false;
        self.error_message = Some(error_message);
        self
    }

    /// Log the audit entry under the `audit` target
    pub fn log(&self) {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());

        if self.success {
            tracing::event!(
                target: "audit",
                tracing::Level::INFO,
                audit_entry = %json,
                event_type = ?self.event_type,
                username = ?self.username,
                success = self.success,
                "Security audit log"
            );
        } else {
            tracing::event!(
                target: "audit",
                tracing::Level::WARN,
                audit_entry = %json,
                event_type = ?self.event_type,
                username = ?self.username,
                client_ip = ?self.client_ip,
                success = self.success,
                error = ?self.error_message,
                "Security audit log - failure"
            );
        }
    }
}

pub fn log_authentication_failure(client_ip: String, request_path: String, reason: &str) {
    AuditLogEntry::new(AuditEventType::AuthenticationFailure)
        .with_client_ip(client_ip)
        .with_request_path(request_path)
        .with_failure(reason.to_string())
        .log();
}

pub fn log_rate_limit_exceeded(
    key: &str,
    client_ip: String,
    request_path: String,
    limit: u32,
    retry_after_secs: u64,
) {
    AuditLogEntry::new(AuditEventType::RateLimitExceeded)
        .with_client_ip(client_ip)
        .with_request_path(request_path)
        .with_details(serde_json::json!({
            "rate_limit_key": key,
            "rate_limit": limit,
            "retry_after_secs": retry_after_secs,
        }))
        .with_failure("Rate limit exceeded".to_string())
        .log();
}

pub fn log_upload_rejected(ctx: &RequestContext, declared_filename: &str, declared_mime: &str, reason: &str) {
    AuditLogEntry::new(AuditEventType::UploadRejected)
        .with_context(ctx)
        .with_details(serde_json::json!({
            "declared_filename": declared_filename,
            "declared_mime": declared_mime,
        }))
        .with_failure(reason.to_string())
        .log();
}

pub fn log_file_upload(ctx: &RequestContext, filename: &str, size: u64, content_type: &str) {
    AuditLogEntry::new(AuditEventType::FileUploaded)
        .with_context(ctx)
        .with_details(serde_json::json!({
            "filename": filename,
            "file_size": size,
            "content_type": content_type,
        }))
        .log();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serialization_skips_empty_fields() {
        let entry = AuditLogEntry::new(AuditEventType::FileUploaded)
            .with_username(Some("admin".to_string()));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event_type"], "file_uploaded");
        assert_eq!(json["username"], "admin");
        assert_eq!(json["success"], true);
        assert!(json.get("client_ip").is_none());
        assert!(json.get("error_message").is_none());
    }

    #[test]
    fn test_failure_entry() {
        let ctx = RequestContext {
            identity: None,
            client_ip: "203.0.113.9".to_string(),
            request_id: Some("req-1".to_string()),
        };
        let entry = AuditLogEntry::new(AuditEventType::UploadRejected)
            .with_context(&ctx)
            .with_failure("SVG files are not allowed".to_string());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["client_ip"], "203.0.113.9");
        assert_eq!(json["request_id"], "req-1");
        assert_eq!(json["error_message"], "SVG files are not allowed");
    }
}
