use std::time::Duration;

use crate::models::AuditEvent;

/// Transient success/error notices dismiss themselves after this interval.
pub const NOTICE_DISMISS: Duration = Duration::from_secs(3);

/// What the core needs from the rendering layer. Implementations own the
/// banner markup, toggles, and notices; the core only signals intent and
/// never touches a DOM. All methods are fire-and-forget.
pub trait PresentationAdapter: Send + Sync {
    fn show_banner(&self);
    fn hide_banner(&self);
    fn notice_success(&self, message: &str);
    fn notice_error(&self, message: &str);
    fn dismiss_notice(&self);
    fn audit_event(&self, event: &AuditEvent);
}

/// Headless adapter: banner signals are dropped, audit events are logged.
pub struct NoopPresentation;

impl PresentationAdapter for NoopPresentation {
    fn show_banner(&self) {}

    fn hide_banner(&self) {}

    fn notice_success(&self, message: &str) {
        tracing::debug!(message, "Consent notice (success)");
    }

    fn notice_error(&self, message: &str) {
        tracing::debug!(message, "Consent notice (error)");
    }

    fn dismiss_notice(&self) {}

    fn audit_event(&self, event: &AuditEvent) {
        tracing::info!(
            event_type = event.event_type.as_str(),
            consent_id = event.consent_id.as_deref().unwrap_or("-"),
            "Audit event"
        );
    }
}
