use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use super::category::CategoryId;
use super::consent_record::ConsentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ConsentGiven,
    ConsentWithdrawn,
    ConsentCleared,
}

impl AuditEventType {
    /// Returns the event type as a string for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::ConsentGiven => "consent_given",
            AuditEventType::ConsentWithdrawn => "consent_withdrawn",
            AuditEventType::ConsentCleared => "consent_cleared",
        }
    }
}

/// Emitted to the presentation layer on every consent mutation. The payload
/// is plain JSON so sinks can log or forward it without knowing the schema.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub consent_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub payload: JsonValue,
}

impl AuditEvent {
    pub fn consent_given(record: &ConsentRecord) -> Self {
        AuditEvent {
            event_type: AuditEventType::ConsentGiven,
            consent_id: Some(record.consent_id.clone()),
            timestamp: record.last_modified,
            payload: json!({
                "categories": record.categories,
                "services": record.services.keys().collect::<Vec<_>>(),
            }),
        }
    }

    pub fn consent_withdrawn(record: &ConsentRecord, withdrawn: &BTreeSet<CategoryId>) -> Self {
        AuditEvent {
            event_type: AuditEventType::ConsentWithdrawn,
            consent_id: Some(record.consent_id.clone()),
            timestamp: record.last_modified,
            payload: json!({
                "withdrawnCategories": withdrawn,
                "remainingCategories": record.granted_categories(),
                "historyLength": record.withdrawal_history.len(),
            }),
        }
    }

    pub fn consent_cleared(previous_consent_id: Option<String>) -> Self {
        AuditEvent {
            event_type: AuditEventType::ConsentCleared,
            consent_id: previous_consent_id,
            timestamp: Utc::now(),
            payload: JsonValue::Null,
        }
    }
}
