use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategoryId;

/// Schema version written into every record. Records carrying any other
/// version are discarded on load, never migrated.
pub const SCHEMA_VERSION: &str = "2.0";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("schema version mismatch: found '{found}', expected '{expected}'")]
    SchemaVersionMismatch { found: String, expected: &'static str },
}

/// Derived per-service breakdown of what the chosen categories authorize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConsent {
    pub consented: bool,
    pub timestamp: DateTime<Utc>,
    pub purpose: String,
}

/// Deep value copy of the consent state a withdrawal replaced. Deliberately
/// excludes `services` and `withdrawal_history` so records can never nest
/// or form reference cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSnapshot {
    pub consent_id: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub categories: BTreeMap<CategoryId, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalMethod {
    UserInitiated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRecord {
    pub timestamp: DateTime<Utc>,
    pub withdrawn_categories: BTreeSet<CategoryId>,
    pub previous_consent: ConsentSnapshot,
    pub method: WithdrawalMethod,
}

/// The durable unit: a user's cookie decisions plus audit metadata.
/// Serialized camelCase, matching the wire format of the embedded widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    pub necessary: bool,
    #[serde(default)]
    pub categories: BTreeMap<CategoryId, bool>,
    pub version: String,
    pub consent_id: String,
    pub timestamp: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConsent>,
    #[serde(default)]
    pub withdrawal_history: Vec<WithdrawalRecord>,
}

impl ConsentRecord {
    /// Builds a record for a fresh consent decision. Mints a new consent id,
    /// forces `necessary` to true, and fills every optional category
    /// explicitly (absent selections count as declined). A `necessary` key
    /// in the selections is ignored: it cannot be toggled.
    pub fn new(selections: &BTreeMap<CategoryId, bool>) -> Self {
        let now = Utc::now();
        let categories = CategoryId::optional()
            .map(|c| (c, selections.get(&c).copied().unwrap_or(false)))
            .collect();

        ConsentRecord {
            necessary: true,
            categories,
            version: SCHEMA_VERSION.to_string(),
            consent_id: Uuid::new_v4().to_string(),
            timestamp: now,
            last_modified: now,
            services: BTreeMap::new(),
            withdrawal_history: Vec::new(),
        }
    }

    pub fn accept_all() -> Self {
        let selections = CategoryId::optional().map(|c| (c, true)).collect();
        Self::new(&selections)
    }

    pub fn reject_all() -> Self {
        Self::new(&BTreeMap::new())
    }

    /// Whether a category is currently granted. `necessary` is always
    /// granted; optional categories missing from the map read as declined.
    pub fn is_granted(&self, category: CategoryId) -> bool {
        if category.is_necessary() {
            return true;
        }
        self.categories.get(&category).copied().unwrap_or(false)
    }

    pub fn granted_categories(&self) -> BTreeSet<CategoryId> {
        CategoryId::optional().filter(|c| self.is_granted(*c)).collect()
    }

    pub fn snapshot(&self) -> ConsentSnapshot {
        ConsentSnapshot {
            consent_id: self.consent_id.clone(),
            version: self.version.clone(),
            timestamp: self.timestamp,
            categories: self.categories.clone(),
        }
    }

    /// Appends a withdrawal entry and flips the named categories to declined.
    /// `necessary` is untouched by construction, history only grows, and the
    /// snapshot is taken before the mutation.
    pub fn record_withdrawal(
        &mut self,
        withdrawn: &BTreeSet<CategoryId>,
        method: WithdrawalMethod,
        at: DateTime<Utc>,
    ) {
        self.withdrawal_history.push(WithdrawalRecord {
            timestamp: at,
            withdrawn_categories: withdrawn.clone(),
            previous_consent: self.snapshot(),
            method,
        });
        for category in withdrawn {
            if !category.is_necessary() {
                self.categories.insert(*category, false);
            }
        }
        self.last_modified = at;
    }

    /// Structural validation of a decoded record. Empty identifying fields
    /// or a foreign schema version invalidate the whole record; the caller
    /// treats it as absent and discards the stored data.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::EmptyField("version"));
        }
        if self.consent_id.is_empty() {
            return Err(ValidationError::EmptyField("consentId"));
        }
        if self.version != SCHEMA_VERSION {
            return Err(ValidationError::SchemaVersionMismatch {
                found: self.version.clone(),
                expected: SCHEMA_VERSION,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_valid() {
        let record = ConsentRecord::accept_all();
        assert!(record.validate().is_ok());
        assert!(record.necessary);
        assert_eq!(record.version, SCHEMA_VERSION);
        assert!(!record.consent_id.is_empty());
    }

    #[test]
    fn test_accept_all_grants_every_optional_category() {
        let record = ConsentRecord::accept_all();
        for category in CategoryId::optional() {
            assert!(record.is_granted(category), "{category} not granted");
        }
    }

    #[test]
    fn test_reject_all_keeps_necessary_granted() {
        let record = ConsentRecord::reject_all();
        assert!(record.is_granted(CategoryId::Necessary));
        for category in CategoryId::optional() {
            assert!(!record.is_granted(category), "{category} granted");
        }
    }

    #[test]
    fn test_necessary_selection_is_ignored() {
        let mut selections = BTreeMap::new();
        selections.insert(CategoryId::Necessary, false);
        let record = ConsentRecord::new(&selections);
        assert!(record.necessary);
        assert!(!record.categories.contains_key(&CategoryId::Necessary));
    }

    #[test]
    fn test_absent_category_reads_as_declined() {
        let mut record = ConsentRecord::accept_all();
        record.categories.remove(&CategoryId::Functional);
        assert!(!record.is_granted(CategoryId::Functional));
    }

    #[test]
    fn test_version_mismatch_fails_validation() {
        let mut record = ConsentRecord::accept_all();
        record.version = "1.0".to_string();
        assert_eq!(
            record.validate(),
            Err(ValidationError::SchemaVersionMismatch {
                found: "1.0".to_string(),
                expected: SCHEMA_VERSION,
            })
        );
    }

    #[test]
    fn test_empty_consent_id_fails_validation() {
        let mut record = ConsentRecord::accept_all();
        record.consent_id.clear();
        assert_eq!(record.validate(), Err(ValidationError::EmptyField("consentId")));
    }

    #[test]
    fn test_withdrawal_appends_history_and_flips_categories() {
        let mut record = ConsentRecord::accept_all();
        let before = record.snapshot();
        let withdrawn: BTreeSet<CategoryId> = [CategoryId::Marketing].into();

        record.record_withdrawal(&withdrawn, WithdrawalMethod::UserInitiated, Utc::now());

        assert_eq!(record.withdrawal_history.len(), 1);
        assert!(!record.is_granted(CategoryId::Marketing));
        assert!(record.is_granted(CategoryId::Analytics));
        let entry = &record.withdrawal_history[0];
        assert_eq!(entry.previous_consent, before);
        assert!(entry.previous_consent.categories[&CategoryId::Marketing]);
    }

    #[test]
    fn test_withdrawal_never_touches_necessary() {
        let mut record = ConsentRecord::accept_all();
        let withdrawn: BTreeSet<CategoryId> = [CategoryId::Necessary, CategoryId::Analytics].into();

        record.record_withdrawal(&withdrawn, WithdrawalMethod::UserInitiated, Utc::now());

        assert!(record.necessary);
        assert!(!record.categories.contains_key(&CategoryId::Necessary));
        assert!(!record.is_granted(CategoryId::Analytics));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let record = ConsentRecord::accept_all();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""consentId""#));
        assert!(json.contains(r#""lastModified""#));
        assert!(json.contains(r#""withdrawalHistory""#));
        assert!(json.contains(r#""social_media""#));
    }

    #[test]
    fn test_unknown_category_in_stored_record_fails_decode() {
        let mut json = serde_json::to_value(ConsentRecord::accept_all()).unwrap();
        json["categories"]["advertising"] = serde_json::Value::Bool(true);
        let result: Result<ConsentRecord, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_necessary_field_fails_decode() {
        let mut json = serde_json::to_value(ConsentRecord::accept_all()).unwrap();
        json.as_object_mut().unwrap().remove("necessary");
        let result: Result<ConsentRecord, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_roundtrip_preserves_all_fields() {
        let mut record = ConsentRecord::accept_all();
        record.record_withdrawal(
            &[CategoryId::Analytics].into(),
            WithdrawalMethod::UserInitiated,
            Utc::now(),
        );
        let json = serde_json::to_string(&record).unwrap();
        let decoded: ConsentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
        assert!(decoded.validate().is_ok());
    }
}
