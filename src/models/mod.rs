// Models module - consent data structures and audit events

pub mod audit_event;
pub mod category;
pub mod consent_record;

pub use audit_event::{AuditEvent, AuditEventType};
pub use category::CategoryId;
pub use consent_record::{
    ConsentRecord, ConsentSnapshot, ServiceConsent, ValidationError, WithdrawalMethod,
    WithdrawalRecord, SCHEMA_VERSION,
};
