// Library exports for embedders and tests

pub mod config;
pub mod error;
pub mod models;
pub mod presentation;
pub mod services;
pub mod store;

pub use config::WidgetConfig;
pub use error::{ConsentError, Result};
pub use models::{AuditEvent, AuditEventType, CategoryId, ConsentRecord};
pub use presentation::{NoopPresentation, PresentationAdapter};
pub use services::{ConsentController, ConsentState, Integration, TrackingGate};
pub use store::{ConsentStorage, ConsentStore, FileStorage, MemoryStorage};
