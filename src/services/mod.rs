// Services module - consent state machine and tracking gates

pub mod consent_controller;
pub mod tracking_gate;

pub use consent_controller::{ConsentController, ConsentState};
pub use tracking_gate::{GtmIntegration, Integration, TrackingGate};
