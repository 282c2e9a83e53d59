use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::ConsentError;
use crate::models::category::CategoryId;
use crate::models::consent_record::ServiceConsent;

/// A third-party tracking integration behind a consent gate.
///
/// `load` performs the one-time setup (script inclusion); the gate guards it
/// so it runs at most once per category. `set_enabled` toggles the runtime
/// consent flag the loaded integration is expected to check on every event,
/// since loaded code cannot be unloaded, only told to stop.
pub trait Integration: Send + Sync {
    fn service_id(&self) -> &str;
    fn purpose(&self) -> &str;
    fn category(&self) -> CategoryId;
    fn load(&self) -> anyhow::Result<()>;
    fn set_enabled(&self, enabled: bool);
}

#[derive(Debug, Clone, Copy, Default)]
struct GateState {
    loaded: bool,
    enabled: bool,
}

/// Enable/disable switch per consent category, wired to the registered
/// integrations. Every category starts blocked and not loaded.
#[derive(Default)]
pub struct TrackingGate {
    states: HashMap<CategoryId, GateState>,
    integrations: Vec<Arc<dyn Integration>>,
}

impl TrackingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an integration under its category. Nothing may hide behind
    /// the necessary category: it is never gated.
    pub fn register(&mut self, integration: Arc<dyn Integration>) {
        if integration.category().is_necessary() {
            tracing::warn!(
                service_id = integration.service_id(),
                "Refusing to register integration under the necessary category"
            );
            return;
        }
        tracing::debug!(
            service_id = integration.service_id(),
            category = %integration.category(),
            "Registered tracking integration"
        );
        self.integrations.push(integration);
    }

    /// Idempotent per-category switch. First enable loads the category's
    /// integrations exactly once; disable emits the disable signal to loaded
    /// integrations only; re-enable after a disable does not reload.
    pub fn set_category(&mut self, category: CategoryId, enabled: bool) {
        if category.is_necessary() {
            return;
        }
        let Self { states, integrations } = self;
        let integrations = &*integrations;
        let state = states.entry(category).or_default();
        if enabled {
            if !state.loaded {
                state.loaded = true;
                for integration in integrations.iter().filter(|i| i.category() == category) {
                    if let Err(e) = integration.load() {
                        // The user's choice stands, the integration just
                        // isn't running.
                        let error = ConsentError::IntegrationLoad {
                            service_id: integration.service_id().to_string(),
                            reason: e.to_string(),
                        };
                        tracing::error!(error = %error, "Tracking integration failed to load");
                    }
                }
            }
            if !state.enabled {
                state.enabled = true;
                for integration in integrations.iter().filter(|i| i.category() == category) {
                    integration.set_enabled(true);
                }
                tracing::info!(category = %category, "Tracking category enabled");
            }
        } else if state.enabled {
            state.enabled = false;
            if state.loaded {
                for integration in integrations.iter().filter(|i| i.category() == category) {
                    integration.set_enabled(false);
                }
            }
            tracing::info!(category = %category, "Tracking category disabled");
        }
    }

    /// Applies a full category map, blocking everything it does not grant.
    pub fn apply(&mut self, categories: &BTreeMap<CategoryId, bool>) {
        for category in CategoryId::optional() {
            let enabled = categories.get(&category).copied().unwrap_or(false);
            self.set_category(category, enabled);
        }
    }

    pub fn block_all(&mut self) {
        for category in CategoryId::optional() {
            self.set_category(category, false);
        }
    }

    pub fn is_enabled(&self, category: CategoryId) -> bool {
        if category.is_necessary() {
            return true;
        }
        self.states.get(&category).map(|s| s.enabled).unwrap_or(false)
    }

    /// Derives the per-service consent breakdown for a category map: one
    /// entry per registered integration whose category is granted.
    pub fn derive_services(
        &self,
        categories: &BTreeMap<CategoryId, bool>,
        at: DateTime<Utc>,
    ) -> BTreeMap<String, ServiceConsent> {
        self.integrations
            .iter()
            .filter(|i| categories.get(&i.category()).copied().unwrap_or(false))
            .map(|integration| {
                (
                    integration.service_id().to_string(),
                    ServiceConsent {
                        consented: true,
                        timestamp: at,
                        purpose: integration.purpose().to_string(),
                    },
                )
            })
            .collect()
    }
}

/// Google Tag Manager behind the analytics gate. Script inclusion is
/// delegated to an embedder-supplied loader (the core has no DOM); the
/// disable signal mirrors the `ga-disable-<id>` runtime flag GTM checks.
pub struct GtmIntegration {
    tracking_id: String,
    purpose: String,
    loader: Box<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>,
    disabled: AtomicBool,
}

impl GtmIntegration {
    pub fn new(
        tracking_id: impl Into<String>,
        loader: impl Fn(&str) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        let tracking_id = tracking_id.into();
        GtmIntegration {
            purpose: format!("Usage analytics via Google Tag Manager ({tracking_id})"),
            tracking_id,
            loader: Box::new(loader),
            disabled: AtomicBool::new(true),
        }
    }

    /// The runtime flag the loaded GTM snippet must honor.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}

impl Integration for GtmIntegration {
    fn service_id(&self) -> &str {
        "google_tag_manager"
    }

    fn purpose(&self) -> &str {
        &self.purpose
    }

    fn category(&self) -> CategoryId {
        CategoryId::Analytics
    }

    fn load(&self) -> anyhow::Result<()> {
        (self.loader)(&self.tracking_id)
    }

    fn set_enabled(&self, enabled: bool) {
        self.disabled.store(!enabled, Ordering::SeqCst);
    }
}
