use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::audit_event::AuditEvent;
use crate::models::category::CategoryId;
use crate::models::consent_record::{ConsentRecord, WithdrawalMethod};
use crate::presentation::{PresentationAdapter, NOTICE_DISMISS};
use crate::services::tracking_gate::TrackingGate;
use crate::store::{ConsentStorage, ConsentStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    Uninitialized,
    NoConsent,
    ConsentGiven,
}

struct Inner {
    state: ConsentState,
    record: Option<ConsentRecord>,
    gate: TrackingGate,
}

/// Orchestrates load → validate → apply → persist → notify.
///
/// Every mutating method persists before it touches in-memory state or the
/// gates: a failed write leaves the controller exactly as it was, so memory
/// and storage never disagree. One mutation runs at a time (internal mutex);
/// integration loading is fire-and-forget.
pub struct ConsentController<S> {
    store: ConsentStore<S>,
    presentation: Arc<dyn PresentationAdapter>,
    inner: Mutex<Inner>,
}

impl<S: ConsentStorage> ConsentController<S> {
    pub fn new(storage: S, gate: TrackingGate, presentation: Arc<dyn PresentationAdapter>) -> Self {
        ConsentController {
            store: ConsentStore::new(storage),
            presentation,
            inner: Mutex::new(Inner {
                state: ConsentState::Uninitialized,
                record: None,
                gate,
            }),
        }
    }

    /// Startup transition. A valid stored record is applied immediately and
    /// the banner stays hidden; anything else (absent, undecodable, wrong
    /// schema version) silently falls back to no consent: gates blocked,
    /// banner shown.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> ConsentState {
        let mut inner = self.inner.lock().await;
        match self.store.load().await {
            Some(record) => {
                tracing::info!(consent_id = %record.consent_id, "Restoring stored consent");
                inner.gate.apply(&record.categories);
                inner.record = Some(record);
                inner.state = ConsentState::ConsentGiven;
                self.presentation.hide_banner();
            }
            None => {
                tracing::info!("No stored consent, blocking all categories");
                inner.gate.block_all();
                inner.record = None;
                inner.state = ConsentState::NoConsent;
                self.presentation.show_banner();
            }
        }
        inner.state
    }

    #[tracing::instrument(skip(self))]
    pub async fn accept_all(&self) -> Result<()> {
        let selections = CategoryId::optional().map(|c| (c, true)).collect();
        self.save_decision(selections).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject_all(&self) -> Result<()> {
        self.save_decision(BTreeMap::new()).await
    }

    /// Persists the per-category choices the presentation layer read back
    /// from its toggles. Absent categories count as declined; a `necessary`
    /// key is ignored.
    #[tracing::instrument(skip(self))]
    pub async fn accept_selected(&self, selections: BTreeMap<CategoryId, bool>) -> Result<()> {
        self.save_decision(selections).await
    }

    /// Withdraws previously granted categories: appends one history entry
    /// with a snapshot of the prior state, flips the categories to declined,
    /// re-persists, re-applies gates. Categories that are not currently
    /// granted (including `necessary`) are skipped; withdrawing nothing is a
    /// successful no-op.
    #[tracing::instrument(skip(self))]
    pub async fn withdraw(&self, categories: &[CategoryId]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let Some(current) = inner.record.as_ref() else {
            tracing::warn!("Withdrawal requested without stored consent");
            return Ok(());
        };

        let withdrawn: BTreeSet<CategoryId> = categories
            .iter()
            .copied()
            .filter(|c| !c.is_necessary() && current.is_granted(*c))
            .collect();
        if withdrawn.is_empty() {
            tracing::debug!("Nothing to withdraw");
            return Ok(());
        }

        let mut updated = current.clone();
        let now = Utc::now();
        updated.record_withdrawal(&withdrawn, WithdrawalMethod::UserInitiated, now);
        updated.services = inner.gate.derive_services(&updated.categories, now);

        if let Err(e) = self.store.save(&updated).await {
            tracing::error!(error = %e, "Failed to persist withdrawal, state unchanged");
            self.notice_error("Your withdrawal could not be saved. Please try again.");
            return Err(e);
        }

        inner.gate.apply(&updated.categories);
        self.presentation
            .audit_event(&AuditEvent::consent_withdrawn(&updated, &withdrawn));
        tracing::info!(
            consent_id = %updated.consent_id,
            withdrawn = ?withdrawn,
            history_len = updated.withdrawal_history.len(),
            "Consent withdrawn"
        );
        inner.record = Some(updated);
        self.notice_success("Your consent has been withdrawn.");
        Ok(())
    }

    /// Explicit reset: removes the persisted record and returns to the
    /// pre-consent state (gates blocked, banner shown).
    #[tracing::instrument(skip(self))]
    pub async fn clear_consent(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Err(e) = self.store.clear().await {
            tracing::error!(error = %e, "Failed to clear stored consent");
            self.notice_error("Your cookie settings could not be reset.");
            return Err(e);
        }

        let previous_id = inner.record.take().map(|r| r.consent_id);
        inner.state = ConsentState::NoConsent;
        inner.gate.block_all();
        self.presentation.show_banner();
        self.presentation
            .audit_event(&AuditEvent::consent_cleared(previous_id));
        tracing::info!("Consent cleared");
        Ok(())
    }

    /// Current choice for one category, for restoring presentation toggles.
    /// `necessary` is always granted; without a record everything else reads
    /// declined.
    pub async fn category_state(&self, category: CategoryId) -> bool {
        if category.is_necessary() {
            return true;
        }
        let inner = self.inner.lock().await;
        inner
            .record
            .as_ref()
            .map(|r| r.is_granted(category))
            .unwrap_or(false)
    }

    pub async fn state(&self) -> ConsentState {
        self.inner.lock().await.state
    }

    pub async fn current_record(&self) -> Option<ConsentRecord> {
        self.inner.lock().await.record.clone()
    }

    /// Shared tail of accept-all / reject-all / accept-selected: build the
    /// record, persist it, and only then flip gates and hide the banner.
    async fn save_decision(&self, selections: BTreeMap<CategoryId, bool>) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let mut record = ConsentRecord::new(&selections);
        record.services = inner.gate.derive_services(&record.categories, record.timestamp);
        if let Some(previous) = inner.record.as_ref() {
            record.withdrawal_history = previous.withdrawal_history.clone();
        }

        if let Err(e) = self.store.save(&record).await {
            tracing::error!(error = %e, "Failed to persist consent, state unchanged");
            self.notice_error("Your cookie settings could not be saved. Please try again.");
            return Err(e);
        }

        inner.gate.apply(&record.categories);
        self.presentation.hide_banner();
        self.presentation
            .audit_event(&AuditEvent::consent_given(&record));
        tracing::info!(
            consent_id = %record.consent_id,
            categories = ?record.categories,
            "Consent saved"
        );
        inner.record = Some(record);
        inner.state = ConsentState::ConsentGiven;
        Ok(())
    }

    fn notice_success(&self, message: &str) {
        self.presentation.notice_success(message);
        self.schedule_dismiss();
    }

    fn notice_error(&self, message: &str) {
        self.presentation.notice_error(message);
        self.schedule_dismiss();
    }

    fn schedule_dismiss(&self) {
        let presentation = Arc::clone(&self.presentation);
        tokio::spawn(async move {
            tokio::time::sleep(NOTICE_DISMISS).await;
            presentation.dismiss_notice();
        });
    }
}
