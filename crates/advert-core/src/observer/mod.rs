//! Advert observer
//!
//! Watches the content element of a mounted slot. Every time the tag SDK
//! replaces the creative, the close and refresh controls are re-injected and
//! the automatic refresh timer is re-armed.
//!
//! Injecting a control is itself a child-list change on the watched element,
//! so each batch is first classified: a batch that only adds our own controls
//! (or adds nothing at all) is self-caused and ignored, which keeps injection
//! from feeding back into itself.
//!
//! ```text
//!   idle ──observe()──▶ active ──close()──▶ idle
//!                        │
//!                        ▼ batch of MutationRecords
//!              is_self_caused? ── yes ──▶ ignore
//!                        │ no
//!                        ▼
//!         close button · refresh button · re-arm timer
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, trace};

use crate::model::{Advert, RefreshSettings};
use crate::slot::SlotState;
use crate::traits::{Document, MutationRecord, NodeId, ObserverHandle, Scheduler};

/// Class carried by every close control
pub const CLOSE_BUTTON_CLASS: &str = "advert_close_button";

/// Class carried by every manual refresh control
pub const REFRESH_BUTTON_CLASS: &str = "advert_refresh_button";

const CLOSE_BUTTON_LABEL: &str = "X";
const REFRESH_BUTTON_LABEL: &str = "Refresh AD";

/// An operation of the owning slot, handed to the observer
pub type SlotAction = Arc<dyn Fn() + Send + Sync>;

/// Timer tick of the owning slot, called with the arming it belongs to
pub type RefreshTick = Arc<dyn Fn(u64) + Send + Sync>;

/// The slot operations the observer may trigger
///
/// A `None` entry means the matching behaviour is not attached.
#[derive(Clone, Default)]
pub struct ObserverActions {
    /// Wired to the close control
    pub close: Option<SlotAction>,
    /// Wired to the manual refresh control
    pub refresh_button: Option<SlotAction>,
    /// Run when the automatic refresh timer fires
    pub auto_refresh: Option<RefreshTick>,
}

/// Whether a batch of changes was caused by our own control injection
///
/// True when every record added nothing, or added only elements whose id is
/// one of `own_ids`. A single foreign element or non-element node makes the
/// whole batch external.
pub fn is_self_caused(records: &[MutationRecord], own_ids: &[&str]) -> bool {
    records.iter().all(|record| {
        record
            .added_nodes
            .iter()
            .all(|node| node.element_id().is_some_and(|id| own_ids.contains(&id)))
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Watches one advert and restores its controls after every refresh
pub struct AdvertObserver {
    document: Arc<dyn Document>,
    scheduler: Arc<dyn Scheduler>,
    state: Arc<Mutex<SlotState>>,
    refresh_settings: Option<RefreshSettings>,
    close_button_id: String,
    refresh_button_id: String,
    actions: ObserverActions,
    observation: Mutex<Option<ObserverHandle>>,
}

impl AdvertObserver {
    /// Create an idle observer for `advert`
    ///
    /// Nothing is watched until [`AdvertObserver::observe`] is called.
    pub(crate) fn new(
        advert: &Advert,
        document: Arc<dyn Document>,
        scheduler: Arc<dyn Scheduler>,
        state: Arc<Mutex<SlotState>>,
        actions: ObserverActions,
    ) -> Arc<Self> {
        Arc::new(Self {
            document,
            scheduler,
            state,
            refresh_settings: advert.refresh_settings,
            close_button_id: advert.close_button_id(),
            refresh_button_id: advert.refresh_button_id(),
            actions,
            observation: Mutex::new(None),
        })
    }

    /// Start watching the slot's content element
    ///
    /// Does nothing when the slot has not been rendered or when already
    /// observing.
    pub fn observe(self: &Arc<Self>) {
        let Some(content) = lock(&self.state).content else {
            return;
        };

        let mut observation = lock(&self.observation);
        if observation.is_some() {
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = self.document.observe_child_list(
            content,
            Arc::new(move |records: &[MutationRecord]| {
                if let Some(observer) = weak.upgrade() {
                    observer.advert_changed(records);
                }
            }),
        );
        *observation = Some(handle);
    }

    /// Stop watching; releases the registration held by the document
    pub fn close(&self) {
        if let Some(handle) = lock(&self.observation).take() {
            self.document.disconnect(handle);
        }
    }

    pub fn is_observing(&self) -> bool {
        lock(&self.observation).is_some()
    }

    /// The ids of the controls this observer injects
    pub fn own_ids(&self) -> [&str; 2] {
        [self.close_button_id.as_str(), self.refresh_button_id.as_str()]
    }

    /// Handle one batch of mutation records
    pub fn advert_changed(&self, records: &[MutationRecord]) {
        let Some(content) = lock(&self.state).content else {
            return;
        };

        if is_self_caused(records, &self.own_ids()) {
            trace!("Ignoring self-caused change in {}", self.close_button_id);
            return;
        }
        debug!("Advert content replaced ({} records)", records.len());

        if let Some(close) = &self.actions.close {
            self.add_button(
                content,
                &self.close_button_id,
                CLOSE_BUTTON_CLASS,
                CLOSE_BUTTON_LABEL,
                close,
            );
        }

        if let Some(refresh) = &self.actions.refresh_button {
            self.add_button(
                content,
                &self.refresh_button_id,
                REFRESH_BUTTON_CLASS,
                REFRESH_BUTTON_LABEL,
                refresh,
            );
        }

        if self.actions.auto_refresh.is_some() && self.refresh_settings.is_some() {
            self.initiate_auto_refresh();
        }
    }

    /// Prepend a control unless one with this id already exists
    fn add_button(&self, content: NodeId, id: &str, class: &str, label: &str, action: &SlotAction) {
        if self.document.get_element_by_id(id).is_some() {
            return;
        }

        let button = self.document.create_element("span");
        self.document.set_id(button, id);
        self.document.add_class(button, class);
        self.document.set_text(button, label);
        self.document.add_click_listener(button, action.clone());
        self.document.prepend(content, button);
        debug!("Injected {}", id);
    }

    /// Cancel any pending refresh timer and schedule the next one
    ///
    /// No timer is scheduled once the slot has refreshed `repeat` times.
    /// Every new timer gets a fresh arming number; a tick carrying an older
    /// number belongs to a timer that fired while being replaced and is
    /// ignored by the slot.
    pub fn initiate_auto_refresh(&self) {
        let Some(tick) = self.actions.auto_refresh.clone() else {
            return;
        };
        let Some(RefreshSettings::SelfRefreshing { delay, repeat }) = self.refresh_settings else {
            return;
        };

        let mut state = lock(&self.state);
        if let Some(pending) = state.refresh_timeout.take() {
            self.scheduler.clear_timeout(pending);
        }

        if state.refresh_counter < repeat {
            state.refresh_arm += 1;
            let arm = state.refresh_arm;
            let handle = self
                .scheduler
                .set_timeout(std::time::Duration::from_millis(delay), Box::new(move || tick(arm)));
            state.refresh_timeout = Some(handle);
            debug!(
                "Scheduled refresh {} of {} in {}ms",
                state.refresh_counter + 1,
                repeat,
                delay
            );
        } else {
            debug!("Automatic refresh finished after {} cycles", repeat);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AddedNode;

    const CLOSE: &str = "advert_close_button_divid";
    const REFRESH: &str = "advert_refresh_button_divid";

    fn added(nodes: Vec<AddedNode>) -> MutationRecord {
        MutationRecord::added(NodeId(1), nodes)
    }

    #[test]
    fn empty_batches_are_self_caused() {
        assert!(is_self_caused(&[], &[CLOSE, REFRESH]));
        assert!(is_self_caused(&[added(vec![])], &[CLOSE, REFRESH]));
        assert!(is_self_caused(&[MutationRecord::removed(NodeId(1), 3)], &[CLOSE, REFRESH]));
    }

    #[test]
    fn own_controls_are_self_caused() {
        let batch = [
            added(vec![AddedNode::element(CLOSE)]),
            added(vec![AddedNode::element(REFRESH)]),
        ];
        assert!(is_self_caused(&batch, &[CLOSE, REFRESH]));
    }

    #[test]
    fn foreign_element_is_external() {
        let batch = [added(vec![AddedNode::element("creative")])];
        assert!(!is_self_caused(&batch, &[CLOSE, REFRESH]));

        let unnamed = [added(vec![AddedNode::element("")])];
        assert!(!is_self_caused(&unnamed, &[CLOSE, REFRESH]));
    }

    #[test]
    fn non_element_is_external() {
        let batch = [added(vec![AddedNode::element(CLOSE), AddedNode::Other])];
        assert!(!is_self_caused(&batch, &[CLOSE, REFRESH]));
    }

    #[test]
    fn one_external_record_taints_the_batch() {
        let batch = [
            added(vec![AddedNode::element(CLOSE)]),
            MutationRecord::removed(NodeId(1), 1),
            added(vec![AddedNode::element("iframe_1")]),
        ];
        assert!(!is_self_caused(&batch, &[CLOSE, REFRESH]));
    }
}
