//! Advert slot lifecycle
//!
//! An [`AdvertSlot`] is one validated [`Advert`] plus the runtime state it
//! acquires once rendered: the container and content elements, a pending
//! refresh timer, and the number of automatic refreshes so far.
//!
//! ## Lifecycle
//!
//! 1. Create with [`AdvertSlot::new()`]; optional behaviours are fixed here
//! 2. Mount once with [`AdvertSlot::render_to_dom()`]
//! 3. Close once with [`AdvertSlot::close()`]; a closed slot is not remounted
//!
//! The observer and the control click handlers reach back into the slot
//! through weak references, so dropping every `AdvertSlot` clone releases the
//! slot even while its controls are still registered with the document.
//! Dropping the last clone also stops the observation and cancels the pending
//! refresh, but leaves the elements on the page; call `close()` to remove them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use crate::model::{AdUnit, Advert, ApnTag, Behaviors};
use crate::observer::{AdvertObserver, ObserverActions, RefreshTick, SlotAction};
use crate::traits::{Document, NodeId, Scheduler, TagSdk, TimerHandle};

/// Class of the positioning container
pub const CONTAINER_CLASS: &str = "advert_container";

/// Class of the element the tag SDK renders into
pub const DISPLAY_CLASS: &str = "advert_display";

/// Runtime state shared between a slot and its observer
///
/// Either both element handles are set (mounted) or neither is. A timer is
/// only ever pending for a mounted, self-refreshing slot.
#[derive(Debug, Default)]
pub struct SlotState {
    pub(crate) container: Option<NodeId>,
    pub(crate) content: Option<NodeId>,
    pub(crate) refresh_timeout: Option<TimerHandle>,
    pub(crate) refresh_counter: u32,
    /// Bumped every time a refresh timer is scheduled
    pub(crate) refresh_arm: u64,
}

/// The collaborators a slot renders with
#[derive(Clone)]
pub struct AdvertEnvironment {
    pub document: Arc<dyn Document>,
    pub tags: Arc<dyn TagSdk>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl AdvertEnvironment {
    pub fn new(
        document: Arc<dyn Document>,
        tags: Arc<dyn TagSdk>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            document,
            tags,
            scheduler,
        }
    }
}

fn lock(state: &Mutex<SlotState>) -> MutexGuard<'_, SlotState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SlotInner {
    advert: Advert,
    behaviors: Behaviors,
    env: AdvertEnvironment,
    state: Arc<Mutex<SlotState>>,
    observer: Arc<AdvertObserver>,
}

/// Builds an observer action that calls back into the slot if it still exists
fn slot_action(slot: &Weak<SlotInner>, action: fn(&SlotInner)) -> SlotAction {
    let slot = slot.clone();
    Arc::new(move || {
        if let Some(inner) = slot.upgrade() {
            action(&inner);
        }
    })
}

fn tick_action(slot: &Weak<SlotInner>, action: fn(&SlotInner, u64)) -> RefreshTick {
    let slot = slot.clone();
    Arc::new(move |arm| {
        if let Some(inner) = slot.upgrade() {
            action(&inner, arm);
        }
    })
}

impl SlotInner {
    fn render_to_dom(&self) {
        let document = &self.env.document;
        let position = self.advert.position.as_str();
        let container_id = self.advert.container_id();

        let container = document.get_element_by_id(&container_id).unwrap_or_else(|| {
            let container = document.create_element("div");
            document.set_id(container, &container_id);
            document.add_class(container, CONTAINER_CLASS);
            document.add_class(container, &format!("{}_{}", CONTAINER_CLASS, position));
            document.set_style(container, "display", "none");
            document.prepend(document.body(), container);
            container
        });

        let content = document.create_element("div");
        document.set_id(content, &self.advert.id);
        document.add_class(content, DISPLAY_CLASS);
        document.add_class(content, &format!("{}_{}", DISPLAY_CLASS, position));
        document.append_child(container, content);

        {
            let mut state = lock(&self.state);
            state.container = Some(container);
            state.content = Some(content);
        }

        self.observer.observe();

        let tags = self.env.tags.clone();
        let target_id = self.advert.id.clone();
        self.env
            .tags
            .enqueue(Box::new(move || tags.show_tag(&target_id)));

        debug!("Rendered advert {} ({})", self.advert.id, position);
    }

    fn close(&self) {
        let (container, timer) = {
            let mut state = lock(&self.state);
            let Some(container) = state.container.take() else {
                return;
            };
            state.content = None;
            (container, state.refresh_timeout.take())
        };

        self.observer.close();
        self.env.document.remove(container);
        if let Some(timer) = timer {
            self.env.scheduler.clear_timeout(timer);
        }

        debug!("Closed advert {}", self.advert.id);
    }

    fn refresh_advert(&self) {
        if lock(&self.state).container.is_none() {
            return;
        }
        debug!("Refreshing advert {}", self.advert.id);
        self.env.tags.refresh(std::slice::from_ref(&self.advert.id));
    }

    fn auto_refresh(&self) {
        let pending = {
            let mut state = lock(&self.state);
            state.refresh_counter += 1;
            state.refresh_timeout.take()
        };
        if let Some(timer) = pending {
            self.env.scheduler.clear_timeout(timer);
        }
        self.refresh_advert();
    }

    /// Timer callback for the arming `arm`
    ///
    /// A timer may fire after it has been replaced or the slot closed (the
    /// scheduler already dequeued it, so cancelling came too late). Such a
    /// tick neither counts nor refreshes, and leaves the current timer alone.
    fn refresh_tick(&self, arm: u64) {
        {
            let mut state = lock(&self.state);
            if state.refresh_arm != arm || state.refresh_timeout.is_none() {
                debug!("Ignoring superseded refresh timer of {}", self.advert.id);
                return;
            }
            state.refresh_counter += 1;
            state.refresh_timeout = None;
        }
        self.refresh_advert();
    }
}

impl Drop for SlotInner {
    fn drop(&mut self) {
        self.observer.close();
        let pending = lock(&self.state).refresh_timeout.take();
        if let Some(timer) = pending {
            self.env.scheduler.clear_timeout(timer);
        }
    }
}

/// A single advert and everything it has put on the page
///
/// Cloning is cheap; clones share the same slot.
#[derive(Clone)]
pub struct AdvertSlot {
    inner: Arc<SlotInner>,
}

impl AdvertSlot {
    /// Create an unmounted slot
    ///
    /// Decides once which behaviours attach: the close control iff
    /// `closeBtn`, the refresh control iff `refresh` with a button policy,
    /// automatic refresh iff `refresh` with a non-zero delay and repeat.
    pub fn new(advert: Advert, env: AdvertEnvironment) -> Self {
        let behaviors = advert.behaviors();
        let state = Arc::new(Mutex::new(SlotState::default()));

        let inner = Arc::new_cyclic(|slot: &Weak<SlotInner>| {
            let actions = ObserverActions {
                close: behaviors
                    .close_button
                    .then(|| slot_action(slot, SlotInner::close)),
                refresh_button: behaviors
                    .refresh_button
                    .then(|| slot_action(slot, SlotInner::refresh_advert)),
                auto_refresh: behaviors
                    .auto_refresh
                    .then(|| tick_action(slot, SlotInner::refresh_tick)),
            };
            let observer = AdvertObserver::new(
                &advert,
                env.document.clone(),
                env.scheduler.clone(),
                state.clone(),
                actions,
            );

            SlotInner {
                advert,
                behaviors,
                env,
                state,
                observer,
            }
        });

        Self { inner }
    }

    /// Mount the slot on the page
    ///
    /// Creates a hidden container (or reuses the one already on the page) as
    /// the first child of the body, the content element inside it, starts
    /// observing the content, and asks the tag SDK to show the tag. Must be
    /// called at most once.
    pub fn render_to_dom(&self) {
        self.inner.render_to_dom();
    }

    /// Remove the slot from the page and cancel any pending refresh
    ///
    /// A no-op when the slot is not mounted.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Ask the tag SDK for a fresh creative; no-op when not mounted
    pub fn refresh_advert(&self) {
        self.inner.refresh_advert();
    }

    /// Count a refresh cycle and refresh now
    ///
    /// Cancels the pending timer, if any. The next tick is armed by the
    /// observer once the new creative lands.
    pub fn auto_refresh(&self) {
        self.inner.auto_refresh();
    }

    pub fn advert(&self) -> &Advert {
        &self.inner.advert
    }

    pub fn id(&self) -> &str {
        &self.inner.advert.id
    }

    pub fn behaviors(&self) -> Behaviors {
        self.inner.behaviors
    }

    pub fn observer(&self) -> &Arc<AdvertObserver> {
        &self.inner.observer
    }

    pub fn is_mounted(&self) -> bool {
        lock(&self.inner.state).container.is_some()
    }

    pub fn container(&self) -> Option<NodeId> {
        lock(&self.inner.state).container
    }

    pub fn content(&self) -> Option<NodeId> {
        lock(&self.inner.state).content
    }

    pub fn refresh_timeout(&self) -> Option<TimerHandle> {
        lock(&self.inner.state).refresh_timeout
    }

    /// Automatic refreshes performed so far
    pub fn refresh_counter(&self) -> u32 {
        lock(&self.inner.state).refresh_counter
    }

    pub fn to_ad_unit(&self) -> AdUnit {
        self.inner.advert.to_ad_unit()
    }

    pub fn to_apn_tag(&self) -> ApnTag {
        self.inner.advert.to_apn_tag()
    }
}

impl std::fmt::Debug for AdvertSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvertSlot")
            .field("advert", &self.inner.advert)
            .field("state", &*lock(&self.inner.state))
            .finish()
    }
}
