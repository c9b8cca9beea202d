// # Memory SDKs
//
// Recording implementations of BiddingSdk and TagSdk.
//
// Every call is appended to a call log that tests can inspect. Commands go
// through a `CommandQueue`, so nothing runs until the SDK is marked ready
// (or the SDK was created ready).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use super::queue::CommandQueue;
use crate::model::{AdUnit, ApnTag, PageOptions};
use crate::traits::sdk::{BiddingSdk, BidsBackHandler, SdkCommand, TagSdk};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A call received by [`MemoryBiddingSdk`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiddingCall {
    RequestBids {
        ad_units: Vec<AdUnit>,
        timeout: Duration,
    },
    MarkRequestSent,
    SetTargetingForAst,
}

/// Recording bidding SDK
///
/// Auctions either complete immediately (see [`MemoryBiddingSdk::ready`]) or
/// wait for [`MemoryBiddingSdk::complete_auctions`].
#[derive(Default)]
pub struct MemoryBiddingSdk {
    queue: CommandQueue,
    calls: Mutex<Vec<BiddingCall>>,
    request_sent: AtomicBool,
    auto_complete: bool,
    open_auctions: Mutex<Vec<BidsBackHandler>>,
}

impl MemoryBiddingSdk {
    /// An SDK that is still loading
    pub fn new() -> Self {
        Self::default()
    }

    /// A loaded SDK whose auctions finish as soon as they start
    pub fn ready() -> Self {
        Self {
            queue: CommandQueue::ready(),
            auto_complete: true,
            ..Self::default()
        }
    }

    /// Finish loading and run queued commands
    pub fn mark_ready(&self) {
        self.queue.mark_ready();
    }

    /// Run the bids-back handlers of every open auction
    ///
    /// Returns how many auctions completed.
    pub fn complete_auctions(&self) -> usize {
        let handlers = std::mem::take(&mut *lock(&self.open_auctions));
        let completed = handlers.len();
        for handler in handlers {
            handler();
        }
        completed
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn calls(&self) -> Vec<BiddingCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: BiddingCall) {
        debug!("Bidding SDK call: {:?}", call);
        lock(&self.calls).push(call);
    }
}

impl BiddingSdk for MemoryBiddingSdk {
    fn enqueue(&self, command: SdkCommand) {
        self.queue.push(command);
    }

    fn request_bids(&self, ad_units: Vec<AdUnit>, timeout: Duration, bids_back: BidsBackHandler) {
        self.record(BiddingCall::RequestBids { ad_units, timeout });
        if self.auto_complete {
            bids_back();
        } else {
            lock(&self.open_auctions).push(bids_back);
        }
    }

    fn request_sent(&self) -> bool {
        self.request_sent.load(Ordering::SeqCst)
    }

    fn mark_request_sent(&self) {
        self.record(BiddingCall::MarkRequestSent);
        self.request_sent.store(true, Ordering::SeqCst);
    }

    fn set_targeting_for_ast(&self) {
        self.record(BiddingCall::SetTargetingForAst);
    }
}

/// A call received by [`MemoryTagSdk`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCall {
    SetPageOpts(PageOptions),
    DefineTag(ApnTag),
    LoadTags,
    ShowTag(String),
    Refresh(Vec<String>),
}

/// Recording tag-rendering SDK
#[derive(Default)]
pub struct MemoryTagSdk {
    queue: CommandQueue,
    calls: Mutex<Vec<TagCall>>,
}

impl MemoryTagSdk {
    /// An SDK that is still loading
    pub fn new() -> Self {
        Self::default()
    }

    /// A loaded SDK
    pub fn ready() -> Self {
        Self {
            queue: CommandQueue::ready(),
            ..Self::default()
        }
    }

    /// Finish loading and run queued commands
    pub fn mark_ready(&self) {
        self.queue.mark_ready();
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn calls(&self) -> Vec<TagCall> {
        lock(&self.calls).clone()
    }

    /// Targets passed to `refresh()`, flattened in call order
    pub fn refreshed(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                TagCall::Refresh(ids) => Some(ids.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn record(&self, call: TagCall) {
        debug!("Tag SDK call: {:?}", call);
        lock(&self.calls).push(call);
    }
}

impl TagSdk for MemoryTagSdk {
    fn enqueue(&self, command: SdkCommand) {
        self.queue.push(command);
    }

    fn set_page_opts(&self, options: PageOptions) {
        self.record(TagCall::SetPageOpts(options));
    }

    fn define_tag(&self, tag: ApnTag) {
        self.record(TagCall::DefineTag(tag));
    }

    fn load_tags(&self) {
        self.record(TagCall::LoadTags);
    }

    fn show_tag(&self, target_id: &str) {
        self.record(TagCall::ShowTag(target_id.to_string()));
    }

    fn refresh(&self, target_ids: &[String]) {
        self.record(TagCall::Refresh(target_ids.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn open_auctions_wait_for_completion() {
        let sdk = MemoryBiddingSdk::new();
        let completed = Arc::new(AtomicUsize::new(0));
        let counter = completed.clone();

        sdk.request_bids(
            Vec::new(),
            Duration::from_millis(1000),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(completed.load(Ordering::SeqCst), 0);

        assert_eq!(sdk.complete_auctions(), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(sdk.complete_auctions(), 0);
    }

    #[test]
    fn request_sent_flag() {
        let sdk = MemoryBiddingSdk::ready();
        assert!(!sdk.request_sent());
        sdk.mark_request_sent();
        assert!(sdk.request_sent());
        assert_eq!(sdk.calls(), vec![BiddingCall::MarkRequestSent]);
    }

    #[test]
    fn tag_commands_wait_for_ready() {
        let sdk = Arc::new(MemoryTagSdk::new());
        let inner = sdk.clone();
        sdk.enqueue(Box::new(move || inner.show_tag("eg-ad-1")));

        assert!(sdk.calls().is_empty());
        assert_eq!(sdk.queued(), 1);

        sdk.mark_ready();
        assert_eq!(sdk.calls(), vec![TagCall::ShowTag("eg-ad-1".to_string())]);
    }

    #[test]
    fn refreshed_flattens_targets() {
        let sdk = MemoryTagSdk::ready();
        sdk.refresh(&["a".to_string()]);
        sdk.load_tags();
        sdk.refresh(&["b".to_string(), "c".to_string()]);
        assert_eq!(sdk.refreshed(), vec!["a", "b", "c"]);
    }
}
