// # Advertising SDK Traits
//
// The two third-party SDKs are black boxes reached through their documented
// entry points only. Both expose an append-only command queue that is drained
// in FIFO order once the SDK has finished its own asynchronous start-up; this
// crate only ever appends to those queues.

use std::time::Duration;

use crate::model::{AdUnit, ApnTag, PageOptions};

/// A command appended to an SDK's ready queue
pub type SdkCommand = Box<dyn FnOnce() + Send>;

/// Invoked by the bidding SDK once the auction has finished or timed out
pub type BidsBackHandler = Box<dyn FnOnce() + Send>;

/// Header-bidding auction library
pub trait BiddingSdk: Send + Sync {
    /// Append to the SDK's ready queue
    fn enqueue(&self, command: SdkCommand);

    /// Start an auction for the given ad units
    fn request_bids(&self, ad_units: Vec<AdUnit>, timeout: Duration, bids_back: BidsBackHandler);

    /// Whether the ad server has already been initialised
    fn request_sent(&self) -> bool;

    /// Record that the ad server has been initialised
    fn mark_request_sent(&self);

    /// Pass auction results on to the tag-rendering SDK
    fn set_targeting_for_ast(&self);
}

/// Ad-tag rendering service
pub trait TagSdk: Send + Sync {
    /// Append to the SDK's ready queue
    fn enqueue(&self, command: SdkCommand);

    fn set_page_opts(&self, options: PageOptions);

    fn define_tag(&self, tag: ApnTag);

    /// Load every defined tag
    fn load_tags(&self);

    /// Render the tag targeting the element with this id
    fn show_tag(&self, target_id: &str);

    /// Fetch and render fresh creatives for these targets
    fn refresh(&self, target_ids: &[String]);
}
