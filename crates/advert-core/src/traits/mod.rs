//! Core traits for the advert system
//!
//! Every external collaborator is reached through one of these interfaces and
//! injected explicitly; nothing is looked up from ambient global state.
//!
//! - [`Document`]: the DOM surface slots render into
//! - [`Scheduler`]: one-shot timers for automatic refresh
//! - [`BiddingSdk`]: the header-bidding auction library
//! - [`TagSdk`]: the ad-tag rendering service
//! - [`AdvertSource`]: the remote advert configuration API

pub mod document;
pub mod scheduler;
pub mod sdk;
pub mod source;

pub use document::{AddedNode, ClickListener, Document, MutationCallback, MutationRecord, NodeId, ObserverHandle};
pub use scheduler::{Scheduler, TimerCallback, TimerHandle};
pub use sdk::{BiddingSdk, BidsBackHandler, SdkCommand, TagSdk};
pub use source::AdvertSource;
