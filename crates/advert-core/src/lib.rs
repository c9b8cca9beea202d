// # advert-core
//
// Core library for rendering third-party display adverts.
//
// ## Architecture Overview
//
// - **AdvertFactory**: Validates raw API entries into typed `Advert`s
// - **AdvertSlot**: Mounts, closes and refreshes one advert on the page
// - **AdvertObserver**: Re-injects controls after each creative swap,
//   ignoring the changes it causes itself
// - **AdvertService**: Drives the bidding and tag-rendering SDK queues
// - **AdvertLoader**: Fetches the configuration, degrading to no adverts
// - **AdvertPage**: Bootstraps all of the above for one page
//
// ## Design Principles
//
// 1. **Validated Boundary**: Untyped data never gets past `AdvertFactory`
// 2. **Injected Capabilities**: DOM, timers and SDKs are traits, never globals
// 3. **Fail Quiet**: A bad payload means no adverts, not a broken page

pub mod traits;
pub mod model;
pub mod factory;
pub mod slot;
pub mod observer;
pub mod service;
pub mod loader;
pub mod page;
pub mod config;
pub mod error;
pub mod dom;
pub mod scheduler;
pub mod sdk;

// Re-export core types for convenience
pub use traits::{AdvertSource, BiddingSdk, Document, Scheduler, TagSdk};
pub use model::{Advert, AdvertBidder, AdvertSize, Position, RefreshSettings};
pub use factory::AdvertFactory;
pub use slot::{AdvertEnvironment, AdvertSlot};
pub use observer::AdvertObserver;
pub use service::AdvertService;
pub use loader::AdvertLoader;
pub use page::AdvertPage;
pub use config::AdvertConfig;
pub use error::{Error, Result};
pub use dom::MemoryDocument;
pub use scheduler::{ManualScheduler, TokioScheduler};
pub use sdk::{MemoryBiddingSdk, MemoryTagSdk};
