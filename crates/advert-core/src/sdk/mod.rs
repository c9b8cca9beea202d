//! SDK implementations
//!
//! In-memory stand-ins for the two advertising SDKs. They record every call
//! and reproduce the ready-queue semantics of the real libraries, which makes
//! them suitable for tests and for headless runs.

pub mod memory;
pub mod queue;

pub use memory::{BiddingCall, MemoryBiddingSdk, MemoryTagSdk, TagCall};
pub use queue::CommandQueue;
