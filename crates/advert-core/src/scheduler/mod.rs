//! Scheduler implementations
//!
//! This module provides implementations of the [`Scheduler`](crate::traits::Scheduler) trait.

pub mod manual;
pub mod tokio_timer;

pub use manual::ManualScheduler;
pub use tokio_timer::TokioScheduler;
