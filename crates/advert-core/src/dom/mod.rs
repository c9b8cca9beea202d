//! Document implementations
//!
//! This module provides implementations of the [`Document`](crate::traits::Document) trait.

pub mod memory;

pub use memory::MemoryDocument;
