//! In-process backend for the Beacon alert store.
//!
//! [`MemoryStore`] owns the live mapping and publishes a fresh snapshot through
//! a `tokio::sync::watch` channel after every change. [`spawn_reaper`] adds an
//! optional time-to-live for alerts whose sender went quiet.

mod reaper;
mod store;

pub use reaper::spawn_reaper;
pub use store::MemoryStore;
