//! Core types and trait definitions for the Beacon alert store.
//!
//! This crate is free of HTTP dependencies. Storage backends implement
//! [`store::AlertStore`]; transports depend on the trait, not on a backend.

pub mod alert;
pub mod error;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod subscription;

pub use error::{Error, Result};
