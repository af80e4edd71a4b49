//! RouterOS API client.
//!
//! Speaks the length-prefixed word protocol on the API port (8728) and
//! returns command replies as [`rw_core::Row`]s.

pub mod client;
pub mod codec;
pub mod sentence;

pub use client::*;
pub use sentence::*;
