//! Order Tagger Core - Shared pure types.
//!
//! This crate provides the types and logic shared by the order tagger
//! components:
//! - `server` - Synchronization service with the HTTP trigger endpoint
//! - `cli` - Command-line runner for one-off synchronization runs
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. This keeps it lightweight and allows it to be used
//! anywhere, including inside tests that never touch the network.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and the sync date window
//! - [`tags`] - The order-sequence tag calculator

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod tags;
pub mod types;

pub use types::*;
