#![forbid(unsafe_code)]

//! Cafe Ledger: Rust Runtime
//!
//! Wraps the entitlement kernel with durable file storage, explicit
//! session contexts, configuration and the command-line front end.
//!
//! No business rules live here. Extension, access and credential
//! logic are delegated to the kernel.

pub mod config;
pub mod event_store;
pub mod file_store;
pub mod proto_bridge;
pub mod proto_types;
pub mod session;
pub mod snapshot;
pub mod snapshot_codec;
pub mod telemetry;
