#![doc = include_str!("../docs/rustdoc.md")]

/// Request client for the feedback REST API.
pub mod api;
/// Command-line argument definitions.
pub mod cli;
/// Reconnecting live feed client and subscriber fan-out.
pub mod client;
/// Shared connection state, handler registry and counters.
pub mod client_state;
/// Runtime configuration model.
pub mod config;
/// Error types used across the crate.
pub mod error;
/// Event bus messages between client and UI.
pub mod events;
/// Terminal output formatters.
pub mod formatter;
/// Metrics and health status structures.
pub mod monitoring;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Socket seam between the client and the network.
pub mod transport;
/// Feedback records, frames and request types.
pub mod types;
/// UI controller and presentation loop.
pub mod ui;

/// Primary crate error type.
pub use error::TriageError;
