//! Core library for the plant telemetry service.
//!
//! Streams live environmental sensor readings (CO2, temperature, humidity)
//! from an NDJSON HTTP feed, keeps a bounded rolling history, and derives
//! status summaries on demand for external consumers. The binary wires the
//! streaming client, the store, and the state API together; a mock feed
//! generator is included for local testing.

pub mod config;
pub mod errors;
pub mod ingestor;
pub mod mock;
pub mod models;
pub mod state;
pub mod utils;
pub mod web;
