//! Metrics feed ingestion.
//!
//! The streaming client and the store are decoupled by a bounded sample
//! channel: the client parses and sends, a consumer task receives and
//! updates the store. Backpressure is the channel bound.

use tokio::sync::{mpsc, watch};

use crate::models::PlantSample;

pub mod metrics_stream;

pub use metrics_stream::MetricsStreamClient;

pub type SampleSender = mpsc::Sender<PlantSample>;
pub type SampleReceiver = mpsc::Receiver<PlantSample>;

pub type StopSender = watch::Sender<bool>;
pub type StopReceiver = watch::Receiver<bool>;

pub fn create_sample_channel(capacity: usize) -> (SampleSender, SampleReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Cooperative stop flag for the ingest loop; observed at every suspension
/// point (chunk read or reconnect wait).
pub fn create_stop_channel() -> (StopSender, StopReceiver) {
    watch::channel(false)
}
