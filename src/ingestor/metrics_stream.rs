//! NDJSON metrics stream client.
//!
//! Maintains a long-lived GET against the feed endpoint, parses one JSON
//! record per line, and forwards samples into the sample channel. Transport
//! faults and malformed lines are recovered locally; the loop runs until the
//! stop flag is raised.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{SampleSender, StopReceiver};
use crate::errors::{AppError, StreamError};
use crate::models::PlantSample;
use crate::utils::datetime::DateTimeParser;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Why a single connection attempt ended.
enum StreamEnd {
    /// The server closed the response body.
    Eof,
    /// The stop flag was raised or the sample channel closed.
    Stopped,
}

pub struct MetricsStreamClient {
    url: String,
    http: reqwest::Client,
    reconnect_delay: Duration,
    sample_tx: SampleSender,
    stop_rx: StopReceiver,
}

impl MetricsStreamClient {
    /// Build a client for the given feed URL.
    ///
    /// The HTTP client carries no total-request timeout: the feed going
    /// quiet between lines is a normal idle state, not a failure.
    pub fn new(
        url: impl Into<String>,
        sample_tx: SampleSender,
        stop_rx: StopReceiver,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            url: url.into(),
            http,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            sample_tx,
            stop_rx,
        })
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run until stopped. Connection faults, non-success statuses, and clean
    /// end-of-stream all lead back to a fixed-delay reconnect; there is no
    /// retry cap.
    pub async fn run_forever(mut self) -> Result<()> {
        info!("Starting metrics stream client for {}", self.url);

        loop {
            if *self.stop_rx.borrow() {
                break;
            }

            match self.connect_and_stream().await {
                Ok(StreamEnd::Stopped) => break,
                Ok(StreamEnd::Eof) => {
                    info!("Metrics stream from {} ended; reconnecting", self.url);
                }
                Err(err) => {
                    warn!("Metrics stream error: {}", err);
                }
            }

            if self.wait_for_reconnect().await {
                break;
            }
        }

        info!("Metrics stream client stopped");
        Ok(())
    }

    async fn connect_and_stream(&mut self) -> Result<StreamEnd, StreamError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|source| StreamError::Connect {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        debug!("Connected to metrics stream at {}", self.url);

        let mut stop_rx = self.stop_rx.clone();
        if *stop_rx.borrow() {
            return Ok(StreamEnd::Stopped);
        }
        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            tokio::select! {
                // The flag only ever flips to true, so any observed change
                // (or a dropped stop handle) means stop.
                _ = stop_rx.changed() => return Ok(StreamEnd::Stopped),
                chunk = body.next() => match chunk {
                    None => {
                        // Flush a trailing record the server sent without a newline
                        if !buffer.is_empty() {
                            let line = String::from_utf8_lossy(&buffer).into_owned();
                            buffer.clear();
                            if self.deliver_line(&line).await {
                                return Ok(StreamEnd::Stopped);
                            }
                        }
                        return Ok(StreamEnd::Eof);
                    }
                    Some(Err(err)) => return Err(StreamError::Read(err)),
                    Some(Ok(bytes)) => {
                        buffer.extend_from_slice(&bytes);
                        while let Some(line) = next_line(&mut buffer) {
                            if self.deliver_line(&line).await {
                                return Ok(StreamEnd::Stopped);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Parse one line and forward the sample. Returns true when the client
    /// should stop: the receiving side of the channel is gone, or the stop
    /// flag was raised while a full channel had the send blocked.
    async fn deliver_line(&self, line: &str) -> bool {
        let Some(sample) = parse_line(line, Utc::now()) else {
            return false;
        };
        let mut stop_rx = self.stop_rx.clone();
        if *stop_rx.borrow() {
            return true;
        }
        tokio::select! {
            sent = self.sample_tx.send(sample) => {
                if sent.is_err() {
                    info!("Sample channel closed; stopping metrics stream client");
                    true
                } else {
                    false
                }
            }
            _ = stop_rx.changed() => true,
        }
    }

    /// Wait out the reconnect delay. Returns true when stopped mid-wait.
    async fn wait_for_reconnect(&mut self) -> bool {
        debug!(
            "Waiting {:?} before reconnecting to {}",
            self.reconnect_delay, self.url
        );
        tokio::select! {
            _ = tokio::time::sleep(self.reconnect_delay) => false,
            _ = self.stop_rx.changed() => true,
        }
    }
}

/// Parse one NDJSON line into a sample.
///
/// Blank lines, invalid JSON, records missing a required numeric field, and
/// unparseable timestamp strings all yield `None`; none of them abort the
/// stream. An absent or non-string timestamp gets `now`.
pub fn parse_line(raw_line: &str, now: DateTime<Utc>) -> Option<PlantSample> {
    let line = raw_line.trim();
    if line.is_empty() {
        return None;
    }

    let data: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(_) => {
            debug!("Skipping invalid JSON line: {:?}", line);
            return None;
        }
    };

    let timestamp = match data.get("timestamp") {
        Some(Value::String(raw)) => match DateTimeParser::parse_iso8601(raw) {
            Ok(ts) => ts,
            Err(err) => {
                debug!("Skipping sample with bad timestamp: {}", err);
                return None;
            }
        },
        _ => now,
    };

    let co2_ppm = data.get("co2_ppm").and_then(Value::as_f64);
    let temperature_c = data.get("temperature_c").and_then(Value::as_f64);
    let humidity_pct = data.get("humidity_pct").and_then(Value::as_f64);

    match (co2_ppm, temperature_c, humidity_pct) {
        (Some(co2_ppm), Some(temperature_c), Some(humidity_pct)) => Some(PlantSample {
            timestamp,
            co2_ppm,
            temperature_c,
            humidity_pct,
        }),
        _ => {
            debug!("Skipping sample with missing fields: {}", data);
            None
        }
    }
}

/// Drain the next complete line (without its terminator) from the buffer.
fn next_line(buffer: &mut Vec<u8>) -> Option<String> {
    let pos = buffer.iter().position(|&byte| byte == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(String::from_utf8_lossy(&line).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn parse_line_round_trips_numeric_fields() {
        let sample = parse_line(
            r#"{"timestamp":"2024-01-01T00:00:00Z","co2_ppm":612.5,"temperature_c":21.3,"humidity_pct":44.2}"#,
            now(),
        )
        .unwrap();
        assert_eq!(sample.co2_ppm, 612.5);
        assert_eq!(sample.temperature_c, 21.3);
        assert_eq!(sample.humidity_pct, 44.2);
        assert_eq!(
            sample.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn parse_line_z_suffix_equals_explicit_offset() {
        let with_z = parse_line(
            r#"{"timestamp":"2024-01-01T00:00:00Z","co2_ppm":1.0,"temperature_c":1.0,"humidity_pct":1.0}"#,
            now(),
        )
        .unwrap();
        let with_offset = parse_line(
            r#"{"timestamp":"2024-01-01T00:00:00+00:00","co2_ppm":1.0,"temperature_c":1.0,"humidity_pct":1.0}"#,
            now(),
        )
        .unwrap();
        assert_eq!(with_z.timestamp, with_offset.timestamp);
    }

    #[test]
    fn parse_line_substitutes_now_for_missing_or_non_string_timestamp() {
        let missing = parse_line(
            r#"{"co2_ppm":1.0,"temperature_c":1.0,"humidity_pct":1.0}"#,
            now(),
        )
        .unwrap();
        assert_eq!(missing.timestamp, now());

        let numeric = parse_line(
            r#"{"timestamp":12345,"co2_ppm":1.0,"temperature_c":1.0,"humidity_pct":1.0}"#,
            now(),
        )
        .unwrap();
        assert_eq!(numeric.timestamp, now());
    }

    #[test]
    fn parse_line_drops_records_missing_required_fields() {
        assert!(parse_line(r#"{"temperature_c":1.0,"humidity_pct":1.0}"#, now()).is_none());
        assert!(parse_line(r#"{"co2_ppm":1.0,"humidity_pct":1.0}"#, now()).is_none());
        assert!(parse_line(r#"{"co2_ppm":1.0,"temperature_c":1.0}"#, now()).is_none());
        // Non-numeric required field is as bad as a missing one
        assert!(parse_line(
            r#"{"co2_ppm":"612","temperature_c":1.0,"humidity_pct":1.0}"#,
            now()
        )
        .is_none());
    }

    #[test]
    fn parse_line_skips_blank_and_invalid_input() {
        assert!(parse_line("", now()).is_none());
        assert!(parse_line("   \r", now()).is_none());
        assert!(parse_line("not json at all", now()).is_none());
        assert!(parse_line("[1,2,3]", now()).is_none());
    }

    #[test]
    fn parse_line_drops_unparseable_timestamp_string() {
        assert!(parse_line(
            r#"{"timestamp":"yesterday","co2_ppm":1.0,"temperature_c":1.0,"humidity_pct":1.0}"#,
            now()
        )
        .is_none());
    }

    #[test]
    fn next_line_splits_on_newlines_across_chunks() {
        let mut buffer = b"{\"a\":1}\n{\"b\"".to_vec();
        assert_eq!(next_line(&mut buffer).unwrap(), "{\"a\":1}");
        assert!(next_line(&mut buffer).is_none());
        buffer.extend_from_slice(b":2}\r\n");
        assert_eq!(next_line(&mut buffer).unwrap(), "{\"b\":2}");
        assert!(buffer.is_empty());
    }
}
