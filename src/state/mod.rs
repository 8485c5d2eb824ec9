//! Bounded rolling history of plant samples plus on-demand summarization.
//!
//! Single writer (the ingest consumer task), many readers (API handlers).
//! The ring is guarded by an async `RwLock`; readers take an owned snapshot
//! under the read lock and derive from that, so eviction never races an
//! iteration.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::models::{PlantSample, PlantSummary};
use crate::utils::datetime::DateTimeParser;

pub mod analysis;

pub const DEFAULT_HISTORY_CAPACITY: usize = 720;
pub const DEFAULT_AMBIENT_CO2_BASELINE_PPM: f64 = 600.0;

#[derive(Clone)]
pub struct PlantMetricsStore {
    samples: Arc<RwLock<VecDeque<PlantSample>>>,
    capacity: usize,
    ambient_co2_baseline_ppm: f64,
}

impl PlantMetricsStore {
    pub fn new(capacity: usize, ambient_co2_baseline_ppm: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            ambient_co2_baseline_ppm,
        }
    }

    /// Append a sample, evicting the oldest when the ring is full.
    pub async fn update(&self, sample: PlantSample) {
        let mut samples = self.samples.write().await;
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Most recently appended sample, if any.
    pub async fn latest(&self) -> Option<PlantSample> {
        self.samples.read().await.back().copied()
    }

    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.samples.read().await.is_empty()
    }

    /// Retained samples with a timestamp within `since` of now, in original order.
    pub async fn window(&self, since: Duration) -> Vec<PlantSample> {
        let cutoff = Utc::now() - since;
        self.samples
            .read()
            .await
            .iter()
            .filter(|sample| sample.timestamp >= cutoff)
            .copied()
            .collect()
    }

    async fn snapshot(&self) -> Vec<PlantSample> {
        self.samples.read().await.iter().copied().collect()
    }

    /// Derive a fresh summary from the current contents. Never cached.
    pub async fn summarize(&self) -> PlantSummary {
        let samples = self.snapshot().await;
        analysis::summarize_samples(&samples, Utc::now(), self.ambient_co2_baseline_ppm)
    }

    /// Render the summary as a JSON value for external consumers.
    ///
    /// `units` selects the temperature scale; anything other than
    /// `"imperial"` falls back to metric. An empty store yields the
    /// "unavailable" shape rather than an error.
    pub async fn to_result_dict(&self, units: &str) -> Value {
        let summary = self.summarize().await;

        let Some(latest) = summary.latest else {
            return json!({
                "available": false,
                "message": "No sensor data available yet.",
            });
        };

        let (temp_key, temp_out) = if units == "imperial" {
            ("temperature_f", latest.temperature_c * 9.0 / 5.0 + 32.0)
        } else {
            ("temperature_c", latest.temperature_c)
        };

        let mut latest_obj = serde_json::Map::new();
        latest_obj.insert(temp_key.to_string(), json!(round_to(temp_out, 2)));
        latest_obj.insert(
            "humidity_pct".to_string(),
            json!(round_to(latest.humidity_pct, 2)),
        );
        latest_obj.insert("co2_ppm".to_string(), json!(round_to(latest.co2_ppm, 1)));
        latest_obj.insert(
            "timestamp".to_string(),
            json!(DateTimeParser::format_for_api(&latest.timestamp)),
        );
        latest_obj.insert(
            "seconds_since_update".to_string(),
            json!(summary.seconds_since_update),
        );

        json!({
            "available": true,
            "latest": latest_obj,
            "derived": {
                "vpd_kpa": summary.vpd_kpa.map(|vpd| round_to(vpd, 3)),
                "temperature_status": summary.temperature_status.as_str(),
                "humidity_status": summary.humidity_status.as_str(),
                "co2_status": summary.co2_status.as_str(),
                "stress_risk": summary.stress_risk,
                "co2_relative_to_ambient_low": summary.co2_relative_to_ambient_low,
                "trends": {
                    "co2_trend_ppm_per_min": summary.co2_trend_ppm_per_min,
                    "humidity_trend_pct_per_min": summary.humidity_trend_pct_per_min,
                    "temperature_trend_c_per_min": summary.temperature_trend_c_per_min,
                },
            },
            "phrases": {
                "sleep": summary.sleep_assessment_text,
                "current_feel": summary.current_feel_text,
                "productivity": summary.productivity_assessment_text,
            },
        })
    }
}

pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Co2Status, HumidityStatus, TemperatureStatus};

    fn sample_at(timestamp: chrono::DateTime<Utc>, co2: f64, temp: f64, humidity: f64) -> PlantSample {
        PlantSample {
            timestamp,
            co2_ppm: co2,
            temperature_c: temp,
            humidity_pct: humidity,
        }
    }

    fn sample_now(co2: f64, temp: f64, humidity: f64) -> PlantSample {
        sample_at(Utc::now(), co2, temp, humidity)
    }

    #[test]
    fn capacity_evicts_oldest_samples() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(3, 600.0);
            for i in 0..5 {
                store.update(sample_now(400.0 + i as f64, 20.0, 50.0)).await;
            }
            assert_eq!(store.len().await, 3);
            // The two oldest inserts were evicted
            let oldest = store.window(Duration::hours(1)).await[0];
            assert_eq!(oldest.co2_ppm, 402.0);
            assert_eq!(store.latest().await.unwrap().co2_ppm, 404.0);
        });
    }

    #[test]
    fn window_on_empty_store_is_empty() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(10, 600.0);
            assert!(store.window(Duration::minutes(10)).await.is_empty());
            assert!(store.latest().await.is_none());
            assert!(store.is_empty().await);
        });
    }

    #[test]
    fn window_keeps_only_recent_samples_in_order() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(10, 600.0);
            let now = Utc::now();
            store
                .update(sample_at(now - Duration::hours(2), 500.0, 20.0, 50.0))
                .await;
            store
                .update(sample_at(now - Duration::minutes(5), 510.0, 20.0, 50.0))
                .await;
            store.update(sample_at(now, 520.0, 20.0, 50.0)).await;

            let windowed = store.window(Duration::minutes(10)).await;
            assert_eq!(windowed.len(), 2);
            assert_eq!(windowed[0].co2_ppm, 510.0);
            assert_eq!(windowed[1].co2_ppm, 520.0);
        });
    }

    #[test]
    fn summarize_empty_store_reports_unknown() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(10, 600.0);
            let summary = store.summarize().await;
            assert!(summary.latest.is_none());
            assert!(summary.seconds_since_update.is_none());
            assert!(summary.vpd_kpa.is_none());
            assert_eq!(summary.temperature_status, TemperatureStatus::Unknown);
            assert_eq!(summary.humidity_status, HumidityStatus::Unknown);
            assert_eq!(summary.co2_status, Co2Status::Unknown);
        });
    }

    #[test]
    fn summarize_live_store_classifies_latest() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(10, 600.0);
            store.update(sample_now(1600.0, 32.0, 20.0)).await;
            let summary = store.summarize().await;
            assert_eq!(summary.temperature_status, TemperatureStatus::Hot);
            assert_eq!(summary.humidity_status, HumidityStatus::VeryDry);
            assert_eq!(summary.co2_status, Co2Status::VeryStale);
            assert!(summary.stress_risk);
            assert!(summary.seconds_since_update.unwrap() >= 0.0);
        });
    }

    #[test]
    fn result_dict_unavailable_when_empty() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(10, 600.0);
            let result = store.to_result_dict("metric").await;
            assert_eq!(result["available"], false);
            assert_eq!(result["message"], "No sensor data available yet.");
        });
    }

    #[test]
    fn result_dict_metric_and_imperial_temperature() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(10, 600.0);
            store.update(sample_now(612.3456, 20.0, 45.678)).await;

            let metric = store.to_result_dict("metric").await;
            assert_eq!(metric["available"], true);
            assert_eq!(metric["latest"]["temperature_c"], 20.0);
            assert_eq!(metric["latest"]["humidity_pct"], 45.68);
            assert_eq!(metric["latest"]["co2_ppm"], 612.3);
            assert!(metric["latest"].get("temperature_f").is_none());

            let imperial = store.to_result_dict("imperial").await;
            let temp_f = imperial["latest"]["temperature_f"].as_f64().unwrap();
            assert!((temp_f - 68.0).abs() < 0.01);
            assert!(imperial["latest"].get("temperature_c").is_none());
        });
    }

    #[test]
    fn result_dict_unknown_units_falls_back_to_metric() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(10, 600.0);
            store.update(sample_now(600.0, 21.5, 50.0)).await;
            let result = store.to_result_dict("nautical").await;
            assert_eq!(result["latest"]["temperature_c"], 21.5);
        });
    }

    #[test]
    fn result_dict_rounds_vpd_to_three_decimals() {
        tokio_test::block_on(async {
            let store = PlantMetricsStore::new(10, 600.0);
            store.update(sample_now(600.0, 25.0, 50.0)).await;
            let result = store.to_result_dict("metric").await;
            let vpd = result["derived"]["vpd_kpa"].as_f64().unwrap();
            assert!((vpd - 1.584).abs() < 0.01);
            // At most three decimal places survive rounding
            assert_eq!(round_to(vpd, 3), vpd);
        });
    }
}
