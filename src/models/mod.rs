use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sensor reading from the plant metrics feed.
///
/// All three physical fields are required on the wire; records missing any
/// of them are dropped by the ingest client and never reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantSample {
    pub timestamp: DateTime<Utc>,
    pub co2_ppm: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureStatus {
    Hot,
    Comfy,
    Cool,
    Unknown,
}

impl TemperatureStatus {
    pub fn classify(temperature_c: f64) -> Self {
        if temperature_c > 30.0 {
            Self::Hot
        } else if (18.0..=28.0).contains(&temperature_c) {
            Self::Comfy
        } else {
            Self::Cool
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Comfy => "comfy",
            Self::Cool => "cool",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumidityStatus {
    VeryDry,
    Dry,
    Humid,
    Ideal,
    Unknown,
}

impl HumidityStatus {
    pub fn classify(humidity_pct: f64) -> Self {
        if humidity_pct < 25.0 {
            Self::VeryDry
        } else if humidity_pct < 35.0 {
            Self::Dry
        } else if humidity_pct > 80.0 {
            Self::Humid
        } else {
            Self::Ideal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryDry => "very_dry",
            Self::Dry => "dry",
            Self::Humid => "humid",
            Self::Ideal => "ideal",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_dry(&self) -> bool {
        matches!(self, Self::Dry | Self::VeryDry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Co2Status {
    VeryStale,
    Stale,
    Fresh,
    Normal,
    Unknown,
}

impl Co2Status {
    pub fn classify(co2_ppm: f64) -> Self {
        if co2_ppm > 1500.0 {
            Self::VeryStale
        } else if co2_ppm > 1200.0 {
            Self::Stale
        } else if co2_ppm < 450.0 {
            Self::Fresh
        } else {
            Self::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryStale => "very_stale",
            Self::Stale => "stale",
            Self::Fresh => "fresh",
            Self::Normal => "normal",
            Self::Unknown => "unknown",
        }
    }
}

/// Derived view of the current store contents.
///
/// Recomputed from scratch on every request; holds no state of its own.
#[derive(Debug, Clone)]
pub struct PlantSummary {
    pub latest: Option<PlantSample>,
    pub seconds_since_update: Option<f64>,
    pub vpd_kpa: Option<f64>,
    pub temperature_status: TemperatureStatus,
    pub humidity_status: HumidityStatus,
    pub co2_status: Co2Status,
    pub stress_risk: bool,
    pub co2_relative_to_ambient_low: Option<bool>,
    pub co2_trend_ppm_per_min: Option<f64>,
    pub humidity_trend_pct_per_min: Option<f64>,
    pub temperature_trend_c_per_min: Option<f64>,
    pub sleep_assessment_text: &'static str,
    pub current_feel_text: &'static str,
    pub productivity_assessment_text: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_thresholds() {
        assert_eq!(TemperatureStatus::classify(30.1), TemperatureStatus::Hot);
        assert_eq!(TemperatureStatus::classify(30.0), TemperatureStatus::Cool);
        assert_eq!(TemperatureStatus::classify(28.0), TemperatureStatus::Comfy);
        assert_eq!(TemperatureStatus::classify(18.0), TemperatureStatus::Comfy);
        assert_eq!(TemperatureStatus::classify(17.9), TemperatureStatus::Cool);
    }

    #[test]
    fn humidity_thresholds() {
        assert_eq!(HumidityStatus::classify(24.9), HumidityStatus::VeryDry);
        assert_eq!(HumidityStatus::classify(25.0), HumidityStatus::Dry);
        assert_eq!(HumidityStatus::classify(34.9), HumidityStatus::Dry);
        assert_eq!(HumidityStatus::classify(35.0), HumidityStatus::Ideal);
        assert_eq!(HumidityStatus::classify(80.0), HumidityStatus::Ideal);
        assert_eq!(HumidityStatus::classify(80.1), HumidityStatus::Humid);
    }

    #[test]
    fn co2_thresholds() {
        assert_eq!(Co2Status::classify(1501.0), Co2Status::VeryStale);
        assert_eq!(Co2Status::classify(1500.0), Co2Status::Stale);
        assert_eq!(Co2Status::classify(1200.0), Co2Status::Normal);
        assert_eq!(Co2Status::classify(449.9), Co2Status::Fresh);
        assert_eq!(Co2Status::classify(450.0), Co2Status::Normal);
    }

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(HumidityStatus::VeryDry.as_str(), "very_dry");
        assert_eq!(Co2Status::VeryStale.as_str(), "very_stale");
        assert_eq!(TemperatureStatus::Unknown.as_str(), "unknown");
    }
}
