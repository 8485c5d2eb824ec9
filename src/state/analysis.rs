//! Derivation math for plant summaries.
//!
//! Everything here is a pure function of a sample snapshot and an explicit
//! `now`, so the summarization engine can be tested deterministically. The
//! store wraps these with wall-clock time.

use chrono::{DateTime, Duration, Local, Timelike, Utc};

use crate::models::{Co2Status, HumidityStatus, PlantSample, PlantSummary, TemperatureStatus};

/// Window used for first-last trend slopes, in minutes.
pub const TREND_WINDOW_MINUTES: i64 = 10;
/// Lookback for the overnight CO2 assessment, in hours.
pub const NIGHT_LOOKBACK_HOURS: i64 = 8;
/// Margin below the ambient baseline that signals active CO2 drawdown.
pub const CO2_DRAWDOWN_MARGIN_PPM: f64 = 50.0;
/// Margin below the ambient baseline that separates the two sleep phrases.
pub const NIGHT_CO2_MARGIN_PPM: f64 = 25.0;
/// CO2 slope below which the feed is read as active photosynthesis.
pub const CO2_FALLING_SLOPE_PPM_PER_MIN: f64 = -2.0;

const SLEEP_ELEVATED: &str =
    "I slept great. My indicators show healthy elevated CO2 levels and I slept like a baby.";
const SLEEP_MODERATE: &str = "I rested fine. CO2 stayed moderate overnight, and I felt calm.";
const SLEEP_NO_DATA: &str = "I slept well. Things felt calm and steady through the night.";

const FEEL_STRESSED: &str =
    "Honestly, temperatures are increasing and I feel like I need water. So, I'm getting a bit stressed.";
const FEEL_HOT: &str = "It's quite warm. I could use a cooler breeze or some shade.";
const FEEL_DRY: &str = "A bit dry. I could use some water to stay comfy.";
const FEEL_COMFORTABLE: &str = "I feel comfortable right now. Thank you for checking on me!";

const PRODUCTIVITY_DRAWDOWN: &str =
    "My sensors indicate low CO2 concentrations around my leaves. Makes sense because I'm actively photosynthesizing!";
const PRODUCTIVITY_FALLING: &str =
    "CO2 is dropping around me, which matches active photosynthesis. I'm doing my leafy best!";
const PRODUCTIVITY_DEFAULT: &str =
    "I'm doing my best. If you open a window or give me more light, I can work even harder.";

/// Vapor pressure deficit (kPa) via the Tetens saturation approximation.
pub fn vpd_kpa(temp_c: f64, rh_pct: f64) -> f64 {
    let es = 0.6108 * (17.27 * temp_c / (temp_c + 237.3)).exp();
    let ea = es * (rh_pct / 100.0);
    (es - ea).max(0.0)
}

/// First-last slope per minute over a series of timestamped values.
///
/// Cheap and robust for the feed's 2-second sampling interval; not a
/// least-squares fit. `None` with fewer than 2 points or a non-positive
/// elapsed span.
pub fn trend_per_min(points: &[(DateTime<Utc>, f64)]) -> Option<f64> {
    let (first_ts, first) = points.first()?;
    let (last_ts, last) = points.last()?;
    if points.len() < 2 {
        return None;
    }
    let dt_min = (*last_ts - *first_ts).num_milliseconds() as f64 / 60_000.0;
    if dt_min <= 0.0 {
        return None;
    }
    Some((last - first) / dt_min)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Night hours for the sleep assessment, in local time.
pub fn is_night_hour(hour: u32) -> bool {
    hour >= 22 || hour < 6
}

pub fn sleep_assessment(avg_night_co2: Option<f64>, ambient_baseline_ppm: f64) -> &'static str {
    match avg_night_co2 {
        Some(avg) if avg >= ambient_baseline_ppm - NIGHT_CO2_MARGIN_PPM => SLEEP_ELEVATED,
        Some(_) => SLEEP_MODERATE,
        None => SLEEP_NO_DATA,
    }
}

pub fn current_feel(
    stress_risk: bool,
    temperature_status: TemperatureStatus,
    humidity_status: HumidityStatus,
) -> &'static str {
    if stress_risk {
        FEEL_STRESSED
    } else if temperature_status == TemperatureStatus::Hot {
        FEEL_HOT
    } else if humidity_status.is_dry() {
        FEEL_DRY
    } else {
        FEEL_COMFORTABLE
    }
}

pub fn productivity_assessment(
    co2_relative_to_ambient_low: Option<bool>,
    co2_trend_ppm_per_min: Option<f64>,
) -> &'static str {
    if co2_relative_to_ambient_low == Some(true) {
        PRODUCTIVITY_DRAWDOWN
    } else if co2_trend_ppm_per_min.is_some_and(|slope| slope < CO2_FALLING_SLOPE_PPM_PER_MIN) {
        PRODUCTIVITY_FALLING
    } else {
        PRODUCTIVITY_DEFAULT
    }
}

/// Compute the full summary from a time-ascending sample snapshot.
pub fn summarize_samples(
    samples: &[PlantSample],
    now: DateTime<Utc>,
    ambient_co2_baseline_ppm: f64,
) -> PlantSummary {
    let latest = samples.last().copied();
    let seconds_since_update =
        latest.map(|sample| (now - sample.timestamp).num_milliseconds() as f64 / 1000.0);

    let trend_cutoff = now - Duration::minutes(TREND_WINDOW_MINUTES);
    let in_window: Vec<PlantSample> = samples
        .iter()
        .filter(|sample| sample.timestamp >= trend_cutoff)
        .copied()
        .collect();

    let series_of = |extract: fn(&PlantSample) -> f64| -> Vec<(DateTime<Utc>, f64)> {
        in_window
            .iter()
            .map(|sample| (sample.timestamp, extract(sample)))
            .collect()
    };
    let temperature_trend = trend_per_min(&series_of(|s| s.temperature_c));
    let humidity_trend = trend_per_min(&series_of(|s| s.humidity_pct));
    let co2_trend = trend_per_min(&series_of(|s| s.co2_ppm));

    let vpd = latest.map(|sample| vpd_kpa(sample.temperature_c, sample.humidity_pct));

    let mut temperature_status = TemperatureStatus::Unknown;
    let mut humidity_status = HumidityStatus::Unknown;
    let mut co2_status = Co2Status::Unknown;
    let mut stress_risk = false;
    let mut co2_relative_to_ambient_low = None;

    if let Some(sample) = latest {
        temperature_status = TemperatureStatus::classify(sample.temperature_c);
        humidity_status = HumidityStatus::classify(sample.humidity_pct);
        co2_status = Co2Status::classify(sample.co2_ppm);
        stress_risk = sample.humidity_pct < 35.0 && sample.temperature_c >= 28.0;
        co2_relative_to_ambient_low =
            Some(sample.co2_ppm < ambient_co2_baseline_ppm - CO2_DRAWDOWN_MARGIN_PPM);
    }

    let night_cutoff = now - Duration::hours(NIGHT_LOOKBACK_HOURS);
    let night_co2: Vec<f64> = samples
        .iter()
        .filter(|sample| sample.timestamp >= night_cutoff)
        .filter(|sample| is_night_hour(sample.timestamp.with_timezone(&Local).hour()))
        .map(|sample| sample.co2_ppm)
        .collect();

    PlantSummary {
        latest,
        seconds_since_update,
        vpd_kpa: vpd,
        temperature_status,
        humidity_status,
        co2_status,
        stress_risk,
        co2_relative_to_ambient_low,
        co2_trend_ppm_per_min: co2_trend,
        humidity_trend_pct_per_min: humidity_trend,
        temperature_trend_c_per_min: temperature_trend,
        sleep_assessment_text: sleep_assessment(mean(&night_co2), ambient_co2_baseline_ppm),
        current_feel_text: current_feel(stress_risk, temperature_status, humidity_status),
        productivity_assessment_text: productivity_assessment(co2_relative_to_ambient_low, co2_trend),
    }
}
