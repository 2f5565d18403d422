//! Trailing-window sensor statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reading::Reading;

/// Aggregates over every reading recorded since `since`, across all plants.
///
/// Averages and extremes are `None` when the window holds no readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorStatistics {
    /// Start of the window.
    pub since: DateTime<Utc>,
    /// Number of readings in the window.
    pub reading_count: usize,
    /// Mean soil moisture.
    pub avg_soil_moisture: Option<f64>,
    /// Mean temperature.
    pub avg_temperature: Option<f64>,
    /// Mean humidity.
    pub avg_humidity: Option<f64>,
    /// Lowest temperature.
    pub min_temperature: Option<f64>,
    /// Highest temperature.
    pub max_temperature: Option<f64>,
}

impl SensorStatistics {
    /// Folds a set of readings into statistics.
    #[must_use]
    pub fn from_readings(since: DateTime<Utc>, readings: &[Reading]) -> Self {
        let mut stats = Self {
            since,
            reading_count: readings.len(),
            avg_soil_moisture: None,
            avg_temperature: None,
            avg_humidity: None,
            min_temperature: None,
            max_temperature: None,
        };
        if readings.is_empty() {
            return stats;
        }

        let (mut soil, mut temp, mut hum) = (0.0, 0.0, 0.0);
        let mut min_t = f64::INFINITY;
        let mut max_t = f64::NEG_INFINITY;
        for r in readings {
            soil += r.sample.soil_moisture;
            temp += r.sample.temperature;
            hum += r.sample.humidity;
            min_t = min_t.min(r.sample.temperature);
            max_t = max_t.max(r.sample.temperature);
        }

        #[allow(clippy::cast_precision_loss)]
        let n = readings.len() as f64;
        stats.avg_soil_moisture = Some(soil / n);
        stats.avg_temperature = Some(temp / n);
        stats.avg_humidity = Some(hum / n);
        stats.min_temperature = Some(min_t);
        stats.max_temperature = Some(max_t);
        stats
    }
}
