//! Batch-statistical anomaly detection.
//!
//! The detector is fitted once per batch over readings that carry all three
//! scalars, then consulted per reading. A reading is anomalous when its
//! sensor looks stale, or when any variable is a z-score or Tukey-fence
//! outlier against the batch distribution. Readings missing any scalar are
//! excluded from the fit and never flagged.

use std::collections::{HashMap, HashSet};

use crate::models::SensorReading;
use crate::stats::DescriptiveStats;

// ---

const Z_SCORE_LIMIT: f64 = 3.0;
const IQR_MULTIPLIER: f64 = 1.5;

/// A sensor is considered stale when it reported at least this many humidity
/// samples in the batch...
const STALE_MIN_SAMPLES: usize = 5;
/// ...and a single value makes up at least this share of them.
const STALE_MODE_RATIO: f64 = 0.80;

/// Per-batch anomaly detector. `fit` discards any previous batch state; an
/// unfitted detector reports nothing as anomalous.
#[derive(Debug, Default)]
pub struct AnomalyDetector {
    temperature: Option<DescriptiveStats>,
    humidity: Option<DescriptiveStats>,
    dew_point: Option<DescriptiveStats>,
    stale_sensors: HashSet<String>,
}

impl AnomalyDetector {
    // ---

    pub fn new() -> Self {
        Self::default()
    }

    /// Fit batch statistics over the complete readings and flag sensors with
    /// near-constant humidity as stale.
    pub fn fit(&mut self, readings: &[SensorReading]) {
        // ---
        *self = Self::default();

        let mut temperatures = Vec::with_capacity(readings.len());
        let mut humidities = Vec::with_capacity(readings.len());
        let mut dew_points = Vec::with_capacity(readings.len());
        let mut humidity_by_sensor: HashMap<&str, Vec<f64>> = HashMap::new();

        for reading in readings {
            let (Some(t), Some(h), Some(d)) =
                (reading.temperature, reading.humidity, reading.dew_point)
            else {
                continue;
            };

            temperatures.push(t);
            humidities.push(h);
            dew_points.push(d);
            humidity_by_sensor
                .entry(reading.sensor_id.as_str())
                .or_default()
                .push(h);
        }

        self.temperature = DescriptiveStats::from_values(&temperatures);
        self.humidity = DescriptiveStats::from_values(&humidities);
        self.dew_point = DescriptiveStats::from_values(&dew_points);

        self.stale_sensors = humidity_by_sensor
            .into_iter()
            .filter(|(_, values)| is_stale(values))
            .map(|(sensor_id, _)| sensor_id.to_string())
            .collect();
    }

    /// Whether the fitted batch marks this reading as anomalous.
    pub fn is_anomaly(&self, reading: &SensorReading) -> bool {
        // ---
        let (Some(t), Some(h), Some(d)) =
            (reading.temperature, reading.humidity, reading.dew_point)
        else {
            return false;
        };

        let (Some(temperature), Some(humidity), Some(dew_point)) =
            (self.temperature, self.humidity, self.dew_point)
        else {
            return false;
        };

        if self.stale_sensors.contains(reading.sensor_id.as_str()) {
            return true;
        }

        if is_z_outlier(t, &temperature)
            || is_z_outlier(h, &humidity)
            || is_z_outlier(d, &dew_point)
        {
            return true;
        }

        outside_fence(t, &temperature) || outside_fence(h, &humidity) || outside_fence(d, &dew_point)
    }
}

/// |z| beyond the limit. A zero-deviation sample never produces z outliers.
fn is_z_outlier(value: f64, stats: &DescriptiveStats) -> bool {
    stats.std_dev > 0.0 && ((value - stats.mean) / stats.std_dev).abs() > Z_SCORE_LIMIT
}

/// Outside the Tukey fence [q1 - 1.5*iqr, q3 + 1.5*iqr].
fn outside_fence(value: f64, stats: &DescriptiveStats) -> bool {
    let iqr = stats.iqr();
    value < stats.q1 - IQR_MULTIPLIER * iqr || value > stats.q3 + IQR_MULTIPLIER * iqr
}

fn is_stale(values: &[f64]) -> bool {
    // ---
    if values.len() < STALE_MIN_SAMPLES {
        return false;
    }

    // Group by exact bit pattern; stuck sensors repeat byte-identical values
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.to_bits()).or_insert(0) += 1;
    }

    let mode = counts.values().copied().max().unwrap_or(0);
    mode as f64 / values.len() as f64 >= STALE_MODE_RATIO
}
