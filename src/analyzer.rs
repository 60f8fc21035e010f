//! Per-reading verdict assembly.

use crate::anomaly::AnomalyDetector;
use crate::models::{AnalysisResult, AnomalyVerdict, OverallStatus, SensorReading};
use crate::thresholds::{self, ThresholdConfig};

// ---

/// Combines the threshold evaluator and the anomaly detector into one
/// per-reading classification. Fit once per batch, then analyze readings in
/// any order; `analyze` takes `&self` so a fitted analyzer can be shared
/// across workers.
pub struct SampleAnalyzer {
    config: ThresholdConfig,
    detector: AnomalyDetector,
}

impl SampleAnalyzer {
    // ---

    pub fn new(config: ThresholdConfig) -> Self {
        Self {
            config,
            detector: AnomalyDetector::new(),
        }
    }

    /// Fit the batch statistics backing the anomaly verdicts.
    pub fn fit(&mut self, readings: &[SensorReading]) {
        self.detector.fit(readings);
    }

    /// Classify one reading: each variable against its thresholds, plus the
    /// whole-reading verdict. A reading with no scalars at all is invalid;
    /// otherwise anomaly outranks normal.
    pub fn analyze(&self, reading: &SensorReading) -> AnalysisResult {
        // ---
        let temperature = thresholds::evaluate(reading.temperature, &self.config.temperature);
        let humidity = thresholds::evaluate(reading.humidity, &self.config.humidity);
        let dew_point = thresholds::evaluate(reading.dew_point, &self.config.dew_point);

        let no_scalars = reading.temperature.is_none()
            && reading.humidity.is_none()
            && reading.dew_point.is_none();

        let status = if no_scalars {
            OverallStatus::Invalid
        } else if self.detector.is_anomaly(reading) {
            OverallStatus::Anomaly
        } else {
            OverallStatus::Normal
        };

        AnalysisResult {
            sensor_id: reading.sensor_id.clone(),
            reading_type: reading.reading_type.clone(),
            timestamp: reading.timestamp,
            temperature,
            humidity,
            dew_point,
            anomaly: AnomalyVerdict { status },
        }
    }
}
