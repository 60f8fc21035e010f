//! Data models for the sensor analysis service.
//!
//! Covers the three layers of the wire format: the readings clients upload,
//! the per-reading verdicts the analysis produces, and the dashboard summary
//! aggregated per job. All output types serialize as camelCase JSON; optional
//! fields are omitted rather than sent as `null`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// One uploaded sensor reading. Scalars are optional: an absent value marks
/// that variable invalid for the reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    // ---
    pub sensor_id: String,
    /// Free-form grouping tag, e.g. "indoor" / "outdoor".
    #[serde(default, rename = "type")]
    pub reading_type: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub dew_point: Option<f64>,
}

/// Severity of a single variable against its thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableStatus {
    Normal,
    Alert,
    Critical,
    Invalid,
}

/// Which bound a breached threshold sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitKind {
    Max,
    Min,
}

/// Whole-reading verdict from the statistical pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Normal,
    Anomaly,
    Invalid,
}

/// Why a notification was emitted. Critical breaches outrank anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationReason {
    Critical,
    Anomaly,
}

/// Threshold verdict for one variable of one reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableVerdict {
    // ---
    pub status: VariableStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_type: Option<LimitKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl VariableVerdict {
    // ---

    /// Verdict for an absent input value.
    pub fn invalid() -> Self {
        Self {
            status: VariableStatus::Invalid,
            limit_type: None,
            threshold_value: None,
            value: None,
        }
    }

    /// Verdict for a value inside every configured bound.
    pub fn normal(value: f64) -> Self {
        Self {
            status: VariableStatus::Normal,
            limit_type: None,
            threshold_value: None,
            value: Some(value),
        }
    }

    /// Verdict for a breached bound, recording which one and its value.
    pub fn breach(status: VariableStatus, limit: LimitKind, threshold: f64, value: f64) -> Self {
        Self {
            status,
            limit_type: Some(limit),
            threshold_value: Some(threshold),
            value: Some(value),
        }
    }
}

/// Statistical verdict for the whole reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub status: OverallStatus,
}

/// Full analysis output for one reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    // ---
    pub sensor_id: String,
    #[serde(rename = "type")]
    pub reading_type: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: VariableVerdict,
    pub humidity: VariableVerdict,
    pub dew_point: VariableVerdict,
    pub anomaly: AnomalyVerdict,
}

/// Outbound alert for a critical breach or an anomalous reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub reason: NotificationReason,
}

/// Per-job rollup served on the summary endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    // ---
    pub total_analyzed: usize,
    pub total_invalid: usize,
    pub total_normal: usize,
    pub total_anomaly: usize,
    pub temp_alert_max_count: usize,
    pub temp_critical_max_count: usize,
    pub temp_alert_min_count: usize,
    pub temp_critical_min_count: usize,
    pub humidity_alert_max_count: usize,
    pub humidity_critical_max_count: usize,
    pub humidity_alert_min_count: usize,
    pub humidity_critical_min_count: usize,
    /// Dew point thresholds only carry upper bounds, so no min counters.
    pub dew_point_alert_max_count: usize,
    pub dew_point_critical_max_count: usize,
    pub by_type: HashMap<String, usize>,
    pub notifications: Vec<NotificationMessage>,
}
