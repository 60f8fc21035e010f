//! Threshold configuration and the per-variable evaluator.
//!
//! Each variable carries an alert band nested inside a critical band. Bounds
//! are individually optional; a bound that is not configured can never be
//! breached. The evaluator checks critical before alert and max before min,
//! so a value violating several bounds reports the most severe one.

use serde::Deserialize;

use crate::models::{LimitKind, VariableStatus, VariableVerdict};

// ---

/// Optional upper/lower bounds for one severity level.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct LimitRange {
    pub max: Option<f64>,
    pub min: Option<f64>,
}

/// Alert and critical bands for one variable.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct VariableThreshold {
    pub alert: LimitRange,
    pub critical: LimitRange,
}

/// Threshold bands for all three analyzed variables.
///
/// Defaults are the service's stock environmental bands; a JSON override file
/// replaces whole variables, so a variable present in the file must spell out
/// every bound it wants to keep.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub temperature: VariableThreshold,
    pub humidity: VariableThreshold,
    pub dew_point: VariableThreshold,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        // ---
        Self {
            temperature: VariableThreshold {
                alert: LimitRange { max: Some(30.0), min: Some(15.0) },
                critical: LimitRange { max: Some(35.0), min: Some(10.0) },
            },
            humidity: VariableThreshold {
                alert: LimitRange { max: Some(70.0), min: Some(40.0) },
                critical: LimitRange { max: Some(80.0), min: Some(30.0) },
            },
            // Dew point only has upper bounds
            dew_point: VariableThreshold {
                alert: LimitRange { max: Some(22.0), min: None },
                critical: LimitRange { max: Some(25.0), min: None },
            },
        }
    }
}

// ---

/// Classify one value against one variable's bands.
///
/// Breaches are strict: a value sitting exactly on a bound is still normal.
/// An absent value yields an invalid verdict without touching the bands.
pub fn evaluate(value: Option<f64>, threshold: &VariableThreshold) -> VariableVerdict {
    // ---
    let Some(v) = value else {
        return VariableVerdict::invalid();
    };

    if let Some(max) = threshold.critical.max {
        if v > max {
            return VariableVerdict::breach(VariableStatus::Critical, LimitKind::Max, max, v);
        }
    }
    if let Some(min) = threshold.critical.min {
        if v < min {
            return VariableVerdict::breach(VariableStatus::Critical, LimitKind::Min, min, v);
        }
    }
    if let Some(max) = threshold.alert.max {
        if v > max {
            return VariableVerdict::breach(VariableStatus::Alert, LimitKind::Max, max, v);
        }
    }
    if let Some(min) = threshold.alert.min {
        if v < min {
            return VariableVerdict::breach(VariableStatus::Alert, LimitKind::Min, min, v);
        }
    }

    VariableVerdict::normal(v)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn temperature() -> VariableThreshold {
        ThresholdConfig::default().temperature
    }

    #[test]
    fn test_value_inside_bands_is_normal() {
        // ---
        let verdict = evaluate(Some(22.0), &temperature());

        assert_eq!(verdict.status, VariableStatus::Normal);
        assert_eq!(verdict.limit_type, None);
        assert_eq!(verdict.value, Some(22.0));
    }

    #[test]
    fn test_boundary_value_is_not_a_breach() {
        // ---
        // Sitting exactly on the alert max is still normal
        let on_bound = evaluate(Some(30.0), &temperature());
        assert_eq!(on_bound.status, VariableStatus::Normal);

        // One ulp above the bound tips into alert
        let above = f64::from_bits(30.0_f64.to_bits() + 1);
        let tipped = evaluate(Some(above), &temperature());
        assert_eq!(tipped.status, VariableStatus::Alert);
        assert_eq!(tipped.limit_type, Some(LimitKind::Max));
    }

    #[test]
    fn test_alert_band_breaches() {
        // ---
        let high = evaluate(Some(32.0), &temperature());
        assert_eq!(high.status, VariableStatus::Alert);
        assert_eq!(high.limit_type, Some(LimitKind::Max));
        assert_eq!(high.threshold_value, Some(30.0));

        let low = evaluate(Some(12.0), &temperature());
        assert_eq!(low.status, VariableStatus::Alert);
        assert_eq!(low.limit_type, Some(LimitKind::Min));
        assert_eq!(low.threshold_value, Some(15.0));
    }

    #[test]
    fn test_critical_outranks_alert() {
        // ---
        // 40 breaches both the alert max (30) and the critical max (35)
        let verdict = evaluate(Some(40.0), &temperature());

        assert_eq!(verdict.status, VariableStatus::Critical);
        assert_eq!(verdict.limit_type, Some(LimitKind::Max));
        assert_eq!(verdict.threshold_value, Some(35.0));
    }

    #[test]
    fn test_max_checked_before_min() {
        // ---
        // Inverted band: a value above max and below min at the same time.
        // The max bound is reported.
        let inverted = VariableThreshold {
            alert: LimitRange { max: Some(10.0), min: Some(20.0) },
            critical: LimitRange { max: None, min: None },
        };

        let verdict = evaluate(Some(15.0), &inverted);
        assert_eq!(verdict.status, VariableStatus::Alert);
        assert_eq!(verdict.limit_type, Some(LimitKind::Max));
    }

    #[test]
    fn test_missing_bound_is_never_breached() {
        // ---
        // Dew point has no min bounds; arbitrarily low stays normal
        let verdict = evaluate(Some(-40.0), &ThresholdConfig::default().dew_point);
        assert_eq!(verdict.status, VariableStatus::Normal);

        // A fully unbounded variable accepts anything
        let unbounded = VariableThreshold::default();
        assert_eq!(evaluate(Some(1e9), &unbounded).status, VariableStatus::Normal);
    }

    #[test]
    fn test_absent_value_is_invalid() {
        // ---
        let verdict = evaluate(None, &temperature());

        assert_eq!(verdict.status, VariableStatus::Invalid);
        assert_eq!(verdict.value, None);
        assert_eq!(verdict.threshold_value, None);
    }

    #[test]
    fn test_config_file_overrides_parse() {
        // ---
        let json = r#"{
            "temperature": {
                "alert": { "max": 28.0, "min": 16.0 },
                "critical": { "max": 33.0, "min": 12.0 }
            }
        }"#;

        let config: ThresholdConfig = serde_json::from_str(json).unwrap();

        // Overridden variable uses the file's bounds
        assert_eq!(config.temperature.alert.max, Some(28.0));
        assert_eq!(config.temperature.critical.min, Some(12.0));
        // Untouched variables keep the stock defaults
        assert_eq!(config.humidity.critical.max, Some(80.0));
        assert_eq!(config.dew_point.alert.max, Some(22.0));
    }
}
