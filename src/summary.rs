//! Dashboard summary aggregation.

use crate::models::{
    AnalysisResult, DashboardSummary, LimitKind, NotificationMessage, OverallStatus,
    VariableStatus, VariableVerdict,
};

// ---

/// Roll a job's results and emitted notifications up into the dashboard
/// summary. Single pass; breach counters only tick for alert/critical
/// verdicts that name a bound.
pub fn build_summary(
    results: &[AnalysisResult],
    notifications: Vec<NotificationMessage>,
) -> DashboardSummary {
    // ---
    let mut summary = DashboardSummary {
        total_analyzed: results.len(),
        notifications,
        ..Default::default()
    };

    for result in results {
        match result.anomaly.status {
            OverallStatus::Invalid => summary.total_invalid += 1,
            OverallStatus::Anomaly => summary.total_anomaly += 1,
            OverallStatus::Normal => summary.total_normal += 1,
        }

        match breach(&result.temperature) {
            Some((VariableStatus::Alert, LimitKind::Max)) => summary.temp_alert_max_count += 1,
            Some((VariableStatus::Critical, LimitKind::Max)) => {
                summary.temp_critical_max_count += 1
            }
            Some((VariableStatus::Alert, LimitKind::Min)) => summary.temp_alert_min_count += 1,
            Some((VariableStatus::Critical, LimitKind::Min)) => {
                summary.temp_critical_min_count += 1
            }
            _ => {}
        }

        match breach(&result.humidity) {
            Some((VariableStatus::Alert, LimitKind::Max)) => summary.humidity_alert_max_count += 1,
            Some((VariableStatus::Critical, LimitKind::Max)) => {
                summary.humidity_critical_max_count += 1
            }
            Some((VariableStatus::Alert, LimitKind::Min)) => summary.humidity_alert_min_count += 1,
            Some((VariableStatus::Critical, LimitKind::Min)) => {
                summary.humidity_critical_min_count += 1
            }
            _ => {}
        }

        // Dew point has no configured min bounds, hence no min counters
        match breach(&result.dew_point) {
            Some((VariableStatus::Alert, LimitKind::Max)) => summary.dew_point_alert_max_count += 1,
            Some((VariableStatus::Critical, LimitKind::Max)) => {
                summary.dew_point_critical_max_count += 1
            }
            _ => {}
        }

        *summary.by_type.entry(result.reading_type.clone()).or_insert(0) += 1;
    }

    summary
}

fn breach(verdict: &VariableVerdict) -> Option<(VariableStatus, LimitKind)> {
    verdict.limit_type.map(|limit| (verdict.status, limit))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::analyzer::SampleAnalyzer;
    use crate::models::{NotificationReason, SensorReading};
    use crate::thresholds::ThresholdConfig;
    use chrono::{TimeZone, Utc};

    fn analyze(readings: &[SensorReading]) -> Vec<AnalysisResult> {
        // ---
        let mut analyzer = SampleAnalyzer::new(ThresholdConfig::default());
        analyzer.fit(readings);
        readings.iter().map(|r| analyzer.analyze(r)).collect()
    }

    fn reading(tag: &str, t: Option<f64>, h: Option<f64>, d: Option<f64>) -> SensorReading {
        // ---
        SensorReading {
            sensor_id: "sensor-001".to_string(),
            reading_type: tag.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            temperature: t,
            humidity: h,
            dew_point: d,
        }
    }

    #[test]
    fn test_overall_counters_partition_the_batch() {
        // ---
        let readings = vec![
            reading("indoor", Some(22.0), Some(55.0), Some(18.0)),
            reading("indoor", Some(23.0), Some(56.0), Some(18.5)),
            reading("indoor", None, None, None),
        ];

        let summary = build_summary(&analyze(&readings), Vec::new());

        assert_eq!(summary.total_analyzed, 3);
        assert_eq!(summary.total_invalid, 1);
        assert_eq!(
            summary.total_normal + summary.total_anomaly + summary.total_invalid,
            summary.total_analyzed
        );
    }

    #[test]
    fn test_breach_counters_tick_per_bound() {
        // ---
        let readings = vec![
            // Alert max on temperature (30 < 32 < 35)
            reading("indoor", Some(32.0), Some(55.0), Some(18.0)),
            // Critical min on humidity (25 < 30)
            reading("indoor", Some(22.0), Some(25.0), Some(18.0)),
            // Critical max on dew point (26 > 25)
            reading("indoor", Some(22.0), Some(55.0), Some(26.0)),
        ];

        // Thresholds only; skip the fit so distribution effects stay out
        let analyzer = SampleAnalyzer::new(ThresholdConfig::default());
        let results: Vec<_> = readings.iter().map(|r| analyzer.analyze(r)).collect();
        let summary = build_summary(&results, Vec::new());

        assert_eq!(summary.temp_alert_max_count, 1);
        assert_eq!(summary.temp_critical_max_count, 0);
        assert_eq!(summary.humidity_critical_min_count, 1);
        assert_eq!(summary.humidity_alert_min_count, 0);
        assert_eq!(summary.dew_point_critical_max_count, 1);
        assert_eq!(summary.dew_point_alert_max_count, 0);
    }

    #[test]
    fn test_by_type_counts_sum_to_total() {
        // ---
        let readings = vec![
            reading("indoor", Some(22.0), Some(55.0), Some(18.0)),
            reading("indoor", Some(23.0), Some(56.0), Some(18.5)),
            reading("outdoor", Some(24.0), Some(57.0), Some(19.0)),
            reading("", None, None, None),
        ];

        let summary = build_summary(&analyze(&readings), Vec::new());

        assert_eq!(summary.by_type.get("indoor"), Some(&2));
        assert_eq!(summary.by_type.get("outdoor"), Some(&1));
        // The untagged reading still lands in a bucket
        assert_eq!(summary.by_type.get(""), Some(&1));
        assert_eq!(summary.by_type.values().sum::<usize>(), summary.total_analyzed);
    }

    #[test]
    fn test_notifications_pass_through_untouched() {
        // ---
        let message = NotificationMessage {
            sensor_id: "sensor-001".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            reason: NotificationReason::Critical,
        };

        let summary = build_summary(&[], vec![message.clone()]);

        assert_eq!(summary.total_analyzed, 0);
        assert_eq!(summary.notifications, vec![message]);
    }

    #[test]
    fn test_invalid_variables_never_tick_breach_counters() {
        // ---
        let readings = vec![reading("indoor", None, None, None)];
        let summary = build_summary(&analyze(&readings), Vec::new());

        assert_eq!(summary.temp_alert_max_count, 0);
        assert_eq!(summary.temp_alert_min_count, 0);
        assert_eq!(summary.humidity_critical_max_count, 0);
        assert_eq!(summary.dew_point_alert_max_count, 0);
    }
}
