use chrono::{DateTime, Duration, Utc};

use crate::angles::geometry::round_tenth;
use crate::comparison::NormalRangeTable;
use crate::models::{ActivityRecord, AnalysisPeriod, MotionMeasurement, ProgressData};

use super::config::ProgressConfig;
use super::stats::{data_quality, period_stats, predicted_recovery, recovery_rate};
use super::trend::{field_trends, overall_improvement, overall_trend};

const WEEK_DAYS: i64 = 7;
const MONTH_DAYS: i64 = 30;

/// Scoring inputs shared by every rollup: the normal table recovery is measured
/// against and the trend and quality thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    pub ranges: NormalRangeTable,
    pub config: ProgressConfig,
}

impl Aggregator {
    pub fn new(ranges: NormalRangeTable, config: ProgressConfig) -> Self {
        Self { ranges, config }
    }

    /// Recompute the full rollup for one user and period from raw history.
    ///
    /// Inputs may be unordered and may extend past the window; only records inside
    /// `[now - period, now]` count. `previous` is the rollup of the preceding
    /// period and only feeds `improvement_rate`.
    pub fn aggregate(
        &self,
        user_id: &str,
        measurements: &[MotionMeasurement],
        activities: &[ActivityRecord],
        period: AnalysisPeriod,
        now: DateTime<Utc>,
        previous: Option<&ProgressData>,
    ) -> ProgressData {
        let config = &self.config;
        let ranges = &self.ranges;
        let window_start = now - Duration::days(period.days());

        let mut in_window: Vec<MotionMeasurement> = measurements
            .iter()
            .filter(|m| m.user_id == user_id && m.measured_at >= window_start && m.measured_at <= now)
            .cloned()
            .collect();
        in_window.sort_by_key(|m| m.measured_at);

        let first_day = window_start.date_naive();
        let today = now.date_naive();
        let logged: Vec<ActivityRecord> = activities
            .iter()
            .filter(|a| a.user_id == user_id && a.activity_date >= first_day && a.activity_date <= today)
            .cloned()
            .collect();

        let mut progress = ProgressData::empty(user_id, period, now);
        progress.data_quality = data_quality(in_window.len(), logged.len(), period, config);

        let stats_since = |days: i64| (now - Duration::days(days)).max(window_start);
        progress.weekly_stats = period_stats(&in_window, &logged, stats_since(WEEK_DAYS), now);
        progress.monthly_stats = period_stats(&in_window, &logged, stats_since(MONTH_DAYS), now);

        if in_window.is_empty() {
            return progress;
        }

        let trends = field_trends(&in_window, config.trend_threshold_degrees);
        progress.overall_trend = overall_trend(&trends);
        progress.overall_improvement = overall_improvement(&trends);
        progress.field_trends = trends;

        let averages: Vec<f64> = in_window.iter().filter_map(|m| m.average_angle()).collect();
        if !averages.is_empty() {
            progress.average_angle = round_tenth(averages.iter().sum::<f64>() / averages.len() as f64);
        }

        progress.improvement_rate = match previous {
            Some(prev) if prev.average_angle != 0.0 => round_tenth(
                (progress.average_angle - prev.average_angle) / prev.average_angle * 100.0,
            ),
            _ => 0.0,
        };

        progress.recovery_rate = recovery_rate(&in_window, ranges);
        progress.predicted_recovery = predicted_recovery(&in_window, ranges, today);

        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::MeasurementField;
    use crate::models::{DataQualityLevel, Trend};
    use crate::progress::fixtures::{activity, day, measurement, series};

    fn run(
        measurements: &[MotionMeasurement],
        activities: &[ActivityRecord],
        period: AnalysisPeriod,
        now: DateTime<Utc>,
        previous: Option<&ProgressData>,
    ) -> ProgressData {
        Aggregator::new(NormalRangeTable::default(), ProgressConfig::default()).aggregate(
            "user-1",
            measurements,
            activities,
            period,
            now,
            previous,
        )
    }

    #[test]
    fn empty_history_is_well_formed() {
        let progress = run(&[], &[], AnalysisPeriod::Month, day(10), None);
        assert_eq!(progress.overall_trend, Trend::Stable);
        assert_eq!(progress.overall_improvement, 0.0);
        assert_eq!(progress.improvement_rate, 0.0);
        assert_eq!(progress.average_angle, 0.0);
        assert_eq!(progress.field_trends.len(), MeasurementField::ALL.len());
        assert_eq!(progress.data_quality.level, DataQualityLevel::Insufficient);
    }

    #[test]
    fn rising_flexion_improves_overall() {
        let measurements = series(&[(Some(40.0), None), (Some(55.0), None)]);
        let progress = run(&measurements, &[], AnalysisPeriod::Month, day(2), None);

        let flexion = progress.trend_for(MeasurementField::WristFlexion).unwrap();
        assert_eq!(flexion.trend, Trend::Improving);
        assert_eq!(flexion.change_percentage, 37.5);
        assert_eq!(progress.overall_trend, Trend::Improving);
        assert_eq!(progress.overall_improvement, 37.5);
        assert_eq!(progress.average_angle, 47.5);
    }

    #[test]
    fn records_outside_the_window_are_ignored() {
        let measurements = vec![
            measurement(0, Some(80.0), None),
            measurement(20, Some(40.0), None),
            measurement(21, Some(42.0), None),
        ];
        let progress = run(&measurements, &[activity(1, true, 10)], AnalysisPeriod::Week, day(22), None);

        let flexion = progress.trend_for(MeasurementField::WristFlexion).unwrap();
        assert_eq!(flexion.previous, Some(40.0));
        assert_eq!(progress.weekly_stats.measurement_count, 2);
        assert_eq!(progress.monthly_stats.measurement_count, 2);
        assert_eq!(progress.weekly_stats.activity_count, 0);
    }

    #[test]
    fn unordered_input_is_sorted() {
        let measurements = vec![
            measurement(3, Some(55.0), None),
            measurement(1, Some(40.0), None),
        ];
        let progress = run(&measurements, &[], AnalysisPeriod::Month, day(4), None);
        let flexion = progress.trend_for(MeasurementField::WristFlexion).unwrap();
        assert_eq!(flexion.latest, Some(55.0));
        assert_eq!(flexion.previous, Some(40.0));
    }

    #[test]
    fn improvement_rate_compares_previous_average() {
        let mut previous = ProgressData::empty("user-1", AnalysisPeriod::Month, day(1));
        previous.average_angle = 40.0;

        let measurements = series(&[(Some(40.0), None), (Some(60.0), None)]);
        let progress = run(&measurements, &[], AnalysisPeriod::Month, day(2), Some(&previous));
        assert_eq!(progress.average_angle, 50.0);
        assert_eq!(progress.improvement_rate, 25.0);
    }

    #[test]
    fn other_users_are_excluded() {
        let mut foreign = measurement(1, Some(10.0), None);
        foreign.user_id = "user-2".into();
        let progress = run(&[foreign], &[], AnalysisPeriod::Month, day(2), None);
        assert_eq!(progress.weekly_stats.measurement_count, 0);
        assert_eq!(progress.average_angle, 0.0);
    }
}
