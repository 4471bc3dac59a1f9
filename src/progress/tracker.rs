use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use crate::comparison::NormalRangeTable;
use crate::models::{ActivityRecord, AnalysisPeriod, ProgressData};
use crate::store::MeasurementStore;

use super::{Aggregator, ProgressConfig};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Loads history from the store, recomputes the rollup and stores it.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn MeasurementStore>,
    aggregator: Aggregator,
}

impl ProgressTracker {
    pub fn new(
        store: Arc<dyn MeasurementStore>,
        ranges: NormalRangeTable,
        config: ProgressConfig,
    ) -> Self {
        Self {
            store,
            aggregator: Aggregator::new(ranges, config),
        }
    }

    pub async fn log_activity(&self, record: &ActivityRecord) -> Result<()> {
        self.store
            .insert_activity_record(record)
            .await
            .with_context(|| format!("failed to log activity for {}", record.user_id))
    }

    /// Rebuild and store the rollup for the period ending at `now`.
    ///
    /// `improvement_rate` compares against the rollup stored one full period
    /// earlier, on or before `now - period`.
    pub async fn recalculate(
        &self,
        user_id: &str,
        period: AnalysisPeriod,
        now: DateTime<Utc>,
    ) -> Result<ProgressData> {
        let since = now - Duration::days(period.days());

        let measurements = self
            .store
            .list_motion_measurements(user_id, since)
            .await
            .context("failed to load measurements")?;
        let activities = self
            .store
            .list_activity_records(user_id, since.date_naive())
            .await
            .context("failed to load activity records")?;
        let previous = self
            .store
            .latest_progress_as_of(user_id, period, since.date_naive())
            .await
            .context("failed to load previous progress")?;

        let progress = self.aggregator.aggregate(
            user_id,
            &measurements,
            &activities,
            period,
            now,
            previous.as_ref(),
        );

        let stored = self
            .store
            .upsert_progress(&progress)
            .await
            .context("failed to store progress")?;

        log_info!(
            "Progress for {} ({}): {} measurements, trend {:?}, recovery {:.1}%, quality {:.2}",
            user_id,
            period,
            measurements.len(),
            stored.overall_trend,
            stored.recovery_rate,
            stored.data_quality.score
        );

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Trend;
    use crate::progress::fixtures::{activity, day, measurement};

    fn tracker(db: &Database) -> ProgressTracker {
        ProgressTracker::new(
            Arc::new(db.clone()),
            NormalRangeTable::default(),
            ProgressConfig::default(),
        )
    }

    #[tokio::test]
    async fn recalculation_reads_history_and_stores_result() {
        let db = Database::in_memory().unwrap();
        db.upsert_motion_measurement(&measurement(0, Some(40.0), None))
            .await
            .unwrap();
        db.upsert_motion_measurement(&measurement(1, Some(55.0), None))
            .await
            .unwrap();
        let tracker = tracker(&db);
        tracker.log_activity(&activity(1, true, 20)).await.unwrap();

        let progress = tracker
            .recalculate("user-1", AnalysisPeriod::Month, day(2))
            .await
            .unwrap();
        assert_eq!(progress.overall_trend, Trend::Improving);
        assert_eq!(progress.monthly_stats.exercise_days, 1);
        assert_eq!(progress.improvement_rate, 0.0);

        let again = tracker
            .recalculate("user-1", AnalysisPeriod::Month, day(2) + Duration::hours(3))
            .await
            .unwrap();
        assert_eq!(again.id, progress.id);
    }

    #[tokio::test]
    async fn recent_rollups_are_not_the_baseline() {
        let db = Database::in_memory().unwrap();
        let tracker = tracker(&db);
        db.upsert_motion_measurement(&measurement(0, Some(40.0), None))
            .await
            .unwrap();
        let first = tracker
            .recalculate("user-1", AnalysisPeriod::Month, day(1))
            .await
            .unwrap();
        assert_eq!(first.average_angle, 40.0);

        db.upsert_motion_measurement(&measurement(2, Some(60.0), None))
            .await
            .unwrap();
        let second = tracker
            .recalculate("user-1", AnalysisPeriod::Month, day(3))
            .await
            .unwrap();
        assert_eq!(second.average_angle, 50.0);
        assert_eq!(second.improvement_rate, 0.0);
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn improvement_is_measured_against_the_preceding_period() {
        let db = Database::in_memory().unwrap();
        let mut month_ago = ProgressData::empty("user-1", AnalysisPeriod::Month, day(0));
        month_ago.average_angle = 30.0;
        db.upsert_progress(&month_ago).await.unwrap();
        let mut yesterday = ProgressData::empty("user-1", AnalysisPeriod::Month, day(29));
        yesterday.average_angle = 59.0;
        db.upsert_progress(&yesterday).await.unwrap();
        db.upsert_motion_measurement(&measurement(30, Some(60.0), None))
            .await
            .unwrap();

        let progress = tracker(&db)
            .recalculate("user-1", AnalysisPeriod::Month, day(30))
            .await
            .unwrap();
        assert_eq!(progress.average_angle, 60.0);
        assert_eq!(progress.improvement_rate, 100.0);
    }

    #[tokio::test]
    async fn no_history_yields_stable_rollup() {
        let db = Database::in_memory().unwrap();
        let progress = tracker(&db)
            .recalculate("nobody", AnalysisPeriod::Week, day(5))
            .await
            .unwrap();
        assert_eq!(progress.overall_trend, Trend::Stable);
        assert_eq!(progress.overall_improvement, 0.0);
    }
}
