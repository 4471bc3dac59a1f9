//! Storage contract the engine writes through. The engine never reaches for a
//! concrete database; an implementation is injected at construction.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    ActivityRecord, AnalysisPeriod, MeasurementResult, MeasurementSession, MotionMeasurement,
    ProgressData,
};

#[async_trait]
pub trait MeasurementStore: Send + Sync {
    async fn insert_session(&self, session: &MeasurementSession) -> Result<()>;

    /// Persist the terminal state of a session together with its phase results.
    async fn finish_session(
        &self,
        session: &MeasurementSession,
        results: &[MeasurementResult],
    ) -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Option<MeasurementSession>>;

    async fn get_results_for_session(&self, session_id: &str) -> Result<Vec<MeasurementResult>>;

    /// Insert or replace the user's measurement for `measurement.measurement_date`.
    /// Returns the stored record, which keeps the id of the first write that day.
    async fn upsert_motion_measurement(
        &self,
        measurement: &MotionMeasurement,
    ) -> Result<MotionMeasurement>;

    /// Measurements taken at or after `since`, oldest first.
    async fn list_motion_measurements(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MotionMeasurement>>;

    async fn insert_activity_record(&self, record: &ActivityRecord) -> Result<()>;

    /// Activity records dated on or after `since`, oldest first.
    async fn list_activity_records(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<ActivityRecord>>;

    /// Insert or supersede the rollup for `(user, period, calculated_on)`.
    async fn upsert_progress(&self, progress: &ProgressData) -> Result<ProgressData>;

    /// Most recent rollup for the period calculated on or before `as_of`.
    async fn latest_progress_as_of(
        &self,
        user_id: &str,
        period: AnalysisPeriod,
        as_of: NaiveDate,
    ) -> Result<Option<ProgressData>>;
}
