//! SQLite persistence for sessions, daily measurements, activity logs and
//! progress rollups.

pub mod connection;
pub mod helpers;
mod migrations;
pub mod repositories;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub use connection::Database;

use crate::models::{
    ActivityRecord, AnalysisPeriod, MeasurementResult, MeasurementSession, MotionMeasurement,
    ProgressData,
};
use crate::store::MeasurementStore;

#[async_trait]
impl MeasurementStore for Database {
    async fn insert_session(&self, session: &MeasurementSession) -> Result<()> {
        Database::insert_session(self, session).await
    }

    async fn finish_session(
        &self,
        session: &MeasurementSession,
        results: &[MeasurementResult],
    ) -> Result<()> {
        Database::finish_session(self, session, results).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<MeasurementSession>> {
        Database::get_session(self, session_id).await
    }

    async fn get_results_for_session(&self, session_id: &str) -> Result<Vec<MeasurementResult>> {
        Database::get_results_for_session(self, session_id).await
    }

    async fn upsert_motion_measurement(
        &self,
        measurement: &MotionMeasurement,
    ) -> Result<MotionMeasurement> {
        Database::upsert_motion_measurement(self, measurement).await
    }

    async fn list_motion_measurements(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MotionMeasurement>> {
        Database::list_motion_measurements(self, user_id, since).await
    }

    async fn insert_activity_record(&self, record: &ActivityRecord) -> Result<()> {
        Database::insert_activity_record(self, record).await
    }

    async fn list_activity_records(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<ActivityRecord>> {
        Database::list_activity_records(self, user_id, since).await
    }

    async fn upsert_progress(&self, progress: &ProgressData) -> Result<ProgressData> {
        Database::upsert_progress(self, progress).await
    }

    async fn latest_progress_as_of(
        &self,
        user_id: &str,
        period: AnalysisPeriod,
        as_of: NaiveDate,
    ) -> Result<Option<ProgressData>> {
        Database::latest_progress_as_of(self, user_id, period, as_of).await
    }
}
