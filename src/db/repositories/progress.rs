use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, helpers::format_date};
use crate::models::{AnalysisPeriod, ProgressData};

// The rollup is stored as one JSON payload keyed by (user, period, day).
fn decode(payload: String) -> Result<ProgressData> {
    serde_json::from_str(&payload).context("failed to decode progress payload")
}

impl Database {
    pub async fn upsert_progress(&self, progress: &ProgressData) -> Result<ProgressData> {
        let incoming = progress.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let day = format_date(incoming.calculated_on);

            let existing: Option<String> = tx
                .query_row(
                    "SELECT payload FROM progress_data
                     WHERE user_id = ?1 AND analysis_period = ?2 AND calculated_on = ?3",
                    params![incoming.user_id, incoming.analysis_period.as_str(), day],
                    |row| row.get(0),
                )
                .optional()?;

            let stored = match existing {
                Some(payload) => decode(payload)?.superseded_by(&incoming),
                None => incoming,
            };
            let payload =
                serde_json::to_string(&stored).context("failed to encode progress payload")?;

            tx.execute(
                "INSERT INTO progress_data (id, user_id, analysis_period, calculated_on, payload, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id, analysis_period, calculated_on) DO UPDATE SET
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                params![
                    stored.id,
                    stored.user_id,
                    stored.analysis_period.as_str(),
                    day,
                    payload,
                    stored.created_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("failed to upsert progress data")?;

            tx.commit()?;
            Ok(stored)
        })
        .await
    }

    pub async fn latest_progress_as_of(
        &self,
        user_id: &str,
        period: AnalysisPeriod,
        as_of: NaiveDate,
    ) -> Result<Option<ProgressData>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM progress_data
                     WHERE user_id = ?1 AND analysis_period = ?2 AND calculated_on <= ?3
                     ORDER BY calculated_on DESC
                     LIMIT 1",
                    params![user_id, period.as_str(), format_date(as_of)],
                    |row| row.get(0),
                )
                .optional()?;

            payload.map(decode).transpose()
        })
        .await
    }
}
