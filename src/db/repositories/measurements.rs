use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, parse_datetime},
};
use crate::models::MotionMeasurement;

const MEASUREMENT_COLUMNS: &str = "id, user_id, session_id, measurement_date, measured_at, hand_used,
    wrist_flexion, wrist_extension, wrist_ulnar_deviation, wrist_radial_deviation,
    thumb_flexion, thumb_extension, thumb_adduction, thumb_abduction,
    accuracy_score, comparison_result, created_at, updated_at";

fn row_to_measurement(row: &Row) -> Result<MotionMeasurement> {
    let measurement_date: String = row.get("measurement_date")?;
    let measured_at: String = row.get("measured_at")?;
    let hand_used: String = row.get("hand_used")?;
    let comparison_result: String = row.get("comparison_result")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(MotionMeasurement {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        session_id: row.get("session_id")?,
        measurement_date: parse_date(&measurement_date, "measurement_date")?,
        measured_at: parse_datetime(&measured_at, "measured_at")?,
        hand_used: hand_used.parse()?,
        wrist_flexion: row.get("wrist_flexion")?,
        wrist_extension: row.get("wrist_extension")?,
        wrist_ulnar_deviation: row.get("wrist_ulnar_deviation")?,
        wrist_radial_deviation: row.get("wrist_radial_deviation")?,
        thumb_flexion: row.get("thumb_flexion")?,
        thumb_extension: row.get("thumb_extension")?,
        thumb_adduction: row.get("thumb_adduction")?,
        thumb_abduction: row.get("thumb_abduction")?,
        accuracy_score: row.get("accuracy_score")?,
        comparison_result: serde_json::from_str(&comparison_result)
            .context("failed to decode comparison_result")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn find_for_day(
    conn: &Connection,
    user_id: &str,
    measurement_date: &str,
) -> Result<Option<MotionMeasurement>> {
    let sql = format!(
        "SELECT {MEASUREMENT_COLUMNS} FROM motion_measurements
         WHERE user_id = ?1 AND measurement_date = ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row(params![user_id, measurement_date], |row| {
        Ok(row_to_measurement(row))
    })
    .optional()?
    .transpose()
}

impl Database {
    /// One row per user and calendar day. A later write supersedes the earlier
    /// one in place, so the row keeps the first id and creation time.
    pub async fn upsert_motion_measurement(
        &self,
        measurement: &MotionMeasurement,
    ) -> Result<MotionMeasurement> {
        let incoming = measurement.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let day = format_date(incoming.measurement_date);

            let stored = match find_for_day(&tx, &incoming.user_id, &day)? {
                Some(existing) => existing.superseded_by(&incoming),
                None => incoming,
            };
            let comparison = serde_json::to_string(&stored.comparison_result)
                .context("failed to encode comparison_result")?;

            tx.execute(
                "INSERT INTO motion_measurements (id, user_id, session_id, measurement_date, measured_at, hand_used,
                     wrist_flexion, wrist_extension, wrist_ulnar_deviation, wrist_radial_deviation,
                     thumb_flexion, thumb_extension, thumb_adduction, thumb_abduction,
                     accuracy_score, comparison_result, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                 ON CONFLICT(user_id, measurement_date) DO UPDATE SET
                     session_id = excluded.session_id,
                     measured_at = excluded.measured_at,
                     hand_used = excluded.hand_used,
                     wrist_flexion = excluded.wrist_flexion,
                     wrist_extension = excluded.wrist_extension,
                     wrist_ulnar_deviation = excluded.wrist_ulnar_deviation,
                     wrist_radial_deviation = excluded.wrist_radial_deviation,
                     thumb_flexion = excluded.thumb_flexion,
                     thumb_extension = excluded.thumb_extension,
                     thumb_adduction = excluded.thumb_adduction,
                     thumb_abduction = excluded.thumb_abduction,
                     accuracy_score = excluded.accuracy_score,
                     comparison_result = excluded.comparison_result,
                     updated_at = excluded.updated_at",
                params![
                    stored.id,
                    stored.user_id,
                    stored.session_id,
                    day,
                    stored.measured_at.to_rfc3339(),
                    stored.hand_used.as_str(),
                    stored.wrist_flexion,
                    stored.wrist_extension,
                    stored.wrist_ulnar_deviation,
                    stored.wrist_radial_deviation,
                    stored.thumb_flexion,
                    stored.thumb_extension,
                    stored.thumb_adduction,
                    stored.thumb_abduction,
                    stored.accuracy_score,
                    comparison,
                    stored.created_at.to_rfc3339(),
                    stored.updated_at.to_rfc3339(),
                ],
            )
            .context("failed to upsert motion measurement")?;

            tx.commit()?;
            Ok(stored)
        })
        .await
    }

    pub async fn list_motion_measurements(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MotionMeasurement>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {MEASUREMENT_COLUMNS} FROM motion_measurements
                 WHERE user_id = ?1 AND measured_at >= ?2
                 ORDER BY measured_at ASC"
            );
            let mut stmt = conn.prepare(&sql)?;

            let mut rows = stmt.query(params![user_id, since.to_rfc3339()])?;
            let mut measurements = Vec::new();
            while let Some(row) = rows.next()? {
                measurements.push(row_to_measurement(row)?);
            }

            Ok(measurements)
        })
        .await
    }
}
