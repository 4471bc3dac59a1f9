use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::capture::PhaseId;
use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_status, to_u32},
};
use crate::models::{MeasurementResult, MeasurementSession};

fn row_to_session(row: &Row) -> Result<MeasurementSession> {
    let hand: String = row.get("hand")?;
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let status: String = row.get("status")?;
    let total_phases: i64 = row.get("total_phases")?;
    let completed_phases: i64 = row.get("completed_phases")?;

    Ok(MeasurementSession {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        hand: hand.parse()?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        status: parse_status(&status)?,
        total_phases: to_u32(total_phases, "total_phases")?,
        completed_phases: to_u32(completed_phases, "completed_phases")?,
    })
}

fn row_to_result(row: &Row) -> Result<MeasurementResult> {
    let phase_id: String = row.get("phase_id")?;
    let recorded_at: String = row.get("recorded_at")?;

    Ok(MeasurementResult {
        phase_id: phase_id.parse::<PhaseId>()?,
        angle_value: row.get("angle_value")?,
        target_angle: row.get("target_angle")?,
        achievement: row.get("achievement")?,
        accuracy: row.get("accuracy")?,
        timestamp: parse_datetime(&recorded_at, "recorded_at")?,
        is_completed: row.get("is_completed")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &MeasurementSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO measurement_sessions (id, user_id, hand, started_at, ended_at, status, total_phases, completed_phases, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    record.id,
                    record.user_id,
                    record.hand.as_str(),
                    record.started_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    record.total_phases,
                    record.completed_phases,
                    now,
                ],
            )
            .context("failed to insert measurement session")?;
            Ok(())
        })
        .await
    }

    /// Writes the terminal session row and its phase results in one transaction.
    pub async fn finish_session(
        &self,
        session: &MeasurementSession,
        results: &[MeasurementResult],
    ) -> Result<()> {
        let record = session.clone();
        let results = results.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let rows_affected = tx.execute(
                "UPDATE measurement_sessions
                 SET status = ?1,
                     ended_at = ?2,
                     completed_phases = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    record.status.as_str(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.completed_phases,
                    Utc::now().to_rfc3339(),
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow::anyhow!("Session {} not found", record.id));
            }

            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO measurement_results (session_id, phase_id, angle_value, target_angle, achievement, accuracy, recorded_at, is_completed)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for result in &results {
                    stmt.execute(params![
                        record.id,
                        result.phase_id.as_str(),
                        result.angle_value,
                        result.target_angle,
                        result.achievement,
                        result.accuracy,
                        result.timestamp.to_rfc3339(),
                        result.is_completed,
                    ])?;
                }
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<MeasurementSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, hand, started_at, ended_at, status, total_phases, completed_phases
                 FROM measurement_sessions
                 WHERE id = ?1",
            )?;

            let session = stmt
                .query_row(params![session_id], |row| Ok(row_to_session(row)))
                .optional()?
                .transpose()?;

            Ok(session)
        })
        .await
    }

    pub async fn get_results_for_session(&self, session_id: &str) -> Result<Vec<MeasurementResult>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT phase_id, angle_value, target_angle, achievement, accuracy, recorded_at, is_completed
                 FROM measurement_results
                 WHERE session_id = ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_result(row)?);
            }

            Ok(results)
        })
        .await
    }

    /// Sessions still marked active, e.g. left behind by a crash.
    pub async fn list_active_sessions(&self, user_id: &str) -> Result<Vec<MeasurementSession>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, hand, started_at, ended_at, status, total_phases, completed_phases
                 FROM measurement_sessions
                 WHERE user_id = ?1 AND status = 'Active'
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }
}
