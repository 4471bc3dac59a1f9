use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, parse_datetime, to_u32},
};
use crate::models::ActivityRecord;

fn row_to_activity(row: &Row) -> Result<ActivityRecord> {
    let activity_date: String = row.get("activity_date")?;
    let duration_minutes: i64 = row.get("duration_minutes")?;
    let pain_level: Option<i64> = row.get("pain_level")?;
    let created_at: String = row.get("created_at")?;

    Ok(ActivityRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        activity_date: parse_date(&activity_date, "activity_date")?,
        exercise_completed: row.get("exercise_completed")?,
        duration_minutes: to_u32(duration_minutes, "duration_minutes")?,
        pain_level: pain_level
            .map(|level| u8::try_from(level).context("pain_level out of range"))
            .transpose()?,
        notes: row.get("notes")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_activity_record(&self, record: &ActivityRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO activity_records (id, user_id, activity_date, exercise_completed, duration_minutes, pain_level, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.user_id,
                    format_date(record.activity_date),
                    record.exercise_completed,
                    record.duration_minutes,
                    record.pain_level,
                    record.notes,
                    record.created_at.to_rfc3339(),
                ],
            )
            .context("failed to insert activity record")?;
            Ok(())
        })
        .await
    }

    pub async fn list_activity_records(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<ActivityRecord>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, activity_date, exercise_completed, duration_minutes, pain_level, notes, created_at
                 FROM activity_records
                 WHERE user_id = ?1 AND activity_date >= ?2
                 ORDER BY activity_date ASC, created_at ASC",
            )?;

            let mut rows = stmt.query(params![user_id, format_date(since)])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_activity(row)?);
            }

            Ok(records)
        })
        .await
    }
}
