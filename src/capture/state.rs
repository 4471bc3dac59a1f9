use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::angles::AngleResult;
use crate::comparison::{compare_fields, ComparisonResult, ComparisonStatus, NormalRangeTable};
use crate::error::CaptureError;
use crate::landmarks::Handedness;
use crate::models::{MeasurementResult, MeasurementSession, MotionMeasurement, SessionStatus};

use super::phases::{achievement, PhaseId, PhaseSpec};

/// Latest reading held for a phase that has not been finalized yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReading {
    pub angle: AngleResult,
    pub recorded_at: DateTime<Utc>,
}

/// Thumb angles read alongside the wrist phases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThumbSnapshot {
    pub flexion: f64,
    pub abduction: f64,
    pub accuracy: f64,
}

/// Serializable state of one capture session.
///
/// Every mutation goes through a transition method; a transition that fails
/// leaves the state exactly as it was.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session: MeasurementSession,
    pub phases: Vec<PhaseSpec>,
    /// Index into `phases`; equal to `phases.len()` once every phase is finalized.
    pub current_index: usize,
    pub latest: BTreeMap<PhaseId, PhaseReading>,
    pub results: Vec<MeasurementResult>,
    pub thumb: Option<ThumbSnapshot>,
}

pub fn validate_phases(phases: &[PhaseSpec]) -> Result<(), CaptureError> {
    if phases.is_empty() {
        return Err(CaptureError::InvalidConfig("phase list is empty".into()));
    }

    let mut seen = HashSet::new();
    for spec in phases {
        if !seen.insert(spec.phase) {
            return Err(CaptureError::InvalidConfig(format!(
                "phase {} is listed twice",
                spec.phase
            )));
        }
        if !(spec.target_angle > 0.0) {
            return Err(CaptureError::InvalidConfig(format!(
                "phase {} needs a positive target angle",
                spec.phase
            )));
        }
        if spec.normal_range.min > spec.normal_range.max {
            return Err(CaptureError::InvalidConfig(format!(
                "phase {} has an inverted normal range",
                spec.phase
            )));
        }
    }

    Ok(())
}

impl SessionState {
    pub fn begin(
        session_id: String,
        user_id: String,
        hand: Handedness,
        phases: Vec<PhaseSpec>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, CaptureError> {
        validate_phases(&phases)?;

        Ok(Self {
            session: MeasurementSession {
                id: session_id,
                user_id,
                hand,
                started_at,
                ended_at: None,
                status: SessionStatus::Active,
                total_phases: phases.len() as u32,
                completed_phases: 0,
            },
            phases,
            current_index: 0,
            latest: BTreeMap::new(),
            results: Vec::new(),
            thumb: None,
        })
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn current_phase(&self) -> Option<&PhaseSpec> {
        if self.session.status.is_terminal() {
            return None;
        }
        self.phases.get(self.current_index)
    }

    pub fn current_reading(&self) -> Option<&PhaseReading> {
        self.current_phase()
            .and_then(|spec| self.latest.get(&spec.phase))
    }

    pub fn result_for(&self, phase: PhaseId) -> Option<&MeasurementResult> {
        self.results.iter().find(|result| result.phase_id == phase)
    }

    fn ensure_active(&self) -> Result<(), CaptureError> {
        if self.session.status.is_terminal() {
            return Err(CaptureError::SessionNotActive {
                session_id: self.session.id.clone(),
                status: self.session.status,
            });
        }
        Ok(())
    }

    /// Store the latest reading for the current phase, replacing any earlier one.
    ///
    /// Returns `Ok(false)` when the reading is flagged invalid and was dropped.
    pub fn record_angle(
        &mut self,
        phase: PhaseId,
        angle: AngleResult,
        recorded_at: DateTime<Utc>,
    ) -> Result<bool, CaptureError> {
        self.ensure_active()?;

        let current = self.current_phase().map(|spec| spec.phase);
        if current != Some(phase) {
            return Err(CaptureError::PhaseMismatch {
                requested: phase,
                current,
            });
        }

        if !angle.is_valid {
            return Ok(false);
        }

        self.latest.insert(phase, PhaseReading { angle, recorded_at });
        Ok(true)
    }

    pub fn record_thumb(&mut self, snapshot: ThumbSnapshot) -> Result<(), CaptureError> {
        self.ensure_active()?;
        self.thumb = Some(snapshot);
        Ok(())
    }

    fn finalize(spec: &PhaseSpec, reading: &PhaseReading) -> MeasurementResult {
        MeasurementResult {
            phase_id: spec.phase,
            angle_value: reading.angle.angle,
            target_angle: spec.target_angle,
            achievement: achievement(reading.angle.angle, spec.target_angle),
            accuracy: reading.angle.accuracy,
            timestamp: reading.recorded_at,
            is_completed: true,
        }
    }

    /// Finalize the current phase and move to the next one.
    pub fn advance(&mut self) -> Result<MeasurementResult, CaptureError> {
        self.ensure_active()?;

        let spec = *self
            .current_phase()
            .ok_or(CaptureError::AllPhasesFinalized)?;

        let reading = self
            .latest
            .remove(&spec.phase)
            .ok_or(CaptureError::NoReading(spec.phase))?;

        let result = Self::finalize(&spec, &reading);
        self.results.push(result.clone());
        self.current_index += 1;
        self.session.completed_phases = self.results.len() as u32;

        Ok(result)
    }

    /// Phases with neither a finalized result nor a pending reading.
    pub fn missing_phases(&self) -> Vec<PhaseId> {
        self.phases
            .iter()
            .map(|spec| spec.phase)
            .filter(|phase| self.result_for(*phase).is_none() && !self.latest.contains_key(phase))
            .collect()
    }

    /// Close the session. Refused without any change unless every phase has a reading.
    pub fn complete(&mut self, ended_at: DateTime<Utc>) -> Result<&[MeasurementResult], CaptureError> {
        self.ensure_active()?;

        let missing = self.missing_phases();
        if !missing.is_empty() {
            return Err(CaptureError::IncompleteSession { missing });
        }

        let pending: Vec<PhaseSpec> = self.phases[self.current_index..].to_vec();
        for spec in pending {
            if let Some(reading) = self.latest.remove(&spec.phase) {
                self.results.push(Self::finalize(&spec, &reading));
            }
        }

        self.current_index = self.phases.len();
        self.session.completed_phases = self.results.len() as u32;
        self.session.status = SessionStatus::Completed;
        self.session.ended_at = Some(ended_at);

        Ok(&self.results)
    }

    pub fn cancel(&mut self, ended_at: DateTime<Utc>) -> Result<(), CaptureError> {
        self.ensure_active()?;
        self.latest.clear();
        self.session.status = SessionStatus::Cancelled;
        self.session.ended_at = Some(ended_at);
        Ok(())
    }

    /// Flatten a completed session into the per-day measurement record.
    pub fn build_measurement(&self, ranges: &NormalRangeTable) -> Result<MotionMeasurement, CaptureError> {
        if self.session.status != SessionStatus::Completed {
            return Err(CaptureError::SessionNotActive {
                session_id: self.session.id.clone(),
                status: self.session.status,
            });
        }

        let measured_at = self.session.ended_at.unwrap_or(self.session.started_at);
        let mut measurement = MotionMeasurement {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: self.session.user_id.clone(),
            session_id: Some(self.session.id.clone()),
            measurement_date: measured_at.date_naive(),
            measured_at,
            hand_used: self.session.hand,
            wrist_flexion: None,
            wrist_extension: None,
            wrist_ulnar_deviation: None,
            wrist_radial_deviation: None,
            thumb_flexion: None,
            thumb_extension: None,
            thumb_adduction: None,
            thumb_abduction: None,
            accuracy_score: 0.0,
            comparison_result: ComparisonResult {
                fields: Vec::new(),
                overall_status: ComparisonStatus::Normal,
            },
            created_at: measured_at,
            updated_at: measured_at,
        };

        for result in &self.results {
            if let Some(field) = result.phase_id.field() {
                measurement.set_value(field, Some(result.angle_value));
            }
        }

        if let Some(thumb) = self.thumb {
            measurement.thumb_flexion = Some(thumb.flexion);
            measurement.thumb_abduction = Some(thumb.abduction);
            // Reference positions.
            measurement.thumb_extension = Some(0.0);
            measurement.thumb_adduction = Some(0.0);
        }

        if !self.results.is_empty() {
            measurement.accuracy_score = self.results.iter().map(|r| r.accuracy).sum::<f64>()
                / self.results.len() as f64;
        }

        measurement.comparison_result = compare_fields(measurement.field_values(), ranges);
        Ok(measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 10, minute, 0).unwrap()
    }

    fn state() -> SessionState {
        SessionState::begin(
            "session-1".into(),
            "user-1".into(),
            Handedness::Right,
            PhaseSpec::wrist_protocol(),
            t(0),
        )
        .unwrap()
    }

    fn reading(angle: f64) -> AngleResult {
        AngleResult::valid(angle, 0.9)
    }

    fn record_and_advance(state: &mut SessionState, angle: f64, minute: u32) {
        let phase = state.current_phase().unwrap().phase;
        state.record_angle(phase, reading(angle), t(minute)).unwrap();
        state.advance().unwrap();
    }

    #[test]
    fn starts_on_first_phase() {
        let state = state();
        assert_eq!(state.status(), SessionStatus::Active);
        assert_eq!(state.current_phase().map(|s| s.phase), Some(PhaseId::PalmarFlexion));
        assert_eq!(state.session.total_phases, 4);
    }

    #[test]
    fn latest_reading_wins() {
        let mut state = state();
        state.record_angle(PhaseId::PalmarFlexion, reading(30.0), t(1)).unwrap();
        state.record_angle(PhaseId::PalmarFlexion, reading(46.2), t(2)).unwrap();

        let result = state.advance().unwrap();
        assert_eq!(result.angle_value, 46.2);
        assert_eq!(result.achievement, 51.3);
        assert_eq!(result.timestamp, t(2));
        assert_eq!(state.current_phase().map(|s| s.phase), Some(PhaseId::DorsalFlexion));
    }

    #[test]
    fn recording_does_not_advance() {
        let mut state = state();
        state.record_angle(PhaseId::PalmarFlexion, reading(90.0), t(1)).unwrap();
        assert_eq!(state.current_phase().map(|s| s.phase), Some(PhaseId::PalmarFlexion));
    }

    #[test]
    fn only_current_phase_accepts_readings() {
        let mut state = state();
        let err = state
            .record_angle(PhaseId::RadialDeviation, reading(10.0), t(1))
            .unwrap_err();
        assert!(matches!(err, CaptureError::PhaseMismatch { .. }));
        assert!(err.is_session_state());
    }

    #[test]
    fn invalid_readings_are_dropped() {
        let mut state = state();
        let stored = state
            .record_angle(PhaseId::PalmarFlexion, AngleResult::invalid(0.2), t(1))
            .unwrap();
        assert!(!stored);
        assert!(matches!(state.advance(), Err(CaptureError::NoReading(PhaseId::PalmarFlexion))));
    }

    #[test]
    fn completion_refused_with_missing_phase() {
        let mut state = state();
        record_and_advance(&mut state, 60.0, 1);
        record_and_advance(&mut state, 50.0, 2);
        record_and_advance(&mut state, 30.0, 3);

        let err = state.complete(t(4)).unwrap_err();
        match err {
            CaptureError::IncompleteSession { missing } => {
                assert_eq!(missing, vec![PhaseId::RadialDeviation]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(state.status(), SessionStatus::Active);
        assert_eq!(state.results.len(), 3);
        assert!(state.session.ended_at.is_none());
    }

    #[test]
    fn completion_finalizes_pending_reading() {
        let mut state = state();
        record_and_advance(&mut state, 60.0, 1);
        record_and_advance(&mut state, 50.0, 2);
        record_and_advance(&mut state, 30.0, 3);
        state.record_angle(PhaseId::RadialDeviation, reading(20.0), t(4)).unwrap();

        let results = state.complete(t(5)).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(state.status(), SessionStatus::Completed);
        assert_eq!(state.session.completed_phases, 4);
        assert!(state.current_phase().is_none());
    }

    #[test]
    fn terminal_sessions_reject_transitions() {
        let mut state = state();
        state.cancel(t(1)).unwrap();

        let err = state.record_angle(PhaseId::PalmarFlexion, reading(10.0), t(2)).unwrap_err();
        assert!(matches!(err, CaptureError::SessionNotActive { .. }));
        assert!(state.advance().is_err());
        assert!(state.complete(t(3)).is_err());
        assert!(state.cancel(t(3)).is_err());
    }

    #[test]
    fn builds_flattened_measurement() {
        let mut state = state();
        record_and_advance(&mut state, 46.2, 1);
        record_and_advance(&mut state, 75.0, 2);
        record_and_advance(&mut state, 30.0, 3);
        record_and_advance(&mut state, 20.0, 4);
        state
            .record_thumb(ThumbSnapshot {
                flexion: 40.0,
                abduction: 35.0,
                accuracy: 0.9,
            })
            .unwrap();
        state.complete(t(5)).unwrap();

        let measurement = state.build_measurement(&NormalRangeTable::default()).unwrap();
        assert_eq!(measurement.wrist_flexion, Some(46.2));
        assert_eq!(measurement.wrist_extension, Some(75.0));
        assert_eq!(measurement.thumb_extension, Some(0.0));
        assert_eq!(measurement.session_id.as_deref(), Some("session-1"));
        assert!((measurement.accuracy_score - 0.9).abs() < 1e-9);
        // 75° extension is 5° over the 70° limit.
        assert_eq!(
            measurement.comparison_result.overall_status,
            ComparisonStatus::AboveNormal
        );
    }

    #[test]
    fn session_across_midnight_dates_by_completion() {
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 23, 58, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 5, 5, 0, 2, 0).unwrap();
        let mut state = SessionState::begin(
            "late".into(),
            "user-1".into(),
            Handedness::Right,
            PhaseSpec::wrist_protocol(),
            start,
        )
        .unwrap();
        for angle in [60.0, 50.0, 30.0, 20.0] {
            let phase = state.current_phase().unwrap().phase;
            state.record_angle(phase, reading(angle), start).unwrap();
            state.advance().unwrap();
        }
        state.complete(end).unwrap();

        let measurement = state.build_measurement(&NormalRangeTable::default()).unwrap();
        assert_eq!(measurement.measured_at, end);
        assert_eq!(measurement.measurement_date, end.date_naive());
        assert_eq!(
            measurement.measurement_date,
            chrono::NaiveDate::from_ymd_opt(2026, 5, 5).unwrap()
        );
    }

    #[test]
    fn rejects_bad_phase_lists() {
        let mut duplicated = PhaseSpec::wrist_protocol();
        duplicated.push(duplicated[0]);
        let err = SessionState::begin("s".into(), "u".into(), Handedness::Left, duplicated, t(0))
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfig(_)));

        let err = SessionState::begin("s".into(), "u".into(), Handedness::Left, Vec::new(), t(0))
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfig(_)));
    }
}
