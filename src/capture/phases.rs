use serde::{Deserialize, Serialize};

use crate::angles::Motion;
use crate::comparison::{MeasurementField, NormalRange};

/// One movement direction of the capture protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseId {
    PalmarFlexion,
    DorsalFlexion,
    UlnarDeviation,
    RadialDeviation,
    Pronation,
    Supination,
}

impl PhaseId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseId::PalmarFlexion => "palmar-flexion",
            PhaseId::DorsalFlexion => "dorsal-flexion",
            PhaseId::UlnarDeviation => "ulnar-deviation",
            PhaseId::RadialDeviation => "radial-deviation",
            PhaseId::Pronation => "pronation",
            PhaseId::Supination => "supination",
        }
    }

    pub fn motion(&self) -> Motion {
        match self {
            PhaseId::PalmarFlexion | PhaseId::DorsalFlexion => Motion::WristFlexionExtension,
            PhaseId::UlnarDeviation | PhaseId::RadialDeviation => Motion::WristDeviation,
            PhaseId::Pronation | PhaseId::Supination => Motion::ForearmRotation,
        }
    }

    /// Persisted measurement field this phase fills, if any.
    pub fn field(&self) -> Option<MeasurementField> {
        match self {
            PhaseId::PalmarFlexion => Some(MeasurementField::WristFlexion),
            PhaseId::DorsalFlexion => Some(MeasurementField::WristExtension),
            PhaseId::UlnarDeviation => Some(MeasurementField::WristUlnarDeviation),
            PhaseId::RadialDeviation => Some(MeasurementField::WristRadialDeviation),
            PhaseId::Pronation | PhaseId::Supination => None,
        }
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseId {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "palmar-flexion" => Ok(PhaseId::PalmarFlexion),
            "dorsal-flexion" => Ok(PhaseId::DorsalFlexion),
            "ulnar-deviation" => Ok(PhaseId::UlnarDeviation),
            "radial-deviation" => Ok(PhaseId::RadialDeviation),
            "pronation" => Ok(PhaseId::Pronation),
            "supination" => Ok(PhaseId::Supination),
            other => Err(anyhow::anyhow!("unknown phase id {other}")),
        }
    }
}

/// Lookup entry binding a phase to its clinical target and normal range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSpec {
    pub phase: PhaseId,
    pub target_angle: f64,
    pub normal_range: NormalRange,
}

impl PhaseSpec {
    pub const fn new(phase: PhaseId, target_angle: f64, normal_range: NormalRange) -> Self {
        Self {
            phase,
            target_angle,
            normal_range,
        }
    }

    /// Four-direction wrist protocol.
    pub fn wrist_protocol() -> Vec<PhaseSpec> {
        vec![
            PhaseSpec::new(PhaseId::PalmarFlexion, 90.0, NormalRange::new(0.0, 90.0)),
            PhaseSpec::new(PhaseId::DorsalFlexion, 70.0, NormalRange::new(0.0, 70.0)),
            // Deviation geometry saturates at 45°, so that is the reachable target.
            PhaseSpec::new(PhaseId::UlnarDeviation, 45.0, NormalRange::new(0.0, 55.0)),
            PhaseSpec::new(PhaseId::RadialDeviation, 25.0, NormalRange::new(0.0, 25.0)),
        ]
    }

    /// Wrist protocol followed by forearm pronation and supination.
    pub fn full_protocol() -> Vec<PhaseSpec> {
        let mut phases = Self::wrist_protocol();
        phases.push(PhaseSpec::new(PhaseId::Pronation, 80.0, NormalRange::new(0.0, 80.0)));
        phases.push(PhaseSpec::new(PhaseId::Supination, 80.0, NormalRange::new(0.0, 80.0)));
        phases
    }
}

/// Share of the target reached, in percent with one decimal, capped at 100.
pub fn achievement(angle: f64, target_angle: f64) -> f64 {
    if target_angle <= 0.0 || !angle.is_finite() {
        return 0.0;
    }
    let percent = (angle / target_angle * 1000.0).round() / 10.0;
    percent.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achievement_is_capped() {
        assert_eq!(achievement(90.0, 90.0), 100.0);
        assert_eq!(achievement(180.0, 90.0), 100.0);
        assert_eq!(achievement(0.0, 90.0), 0.0);
        assert_eq!(achievement(46.2, 90.0), 51.3);
    }

    #[test]
    fn achievement_is_monotone() {
        let mut previous = 0.0;
        for step in 0..=300 {
            let value = achievement(step as f64 * 0.5, 70.0);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn zero_target_yields_zero() {
        assert_eq!(achievement(12.0, 0.0), 0.0);
    }

    #[test]
    fn phase_ids_round_trip_through_strings() {
        for spec in PhaseSpec::full_protocol() {
            let parsed: PhaseId = spec.phase.as_str().parse().unwrap();
            assert_eq!(parsed, spec.phase);
        }
    }
}
