use serde::{Deserialize, Serialize};

use super::ranges::{MeasurementField, NormalRange, NormalRangeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Normal,
    BelowNormal,
    AboveNormal,
}

impl ComparisonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonStatus::Normal => "normal",
            ComparisonStatus::BelowNormal => "below_normal",
            ComparisonStatus::AboveNormal => "above_normal",
        }
    }
}

/// Classification of one angle against one range.
///
/// `deviation` is the deficit below `min` or the excess above `max`, always
/// non-negative and zero inside the range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeComparison {
    pub status: ComparisonStatus,
    pub deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldComparison {
    pub field: MeasurementField,
    pub value: f64,
    pub status: ComparisonStatus,
    pub within_range: bool,
    pub deviation_degrees: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub fields: Vec<FieldComparison>,
    pub overall_status: ComparisonStatus,
}

impl ComparisonResult {
    pub fn field(&self, field: MeasurementField) -> Option<&FieldComparison> {
        self.fields.iter().find(|entry| entry.field == field)
    }
}

pub fn compare(angle: f64, range: NormalRange) -> RangeComparison {
    if angle < range.min {
        RangeComparison {
            status: ComparisonStatus::BelowNormal,
            deviation: range.min - angle,
        }
    } else if angle > range.max {
        RangeComparison {
            status: ComparisonStatus::AboveNormal,
            deviation: angle - range.max,
        }
    } else {
        RangeComparison {
            status: ComparisonStatus::Normal,
            deviation: 0.0,
        }
    }
}

/// Compare every present field against the table.
///
/// Fields without a value or without a configured range are left out. The overall
/// status is the status of the largest deviation; the earliest declared field wins
/// a tie because later fields must strictly exceed it.
pub fn compare_fields<I>(values: I, table: &NormalRangeTable) -> ComparisonResult
where
    I: IntoIterator<Item = (MeasurementField, Option<f64>)>,
{
    let mut fields: Vec<FieldComparison> = values
        .into_iter()
        .filter_map(|(field, value)| {
            let value = value?;
            let range = table.range(field)?;
            let comparison = compare(value, range);
            Some(FieldComparison {
                field,
                value,
                status: comparison.status,
                within_range: comparison.status == ComparisonStatus::Normal,
                deviation_degrees: comparison.deviation,
            })
        })
        .collect();
    fields.sort_by_key(|entry| entry.field);

    let mut worst: Option<&FieldComparison> = None;
    for entry in fields.iter().filter(|entry| !entry.within_range) {
        match worst {
            Some(current) if entry.deviation_degrees <= current.deviation_degrees => {}
            _ => worst = Some(entry),
        }
    }

    let overall_status = worst
        .map(|entry| entry.status)
        .unwrap_or(ComparisonStatus::Normal);

    ComparisonResult {
        fields,
        overall_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MeasurementField::*;

    #[test]
    fn classifies_against_range() {
        let range = NormalRange::new(0.0, 90.0);

        let above = compare(95.0, range);
        assert_eq!(above.status, ComparisonStatus::AboveNormal);
        assert_eq!(above.deviation, 5.0);

        let inside = compare(46.2, range);
        assert_eq!(inside.status, ComparisonStatus::Normal);
        assert_eq!(inside.deviation, 0.0);

        let below = compare(-4.0, range);
        assert_eq!(below.status, ComparisonStatus::BelowNormal);
        assert_eq!(below.deviation, 4.0);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = NormalRange::new(10.0, 25.0);
        assert_eq!(compare(10.0, range).status, ComparisonStatus::Normal);
        assert_eq!(compare(25.0, range).status, ComparisonStatus::Normal);
    }

    #[test]
    fn overall_normal_when_every_field_normal() {
        let table = NormalRangeTable::default();
        let result = compare_fields(
            [
                (WristFlexion, Some(60.0)),
                (WristExtension, Some(50.0)),
                (ThumbExtension, Some(0.0)),
                (ThumbAbduction, None),
            ],
            &table,
        );
        assert_eq!(result.overall_status, ComparisonStatus::Normal);
        assert_eq!(result.fields.len(), 3);
        assert!(result.field(ThumbAbduction).is_none());
    }

    #[test]
    fn overall_takes_worst_deviation() {
        let table = NormalRangeTable::default()
            .with_range(WristFlexion, NormalRange::new(30.0, 90.0));
        let result = compare_fields(
            [
                (WristFlexion, Some(20.0)),
                (WristRadialDeviation, Some(37.0)),
            ],
            &table,
        );
        // 12° above radial beats 10° below flexion
        assert_eq!(result.overall_status, ComparisonStatus::AboveNormal);
        assert_eq!(
            result.field(WristFlexion).map(|f| f.status),
            Some(ComparisonStatus::BelowNormal)
        );
    }

    #[test]
    fn ties_go_to_earlier_field() {
        let table = NormalRangeTable::default()
            .with_range(WristFlexion, NormalRange::new(30.0, 90.0));
        let result = compare_fields(
            [
                (WristRadialDeviation, Some(35.0)),
                (WristFlexion, Some(20.0)),
            ],
            &table,
        );
        assert_eq!(result.overall_status, ComparisonStatus::BelowNormal);
    }
}
