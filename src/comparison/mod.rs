pub mod engine;
pub mod ranges;

pub use engine::{
    compare, compare_fields, ComparisonResult, ComparisonStatus, FieldComparison,
    RangeComparison,
};
pub use ranges::{MeasurementField, NormalRange, NormalRangeTable};
