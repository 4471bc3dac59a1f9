pub mod activity;
pub mod measurement;
pub mod progress;
pub mod session;

pub use activity::ActivityRecord;
pub use measurement::MotionMeasurement;
pub use progress::{
    AnalysisPeriod, DataQuality, DataQualityLevel, FieldAverage, FieldTrend, PeriodStats,
    PredictedRecovery, ProgressData, Trend,
};
pub use session::{MeasurementResult, MeasurementSession, SessionStatus};
