pub mod geometry;
pub mod motions;

pub use geometry::{angle_between, angle_between_vectors, Vec3};
pub use motions::{landmark_accuracy, measure, AngleResult, Motion};
