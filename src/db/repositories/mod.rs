pub mod activities;
pub mod measurements;
pub mod progress;
pub mod sessions;
