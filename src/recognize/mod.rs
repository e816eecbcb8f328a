//! Recognition-engine boundary and display-update throttling.

pub mod engine;
pub mod throttle;
