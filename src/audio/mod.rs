//! Audio capture and format normalization.

pub mod frame;
pub mod microphone;
pub mod normalizer;
pub mod router;
pub mod source;
pub mod system;
