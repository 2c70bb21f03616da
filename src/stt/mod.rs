//! Speech-to-text seam and transcript confidence scoring.

pub mod confidence;
pub mod transcriber;
