//! Audio path: chunk types, the speech classifier seam, and capture.

pub mod chunk;
pub mod classifier;

#[cfg(feature = "cpal-audio")]
pub mod capture;
