//! Vision path: frame capture, scene classification, change detection,
//! and event confirmation.

pub mod change;
pub mod classifier;
pub mod frame;
pub mod tracker;
pub mod watcher;
