//! Scene classifier seam.
//!
//! The real classifier is an external vision model. Its free-text reply is
//! normalized by the adapter; the rest of the crate only ever sees a label
//! string plus a confidence, never raw model output.

use crate::error::{PerceptError, Result};
use crate::vision::frame::Frame;
use std::collections::VecDeque;
use std::time::Duration;

/// One normalized classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Normalized label, uppercase. The reserved no-event label means the
    /// classifier saw nothing of interest.
    pub label: String,
    pub confidence: f32,
    /// Wall-clock time the classifier spent on this frame.
    pub latency: Duration,
}

impl Detection {
    pub fn new(label: &str, confidence: f32, latency: Duration) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            latency,
        }
    }
}

/// Trait for scene classification.
///
/// Implementations normalize whatever the underlying model returns into a
/// `Detection` before handing it back.
pub trait SceneClassifier: Send {
    /// Classifies one frame.
    fn classify(&mut self, frame: &Frame) -> Result<Detection>;
}

/// Scripted classifier for tests: replays fixed detections in order.
///
/// Exhausting the script is a failure, as is an injected failing tick.
#[derive(Debug, Default)]
pub struct ScriptedSceneClassifier {
    script: VecDeque<Option<Detection>>,
    calls: u32,
}

impl ScriptedSceneClassifier {
    /// Replays `labels` in order with a fixed confidence and latency.
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            script: labels
                .iter()
                .map(|&label| Some(Detection::new(label, 0.9, Duration::from_millis(5))))
                .collect(),
            calls: 0,
        }
    }

    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self {
            script: detections.into_iter().map(Some).collect(),
            calls: 0,
        }
    }

    /// Appends a failing tick to the script.
    pub fn then_failure(mut self) -> Self {
        self.script.push_back(None);
        self
    }

    /// How many times `classify` has been called.
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl SceneClassifier for ScriptedSceneClassifier {
    fn classify(&mut self, _frame: &Frame) -> Result<Detection> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Some(detection)) => Ok(detection),
            _ => Err(PerceptError::SceneClassification {
                message: "scripted failure".to_string(),
            }),
        }
    }
}
