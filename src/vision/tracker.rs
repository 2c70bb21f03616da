//! Event confirmation tracking.
//!
//! A detection only counts once it has been seen on enough consecutive
//! frames. Each tracked label carries its own confirmation threshold; a
//! frame that matches one label resets every other label's run, so at most
//! one counter is ever non-zero. The tracker fires once and then goes inert.

use crate::config::EventsConfig;
use crate::defaults;
use crate::vision::classifier::Detection;

/// A confirmed event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTrigger {
    pub label: String,
    /// Confidence of the detection that completed the run.
    pub confidence: f32,
    /// Classifier latency of that detection, in milliseconds.
    pub latency_ms: f32,
    /// Sequence number of the frame that completed the run.
    pub frame_sequence: u64,
}

#[derive(Debug)]
struct LabelRun {
    label: String,
    threshold: u32,
    count: u32,
}

/// Debounces per-label detections into at most one trigger.
#[derive(Debug)]
pub struct EventTracker {
    runs: Vec<LabelRun>,
    none_label: String,
    fired: bool,
}

impl EventTracker {
    /// Builds a tracker from `(label, confirm_frames)` pairs.
    pub fn new(rules: &[(&str, u32)]) -> Self {
        Self {
            runs: rules
                .iter()
                .map(|&(label, threshold)| LabelRun {
                    label: label.to_string(),
                    threshold,
                    count: 0,
                })
                .collect(),
            none_label: defaults::NONE_LABEL.to_string(),
            fired: false,
        }
    }

    /// Builds a tracker from config, applying any confirm-frames override.
    pub fn from_config(events: &EventsConfig) -> Self {
        Self {
            runs: events
                .rules
                .iter()
                .map(|rule| LabelRun {
                    label: rule.label.clone(),
                    threshold: events.effective_threshold(rule),
                    count: 0,
                })
                .collect(),
            none_label: defaults::NONE_LABEL.to_string(),
            fired: false,
        }
    }

    /// Whether the tracker has already produced its trigger.
    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Current run length for a label, mainly for diagnostics.
    pub fn run_length(&self, label: &str) -> u32 {
        self.runs
            .iter()
            .find(|run| run.label == label)
            .map_or(0, |run| run.count)
    }

    /// Feeds one detection.
    ///
    /// The reserved no-event label and any label with no configured rule
    /// reset every run. After the first trigger the tracker ignores all
    /// further input.
    pub fn observe(&mut self, detection: &Detection, frame_sequence: u64) -> Option<EventTrigger> {
        if self.fired {
            return None;
        }

        let label = detection.label.as_str();
        let matched = label != self.none_label && self.runs.iter().any(|run| run.label == label);

        if !matched {
            self.clear_runs();
            return None;
        }

        let mut trigger = None;
        for run in &mut self.runs {
            if run.label == label {
                run.count += 1;
                if run.count >= run.threshold {
                    trigger = Some(EventTrigger {
                        label: run.label.clone(),
                        confidence: detection.confidence,
                        latency_ms: detection.latency.as_secs_f32() * 1000.0,
                        frame_sequence,
                    });
                }
            } else {
                run.count = 0;
            }
        }

        if trigger.is_some() {
            self.fired = true;
        }
        trigger
    }

    fn clear_runs(&mut self) {
        for run in &mut self.runs {
            run.count = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventRule;
    use std::time::Duration;

    fn detection(label: &str) -> Detection {
        Detection::new(label, 0.8, Duration::from_millis(12))
    }

    fn feed(tracker: &mut EventTracker, labels: &[&str]) -> Vec<Option<EventTrigger>> {
        labels
            .iter()
            .enumerate()
            .map(|(i, &label)| tracker.observe(&detection(label), i as u64))
            .collect()
    }

    #[test]
    fn switching_labels_resets_the_earlier_run() {
        // A needs 3 frames, B needs 2. Two As then two Bs: A never confirms
        // because the first B resets it; B confirms on the fourth frame.
        let mut tracker = EventTracker::new(&[("A", 3), ("B", 2)]);
        let results = feed(&mut tracker, &["A", "A", "B", "B"]);

        assert!(results[0].is_none());
        assert!(results[1].is_none());
        assert!(results[2].is_none());
        let trigger = results[3].as_ref().expect("B confirms at frame 4");
        assert_eq!(trigger.label, "B");
        assert_eq!(trigger.frame_sequence, 3);
    }

    #[test]
    fn consecutive_matches_confirm_at_threshold() {
        let mut tracker = EventTracker::new(&[("CLEANING", 3)]);
        let results = feed(&mut tracker, &["CLEANING", "CLEANING", "CLEANING"]);
        assert!(results[2].is_some());
        assert_eq!(results[2].as_ref().unwrap().frame_sequence, 2);
    }

    #[test]
    fn none_label_resets_all_runs() {
        let mut tracker = EventTracker::new(&[("COOKING", 2)]);
        let results = feed(&mut tracker, &["COOKING", "NONE", "COOKING", "COOKING"]);
        assert!(results[0..3].iter().all(Option::is_none));
        assert!(results[3].is_some());
    }

    #[test]
    fn unknown_label_behaves_like_none() {
        let mut tracker = EventTracker::new(&[("COOKING", 2)]);
        let results = feed(&mut tracker, &["COOKING", "JUGGLING", "COOKING", "COOKING"]);
        assert!(results[0..3].iter().all(Option::is_none));
        assert!(results[3].is_some());
    }

    #[test]
    fn at_most_one_run_is_nonzero() {
        let mut tracker = EventTracker::new(&[("A", 10), ("B", 10), ("C", 10)]);
        for labels in [&["A", "B"][..], &["B", "C"], &["C", "A"]] {
            feed(&mut tracker, labels);
            let nonzero = ["A", "B", "C"]
                .iter()
                .filter(|label| tracker.run_length(label) > 0)
                .count();
            assert!(nonzero <= 1);
        }
    }

    #[test]
    fn tracker_is_inert_after_firing() {
        let mut tracker = EventTracker::new(&[("A", 1)]);
        assert!(tracker.observe(&detection("A"), 0).is_some());
        assert!(tracker.fired());
        assert!(tracker.observe(&detection("A"), 1).is_none());
        assert!(tracker.observe(&detection("A"), 2).is_none());
    }

    #[test]
    fn trigger_carries_the_confirming_detection() {
        let mut tracker = EventTracker::new(&[("A", 2)]);
        tracker.observe(&detection("A"), 10);
        let confirming = Detection::new("A", 0.93, Duration::from_millis(40));
        let trigger = tracker.observe(&confirming, 11).expect("confirmed");
        assert_eq!(trigger.confidence, 0.93);
        assert!((trigger.latency_ms - 40.0).abs() < 1e-3);
        assert_eq!(trigger.frame_sequence, 11);
    }

    #[test]
    fn from_config_applies_confirm_override() {
        let events = EventsConfig {
            rules: vec![EventRule {
                label: "COOKING".to_string(),
                confirm_frames: 5,
            }],
            confirm_override: Some(2),
        };
        let mut tracker = EventTracker::from_config(&events);
        let results = feed(&mut tracker, &["COOKING", "COOKING"]);
        assert!(results[1].is_some());
    }

    #[test]
    fn empty_rule_set_never_fires() {
        let mut tracker = EventTracker::new(&[]);
        let results = feed(&mut tracker, &["A", "NONE", "B"]);
        assert!(results.iter().all(Option::is_none));
        assert!(!tracker.fired());
    }
}
