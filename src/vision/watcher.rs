//! Scene watch loop.
//!
//! Single-threaded and cooperative: capture a frame, run change detection,
//! classify, feed the tracker, then sleep out the remainder of the tick
//! interval. The loop ends on the first confirmed event, on source
//! exhaustion, on cancellation, or on a classifier failure.

use crate::config::{ChangePolicy, EventsConfig, SceneConfig};
use crate::defaults;
use crate::error::Result;
use crate::health::{HealthRegistry, HealthStatus};
use crate::sink::EventSink;
use crate::vision::change::ChangeDetector;
use crate::vision::classifier::SceneClassifier;
use crate::vision::frame::FrameSource;
use crate::vision::tracker::{EventTracker, EventTrigger};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const HEALTH_SUBSYSTEM: &str = "vision";

/// One watch session over a frame source.
pub struct EventWatch {
    interval: Duration,
    policy: ChangePolicy,
    change: ChangeDetector,
    tracker: EventTracker,
    health: Option<Arc<HealthRegistry>>,
}

impl EventWatch {
    pub fn new(scene: &SceneConfig, events: &EventsConfig) -> Self {
        Self {
            interval: scene.interval(),
            policy: scene.change_policy,
            change: ChangeDetector::new(defaults::CHANGE_DETECTION_SIZE, scene.change_threshold),
            tracker: EventTracker::from_config(events),
            health: None,
        }
    }

    /// Reports lifecycle state into the given registry.
    pub fn with_health(mut self, health: Arc<HealthRegistry>) -> Self {
        self.health = Some(health);
        self
    }

    /// Runs until an event confirms, the source is exhausted, or `cancel`
    /// is set.
    ///
    /// Classifier failures are fatal to the session; frame capture failures
    /// only skip the tick. Returns the confirmed trigger, if any, after
    /// publishing it to the sink.
    pub fn run(
        mut self,
        source: &mut dyn FrameSource,
        classifier: &mut dyn SceneClassifier,
        sink: &dyn EventSink,
        cancel: &AtomicBool,
    ) -> Result<Option<EventTrigger>> {
        if let Some(health) = &self.health {
            health.set(HEALTH_SUBSYSTEM, HealthStatus::Healthy);
        }

        let result = self.watch(source, classifier, sink, cancel);

        if let Some(health) = &self.health {
            let status = match &result {
                Ok(_) => HealthStatus::Stopped,
                Err(_) => HealthStatus::Degraded,
            };
            health.set(HEALTH_SUBSYSTEM, status);
        }
        result
    }

    fn watch(
        &mut self,
        source: &mut dyn FrameSource,
        classifier: &mut dyn SceneClassifier,
        sink: &dyn EventSink,
        cancel: &AtomicBool,
    ) -> Result<Option<EventTrigger>> {
        while !cancel.load(Ordering::SeqCst) {
            let tick_started = Instant::now();

            let frame = match source.capture() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::debug!("frame source exhausted");
                    return Ok(None);
                }
                Err(e) => {
                    tracing::warn!("frame capture failed, skipping tick: {e}");
                    self.sleep_remaining(tick_started, cancel);
                    continue;
                }
            };

            // The first frame only establishes the change baseline and is
            // always classified, whatever the policy.
            let had_baseline = self.change.has_baseline();
            let reading = self.change.update(&frame.image);
            let gated =
                self.policy == ChangePolicy::Gate && had_baseline && !reading.exceeded;

            if gated {
                tracing::trace!(
                    sequence = frame.sequence,
                    magnitude = reading.magnitude,
                    "no scene change, skipping classification"
                );
            } else {
                let detection = classifier.classify(&frame)?;
                tracing::debug!(
                    sequence = frame.sequence,
                    label = %detection.label,
                    confidence = detection.confidence,
                    magnitude = reading.magnitude,
                    changed = reading.exceeded,
                    "scene tick"
                );

                if let Some(trigger) = self.tracker.observe(&detection, frame.sequence) {
                    tracing::info!(label = %trigger.label, "event confirmed");
                    if let Err(e) = sink.publish_event(&trigger) {
                        tracing::warn!("failed to publish event: {e}");
                    }
                    return Ok(Some(trigger));
                }
            }

            self.sleep_remaining(tick_started, cancel);
        }
        Ok(None)
    }

    /// Sleeps out the rest of the tick interval in short, cancel-aware
    /// slices. A tick that overran its interval gets no sleep at all.
    fn sleep_remaining(&self, tick_started: Instant, cancel: &AtomicBool) {
        let Some(mut remaining) = self.interval.checked_sub(tick_started.elapsed()) else {
            return;
        };
        let slice = Duration::from_millis(defaults::QUEUE_POLL_MS);
        while remaining > Duration::ZERO && !cancel.load(Ordering::SeqCst) {
            let nap = remaining.min(slice);
            thread::sleep(nap);
            remaining -= nap;
        }
    }
}
