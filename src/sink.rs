//! Output seam for perception results.
//!
//! Everything the crate detects leaves through an `EventSink`: speech
//! boundaries, scored transcripts, and confirmed scene events. Sinks are
//! shared across the speech and vision threads and must tolerate calls
//! from both.

use crate::error::{PerceptError, Result};
use crate::segment::segmenter::FlushReason;
use crate::vision::tracker::EventTrigger;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// An utterance boundary crossing.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechBoundary {
    /// Speech onset was confirmed at this chunk sequence number.
    Started { sequence: u64 },
    /// An utterance ended.
    Ended {
        /// Sequence number of the utterance's first chunk.
        sequence: u64,
        reason: FlushReason,
        duration_seconds: f32,
    },
}

/// A scored transcript for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptMessage {
    pub text: String,
    /// Combined confidence score in [0, 1].
    pub confidence: f32,
    /// True when the score fell below the configured threshold. The
    /// transcript is still delivered; consumers decide what to do with it.
    pub low_confidence: bool,
}

/// Trait for publishing perception output.
///
/// This trait allows swapping destinations (stdout JSONL, a message bus,
/// a collector in tests).
pub trait EventSink: Send + Sync {
    fn publish_speech_boundary(&self, boundary: &SpeechBoundary) -> Result<()>;
    fn publish_transcript(&self, message: &TranscriptMessage) -> Result<()>;
    fn publish_event(&self, trigger: &EventTrigger) -> Result<()>;
}

#[derive(Debug, Default)]
struct Collected {
    boundaries: Vec<SpeechBoundary>,
    transcripts: Vec<TranscriptMessage>,
    events: Vec<EventTrigger>,
}

/// Sink that accumulates everything in memory, for tests.
///
/// Cloning is cheap; clones share the same storage so a test can keep one
/// handle while the pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct CollectorSink {
    inner: Arc<Mutex<Collected>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boundaries(&self) -> Vec<SpeechBoundary> {
        self.lock().boundaries.clone()
    }

    pub fn transcripts(&self) -> Vec<TranscriptMessage> {
        self.lock().transcripts.clone()
    }

    pub fn events(&self) -> Vec<EventTrigger> {
        self.lock().events.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collected> {
        // A panic while holding this lock already failed the test; the
        // poisoned data is still the right thing to inspect.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for CollectorSink {
    fn publish_speech_boundary(&self, boundary: &SpeechBoundary) -> Result<()> {
        self.lock().boundaries.push(boundary.clone());
        Ok(())
    }

    fn publish_transcript(&self, message: &TranscriptMessage) -> Result<()> {
        self.lock().transcripts.push(message.clone());
        Ok(())
    }

    fn publish_event(&self, trigger: &EventTrigger) -> Result<()> {
        self.lock().events.push(trigger.clone());
        Ok(())
    }
}

/// Sink that writes one JSON object per line to a writer.
pub struct JsonlSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_line(&self, value: serde_json::Value) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| PerceptError::Sink {
            message: "sink writer lock poisoned".to_string(),
        })?;
        serde_json::to_writer(&mut *writer, &value).map_err(|e| PerceptError::Sink {
            message: format!("failed to serialize output: {e}"),
        })?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> EventSink for JsonlSink<W> {
    fn publish_speech_boundary(&self, boundary: &SpeechBoundary) -> Result<()> {
        let value = match boundary {
            SpeechBoundary::Started { sequence } => serde_json::json!({
                "type": "speech_started",
                "sequence": sequence,
            }),
            SpeechBoundary::Ended {
                sequence,
                reason,
                duration_seconds,
            } => serde_json::json!({
                "type": "speech_ended",
                "sequence": sequence,
                "reason": reason.as_str(),
                "duration_seconds": duration_seconds,
            }),
        };
        self.write_line(value)
    }

    fn publish_transcript(&self, message: &TranscriptMessage) -> Result<()> {
        self.write_line(serde_json::json!({
            "type": "transcript",
            "text": message.text,
            "confidence": message.confidence,
            "low_confidence": message.low_confidence,
        }))
    }

    fn publish_event(&self, trigger: &EventTrigger) -> Result<()> {
        self.write_line(serde_json::json!({
            "type": "event",
            "label": trigger.label,
            "confidence": trigger.confidence,
            "latency_ms": trigger.latency_ms,
            "frame_sequence": trigger.frame_sequence,
        }))
    }
}
