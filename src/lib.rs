//! percept - Streaming speech and scene perception
//!
//! Segments live audio into utterances with a hysteresis state machine,
//! scores transcripts, and debounces scene classifications into confirmed
//! events.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod health;
pub mod segment;
pub mod sink;
pub mod stt;
pub mod vision;

// Core traits (source → process → sink)
pub use audio::chunk::{Chunk, chunk_queue, default_chunk_queue};
pub use audio::classifier::SpeechClassifier;
pub use sink::{CollectorSink, EventSink, JsonlSink};
pub use stt::transcriber::Transcriber;
pub use vision::classifier::SceneClassifier;
pub use vision::frame::FrameSource;

// Speech path
pub use segment::pipeline::{PipelineHandle, SpeechPipeline, SpeechPipelineConfig};
pub use segment::segmenter::{FlushReason, SpeechState, Utterance, UtteranceSegmenter};
pub use stt::confidence::{ConfidenceScorer, TranscriptSignals};

// Vision path
pub use vision::change::{ChangeDetector, ChangeReading};
pub use vision::tracker::{EventTracker, EventTrigger};
pub use vision::watcher::EventWatch;

// Error handling
pub use error::{PerceptError, Result};

// Config
pub use config::{ChangePolicy, Config};

// Health
pub use health::{HealthRegistry, HealthStatus};
