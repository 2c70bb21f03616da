//! Speech pipeline: one consumer thread that drives the segmenter.
//!
//! The capture side produces chunks into a bounded queue; this thread is
//! the only consumer. Every stage downstream of the queue runs here, in
//! order: classify, segment, transcribe, score, publish. Strict ordering
//! is what makes the segmenter's state transitions deterministic.

use crate::audio::chunk::Chunk;
use crate::audio::classifier::SpeechClassifier;
use crate::config::{SttConfig, VadConfig};
use crate::defaults;
use crate::error::PerceptError;
use crate::health::{HealthRegistry, HealthStatus};
use crate::segment::segmenter::{SpeechState, Utterance, UtteranceSegmenter};
use crate::sink::{EventSink, SpeechBoundary, TranscriptMessage};
use crate::stt::confidence::ConfidenceScorer;
use crate::stt::transcriber::Transcriber;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const HEALTH_SUBSYSTEM: &str = "speech";

/// Configuration for the speech pipeline.
#[derive(Debug, Clone)]
pub struct SpeechPipelineConfig {
    pub vad: VadConfig,
    pub stt: SttConfig,
    pub sample_rate: u32,
    /// Expected samples per chunk; chunks of any other size are dropped.
    pub chunk_size: usize,
}

impl Default for SpeechPipelineConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            stt: SttConfig::default(),
            sample_rate: defaults::SAMPLE_RATE,
            chunk_size: defaults::CHUNK_SIZE,
        }
    }
}

/// Handle to a running speech pipeline.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// Stops the pipeline and waits for the consumer thread.
    ///
    /// The thread drains already-queued chunks and flushes any partial
    /// utterance before exiting, so everything captured up to the stop
    /// call is still published.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if let Err(panic_info) = thread.join() {
                let msg = panic_info
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
                    .unwrap_or("unknown panic");
                tracing::error!("speech pipeline thread panicked: {msg}");
            }
        }
    }

    /// Returns true if the pipeline has not been stopped.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Speech pipeline: chunk queue → classifier → segmenter → transcriber → sink.
pub struct SpeechPipeline {
    config: SpeechPipelineConfig,
    health: Option<Arc<HealthRegistry>>,
}

impl SpeechPipeline {
    pub fn new(config: SpeechPipelineConfig) -> Self {
        Self {
            config,
            health: None,
        }
    }

    /// Reports lifecycle state into the given registry.
    pub fn with_health(mut self, health: Arc<HealthRegistry>) -> Self {
        self.health = Some(health);
        self
    }

    /// Starts the consumer thread.
    ///
    /// # Arguments
    /// * `classifier` - Per-chunk speech probability source
    /// * `transcriber` - Speech-to-text backend
    /// * `sink` - Destination for boundaries and transcripts
    /// * `chunks` - Receiver side of the capture queue
    pub fn start(
        self,
        classifier: Box<dyn SpeechClassifier>,
        transcriber: Arc<dyn Transcriber>,
        sink: Arc<dyn EventSink>,
        chunks: Receiver<Chunk>,
    ) -> PipelineHandle {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();

        let mut worker = Worker {
            segmenter: UtteranceSegmenter::new(&self.config.vad, self.config.sample_rate),
            classifier,
            transcriber,
            sink,
            scorer: ConfidenceScorer::default(),
            confidence_threshold: self.config.stt.confidence_threshold,
            sample_rate: self.config.sample_rate,
            chunk_size: self.config.chunk_size,
        };
        let health = self.health;

        let thread = thread::spawn(move || {
            if let Some(health) = &health {
                health.set(HEALTH_SUBSYSTEM, HealthStatus::Healthy);
            }

            let poll = Duration::from_millis(defaults::QUEUE_POLL_MS);
            while thread_running.load(Ordering::SeqCst) {
                match chunks.recv_timeout(poll) {
                    Ok(chunk) => worker.handle_chunk(&chunk),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            // Everything queued before the stop signal still gets processed.
            while let Ok(chunk) = chunks.try_recv() {
                worker.handle_chunk(&chunk);
            }
            if let Some(utterance) = worker.segmenter.flush_pending() {
                worker.classifier.reset();
                worker.handle_utterance(utterance);
            }

            if let Some(health) = &health {
                health.set(HEALTH_SUBSYSTEM, HealthStatus::Stopped);
            }
        });

        PipelineHandle {
            running,
            thread: Some(thread),
        }
    }
}

struct Worker {
    segmenter: UtteranceSegmenter,
    classifier: Box<dyn SpeechClassifier>,
    transcriber: Arc<dyn Transcriber>,
    sink: Arc<dyn EventSink>,
    scorer: ConfidenceScorer,
    confidence_threshold: f32,
    sample_rate: u32,
    chunk_size: usize,
}

impl Worker {
    fn handle_chunk(&mut self, chunk: &Chunk) {
        if chunk.len() != self.chunk_size {
            let err = PerceptError::ChunkSizeMismatch {
                expected: self.chunk_size,
                actual: chunk.len(),
            };
            tracing::warn!(sequence = chunk.sequence, "dropping chunk: {err}");
            return;
        }

        // A failed tick while waiting is skipped outright; mid-utterance it
        // is fed as silence so a dead classifier cannot hold the utterance
        // open forever.
        let probability = match self.classifier.speech_probability(chunk) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(sequence = chunk.sequence, "speech classification failed: {e}");
                if self.segmenter.state() == SpeechState::Waiting {
                    return;
                }
                0.0
            }
        };

        let outcome = self.segmenter.push(chunk, probability);

        if outcome.speech_started {
            tracing::debug!(sequence = chunk.sequence, "speech onset");
            self.publish_boundary(SpeechBoundary::Started {
                sequence: chunk.sequence,
            });
        }

        if let Some(utterance) = outcome.utterance {
            self.classifier.reset();
            self.handle_utterance(utterance);
        }
    }

    fn handle_utterance(&mut self, utterance: Utterance) {
        let duration_seconds = utterance.duration_seconds(self.sample_rate);
        tracing::debug!(
            reason = utterance.reason.as_str(),
            chunks = utterance.chunk_count,
            duration_seconds,
            "utterance complete"
        );
        self.publish_boundary(SpeechBoundary::Ended {
            sequence: utterance.first_sequence,
            reason: utterance.reason,
            duration_seconds,
        });

        let transcript = match self.transcriber.transcribe(&utterance.samples) {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::error!("transcription failed: {e}");
                return;
            }
        };

        let text = transcript.text.trim();
        if text.is_empty() {
            tracing::debug!("empty transcript, nothing to publish");
            return;
        }

        let confidence = self.scorer.score(transcript.signals);
        let message = TranscriptMessage {
            text: text.to_string(),
            confidence,
            low_confidence: confidence < self.confidence_threshold,
        };
        if let Err(e) = self.sink.publish_transcript(&message) {
            tracing::warn!("failed to publish transcript: {e}");
        }
    }

    fn publish_boundary(&self, boundary: SpeechBoundary) {
        if let Err(e) = self.sink.publish_speech_boundary(&boundary) {
            tracing::warn!("failed to publish speech boundary: {e}");
        }
    }
}
