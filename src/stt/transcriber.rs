use crate::error::{PerceptError, Result};
use crate::stt::confidence::TranscriptSignals;
use std::sync::Arc;

/// One utterance's transcription output.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Decoded text, whitespace-trimmed. May be empty when the model
    /// produced no segments.
    pub text: String,
    /// Quality signals for confidence scoring.
    pub signals: TranscriptSignals,
}

impl Transcript {
    /// A transcript for audio that produced no decoded segments.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            signals: TranscriptSignals::empty(),
        }
    }

    /// Returns true if the model produced no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (a real model vs mock).
pub trait Transcriber: Send + Sync {
    /// Transcribe an utterance's samples to text.
    ///
    /// # Arguments
    /// * `audio` - Normalized mono f32 samples at the pipeline's sample rate
    ///
    /// # Returns
    /// Transcript with quality signals, or error
    fn transcribe(&self, audio: &[f32]) -> Result<Transcript>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across pipelines.
impl<T: Transcriber> Transcriber for Arc<T> {
    fn transcribe(&self, audio: &[f32]) -> Result<Transcript> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    model_name: String,
    response: Transcript,
    should_fail: bool,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: Transcript {
                text: "mock transcription".to_string(),
                signals: TranscriptSignals::new(-0.3, 0.0),
            },
            should_fail: false,
        }
    }

    /// Configure the mock to return specific text
    pub fn with_response(mut self, text: &str) -> Self {
        self.response.text = text.to_string();
        self
    }

    /// Configure the quality signals the mock reports
    pub fn with_signals(mut self, avg_logprob: f32, no_speech_prob: f32) -> Self {
        self.response.signals = TranscriptSignals::new(avg_logprob, no_speech_prob);
        self
    }

    /// Configure the mock to return an empty transcript
    pub fn with_empty_response(mut self) -> Self {
        self.response = Transcript::empty();
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio: &[f32]) -> Result<Transcript> {
        if self.should_fail {
            Err(PerceptError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
