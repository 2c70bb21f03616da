//! Transcript confidence scoring.
//!
//! Speech models report two quality signals per utterance: the mean token
//! log-probability (more negative is worse) and the probability that the
//! segment contains no speech at all. Both are folded into a single score
//! in [0, 1] used to flag low-confidence transcripts downstream.

use crate::defaults;

/// Quality signals reported by a transcription backend for one utterance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscriptSignals {
    /// Mean log-probability over decoded tokens.
    pub avg_logprob: f32,
    /// Model's probability that the audio contains no speech.
    pub no_speech_prob: f32,
}

impl TranscriptSignals {
    pub fn new(avg_logprob: f32, no_speech_prob: f32) -> Self {
        Self {
            avg_logprob,
            no_speech_prob,
        }
    }

    /// Signals for an utterance that produced no decoded segments.
    ///
    /// Pinned so the resulting score is exactly 0.0.
    pub fn empty() -> Self {
        Self {
            avg_logprob: -1.0,
            no_speech_prob: 1.0,
        }
    }
}

/// Maps backend quality signals to a confidence score in [0, 1].
///
/// The mean log-probability is rescaled linearly between a floor and a
/// ceiling, clamped, then discounted by the no-speech probability:
///
/// ```text
/// clamp01((avg_logprob - low) / (high - low)) * (1 - no_speech_prob)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
    logprob_low: f32,
    logprob_high: f32,
}

impl ConfidenceScorer {
    pub fn new(logprob_low: f32, logprob_high: f32) -> Self {
        Self {
            logprob_low,
            logprob_high,
        }
    }

    /// Scores one utterance's signals.
    pub fn score(&self, signals: TranscriptSignals) -> f32 {
        let span = self.logprob_high - self.logprob_low;
        let scaled = ((signals.avg_logprob - self.logprob_low) / span).clamp(0.0, 1.0);
        scaled * (1.0 - signals.no_speech_prob).clamp(0.0, 1.0)
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(
            defaults::CONFIDENCE_LOGPROB_LOW,
            defaults::CONFIDENCE_LOGPROB_HIGH,
        )
    }
}
