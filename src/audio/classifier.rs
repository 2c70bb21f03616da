//! Speech classifier seam.
//!
//! The real classifier is an external model that maps a 512-sample chunk to
//! a speech probability and keeps hidden state across chunks within one
//! utterance. The trait makes that state explicit: `reset` must be called
//! between utterances, and the pipeline does so on every flush.

use crate::audio::chunk::Chunk;
use crate::error::{PerceptError, Result};

/// Per-chunk speech probability classifier.
///
/// Implementations are not safe for concurrent invocation; exactly one
/// consumer thread may call them (see the pipeline's ordering contract).
pub trait SpeechClassifier: Send {
    /// Speech probability in [0, 1] for a single chunk.
    fn speech_probability(&mut self, chunk: &Chunk) -> Result<f32>;

    /// Clears any hidden state carried across chunks.
    ///
    /// Called between utterances so the next utterance's frames are
    /// evaluated from a clean state.
    fn reset(&mut self);
}

/// Energy-based classifier: RMS level mapped to a pseudo-probability.
///
/// Not a real VAD model, but a dependency-free stand-in that behaves
/// sensibly on quiet-room audio. RMS at or above `full_scale_rms` maps to
/// probability 1.0, zero maps to 0.0, linear in between. Stateless, so
/// `reset` is a no-op.
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    full_scale_rms: f32,
}

impl EnergyClassifier {
    pub fn new(full_scale_rms: f32) -> Self {
        Self { full_scale_rms }
    }

    /// Root mean square of normalized samples.
    ///
    /// 0.0 is silence; ~0.707 is a full-scale sine wave.
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_squares / samples.len() as f64).sqrt() as f32
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        // RMS of 0.1 (a normal speaking level on a typical microphone)
        // saturates the probability.
        Self::new(0.1)
    }
}

impl SpeechClassifier for EnergyClassifier {
    fn speech_probability(&mut self, chunk: &Chunk) -> Result<f32> {
        let rms = Self::rms(&chunk.samples);
        Ok((rms / self.full_scale_rms).clamp(0.0, 1.0))
    }

    fn reset(&mut self) {}
}

/// Scripted classifier for tests: replays a fixed probability sequence.
///
/// Exhausting the script yields 0.0. Tracks how often `reset` was called so
/// tests can assert the pipeline clears classifier state between utterances.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClassifier {
    script: Vec<ScriptedTick>,
    position: usize,
    reset_count: u32,
}

#[derive(Debug, Clone)]
enum ScriptedTick {
    Probability(f32),
    Failure,
}

impl ScriptedClassifier {
    /// Creates a classifier that replays `probabilities` in order.
    pub fn new(probabilities: &[f32]) -> Self {
        Self {
            script: probabilities
                .iter()
                .map(|&p| ScriptedTick::Probability(p))
                .collect(),
            position: 0,
            reset_count: 0,
        }
    }

    /// Appends a failing tick to the script.
    pub fn then_failure(mut self) -> Self {
        self.script.push(ScriptedTick::Failure);
        self
    }

    /// Appends more probability ticks to the script.
    pub fn then_probabilities(mut self, probabilities: &[f32]) -> Self {
        self.script
            .extend(probabilities.iter().map(|&p| ScriptedTick::Probability(p)));
        self
    }

    /// How many times `reset` has been called.
    pub fn reset_count(&self) -> u32 {
        self.reset_count
    }
}

impl SpeechClassifier for ScriptedClassifier {
    fn speech_probability(&mut self, _chunk: &Chunk) -> Result<f32> {
        let tick = self.script.get(self.position).cloned();
        self.position += 1;
        match tick {
            Some(ScriptedTick::Probability(p)) => Ok(p),
            Some(ScriptedTick::Failure) => Err(PerceptError::SpeechClassification {
                message: "scripted failure".to_string(),
            }),
            None => Ok(0.0),
        }
    }

    fn reset(&mut self) {
        self.reset_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn chunk_of(samples: Vec<f32>) -> Chunk {
        Chunk::new(samples, Instant::now(), 0)
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(EnergyClassifier::rms(&vec![0.0; 512]), 0.0);
    }

    #[test]
    fn rms_of_empty_is_zero() {
        assert_eq!(EnergyClassifier::rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_constant_signal() {
        let rms = EnergyClassifier::rms(&vec![0.5; 512]);
        assert!((rms - 0.5).abs() < 1e-6);
    }

    #[test]
    fn energy_probability_saturates() {
        let mut classifier = EnergyClassifier::new(0.1);
        let loud = chunk_of(vec![0.5; 512]);
        assert_eq!(classifier.speech_probability(&loud).unwrap(), 1.0);

        let silent = chunk_of(vec![0.0; 512]);
        assert_eq!(classifier.speech_probability(&silent).unwrap(), 0.0);
    }

    #[test]
    fn energy_probability_is_linear_below_full_scale() {
        let mut classifier = EnergyClassifier::new(0.1);
        let half = chunk_of(vec![0.05; 512]);
        let p = classifier.speech_probability(&half).unwrap();
        assert!((p - 0.5).abs() < 1e-5);
    }

    #[test]
    fn scripted_replays_then_goes_silent() {
        let mut classifier = ScriptedClassifier::new(&[0.9, 0.2]);
        let chunk = chunk_of(vec![0.0; 4]);
        assert_eq!(classifier.speech_probability(&chunk).unwrap(), 0.9);
        assert_eq!(classifier.speech_probability(&chunk).unwrap(), 0.2);
        assert_eq!(classifier.speech_probability(&chunk).unwrap(), 0.0);
    }

    #[test]
    fn scripted_failure_surfaces_error() {
        let mut classifier = ScriptedClassifier::new(&[0.9]).then_failure();
        let chunk = chunk_of(vec![0.0; 4]);
        assert!(classifier.speech_probability(&chunk).is_ok());
        assert!(classifier.speech_probability(&chunk).is_err());
    }

    #[test]
    fn scripted_counts_resets() {
        let mut classifier = ScriptedClassifier::new(&[]);
        assert_eq!(classifier.reset_count(), 0);
        classifier.reset();
        classifier.reset();
        assert_eq!(classifier.reset_count(), 2);
    }
}
