//! Hysteresis-based utterance segmentation.
//!
//! Two states, asymmetric thresholds. Entering SPEAKING requires a run of
//! `min_speech_frames` consecutive chunks at or above the onset threshold;
//! leaving it requires `silence_frames` consecutive chunks below the offset
//! threshold. Probabilities between the two thresholds extend whatever state
//! the machine is already in, which is what stops flapping near a boundary.

use crate::audio::chunk::Chunk;
use crate::config::VadConfig;
use std::time::Instant;

/// Segmenter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    /// No utterance in progress; counting qualifying onset frames.
    Waiting,
    /// Accumulating an utterance; counting qualifying silence frames.
    Speaking,
}

/// Why an utterance was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The configured run of consecutive sub-offset frames was observed.
    SilenceRun,
    /// The buffer reached the hard sample cap.
    MaxDuration,
    /// The pipeline is stopping and drained the partial buffer.
    Shutdown,
}

impl FlushReason {
    /// Stable lowercase name for logs and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::SilenceRun => "silence",
            FlushReason::MaxDuration => "max_duration",
            FlushReason::Shutdown => "shutdown",
        }
    }
}

/// One completed utterance.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Buffered samples, transition chunk first.
    pub samples: Vec<f32>,
    /// Sequence number of the first buffered chunk.
    pub first_sequence: u64,
    /// Number of chunks in the buffer, including trailing silence frames.
    pub chunk_count: usize,
    /// Capture timestamp of the first buffered chunk.
    pub started_at: Instant,
    pub reason: FlushReason,
}

impl Utterance {
    /// Utterance length in seconds at the given sample rate.
    pub fn duration_seconds(&self, sample_rate: u32) -> f32 {
        self.samples.len() as f32 / sample_rate as f32
    }
}

/// Result of feeding one chunk to the segmenter.
///
/// A single chunk can both start speech and complete an utterance when the
/// hard cap is small enough to trip on the transition chunk.
#[derive(Debug, Default)]
pub struct PushOutcome {
    /// The WAITING to SPEAKING transition happened on this chunk.
    pub speech_started: bool,
    /// A completed utterance, if this chunk closed one.
    pub utterance: Option<Utterance>,
}

/// Hysteresis state machine that groups chunks into utterances.
///
/// Purely synchronous; the pipeline owns one instance and feeds it chunks
/// in capture order with their speech probabilities.
#[derive(Debug)]
pub struct UtteranceSegmenter {
    onset_threshold: f32,
    offset_threshold: f32,
    min_speech_frames: u32,
    silence_frames: u32,
    max_samples: usize,

    state: SpeechState,
    buffer: Vec<f32>,
    onset_run: u32,
    silence_run: u32,
    chunk_count: usize,
    first_sequence: u64,
    started_at: Option<Instant>,
}

impl UtteranceSegmenter {
    pub fn new(vad: &VadConfig, sample_rate: u32) -> Self {
        Self {
            onset_threshold: vad.onset_threshold,
            offset_threshold: vad.offset_threshold,
            min_speech_frames: vad.min_speech_frames,
            silence_frames: vad.silence_frames,
            max_samples: vad.max_samples(sample_rate),
            state: SpeechState::Waiting,
            buffer: Vec::new(),
            onset_run: 0,
            silence_run: 0,
            chunk_count: 0,
            first_sequence: 0,
            started_at: None,
        }
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    /// Samples currently buffered for the in-progress utterance.
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one chunk and its speech probability.
    ///
    /// The caller maps a mid-utterance classification failure to probability
    /// 0.0 so it counts toward the silence run while the chunk is still
    /// buffered.
    pub fn push(&mut self, chunk: &Chunk, probability: f32) -> PushOutcome {
        let mut outcome = PushOutcome::default();

        match self.state {
            SpeechState::Waiting => {
                if probability >= self.onset_threshold {
                    self.onset_run += 1;
                    if self.onset_run >= self.min_speech_frames {
                        self.state = SpeechState::Speaking;
                        self.buffer.clear();
                        self.onset_run = 0;
                        self.silence_run = 0;
                        self.chunk_count = 0;
                        self.first_sequence = chunk.sequence;
                        self.started_at = Some(chunk.timestamp);
                        outcome.speech_started = true;
                        // The transition chunk opens the buffer.
                        self.append(chunk);
                        if self.buffer.len() >= self.max_samples {
                            outcome.utterance = Some(self.flush(FlushReason::MaxDuration));
                        }
                    }
                } else {
                    self.onset_run = 0;
                }
            }
            SpeechState::Speaking => {
                self.append(chunk);
                if probability < self.offset_threshold {
                    self.silence_run += 1;
                } else {
                    self.silence_run = 0;
                }
                if self.silence_run >= self.silence_frames {
                    outcome.utterance = Some(self.flush(FlushReason::SilenceRun));
                } else if self.buffer.len() >= self.max_samples {
                    outcome.utterance = Some(self.flush(FlushReason::MaxDuration));
                }
            }
        }

        outcome
    }

    /// Drains a partial utterance at shutdown, if one is in progress.
    pub fn flush_pending(&mut self) -> Option<Utterance> {
        if self.state == SpeechState::Speaking && !self.buffer.is_empty() {
            Some(self.flush(FlushReason::Shutdown))
        } else {
            self.reset();
            None
        }
    }

    /// Returns to WAITING and discards any buffered audio.
    pub fn reset(&mut self) {
        self.state = SpeechState::Waiting;
        self.buffer.clear();
        self.onset_run = 0;
        self.silence_run = 0;
        self.chunk_count = 0;
        self.started_at = None;
    }

    fn append(&mut self, chunk: &Chunk) {
        self.buffer.extend_from_slice(&chunk.samples);
        self.chunk_count += 1;
    }

    fn flush(&mut self, reason: FlushReason) -> Utterance {
        let utterance = Utterance {
            samples: std::mem::take(&mut self.buffer),
            first_sequence: self.first_sequence,
            chunk_count: self.chunk_count,
            started_at: self.started_at.unwrap_or_else(Instant::now),
            reason,
        };
        self.reset();
        utterance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    fn vad(
        onset: f32,
        offset: f32,
        min_speech_frames: u32,
        silence_frames: u32,
        max_speech_seconds: f32,
    ) -> VadConfig {
        VadConfig {
            onset_threshold: onset,
            offset_threshold: offset,
            min_speech_frames,
            silence_frames,
            max_speech_seconds,
        }
    }

    /// Feeds probabilities as synthetic chunks, collecting outcomes.
    fn run(
        segmenter: &mut UtteranceSegmenter,
        probabilities: &[f32],
        chunk_size: usize,
    ) -> Vec<(usize, PushOutcome)> {
        let mut outcomes = Vec::new();
        for (index, &probability) in probabilities.iter().enumerate() {
            let chunk = Chunk::new(vec![0.1; chunk_size], Instant::now(), index as u64);
            outcomes.push((index, segmenter.push(&chunk, probability)));
        }
        outcomes
    }

    #[test]
    fn onset_then_offset_run_brackets_the_utterance() {
        // onset=0.6, offset=0.4, 2 frames each way. Speech starts on the
        // second qualifying frame (index 2) and the buffer covers chunks 2
        // through 4, where the second sub-offset frame lands.
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 2, 2, 30.0), 16000);
        let outcomes = run(&mut segmenter, &[0.2, 0.7, 0.8, 0.3, 0.3, 0.2], 512);

        assert!(outcomes[2].1.speech_started);
        let utterance = outcomes[4].1.utterance.as_ref().expect("flush at index 4");
        assert_eq!(utterance.reason, FlushReason::SilenceRun);
        assert_eq!(utterance.first_sequence, 2);
        assert_eq!(utterance.chunk_count, 3);
        assert_eq!(utterance.samples.len(), 3 * 512);
        assert_eq!(segmenter.state(), SpeechState::Waiting);

        for (index, outcome) in &outcomes {
            if *index != 4 {
                assert!(outcome.utterance.is_none(), "spurious flush at {index}");
            }
        }
    }

    #[test]
    fn broken_onset_run_does_not_transition() {
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 3, 2, 30.0), 16000);
        let outcomes = run(&mut segmenter, &[0.7, 0.7, 0.5, 0.7, 0.7], 512);
        assert!(outcomes.iter().all(|(_, o)| !o.speech_started));
        assert_eq!(segmenter.state(), SpeechState::Waiting);
    }

    #[test]
    fn mid_band_probability_extends_speaking() {
        // 0.5 sits between offset 0.4 and onset 0.6: it neither counts
        // toward onset in WAITING nor toward silence in SPEAKING.
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 1, 2, 30.0), 16000);
        run(&mut segmenter, &[0.9, 0.5, 0.5, 0.5, 0.5], 512);
        assert_eq!(segmenter.state(), SpeechState::Speaking);
        assert_eq!(segmenter.buffered_samples(), 5 * 512);
    }

    #[test]
    fn silence_run_reset_by_speech_frame() {
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 1, 3, 30.0), 16000);
        let outcomes = run(
            &mut segmenter,
            &[0.9, 0.1, 0.1, 0.9, 0.1, 0.1, 0.1],
            512,
        );
        // Two sub-offset frames, then speech resets the run; three more are
        // needed, so the flush lands on index 6.
        assert!(outcomes[5].1.utterance.is_none());
        assert!(outcomes[6].1.utterance.is_some());
    }

    #[test]
    fn probability_equal_to_offset_is_not_silence() {
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 1, 1, 30.0), 16000);
        run(&mut segmenter, &[0.9, 0.4, 0.4], 512);
        assert_eq!(segmenter.state(), SpeechState::Speaking);
    }

    #[test]
    fn probability_equal_to_onset_qualifies() {
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 2, 2, 30.0), 16000);
        let outcomes = run(&mut segmenter, &[0.6, 0.6], 512);
        assert!(outcomes[1].1.speech_started);
    }

    #[test]
    fn hard_cap_forces_flush_mid_speech() {
        // 5 s at 16 kHz is 80000 samples. With 512-sample chunks that cap
        // trips on the 157th buffered chunk, probability notwithstanding.
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 1, 15, 5.0), 16000);
        let probabilities = vec![0.9; 200];
        let outcomes = run(&mut segmenter, &probabilities, 512);

        let flush_index = outcomes
            .iter()
            .find_map(|(i, o)| o.utterance.as_ref().map(|u| (*i, u.reason)))
            .expect("hard cap flush");
        assert_eq!(flush_index, (156, FlushReason::MaxDuration));

        let utterance = outcomes[156].1.utterance.as_ref().unwrap();
        assert_eq!(utterance.chunk_count, 157);
        assert_eq!(utterance.samples.len(), 157 * 512);
    }

    #[test]
    fn tiny_cap_can_start_and_flush_on_one_chunk() {
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 1, 15, 0.01), 16000);
        let chunk = Chunk::new(vec![0.1; 512], Instant::now(), 0);
        let outcome = segmenter.push(&chunk, 0.9);
        assert!(outcome.speech_started);
        let utterance = outcome.utterance.expect("cap flush on transition chunk");
        assert_eq!(utterance.reason, FlushReason::MaxDuration);
        assert_eq!(segmenter.state(), SpeechState::Waiting);
    }

    #[test]
    fn flush_pending_drains_partial_utterance() {
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 1, 15, 30.0), 16000);
        run(&mut segmenter, &[0.9, 0.9, 0.9], 512);

        let utterance = segmenter.flush_pending().expect("partial buffer");
        assert_eq!(utterance.reason, FlushReason::Shutdown);
        assert_eq!(utterance.chunk_count, 3);
        assert_eq!(segmenter.state(), SpeechState::Waiting);
        assert!(segmenter.flush_pending().is_none());
    }

    #[test]
    fn flush_pending_in_waiting_is_none() {
        let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 3, 15, 30.0), 16000);
        run(&mut segmenter, &[0.9, 0.9], 512);
        assert!(segmenter.flush_pending().is_none());
        // Drain also clears the partial onset run.
        let outcomes = run(&mut segmenter, &[0.9], 512);
        assert!(!outcomes[0].1.speech_started);
    }

    #[test]
    fn replay_produces_identical_boundaries() {
        let probabilities = [
            0.1, 0.7, 0.7, 0.7, 0.3, 0.5, 0.1, 0.1, 0.9, 0.9, 0.9, 0.1, 0.1, 0.1,
        ];
        let trace = |probabilities: &[f32]| {
            let mut segmenter = UtteranceSegmenter::new(&vad(0.6, 0.4, 3, 3, 30.0), 16000);
            run(&mut segmenter, probabilities, 512)
                .into_iter()
                .map(|(i, o)| (i, o.speech_started, o.utterance.map(|u| u.samples.len())))
                .collect::<Vec<_>>()
        };
        assert_eq!(trace(&probabilities), trace(&probabilities));
    }

    #[test]
    fn default_config_brackets_speech() {
        let vad = VadConfig::default();
        let mut segmenter = UtteranceSegmenter::new(&vad, defaults::SAMPLE_RATE);

        let mut probabilities = vec![0.9; defaults::MIN_SPEECH_FRAMES as usize + 5];
        probabilities.extend(vec![0.1; defaults::SILENCE_FRAMES as usize]);
        let outcomes = run(&mut segmenter, &probabilities, defaults::CHUNK_SIZE);

        let flushes: Vec<_> = outcomes
            .iter()
            .filter(|(_, o)| o.utterance.is_some())
            .collect();
        assert_eq!(flushes.len(), 1);
        assert_eq!(segmenter.state(), SpeechState::Waiting);
    }
}
