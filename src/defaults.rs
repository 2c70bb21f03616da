//! Default configuration constants for percept.
//!
//! Shared across config types and tests so tuned values live in one place.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech classifiers and keeps chunk math
/// consistent with the 512-sample frame the classifier expects.
pub const SAMPLE_RATE: u32 = 16000;

/// Samples per audio chunk.
///
/// The frame classifier operates on exactly 512 samples at 16kHz (32ms).
/// Every chunk entering the segmenter must have this length.
pub const CHUNK_SIZE: usize = 512;

/// Speech probability at or above which a frame counts toward speech onset.
pub const ONSET_THRESHOLD: f32 = 0.6;

/// Speech probability below which a frame counts toward trailing silence.
///
/// Deliberately lower than the onset threshold: the gap between the two is
/// the hysteresis band that prevents state flapping on borderline frames.
pub const OFFSET_THRESHOLD: f32 = 0.4;

/// Consecutive qualifying frames required before speech is confirmed.
pub const MIN_SPEECH_FRAMES: u32 = 3;

/// Consecutive sub-offset frames required before an utterance ends.
pub const SILENCE_FRAMES: u32 = 15;

/// Maximum utterance length in seconds before a forced flush.
///
/// Bounds both memory (buffered samples) and transcription latency under
/// continuous speech.
pub const MAX_SPEECH_SECONDS: f32 = 30.0;

/// Transcripts scoring below this confidence are flagged `low_confidence`.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// avg_logprob value mapped to confidence 0.0.
pub const CONFIDENCE_LOGPROB_LOW: f32 = -1.5;

/// avg_logprob value mapped to confidence 1.0.
pub const CONFIDENCE_LOGPROB_HIGH: f32 = -0.3;

/// Seconds between vision watch ticks.
pub const WATCH_INTERVAL_SECONDS: f32 = 1.0;

/// Consecutive identical detections required to confirm an event.
pub const CONFIRM_FRAMES: u32 = 3;

/// Reserved label meaning "no event visible"; never tracked, never fires.
pub const NONE_LABEL: &str = "NONE";

/// Edge length of the square frames are downscaled to for change detection.
pub const CHANGE_DETECTION_SIZE: u32 = 64;

/// Mean absolute difference threshold (on [0,1] intensity) above which two
/// consecutive frames are considered changed.
pub const CHANGE_MAD_THRESHOLD: f32 = 25.0 / 255.0;

/// How long the pipeline consumer waits on the chunk queue before re-checking
/// the shutdown flag, in milliseconds.
pub const QUEUE_POLL_MS: u64 = 100;

/// Capacity of the bounded chunk queue between capture and consumer.
///
/// 256 chunks at 32ms each is ~8s of headroom; if the consumer falls further
/// behind than that, chunks are dropped at the producer rather than blocking
/// the capture callback.
pub const CHUNK_QUEUE_CAPACITY: usize = 256;
