//! Fixed-size audio chunks and the bounded queue that carries them.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::time::Instant;

/// A fixed-length run of normalized audio samples.
///
/// Samples are mono f32 in [-1, 1] at a fixed rate. Chunks are immutable
/// once produced and carry a sequence number for ordering and gap detection.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Normalized samples; length is the configured chunk size.
    pub samples: Vec<f32>,
    /// Timestamp when this chunk was captured.
    pub timestamp: Instant,
    /// Monotonically increasing sequence number.
    pub sequence: u64,
}

impl Chunk {
    /// Creates a new chunk.
    pub fn new(samples: Vec<f32>, timestamp: Instant, sequence: u64) -> Self {
        Self {
            samples,
            timestamp,
            sequence,
        }
    }

    /// Number of samples in this chunk.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the chunk carries no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of this chunk in milliseconds at the given sample rate.
    pub fn duration_ms(&self, sample_rate: u32) -> f32 {
        self.samples.len() as f32 / sample_rate as f32 * 1000.0
    }
}

/// Creates the bounded single-producer single-consumer chunk queue.
///
/// The producer side belongs to the capture callback and must never block:
/// use `try_send` and drop on overflow. The consumer side belongs to the
/// speech pipeline, which polls it with a bounded wait.
pub fn chunk_queue(capacity: usize) -> (Sender<Chunk>, Receiver<Chunk>) {
    bounded(capacity)
}

/// The chunk queue at its default capacity (~8s of audio headroom).
pub fn default_chunk_queue() -> (Sender<Chunk>, Receiver<Chunk>) {
    chunk_queue(crate::defaults::CHUNK_QUEUE_CAPACITY)
}
