//! Real audio capture using CPAL.
//!
//! The stream callback runs on the audio backend's real-time thread and must
//! never block: samples are framed into fixed-size chunks and `try_send`'d
//! into the bounded queue. When the queue is full the chunk is dropped and
//! counted; the consumer is the one that fell behind.

use crate::audio::chunk::Chunk;
use crate::error::{PerceptError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Accumulates raw samples and emits fixed-size chunks.
///
/// Pure framing logic, kept separate from the cpal stream so it can be
/// tested without audio hardware.
#[derive(Debug)]
pub struct ChunkFramer {
    chunk_size: usize,
    pending: Vec<f32>,
    sequence: u64,
}

impl ChunkFramer {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            pending: Vec::with_capacity(chunk_size),
            sequence: 0,
        }
    }

    /// Feeds raw samples, invoking `emit` once per completed chunk.
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(Chunk)) {
        for &sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.chunk_size {
                let samples = std::mem::replace(&mut self.pending, Vec::with_capacity(self.chunk_size));
                let chunk = Chunk::new(samples, Instant::now(), self.sequence);
                self.sequence += 1;
                emit(chunk);
            }
        }
    }
}

/// Live audio capture feeding the chunk queue.
///
/// Captures mono f32 at the configured rate, preferring the named device
/// and falling back to the system default. Holds the cpal stream; dropping
/// the capture stops it.
pub struct ChunkCapture {
    stream: cpal::Stream,
    dropped: Arc<AtomicU64>,
}

impl ChunkCapture {
    /// Opens the device and starts pushing chunks into `tx`.
    pub fn start(
        device_name: Option<&str>,
        sample_rate: u32,
        chunk_size: usize,
        tx: Sender<Chunk>,
    ) -> Result<Self> {
        let device = find_device(device_name)?;
        let config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_cb = Arc::clone(&dropped);
        let mut framer = ChunkFramer::new(chunk_size);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    framer.push(data, |chunk| {
                        if tx.try_send(chunk).is_err() {
                            dropped_cb.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                },
                |err| {
                    tracing::error!("audio stream error: {err}");
                },
                None,
            )
            .map_err(|e| PerceptError::AudioCapture {
                message: format!("Failed to build input stream: {e}"),
            })?;

        stream.play().map_err(|e| PerceptError::AudioCapture {
            message: format!("Failed to start input stream: {e}"),
        })?;

        Ok(Self { stream, dropped })
    }

    /// Chunks dropped because the queue was full.
    pub fn dropped_chunks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops the stream.
    pub fn stop(self) -> Result<()> {
        let dropped = self.dropped_chunks();
        if dropped > 0 {
            tracing::warn!(dropped, "chunks dropped because the queue was full");
        }
        self.stream.pause().map_err(|e| PerceptError::AudioCapture {
            message: format!("Failed to stop input stream: {e}"),
        })
    }
}

fn find_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    if let Some(name) = name {
        let devices = host.input_devices().map_err(|e| PerceptError::AudioCapture {
            message: format!("Failed to enumerate input devices: {e}"),
        })?;
        for device in devices {
            if device.name().is_ok_and(|n| n == name) {
                return Ok(device);
            }
        }
        return Err(PerceptError::AudioCapture {
            message: format!("Audio device not found: {name}"),
        });
    }

    host.default_input_device()
        .ok_or_else(|| PerceptError::AudioCapture {
            message: "No default input device".to_string(),
        })
}
