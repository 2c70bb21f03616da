//! Utterance segmentation: the hysteresis state machine and the pipeline
//! thread that drives it from the chunk queue.

pub mod pipeline;
pub mod segmenter;
