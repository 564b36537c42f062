//! Lock-free counters shared across the pipeline's threads.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated from worker threads, read by the session and by
/// tests. Every field is independent; there is no cross-field invariant
/// enforced at this layer.
#[derive(Default)]
pub struct Stats {
    pub frames_captured: AtomicU64,
    pub frames_dropped_capture: AtomicU64,
    pub frames_dropped_backpressure: AtomicU64,
    pub frames_encoded: AtomicU64,
    pub encode_errors: AtomicU64,
    pub audio_packets_captured: AtomicU64,
    pub audio_packets_dropped: AtomicU64,
    pub video_chunks_written: AtomicU64,
    pub audio_chunks_written: AtomicU64,
    pub throttle_events: AtomicU64,
    pub restore_events: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Point-in-time snapshot, for reporting and assertions.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatsSnapshot {
    pub frames_captured: u64,
    pub frames_dropped_capture: u64,
    pub frames_dropped_backpressure: u64,
    pub frames_encoded: u64,
    pub encode_errors: u64,
    pub audio_packets_captured: u64,
    pub audio_packets_dropped: u64,
    pub video_chunks_written: u64,
    pub audio_chunks_written: u64,
    pub throttle_events: u64,
    pub restore_events: u64,
}

impl Stats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_dropped_capture: self.frames_dropped_capture.load(Ordering::Relaxed),
            frames_dropped_backpressure: self.frames_dropped_backpressure.load(Ordering::Relaxed),
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            audio_packets_captured: self.audio_packets_captured.load(Ordering::Relaxed),
            audio_packets_dropped: self.audio_packets_dropped.load(Ordering::Relaxed),
            video_chunks_written: self.video_chunks_written.load(Ordering::Relaxed),
            audio_chunks_written: self.audio_chunks_written.load(Ordering::Relaxed),
            throttle_events: self.throttle_events.load(Ordering::Relaxed),
            restore_events: self.restore_events.load(Ordering::Relaxed),
        }
    }
}
