//! Audio Grabber: polls the system loopback mix and publishes timestamped
//! PCM packets onto the audio ring.
//!
//! Loopback capture is a trait boundary ([`LoopbackCapture`]); this crate
//! ships only [`SilentLoopback`], which never touches an OS API. A real
//! backend (WASAPI loopback, PulseAudio monitor, ...) implements the same
//! trait and is out of scope here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::packet::{AudioFormat, AudioPacket};
use crate::ring::SpscRing;
use crate::stats::Stats;

pub trait LoopbackCapture: Send {
    fn format(&self) -> AudioFormat;
    /// Returns the next available packet, or `None` if nothing is queued.
    fn next_packet(&mut self) -> Option<Vec<u8>>;
}

/// Yields a fixed-size buffer of silence at the cadence implied by its
/// format's byte rate, in place of a real OS loopback endpoint.
pub struct SilentLoopback {
    format: AudioFormat,
    packet_frames: usize,
    last_emit: Instant,
    packet_interval: Duration,
}

impl SilentLoopback {
    pub fn new() -> Self {
        let format = AudioFormat {
            sample_rate: 48_000,
            channels: 2,
            block_align: 4,
        };
        let packet_frames = 480; // 10ms @ 48kHz
        let packet_interval =
            Duration::from_millis(1000 * packet_frames as u64 / format.sample_rate as u64);
        Self {
            format,
            packet_frames,
            last_emit: Instant::now() - packet_interval,
            packet_interval,
        }
    }
}

impl Default for SilentLoopback {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackCapture for SilentLoopback {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn next_packet(&mut self) -> Option<Vec<u8>> {
        if self.last_emit.elapsed() < self.packet_interval {
            return None;
        }
        self.last_emit = Instant::now();
        let bytes = self.packet_frames * self.format.block_align as usize;
        Some(vec![0u8; bytes])
    }
}

pub struct AudioGrabber {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    format: AudioFormat,
}

impl AudioGrabber {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            format,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn start(
        &mut self,
        mut capture: Box<dyn LoopbackCapture>,
        ring: Arc<SpscRing<AudioPacket>>,
        epoch: Instant,
        stats: Arc<Stats>,
    ) {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        self.thread = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                match capture.next_packet() {
                    Some(bytes) => {
                        let pts_ms = epoch.elapsed().as_millis() as u64;
                        stats
                            .audio_packets_captured
                            .fetch_add(1, Ordering::Relaxed);
                        if ring.push(AudioPacket { bytes, pts_ms }).is_err() {
                            stats.audio_packets_dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    None => thread::sleep(Duration::from_millis(10)),
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for AudioGrabber {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_loopback_reports_fixed_format() {
        let lb = SilentLoopback::new();
        let fmt = lb.format();
        assert_eq!(fmt.sample_rate, 48_000);
        assert_eq!(fmt.channels, 2);
    }

    #[test]
    fn silent_loopback_does_not_emit_before_its_packet_interval() {
        let mut lb = SilentLoopback::new();
        assert!(lb.next_packet().is_some());
        assert!(lb.next_packet().is_none());
    }
}
