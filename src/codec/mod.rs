pub mod jpeg;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::warn;

use crate::packet::VideoPacket;
use crate::pool::FrameBufferPool;
use crate::ring::SpscRing;
use crate::stats::Stats;

/// Consumes buffer indices from R1, encodes the referenced frame, and
/// pushes the resulting [`VideoPacket`] onto R2.
pub struct JpegEncoderStage {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl JpegEncoderStage {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    pub fn start(
        &mut self,
        pool: Arc<FrameBufferPool>,
        input: Arc<SpscRing<usize>>,
        output: Arc<SpscRing<VideoPacket>>,
        quality: u8,
        epoch: std::time::Instant,
        stats: Arc<Stats>,
    ) {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        self.thread = Some(thread::spawn(move || {
            let (w, h) = pool.dimensions();
            while running.load(Ordering::SeqCst) {
                let Some(ix) = input.pop() else {
                    thread::sleep(Duration::from_millis(1));
                    continue;
                };

                // SAFETY: `ix` was just popped off the ring that
                // synchronizes the handoff from the grabber.
                let encoded =
                    unsafe { pool.read(ix, |bgra| jpeg::encode_jpeg(bgra, w, h, quality)) };

                match encoded {
                    Ok(bytes) if !bytes.is_empty() => {
                        stats.frames_encoded.fetch_add(1, Ordering::Relaxed);
                        let pts_ms = epoch.elapsed().as_millis() as u64;
                        let mut packet = VideoPacket { bytes, pts_ms };
                        // encoder is the sole producer on R2: on backpressure
                        // busy-wait 1ms and retry rather than silently drop,
                        // per the spec's suspension-point table (D busy-waits
                        // 1ms when R2 is full).
                        while running.load(Ordering::SeqCst) {
                            match output.push(packet) {
                                Ok(()) => break,
                                Err(returned) => {
                                    packet = returned;
                                    thread::sleep(Duration::from_millis(1));
                                }
                            }
                        }
                    }
                    Ok(_) => {
                        warn!("encoder returned empty output for buffer {ix}");
                        stats.encode_errors.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!("jpeg encode failed for buffer {ix}: {e}");
                        stats.encode_errors.fetch_add(1, Ordering::Relaxed);
                    }
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

impl Default for JpegEncoderStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for JpegEncoderStage {
    fn drop(&mut self) {
        self.stop();
    }
}
