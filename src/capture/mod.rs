//! Frame Grabber: periodically snapshots the display into the frame pool
//! and publishes the written index on the capture ring.
//!
//! Platform capture is a trait boundary ([`DisplayCapture`]); this crate
//! ships only [`SyntheticCapture`], a deterministic test-pattern generator.
//! A real OS backend (GDI, X11, ScreenCaptureKit, ...) implements the same
//! trait and is out of scope here.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::warn;

use crate::error::RecorderError;
use crate::pool::FrameBufferPool;
use crate::ring::SpscRing;
use crate::stats::Stats;

/// Platform capture boundary: fills `buf` (top-down BGRA, `width*height*4`
/// bytes) with the current display contents.
pub trait DisplayCapture: Send {
    fn dimensions(&self) -> (u32, u32);
    fn capture_into(&mut self, buf: &mut [u8]) -> Result<(), RecorderError>;
}

/// Deterministic animated test pattern; used in place of a real platform
/// capture backend.
pub struct SyntheticCapture {
    width: u32,
    height: u32,
    tick: u32,
}

impl SyntheticCapture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }
}

impl DisplayCapture for SyntheticCapture {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture_into(&mut self, buf: &mut [u8]) -> Result<(), RecorderError> {
        let shade = (self.tick % 256) as u8;
        for px in buf.chunks_exact_mut(4) {
            px[0] = shade; // B
            px[1] = shade.wrapping_add(85); // G
            px[2] = shade.wrapping_add(170); // R
            px[3] = 0xFF; // A
        }
        self.tick = self.tick.wrapping_add(1);
        Ok(())
    }
}

/// A clonable, 'static handle onto just a grabber's target-FPS cell, for
/// handing to the adaptive controller without sharing the rest of the
/// grabber.
#[derive(Clone)]
pub struct FpsHandle(Arc<AtomicU32>);

impl FpsHandle {
    /// Thread-safe; takes effect on the grabber's next tick. Values below 1
    /// clamp to 1.
    pub fn set(&self, fps: u32) {
        self.0.store(fps.max(1), Ordering::Relaxed);
    }
}

/// Runs the grabber thread: capture -> pool slot -> push index onto `ring`.
pub struct FrameGrabber {
    running: Arc<AtomicBool>,
    target_fps: Arc<AtomicU32>,
    thread: Option<JoinHandle<()>>,
}

impl FrameGrabber {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            target_fps: Arc::new(AtomicU32::new(30)),
            thread: None,
        }
    }

    /// Thread-safe; takes effect on the grabber's next tick. Values below 1
    /// clamp to 1.
    pub fn set_fps(&self, fps: u32) {
        self.target_fps.store(fps.max(1), Ordering::Relaxed);
    }

    /// A clonable, 'static handle onto just the FPS cell, for handing to
    /// the adaptive controller without sharing the rest of the grabber.
    pub fn fps_handle(&self) -> FpsHandle {
        FpsHandle(self.target_fps.clone())
    }

    pub fn start(
        &mut self,
        mut capture: Box<dyn DisplayCapture>,
        pool: Arc<FrameBufferPool>,
        ring: Arc<SpscRing<usize>>,
        initial_fps: u32,
        stats: Arc<Stats>,
    ) {
        self.target_fps.store(initial_fps.max(1), Ordering::Relaxed);
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let target_fps = self.target_fps.clone();

        self.thread = Some(thread::spawn(move || {
            let n = pool.len();
            let mut write_ix = 0usize;
            let mut next_tick = Instant::now();

            while running.load(Ordering::SeqCst) {
                let fps = target_fps.load(Ordering::Relaxed).max(1);
                let interval = Duration::from_millis(1000 / fps as u64);

                // SAFETY: write_ix was not handed to the encoder until the
                // push below; no reader can be observing it concurrently.
                let capture_result =
                    unsafe { pool.write(write_ix, |buf| capture.capture_into(buf)) };

                match capture_result {
                    Ok(()) => {
                        stats.frames_captured.fetch_add(1, Ordering::Relaxed);
                        if ring.push(write_ix).is_err() {
                            stats
                                .frames_dropped_backpressure
                                .fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(e) => {
                        warn!("capture failure on buffer {write_ix}: {e}");
                        stats.frames_dropped_capture.fetch_add(1, Ordering::Relaxed);
                    }
                }

                write_ix = (write_ix + 1) % n;

                next_tick += interval;
                let now = Instant::now();
                if next_tick > now {
                    thread::sleep(next_tick - now);
                } else {
                    // capture+publish exceeded the interval: no compensating
                    // oversleep, begin the next capture immediately.
                    next_tick = now;
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

impl Default for FrameGrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameGrabber {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_capture_fills_buffer_with_opaque_pixels() {
        let mut cap = SyntheticCapture::new(2, 2);
        let mut buf = vec![0u8; 2 * 2 * 4];
        cap.capture_into(&mut buf).unwrap();
        for px in buf.chunks_exact(4) {
            assert_eq!(px[3], 0xFF);
        }
    }

    #[test]
    fn set_fps_clamps_below_one() {
        let grabber = FrameGrabber::new();
        grabber.set_fps(0);
        assert_eq!(grabber.target_fps.load(Ordering::Relaxed), 1);
    }
}
