//! Adaptive Controller: samples the capture ring's fill level and
//! throttles/restores the frame grabber's target FPS under sustained
//! backpressure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::info;

use crate::ring::SpscRing;
use crate::stats::Stats;

const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);
const HIGH_THRESHOLD: f64 = 0.75;
const LOW_THRESHOLD: f64 = 0.25;
const HIGH_DWELL: Duration = Duration::from_millis(800);
const LOW_DWELL: Duration = Duration::from_millis(5000);
const THROTTLED_FPS: u32 = 30;

pub struct AdaptiveController {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AdaptiveController {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    pub fn start<F>(&mut self, ring: Arc<SpscRing<usize>>, set_fps: F, original_fps: u32, stats: Arc<Stats>)
    where
        F: Fn(u32) + Send + 'static,
    {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        self.thread = Some(thread::spawn(move || {
            let mut throttled = false;
            let mut high_since: Option<Instant> = None;
            let mut low_since: Option<Instant> = None;

            while running.load(Ordering::SeqCst) {
                let fill = ring.fill_factor();

                if fill >= HIGH_THRESHOLD {
                    high_since.get_or_insert_with(Instant::now);
                } else {
                    high_since = None;
                }
                if fill <= LOW_THRESHOLD {
                    low_since.get_or_insert_with(Instant::now);
                } else {
                    low_since = None;
                }

                if !throttled
                    && original_fps > THROTTLED_FPS
                    && high_since.is_some_and(|t| t.elapsed() >= HIGH_DWELL)
                {
                    set_fps(THROTTLED_FPS);
                    throttled = true;
                    stats.throttle_events.fetch_add(1, Ordering::Relaxed);
                    info!("adaptive controller: throttled to {THROTTLED_FPS} fps (fill={fill:.2})");
                } else if throttled
                    && original_fps > THROTTLED_FPS
                    && low_since.is_some_and(|t| t.elapsed() >= LOW_DWELL)
                {
                    set_fps(original_fps);
                    throttled = false;
                    stats.restore_events.fetch_add(1, Ordering::Relaxed);
                    info!("adaptive controller: restored to {original_fps} fps (fill={fill:.2})");
                }

                thread::sleep(SAMPLE_INTERVAL);
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

impl Default for AdaptiveController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AdaptiveController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn push_n(ring: &SpscRing<usize>, n: usize) {
        for i in 0..n {
            ring.push(i).unwrap();
        }
    }

    #[test]
    fn throttles_once_after_sustained_high_fill() {
        let ring = Arc::new(SpscRing::<usize>::new(8));
        push_n(&ring, 6); // fill_factor = 6/7 ~ 0.857 >= 0.75
        let stats = Arc::new(Stats::new());
        let calls: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();

        let mut controller = AdaptiveController::new();
        controller.start(ring.clone(), move |fps| calls_clone.lock().unwrap().push(fps), 60, stats);

        thread::sleep(Duration::from_millis(1100));
        controller.stop();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[30]);
    }

    #[test]
    fn does_not_throttle_before_high_dwell_elapses() {
        let ring = Arc::new(SpscRing::<usize>::new(8));
        push_n(&ring, 6);
        let stats = Arc::new(Stats::new());
        let calls: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();

        let mut controller = AdaptiveController::new();
        controller.start(ring.clone(), move |fps| calls_clone.lock().unwrap().push(fps), 60, stats);

        thread::sleep(Duration::from_millis(700));
        // drop fill before the 800ms high dwell threshold is reached
        while ring.pop().is_some() {}
        thread::sleep(Duration::from_millis(200));
        controller.stop();

        assert!(calls.lock().unwrap().is_empty());
    }
}
