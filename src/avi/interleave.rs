//! Writer thread: interleaves R2 (video) and R3 (audio) by timestamp and
//! drives the [`AviMuxer`]'s streaming write protocol.
//!
//! Policy (the "hold-one-side" interleave): at most one packet per stream
//! is held at a time. When both sides are held, the smaller `pts_ms` wins,
//! ties favor video. When only one side is held, it is written once the
//! other ring has been empty for one polling interval, rather than being
//! pushed back onto the ring it came from (re-pushing would violate SPSC
//! discipline, since the writer is not R2/R3's producer).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{error, info};

use super::{AviMuxer, StreamConfig};
use crate::error::RecorderError;
use crate::packet::{AudioPacket, VideoPacket};
use crate::ring::SpscRing;
use crate::stats::Stats;

const POLL_INTERVAL: Duration = Duration::from_millis(1);
const EMPTY_SIDE_GRACE: Duration = Duration::from_millis(10);

pub struct WriterStage {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WriterStage {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    pub fn start(
        &mut self,
        path: std::path::PathBuf,
        stream_config: StreamConfig,
        video_ring: Arc<SpscRing<VideoPacket>>,
        audio_ring: Arc<SpscRing<AudioPacket>>,
        stats: Arc<Stats>,
    ) {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        self.thread = Some(thread::spawn(move || {
            let muxer = match AviMuxer::open(&path, &stream_config) {
                Ok(m) => m,
                Err(e) => {
                    error!("failed to open {}: {e}", path.display());
                    return;
                }
            };
            run_interleave_loop(muxer, running, video_ring, audio_ring, stats);
        }));
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Default for WriterStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WriterStage {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_interleave_loop(
    mut muxer: AviMuxer,
    running: Arc<AtomicBool>,
    video_ring: Arc<SpscRing<VideoPacket>>,
    audio_ring: Arc<SpscRing<AudioPacket>>,
    stats: Arc<Stats>,
) {
    let mut held_video: Option<VideoPacket> = None;
    let mut held_audio: Option<AudioPacket> = None;
    let mut video_empty_since: Option<Instant> = None;
    let mut audio_empty_since: Option<Instant> = None;

    loop {
        if held_video.is_none() {
            match video_ring.pop() {
                Some(v) => {
                    held_video = Some(v);
                    video_empty_since = None;
                }
                None => {
                    video_empty_since.get_or_insert_with(Instant::now);
                }
            }
        }
        if held_audio.is_none() {
            match audio_ring.pop() {
                Some(a) => {
                    held_audio = Some(a);
                    audio_empty_since = None;
                }
                None => {
                    audio_empty_since.get_or_insert_with(Instant::now);
                }
            }
        }

        match (&held_video, &held_audio) {
            (Some(v), Some(a)) => {
                if v.pts_ms <= a.pts_ms {
                    let v = held_video.take().unwrap();
                    write_video(&mut muxer, &stats, &v);
                } else {
                    let a = held_audio.take().unwrap();
                    write_audio(&mut muxer, &stats, &a);
                }
            }
            (Some(_), None) => {
                if audio_empty_since.is_some_and(|t| t.elapsed() >= EMPTY_SIDE_GRACE) {
                    let v = held_video.take().unwrap();
                    write_video(&mut muxer, &stats, &v);
                }
            }
            (None, Some(_)) => {
                if video_empty_since.is_some_and(|t| t.elapsed() >= EMPTY_SIDE_GRACE) {
                    let a = held_audio.take().unwrap();
                    write_audio(&mut muxer, &stats, &a);
                }
            }
            (None, None) => {}
        }

        if !running.load(Ordering::SeqCst) {
            let rings_drained = held_video.is_none()
                && held_audio.is_none()
                && video_ring.is_empty()
                && audio_ring.is_empty();
            if rings_drained {
                break;
            }
        }

        thread::sleep(POLL_INTERVAL);
    }

    // Drain: write any remaining held/queued packets in timestamp order.
    loop {
        if held_video.is_none() {
            held_video = video_ring.pop();
        }
        if held_audio.is_none() {
            held_audio = audio_ring.pop();
        }
        match (held_video.take(), held_audio.take()) {
            (Some(v), Some(a)) => {
                if v.pts_ms <= a.pts_ms {
                    write_video(&mut muxer, &stats, &v);
                    held_audio = Some(a);
                } else {
                    write_audio(&mut muxer, &stats, &a);
                    held_video = Some(v);
                }
            }
            (Some(v), None) => write_video(&mut muxer, &stats, &v),
            (None, Some(a)) => write_audio(&mut muxer, &stats, &a),
            (None, None) => break,
        }
    }

    if let Err(e) = muxer.close() {
        error!("error closing avi container: {e}");
    } else {
        info!("avi container closed cleanly");
    }
}

fn write_video(muxer: &mut AviMuxer, stats: &Stats, packet: &VideoPacket) {
    match muxer.write_video(&packet.bytes) {
        Ok(()) => {
            stats.video_chunks_written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => log_write_error(e),
    }
}

fn write_audio(muxer: &mut AviMuxer, stats: &Stats, packet: &AudioPacket) {
    match muxer.write_audio(&packet.bytes) {
        Ok(()) => {
            stats.audio_chunks_written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => log_write_error(e),
    }
}

fn log_write_error(e: RecorderError) {
    error!("avi write failed: {e}");
}
