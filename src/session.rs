//! Session: the single owning object for a recording run. Construction
//! order fixes destruction order (pool and rings outlive the threads that
//! reference them; threads are stopped and joined, in order, before the
//! pool and rings are dropped).

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;

use crate::audio::{AudioGrabber, LoopbackCapture};
use crate::avi::{StreamConfig, WriterStage};
use crate::capture::{DisplayCapture, FrameGrabber};
use crate::codec::JpegEncoderStage;
use crate::config::{
    Config, AUDIO_RING_CAPACITY, CAPTURE_RING_CAPACITY, VIDEO_RING_CAPACITY, WRITE_BUFFER_BYTES,
};
use crate::controller::AdaptiveController;
use crate::error::RecorderError;
use crate::packet::{AudioFormat, AudioPacket, VideoPacket};
use crate::pool::FrameBufferPool;
use crate::ring::SpscRing;
use crate::stats::{Stats, StatsSnapshot};

pub struct Session {
    config: Config,
    epoch: Instant,
    pool: Arc<FrameBufferPool>,
    capture_ring: Arc<SpscRing<usize>>,
    video_ring: Arc<SpscRing<VideoPacket>>,
    audio_ring: Arc<SpscRing<AudioPacket>>,
    stats: Arc<Stats>,
    grabber: FrameGrabber,
    audio_grabber: AudioGrabber,
    encoder: JpegEncoderStage,
    writer: WriterStage,
    controller: AdaptiveController,
    running: bool,
}

impl Session {
    /// Validates nothing beyond what `Config` already validated; allocates
    /// the pool and rings but does not start any thread.
    pub fn build(
        config: Config,
        display_capture: Box<dyn DisplayCapture>,
        loopback_capture: Option<Box<dyn LoopbackCapture>>,
    ) -> Result<SessionHandle, RecorderError> {
        let pool = Arc::new(FrameBufferPool::new(
            config.width,
            config.height,
            crate::config::FRAME_POOL_SIZE,
        ));
        let capture_ring = Arc::new(SpscRing::new(CAPTURE_RING_CAPACITY));
        let video_ring = Arc::new(SpscRing::new(VIDEO_RING_CAPACITY));
        let audio_ring = Arc::new(SpscRing::new(AUDIO_RING_CAPACITY));
        let stats = Arc::new(Stats::new());

        let audio_format = loopback_capture
            .as_ref()
            .map(|c| c.format())
            .unwrap_or(AudioFormat {
                sample_rate: 48_000,
                channels: 2,
                block_align: 4,
            });

        let session = Session {
            config,
            epoch: Instant::now(),
            pool,
            capture_ring,
            video_ring,
            audio_ring,
            stats,
            grabber: FrameGrabber::new(),
            audio_grabber: AudioGrabber::new(audio_format),
            encoder: JpegEncoderStage::new(),
            writer: WriterStage::new(),
            controller: AdaptiveController::new(),
            running: false,
        };

        Ok(SessionHandle {
            session,
            display_capture: Some(display_capture),
            loopback_capture,
        })
    }
}

/// Wraps a built [`Session`] together with the platform capture boundaries
/// it has not yet handed off to worker threads.
pub struct SessionHandle {
    session: Session,
    display_capture: Option<Box<dyn DisplayCapture>>,
    loopback_capture: Option<Box<dyn LoopbackCapture>>,
}

impl SessionHandle {
    /// Spawns the five long-lived threads in order A, B, D, E, F and blocks
    /// until `--auto-record` elapses or `stop()` is called from another
    /// thread (e.g. a Ctrl-C handler).
    pub fn run(&mut self) {
        let s = &mut self.session;
        s.running = true;

        // A: frame grabber.
        let display_capture = self.display_capture.take().expect("run called once");
        s.grabber.start(
            display_capture,
            s.pool.clone(),
            s.capture_ring.clone(),
            s.config.fps,
            s.stats.clone(),
        );

        // B: audio grabber, only if audio was requested.
        if s.config.audio {
            let loopback = self
                .loopback_capture
                .take()
                .unwrap_or_else(|| Box::new(crate::audio::SilentLoopback::new()));
            s.audio_grabber
                .start(loopback, s.audio_ring.clone(), s.epoch, s.stats.clone());
        }

        // D: JPEG encoder.
        s.encoder.start(
            s.pool.clone(),
            s.capture_ring.clone(),
            s.video_ring.clone(),
            s.config.jpeg_quality,
            s.epoch,
            s.stats.clone(),
        );

        // E: AVI muxer / writer.
        let audio_format = s.audio_grabber.format();
        let stream_config = StreamConfig {
            fps: s.config.fps,
            width: s.config.width,
            height: s.config.height,
            audio_sample_rate: audio_format.sample_rate,
            audio_channels: audio_format.channels,
            audio_block_align: audio_format.block_align,
            has_audio: s.config.audio,
            write_buffer_bytes: WRITE_BUFFER_BYTES,
        };
        s.writer.start(
            s.config.output.clone(),
            stream_config,
            s.video_ring.clone(),
            s.audio_ring.clone(),
            s.stats.clone(),
        );

        // F: adaptive controller, advisory only.
        let original_fps = s.config.fps;
        let fps_handle = s.grabber.fps_handle();
        let set_fps = move |fps: u32| fps_handle.set(fps);
        s.controller.start(
            s.capture_ring.clone(),
            set_fps,
            original_fps,
            s.stats.clone(),
        );

        info!(
            "recording started: {}x{} @ {} fps, audio={}, output={}",
            s.config.width,
            s.config.height,
            s.config.fps,
            s.config.audio,
            s.config.output.display()
        );

        if s.config.auto_record_secs > 0 {
            std::thread::sleep(Duration::from_secs(s.config.auto_record_secs));
            self.stop();
        }
    }

    /// Idempotent. Sets `running` false and joins in order A, B, D, E, F.
    pub fn stop(&mut self) {
        let s = &mut self.session;
        if !s.running {
            return;
        }
        s.running = false;
        s.grabber.stop();
        s.audio_grabber.stop();
        s.encoder.stop();
        s.writer.stop();
        s.controller.stop();
        info!("recording stopped");
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.session.stats.snapshot()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

