use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use screencast_recorder::audio::SilentLoopback;
use screencast_recorder::auth::{check_entitlement, NoAuthGate};
use screencast_recorder::capture::SyntheticCapture;
use screencast_recorder::session::Session;
use screencast_recorder::{Args, Config};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match Config::from_args(args) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if !check_entitlement(config.no_auth, &NoAuthGate) {
        error!("entitlement check failed; pass --no-auth to bypass it in this build");
        return ExitCode::FAILURE;
    }

    let display_capture = Box::new(SyntheticCapture::new(config.width, config.height));
    let loopback_capture: Option<Box<dyn screencast_recorder::audio::LoopbackCapture>> =
        if config.audio {
            Some(Box::new(SilentLoopback::new()))
        } else {
            None
        };
    let auto_record_secs = config.auto_record_secs;

    let mut handle = match Session::build(config, display_capture, loopback_capture) {
        Ok(h) => h,
        Err(e) => {
            error!("failed to initialize recording session: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Ctrl+C stops an interactive (--auto-record 0) session cleanly; the
    // container is always finalized before exit.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_handler = interrupted.clone();
    if ctrlc::set_handler(move || {
        interrupted_handler.store(true, Ordering::SeqCst);
    })
    .is_err()
    {
        error!("failed to install Ctrl-C handler; stop with SIGKILL or --auto-record");
    }

    if auto_record_secs == 0 {
        info!("press Ctrl-C to stop recording");
    }
    handle.run();

    // `run` blocks for `--auto-record` internally and stops the session
    // itself before returning; an interactive (0) session keeps its worker
    // threads running until Ctrl-C is observed here.
    if auto_record_secs == 0 {
        while !interrupted.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        handle.stop();
    }

    let snapshot = handle.stats();
    info!(
        "session summary: frames_captured={} frames_encoded={} video_chunks={} audio_chunks={} \
         throttle_events={} restore_events={}",
        snapshot.frames_captured,
        snapshot.frames_encoded,
        snapshot.video_chunks_written,
        snapshot.audio_chunks_written,
        snapshot.throttle_events,
        snapshot.restore_events,
    );

    ExitCode::SUCCESS
}
