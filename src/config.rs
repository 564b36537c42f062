//! CLI surface and the validated, immutable configuration derived from it.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::RecorderError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Resolution {
    #[value(name = "720p")]
    R720p,
    #[value(name = "1080p")]
    R1080p,
    #[value(name = "1440p")]
    R1440p,
}

impl Resolution {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::R720p => (1280, 720),
            Resolution::R1080p => (1920, 1080),
            Resolution::R1440p => (2560, 1440),
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::R720p
    }
}

/// Real-time screen + system-audio recorder producing MJPEG/PCM in AVI.
#[derive(Parser, Debug)]
#[command(name = "screencast-recorder", version)]
pub struct Args {
    /// Target capture frame rate, 1 or higher.
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Capture resolution.
    #[arg(long, value_enum, default_value_t = Resolution::R720p)]
    pub res: Resolution,

    /// Capture system-mix audio in addition to video.
    #[arg(long, default_value_t = false)]
    pub audio: bool,

    /// Run for N seconds then stop automatically; 0 means run until
    /// interrupted (Ctrl-C).
    #[arg(long = "auto-record", default_value_t = 0)]
    pub auto_record: u64,

    /// Output AVI path.
    #[arg(long, default_value = "recording.avi")]
    pub output: PathBuf,

    /// Bypass the external entitlement check.
    #[arg(long = "no-auth", default_value_t = false)]
    pub no_auth: bool,
}

/// JPEG quality used by the encoder. Fixed per the spec; not CLI-exposed.
pub const JPEG_QUALITY: u8 = 75;
/// Frame buffer pool size (must be a power of two).
pub const FRAME_POOL_SIZE: usize = 4;
/// R1 (grabber -> encoder) ring capacity.
pub const CAPTURE_RING_CAPACITY: usize = 8;
/// R2 (encoder -> writer) ring capacity.
pub const VIDEO_RING_CAPACITY: usize = 32;
/// R3 (audio grabber -> writer) ring capacity.
pub const AUDIO_RING_CAPACITY: usize = 64;
/// Writer user-space buffer size before a flush is forced.
pub const WRITE_BUFFER_BYTES: usize = 8 * 1024 * 1024;

/// Fully resolved, validated configuration for a recording session.
#[derive(Clone, Debug)]
pub struct Config {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub audio: bool,
    pub auto_record_secs: u64,
    pub output: PathBuf,
    pub no_auth: bool,
    pub jpeg_quality: u8,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, RecorderError> {
        if args.fps < 1 {
            return Err(RecorderError::Config("--fps must be >= 1".into()));
        }
        let (width, height) = args.res.dimensions();
        if let Some(parent) = args.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(RecorderError::Config(format!(
                    "output directory does not exist: {}",
                    parent.display()
                )));
            }
        }
        Ok(Config {
            fps: args.fps,
            width,
            height,
            audio: args.audio,
            auto_record_secs: args.auto_record,
            output: args.output,
            no_auth: args.no_auth,
            jpeg_quality: JPEG_QUALITY.clamp(1, 100),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            fps: 30,
            res: Resolution::R720p,
            audio: false,
            auto_record: 0,
            output: PathBuf::from("recording.avi"),
            no_auth: false,
        }
    }

    #[test]
    fn from_args_resolves_resolution_to_dimensions() {
        let mut args = base_args();
        args.res = Resolution::R1080p;
        let cfg = Config::from_args(args).unwrap();
        assert_eq!((cfg.width, cfg.height), (1920, 1080));
    }

    #[test]
    fn from_args_rejects_zero_fps() {
        let mut args = base_args();
        args.fps = 0;
        assert!(Config::from_args(args).is_err());
    }

    #[test]
    fn from_args_rejects_missing_output_directory() {
        let mut args = base_args();
        args.output = PathBuf::from("/no/such/dir/out.avi");
        assert!(Config::from_args(args).is_err());
    }
}
