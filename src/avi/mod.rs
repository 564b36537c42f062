pub mod header;
mod interleave;

pub use interleave::WriterStage;

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use log::error;

use header::*;

use crate::error::RecorderError;

/// Streaming RIFF/AVI writer. Lifecycle: `open` -> `write_video`/
/// `write_audio` (any order, any count) -> `close`. Writing after `close`
/// is a programmer error (the muxer is consumed by `close`).
pub struct AviMuxer {
    file: File,
    buffer: Vec<u8>,
    buffer_capacity: usize,
    pos: u64,
    riff_size_offset: u64,
    hdrl_list_pos: u64,
    movi_list_pos: u64,
    movi_payload_start: u64,
    index: Vec<IndexEntry>,
    poisoned: bool,
}

pub struct StreamConfig {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
    pub audio_block_align: u16,
    pub has_audio: bool,
    pub write_buffer_bytes: usize,
}

impl AviMuxer {
    pub fn open(path: &Path, cfg: &StreamConfig) -> Result<Self, RecorderError> {
        let file = File::create(path)?;
        let mut muxer = AviMuxer {
            file,
            buffer: Vec::with_capacity(cfg.write_buffer_bytes),
            buffer_capacity: cfg.write_buffer_bytes,
            pos: 0,
            riff_size_offset: 0,
            hdrl_list_pos: 0,
            movi_list_pos: 0,
            movi_payload_start: 0,
            index: Vec::new(),
            poisoned: false,
        };
        muxer.write_skeleton(cfg)?;
        Ok(muxer)
    }

    fn write_skeleton(&mut self, cfg: &StreamConfig) -> Result<(), RecorderError> {
        self.raw_append(FCC_RIFF)?;
        self.riff_size_offset = self.pos;
        self.raw_append(&0u32.to_le_bytes())?; // RIFF size, patched at close
        self.raw_append(FCC_AVI)?;

        self.hdrl_list_pos = self.pos;
        self.raw_append(FCC_LIST)?;
        self.raw_append(&0u32.to_le_bytes())?; // hdrl size, patched at close
        self.raw_append(FCC_HDRL)?;

        let micro_sec_per_frame = if cfg.fps == 0 {
            33_333
        } else {
            1_000_000 / cfg.fps
        };
        let main_header = MainHeader {
            micro_sec_per_frame,
            streams: if cfg.has_audio { 2 } else { 1 },
            suggested_buffer_size: cfg.width * cfg.height * 3 / 2,
            width: cfg.width,
            height: cfg.height,
        };
        self.write_sized_chunk(FCC_AVIH, &main_header.to_bytes())?;

        // Video strl.
        let video_strh = StreamHeader::video(cfg.fps, cfg.width, cfg.height).to_bytes();
        let video_strf = BitmapInfoHeader {
            width: cfg.width,
            height: cfg.height,
        }
        .to_bytes();
        self.write_strl(&video_strh, &video_strf)?;

        if cfg.has_audio {
            let audio_strh =
                StreamHeader::audio(cfg.audio_sample_rate, cfg.audio_block_align).to_bytes();
            let audio_strf = WaveFormatEx {
                sample_rate: cfg.audio_sample_rate,
                channels: cfg.audio_channels,
                block_align: cfg.audio_block_align,
            }
            .to_bytes();
            self.write_strl(&audio_strh, &audio_strf)?;
        }

        self.movi_list_pos = self.pos;
        self.raw_append(FCC_LIST)?;
        self.raw_append(&0u32.to_le_bytes())?; // movi size, patched at close
        self.raw_append(FCC_MOVI)?;
        self.movi_payload_start = self.pos;

        Ok(())
    }

    fn write_strl(&mut self, strh: &[u8], strf: &[u8]) -> Result<(), RecorderError> {
        let list_size = 4 + (8 + strh.len() as u32) + (8 + strf.len() as u32);
        self.raw_append(FCC_LIST)?;
        self.raw_append(&list_size.to_le_bytes())?;
        self.raw_append(FCC_STRL)?;
        self.write_sized_chunk(FCC_STRH, strh)?;
        self.write_sized_chunk(FCC_STRF, strf)?;
        Ok(())
    }

    /// Writes a non-media chunk (fixed-size header structs, always even
    /// length here, so no padding is needed).
    fn write_sized_chunk(&mut self, fourcc: &[u8; 4], payload: &[u8]) -> Result<(), RecorderError> {
        self.raw_append(fourcc)?;
        self.raw_append(&(payload.len() as u32).to_le_bytes())?;
        self.raw_append(payload)?;
        if payload.len() % 2 == 1 {
            self.raw_append(&[0u8])?;
        }
        Ok(())
    }

    /// Writes a `'00dc'`/`'01wb'` media chunk and records its index entry.
    fn write_media_chunk(
        &mut self,
        fourcc: &[u8; 4],
        payload: &[u8],
        flags: u32,
    ) -> Result<(), RecorderError> {
        if self.poisoned {
            return Ok(());
        }
        let chunk_start = self.pos;
        if let Err(e) = self.write_sized_chunk(fourcc, payload) {
            self.poisoned = true;
            error!("avi writer poisoned: {e}");
            return Err(e);
        }
        self.index.push(IndexEntry {
            ckid: *fourcc,
            flags,
            offset: (chunk_start - self.movi_payload_start) as u32,
            size: payload.len() as u32,
        });
        Ok(())
    }

    pub fn write_video(&mut self, bytes: &[u8]) -> Result<(), RecorderError> {
        self.write_media_chunk(FCC_00DC, bytes, AVIIF_KEYFRAME)
    }

    pub fn write_audio(&mut self, bytes: &[u8]) -> Result<(), RecorderError> {
        self.write_media_chunk(FCC_01WB, bytes, 0)
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    pub fn close(mut self) -> Result<(), RecorderError> {
        if !self.poisoned {
            let idx1_start = self.pos;
            let mut idx_payload = Vec::with_capacity(self.index.len() * 16);
            for entry in &self.index {
                idx_payload.extend_from_slice(&entry.to_bytes());
            }
            self.write_sized_chunk(FCC_IDX1, &idx_payload)?;
            self.flush()?;

            let file_end = self.pos;
            let riff_size = (file_end - 8) as u32;
            let hdrl_size = (self.movi_list_pos - self.hdrl_list_pos - 8) as u32;
            let movi_size = (idx1_start - self.movi_list_pos - 8) as u32;

            self.patch(self.riff_size_offset, riff_size)?;
            self.patch(self.hdrl_list_pos + 4, hdrl_size)?;
            self.patch(self.movi_list_pos + 4, movi_size)?;
        } else {
            // Still attempt to backpatch what we can: sizes reflect
            // whatever was successfully written before poisoning.
            self.flush()?;
            let file_end = self.pos;
            let riff_size = (file_end - 8) as u32;
            let _ = self.patch(self.riff_size_offset, riff_size);
        }
        Ok(())
    }

    fn patch(&mut self, offset: u64, value: u32) -> Result<(), RecorderError> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn raw_append(&mut self, bytes: &[u8]) -> Result<(), RecorderError> {
        if bytes.len() > self.buffer_capacity {
            self.flush()?;
            self.file.write_all(bytes)?;
        } else {
            if self.buffer.len() + bytes.len() > self.buffer_capacity {
                self.flush()?;
            }
            self.buffer.extend_from_slice(bytes);
        }
        self.pos += bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RecorderError> {
        if !self.buffer.is_empty() {
            self.file.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn cfg(has_audio: bool) -> StreamConfig {
        StreamConfig {
            fps: 30,
            width: 16,
            height: 16,
            audio_sample_rate: 48_000,
            audio_channels: 2,
            audio_block_align: 4,
            has_audio,
            write_buffer_bytes: 64 * 1024,
        }
    }

    #[test]
    fn open_write_close_produces_consistent_riff_sizes() {
        let tmp = NamedTempFile::new().unwrap();
        let mut muxer = AviMuxer::open(tmp.path(), &cfg(true)).unwrap();
        muxer.write_video(&[0xAA; 10]).unwrap();
        muxer.write_audio(&[0xBB; 9]).unwrap(); // odd length exercises padding
        muxer.write_video(&[0xCC; 4]).unwrap();
        assert_eq!(muxer.index_len(), 3);
        muxer.close().unwrap();

        let mut file = File::open(tmp.path()).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();

        let riff_size = u32::from_le_bytes(data[4..8].try_into().unwrap());
        assert_eq!(riff_size as usize, data.len() - 8);

        assert_eq!(&data[8..12], FCC_AVI);
        assert_eq!(&data[12..16], FCC_LIST);
        let hdrl_size = u32::from_le_bytes(data[16..20].try_into().unwrap());
        assert_eq!(&data[20..24], FCC_HDRL);

        let movi_list_pos = 16 + hdrl_size as usize;
        assert_eq!(&data[movi_list_pos..movi_list_pos + 4], FCC_LIST);
        let movi_size = u32::from_le_bytes(
            data[movi_list_pos + 4..movi_list_pos + 8]
                .try_into()
                .unwrap(),
        );
        assert_eq!(&data[movi_list_pos + 8..movi_list_pos + 12], FCC_MOVI);

        let idx1_pos = movi_list_pos + 8 + movi_size as usize;
        assert_eq!(&data[idx1_pos..idx1_pos + 4], FCC_IDX1);
    }

    #[test]
    fn index_entries_do_not_overlap_and_respect_padding() {
        let tmp = NamedTempFile::new().unwrap();
        let mut muxer = AviMuxer::open(tmp.path(), &cfg(false)).unwrap();
        muxer.write_video(&[1; 7]).unwrap(); // odd
        muxer.write_video(&[2; 8]).unwrap();
        muxer.write_video(&[3; 5]).unwrap(); // odd
        let entries = muxer.index.clone();
        muxer.close().unwrap();

        for w in entries.windows(2) {
            let a = &w[0];
            let b = &w[1];
            let a_end = a.offset + 8 + (a.size as u32).div_ceil(2) * 2;
            assert!(a_end <= b.offset);
        }
    }

    #[test]
    fn video_chunks_are_flagged_as_keyframes() {
        let tmp = NamedTempFile::new().unwrap();
        let mut muxer = AviMuxer::open(tmp.path(), &cfg(false)).unwrap();
        muxer.write_video(&[0; 4]).unwrap();
        assert_eq!(muxer.index[0].flags, AVIIF_KEYFRAME);
        muxer.close().unwrap();
    }
}
