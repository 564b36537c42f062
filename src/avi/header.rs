//! Binary layout of the RIFF/AVI structures this muxer emits.
//!
//! All multi-byte integers are little-endian; every struct here is written
//! at a fixed size matching the classic AVI 1.0 layout.

pub const FCC_RIFF: &[u8; 4] = b"RIFF";
pub const FCC_AVI: &[u8; 4] = b"AVI ";
pub const FCC_LIST: &[u8; 4] = b"LIST";
pub const FCC_HDRL: &[u8; 4] = b"hdrl";
pub const FCC_AVIH: &[u8; 4] = b"avih";
pub const FCC_STRL: &[u8; 4] = b"strl";
pub const FCC_STRH: &[u8; 4] = b"strh";
pub const FCC_STRF: &[u8; 4] = b"strf";
pub const FCC_MOVI: &[u8; 4] = b"movi";
pub const FCC_IDX1: &[u8; 4] = b"idx1";
pub const FCC_VIDS: &[u8; 4] = b"vids";
pub const FCC_AUDS: &[u8; 4] = b"auds";
pub const FCC_MJPG: &[u8; 4] = b"MJPG";
pub const FCC_00DC: &[u8; 4] = b"00dc";
pub const FCC_01WB: &[u8; 4] = b"01wb";

pub const AVIIF_KEYFRAME: u32 = 0x10;

pub const AVIH_SIZE: u32 = 56;
pub const STRH_SIZE: u32 = 56;
pub const STRF_VIDEO_SIZE: u32 = 40;
pub const STRF_AUDIO_SIZE: u32 = 18;

/// `avih` main AVI header (56 bytes).
pub struct MainHeader {
    pub micro_sec_per_frame: u32,
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
}

impl MainHeader {
    pub fn to_bytes(&self) -> [u8; AVIH_SIZE as usize] {
        let mut buf = [0u8; AVIH_SIZE as usize];
        buf[0..4].copy_from_slice(&self.micro_sec_per_frame.to_le_bytes());
        // dwMaxBytesPerSec (4..8) and dwPaddingGranularity (8..12) and
        // dwFlags (12..16) are all zero per spec.
        // dwTotalFrames (16..20), dwInitialFrames (20..24) zero.
        buf[24..28].copy_from_slice(&self.streams.to_le_bytes());
        buf[28..32].copy_from_slice(&self.suggested_buffer_size.to_le_bytes());
        buf[32..36].copy_from_slice(&self.width.to_le_bytes());
        buf[36..40].copy_from_slice(&self.height.to_le_bytes());
        // dwReserved[4] (40..56) zero.
        buf
    }
}

/// `strh` stream header (56 bytes): fccType(4) fccHandler(4) dwFlags(4)
/// wPriority(2) wLanguage(2) dwInitialFrames(4) dwScale(4) dwRate(4)
/// dwStart(4) dwLength(4) dwSuggestedBufferSize(4) dwQuality(4)
/// dwSampleSize(4) rcFrame{left,top,right,bottom}(2 each = 8).
pub struct StreamHeader {
    pub fcc_type: [u8; 4],
    pub fcc_handler: [u8; 4],
    pub scale: u32,
    pub rate: u32,
    pub quality: u32,
    pub sample_size: u32,
    pub rect: (i16, i16, i16, i16),
}

impl StreamHeader {
    pub fn to_bytes(&self) -> [u8; STRH_SIZE as usize] {
        let mut buf = [0u8; STRH_SIZE as usize];
        buf[0..4].copy_from_slice(&self.fcc_type);
        buf[4..8].copy_from_slice(&self.fcc_handler);
        // dwFlags (8..12) zero.
        // wPriority (12..14), wLanguage (14..16) zero.
        // dwInitialFrames (16..20) zero.
        buf[20..24].copy_from_slice(&self.scale.to_le_bytes());
        buf[24..28].copy_from_slice(&self.rate.to_le_bytes());
        // dwStart (28..32), dwLength (32..36) zero (unknown at stream open).
        // dwSuggestedBufferSize (36..40) zero.
        buf[40..44].copy_from_slice(&self.quality.to_le_bytes());
        buf[44..48].copy_from_slice(&self.sample_size.to_le_bytes());
        buf[48..50].copy_from_slice(&self.rect.0.to_le_bytes());
        buf[50..52].copy_from_slice(&self.rect.1.to_le_bytes());
        buf[52..54].copy_from_slice(&self.rect.2.to_le_bytes());
        buf[54..56].copy_from_slice(&self.rect.3.to_le_bytes());
        buf
    }

    pub fn video(fps: u32, width: u32, height: u32) -> Self {
        StreamHeader {
            fcc_type: *FCC_VIDS,
            fcc_handler: *FCC_MJPG,
            scale: 1,
            rate: fps,
            quality: 0xFFFF_FFFF,
            sample_size: 0,
            rect: (0, 0, width as i16, height as i16),
        }
    }

    pub fn audio(sample_rate: u32, block_align: u16) -> Self {
        StreamHeader {
            fcc_type: *FCC_AUDS,
            fcc_handler: [0; 4],
            scale: block_align as u32,
            rate: sample_rate * block_align as u32,
            quality: 0,
            sample_size: block_align as u32,
            rect: (0, 0, 0, 0),
        }
    }
}

/// `strf` video format (BITMAPINFOHEADER, 40 bytes).
pub struct BitmapInfoHeader {
    pub width: u32,
    pub height: u32,
}

impl BitmapInfoHeader {
    pub fn to_bytes(&self) -> [u8; STRF_VIDEO_SIZE as usize] {
        let mut buf = [0u8; STRF_VIDEO_SIZE as usize];
        buf[0..4].copy_from_slice(&STRF_VIDEO_SIZE.to_le_bytes()); // biSize
        buf[4..8].copy_from_slice(&(self.width as i32).to_le_bytes());
        buf[8..12].copy_from_slice(&(self.height as i32).to_le_bytes());
        buf[12..14].copy_from_slice(&1u16.to_le_bytes()); // biPlanes
        buf[14..16].copy_from_slice(&24u16.to_le_bytes()); // biBitCount
        buf[16..20].copy_from_slice(FCC_MJPG); // biCompression
        let size_image = self.width * self.height * 3;
        buf[20..24].copy_from_slice(&size_image.to_le_bytes());
        // biXPelsPerMeter, biYPelsPerMeter, biClrUsed, biClrImportant zero.
        buf
    }
}

/// `strf` audio format (WAVEFORMATEX, 18 bytes).
pub struct WaveFormatEx {
    pub sample_rate: u32,
    pub channels: u16,
    pub block_align: u16,
}

impl WaveFormatEx {
    pub fn to_bytes(&self) -> [u8; STRF_AUDIO_SIZE as usize] {
        let mut buf = [0u8; STRF_AUDIO_SIZE as usize];
        buf[0..2].copy_from_slice(&1u16.to_le_bytes()); // wFormatTag = PCM
        buf[2..4].copy_from_slice(&self.channels.to_le_bytes());
        buf[4..8].copy_from_slice(&self.sample_rate.to_le_bytes());
        let avg_bytes_per_sec = self.sample_rate * self.block_align as u32;
        buf[8..12].copy_from_slice(&avg_bytes_per_sec.to_le_bytes());
        buf[12..14].copy_from_slice(&self.block_align.to_le_bytes());
        let bits_per_sample = if self.channels > 0 {
            (self.block_align / self.channels) * 8
        } else {
            0
        };
        buf[14..16].copy_from_slice(&bits_per_sample.to_le_bytes());
        // cbSize (16..18) zero.
        buf
    }
}

/// One `idx1` entry (16 bytes): ckid(4) flags(4) offset(4) size(4).
#[derive(Clone, Copy)]
pub struct IndexEntry {
    pub ckid: [u8; 4],
    pub flags: u32,
    pub offset: u32,
    pub size: u32,
}

impl IndexEntry {
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&self.ckid);
        buf[4..8].copy_from_slice(&self.flags.to_le_bytes());
        buf[8..12].copy_from_slice(&self.offset.to_le_bytes());
        buf[12..16].copy_from_slice(&self.size.to_le_bytes());
        buf
    }
}
