//! Wire-level packet shapes moved across the SPSC rings.

/// A complete JPEG bitstream (SOI..EOI) with its capture timestamp.
#[derive(Clone)]
pub struct VideoPacket {
    pub bytes: Vec<u8>,
    pub pts_ms: u64,
}

/// Raw PCM in the loopback device's native format, with the timestamp at
/// which it was drained from the OS buffer.
#[derive(Clone)]
pub struct AudioPacket {
    pub bytes: Vec<u8>,
    pub pts_ms: u64,
}

/// Loopback audio format, captured once at init and held immutable for the
/// session.
#[derive(Clone, Copy, Debug)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub block_align: u16,
}
