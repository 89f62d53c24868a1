use std::time::Duration;

use bytes::BytesMut;
use uartframe_transport::ByteSink;

use crate::checksum::checksum;
use crate::error::{FrameError, Result};

/// Start delimiter for payloads shorter than 256 bytes (1-byte length).
pub const START_SHORT: u8 = 0x02;

/// Start delimiter for payloads of 256 bytes or more (2-byte length).
pub const START_LONG: u8 = 0x03;

/// End delimiter.
pub const END: u8 = 0x03;

/// Longest payload the short form can describe.
pub const MAX_SHORT_PAYLOAD: usize = u8::MAX as usize;

/// Longest payload the wire format can describe at all.
pub const MAX_WIRE_PAYLOAD: usize = u16::MAX as usize;

/// Default decoder buffer capacity: 4 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 4 * 1024;

/// Bytes a frame adds around its payload.
pub fn frame_overhead(payload_len: usize) -> usize {
    let length_field = if payload_len > MAX_SHORT_PAYLOAD { 2 } else { 1 };
    1 + length_field + 2 + 1
}

/// The total wire size of a frame carrying `payload_len` bytes.
pub fn wire_size(payload_len: usize) -> usize {
    payload_len + frame_overhead(payload_len)
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────────────────┬──────────┬────────────┬──────────┐
/// │ Start (1B) │ Length           │ Payload  │ CRC (2B BE)│ End (1B) │
/// │ 0x02 short │ 1B  if len < 256 │ (Length) │ XMODEM     │ 0x03     │
/// │ 0x03 long  │ 2B BE otherwise  │          │ payload    │          │
/// └────────────┴──────────────────┴──────────┴────────────┴──────────┘
/// ```
///
/// The length field counts payload bytes only.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    dst.reserve(wire_size(payload.len()));
    write_frame(payload, dst)
}

/// Push a frame into `sink` one byte at a time, in wire order.
///
/// Holds no state between calls and never retries. Sink failures abort the
/// frame mid-way; the receiver drops the partial frame on its own.
pub fn write_frame<S: ByteSink + ?Sized>(payload: &[u8], sink: &mut S) -> Result<()> {
    if payload.len() > MAX_WIRE_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_WIRE_PAYLOAD,
        });
    }

    let crc = checksum(payload);
    let len = payload.len() as u16;

    if payload.len() <= MAX_SHORT_PAYLOAD {
        sink.write_byte(START_SHORT)?;
        sink.write_byte(len as u8)?;
    } else {
        let [hi, lo] = len.to_be_bytes();
        sink.write_byte(START_LONG)?;
        sink.write_byte(hi)?;
        sink.write_byte(lo)?;
    }

    for &byte in payload {
        sink.write_byte(byte)?;
    }

    let [crc_hi, crc_lo] = crc.to_be_bytes();
    sink.write_byte(crc_hi)?;
    sink.write_byte(crc_lo)?;
    sink.write_byte(END)?;
    Ok(())
}

/// How the decoder provides memory for in-flight payloads.
///
/// Both strategies decode identically; they differ only in when memory is
/// allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferAllocation {
    /// One buffer of `max_payload_size` bytes, allocated up front and reused.
    #[default]
    Fixed,
    /// A buffer of exactly the declared length, allocated per frame and
    /// released when the frame ends.
    Dynamic,
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 4 KiB. Lengths above
    /// [`MAX_WIRE_PAYLOAD`] cannot occur on the wire, so larger values
    /// behave like `MAX_WIRE_PAYLOAD` and never reserve more memory.
    pub max_payload_size: usize,
    /// Drop an in-flight frame when no byte arrives for this long.
    /// Default: disabled.
    pub receive_timeout: Option<Duration>,
    /// Payload buffer allocation strategy. Default: fixed.
    pub allocation: BufferAllocation,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            receive_timeout: None,
            allocation: BufferAllocation::Fixed,
        }
    }
}
