//! Delimited, checksummed message framing for byte-at-a-time serial links.
//!
//! This is the core of uartframe. Every payload is framed with:
//! - A start delimiter: `0x02` (short form) or `0x03` (long form)
//! - A payload length: 1 byte, or 2 bytes big-endian from 256 bytes up
//! - The payload
//! - A 2-byte big-endian CRC-16/XMODEM over the payload
//! - An end delimiter `0x03`
//!
//! [`FrameDecoder`] reassembles payloads from bytes arriving in any chunking
//! and recovers from every framing error on its own.

pub mod buffer;
pub mod checksum;
pub mod clock;
pub mod codec;
pub mod decoder;
pub mod error;
#[cfg(feature = "async")]
pub mod framed;
pub mod reader;
pub mod writer;

pub use buffer::PayloadBuffer;
pub use checksum::checksum;
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{
    encode_frame, frame_overhead, wire_size, write_frame, BufferAllocation, FrameConfig,
    DEFAULT_MAX_PAYLOAD, END, MAX_SHORT_PAYLOAD, MAX_WIRE_PAYLOAD, START_LONG, START_SHORT,
};
pub use decoder::{DecodeEvent, FrameDecoder, Received, Stage};
pub use error::{DecodeError, ErrorKind, FrameError, Result};
#[cfg(feature = "async")]
pub use framed::FrameCodec;
pub use reader::FrameReader;
pub use writer::FrameWriter;
