//! Delimited, checksummed message framing for UART links.
//!
//! Frames carry a start delimiter, a 1 or 2 byte length, the payload, a
//! CRC-16/XMODEM checksum and an end delimiter. The decoder consumes bytes in
//! any chunking and recovers from every framing error by itself.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte sinks and raw serial ports
//! - [`frame`]: wire format, incremental decoder and encoder
//! - [`link`]: message dispatch and error reporting for one connection

/// Re-export transport types.
pub mod transport {
    pub use uartframe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use uartframe_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use uartframe_link::*;
}
