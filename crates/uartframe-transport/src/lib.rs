//! Byte-level transport seams for UART framing.
//!
//! Provides the two ends the codec talks to:
//! - [`ByteSink`], the one-byte-at-a-time output the encoder pushes into
//! - [`SerialPort`], a raw-mode serial device (Linux/macOS)
//!
//! This is the lowest layer of uartframe. The frame codec builds on the
//! [`ByteSink`] trait provided here.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::{ByteSink, IoSink};

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort, SUPPORTED_BAUD_RATES};
