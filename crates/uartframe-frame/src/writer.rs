use uartframe_transport::{ByteSink, IoSink};

use crate::codec::{write_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Writes complete frames to a [`ByteSink`].
///
/// The encoder itself is stateless; the writer adds the outgoing size limit
/// and a flush after every frame. Callers sharing one line between several
/// writers must serialize `send` calls themselves.
pub struct FrameWriter<S> {
    inner: S,
    config: FrameConfig,
}

impl<S: ByteSink> FrameWriter<S> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: S, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Encode and send a payload.
    ///
    /// Payloads larger than the configured maximum are refused before any
    /// byte is written, since the receiving decoder would drop them anyway.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        write_frame(payload, &mut self.inner)?;
        self.flush()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(FrameError::Io)
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<W: std::io::Write> FrameWriter<IoSink<W>> {
    /// Create a frame writer over any `Write` stream.
    pub fn from_writer(inner: W, config: FrameConfig) -> Self {
        Self::with_config(IoSink::new(inner), config)
    }
}
