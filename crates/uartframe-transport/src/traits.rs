use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};

/// A transmit path that accepts one byte at a time, in emission order.
///
/// The frame encoder pushes every byte of a frame individually and never
/// buffers on its own. Implementations decide whether to buffer, and
/// `flush` is called once after each complete frame.
pub trait ByteSink {
    /// Transmit one byte.
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()>;

    /// Push any buffered bytes to the line.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ByteSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.push(byte);
        Ok(())
    }
}

impl ByteSink for BytesMut {
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.put_u8(byte);
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        (**self).write_byte(byte)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (**self).flush()
    }
}

/// Adapts any `Write` stream (serial port, file, pipe) into a [`ByteSink`].
///
/// Interrupted writes are retried. `WouldBlock` is returned to the caller
/// rather than spun on, so non-blocking writers must be polled by the
/// caller. A write that accepts zero bytes is reported as `WriteZero`.
#[derive(Debug)]
pub struct IoSink<W> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the sink and return the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for IoSink<W> {
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        let buf = [byte];
        loop {
            match self.inner.write(&buf) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
                Ok(_) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}
