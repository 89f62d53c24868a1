use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::clock::{Clock, SystemClock};
use crate::codec::FrameConfig;
use crate::decoder::{FrameDecoder, Received};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 1024;

/// Reads decode events from any `Read` stream.
///
/// Handles partial reads internally. Framing errors are returned as
/// [`Received::Error`] items and decoding carries on; only I/O failures and
/// end-of-stream are `Err`.
pub struct FrameReader<T, C = SystemClock> {
    inner: T,
    decoder: FrameDecoder<C>,
    pending: VecDeque<Received>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self::with_decoder(inner, FrameDecoder::with_config(config))
    }
}

impl<T: Read, C: Clock> FrameReader<T, C> {
    /// Create a frame reader around an existing decoder.
    pub fn with_decoder(inner: T, decoder: FrameDecoder<C>) -> Self {
        Self {
            inner,
            decoder,
            pending: VecDeque::new(),
        }
    }

    /// Read the next payload or framing error (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A
    /// `WouldBlock` or `TimedOut` read first checks the receive timeout and
    /// returns the resulting `ReceiveTimeout`, if any, before propagating.
    pub fn next_event(&mut self) -> Result<Received> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    if let Some(timeout) = self.decoder.poll_timeout() {
                        return Ok(Received::Error(timeout));
                    }
                    return Err(FrameError::Io(err));
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.decoder.reset();
                return Err(FrameError::ConnectionClosed);
            }

            let pending = &mut self.pending;
            self.decoder
                .feed(&chunk[..read], |event| pending.push_back(event.to_received()));
        }
    }

    /// Read until the next complete payload, skipping framing errors.
    pub fn read_payload(&mut self) -> Result<bytes::Bytes> {
        loop {
            match self.next_event()? {
                Received::Payload(payload) => return Ok(payload),
                Received::Error(err) => tracing::debug!(%err, "skipping damaged frame"),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Borrow the decoder.
    pub fn decoder(&self) -> &FrameDecoder<C> {
        &self.decoder
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.decoder.config()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use bytes::BytesMut;

    use super::*;
    use crate::clock::ManualClock;
    use crate::codec::{encode_frame, START_SHORT};
    use crate::error::DecodeError;

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_payload() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"hello"])));
        assert_eq!(reader.read_payload().unwrap().as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_payloads() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"one", b"two", b"three"])));

        assert_eq!(reader.read_payload().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_payload().unwrap().as_ref(), b"two");
        assert_eq!(reader.read_payload().unwrap().as_ref(), b"three");
    }

    #[test]
    fn read_payload_larger_than_one_chunk() {
        let payload = vec![0xAB; 4000];
        let mut reader = FrameReader::new(Cursor::new(wire(&[&payload])));
        assert_eq!(reader.read_payload().unwrap().as_ref(), payload.as_slice());
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[b"slow"]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);
        assert_eq!(reader.read_payload().unwrap().as_ref(), b"slow");
    }

    #[test]
    fn framing_errors_surface_as_events() {
        let mut stream = wire(&[b"bad"]);
        let last = stream.len() - 1;
        stream[last] = 0xEE;
        stream.extend(wire(&[b"good"]));

        let mut reader = FrameReader::new(Cursor::new(stream));
        assert_eq!(
            reader.next_event().unwrap(),
            Received::Error(DecodeError::EndByte { found: 0xEE })
        );
        assert_eq!(
            reader.next_event().unwrap(),
            Received::Payload(bytes::Bytes::from_static(b"good"))
        );
    }

    #[test]
    fn read_payload_skips_damaged_frames() {
        let mut stream = wire(&[b"bad"]);
        let crc = stream.len() - 2;
        stream[crc] ^= 0x80;
        stream.extend(wire(&[b"good"]));

        let mut reader = FrameReader::new(Cursor::new(stream));
        assert_eq!(reader.read_payload().unwrap().as_ref(), b"good");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.next_event().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut reader = FrameReader::new(Cursor::new(vec![START_SHORT, 16, 1, 2, 3]));
        let err = reader.next_event().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert!(!reader.decoder().in_frame());
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = FailingReader {
            failures: vec![ErrorKind::Interrupted],
            bytes: wire(&[b"ok"]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_payload().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn would_block_propagates_io_error() {
        let reader = FailingReader {
            failures: vec![ErrorKind::WouldBlock],
            bytes: wire(&[b"ok"]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.next_event().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn idle_read_surfaces_receive_timeout() {
        let clock = ManualClock::new();
        let config = FrameConfig {
            receive_timeout: Some(Duration::from_millis(20)),
            ..FrameConfig::default()
        };
        let line = IdleLine {
            head: vec![START_SHORT, 7, b's'],
            clock: clock.clone(),
        };
        let mut framed = FrameReader::with_decoder(line, FrameDecoder::with_clock(config, clock));

        assert_eq!(
            framed.next_event().unwrap(),
            Received::Error(DecodeError::ReceiveTimeout)
        );
        assert!(!framed.decoder().in_frame());

        let err = framed.next_event().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::TimedOut));
    }

    /// Delivers a partial frame, then goes quiet; each idle read lets time pass.
    struct IdleLine {
        head: Vec<u8>,
        clock: ManualClock,
    }

    impl Read for IdleLine {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.head.is_empty() {
                let n = self.head.len().min(buf.len());
                buf[..n].copy_from_slice(&self.head[..n]);
                self.head.drain(..n);
                return Ok(n);
            }
            self.clock.advance(Duration::from_millis(25));
            Err(std::io::Error::from(ErrorKind::TimedOut))
        }
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct FailingReader {
        failures: Vec<ErrorKind>,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.failures.is_empty() {
                return Err(std::io::Error::from(self.failures.remove(0)));
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
