use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::buffer::PayloadBuffer;
use crate::checksum::checksum;
use crate::clock::{Clock, SystemClock};
use crate::codec::{FrameConfig, END, START_LONG, START_SHORT};
use crate::error::DecodeError;

/// Where the decoder is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitStart,
    LenShort,
    LenHi,
    LenLo,
    Payload,
    CrcHi,
    CrcLo,
    AwaitEnd,
}

/// Outcome of a decode step, borrowing the decoder's payload buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeEvent<'a> {
    /// A complete payload whose checksum matched.
    Payload(&'a [u8]),
    /// The in-flight frame was dropped.
    Error(DecodeError),
}

impl DecodeEvent<'_> {
    /// Copy the event out of the decoder's buffer.
    pub fn to_received(&self) -> Received {
        match self {
            DecodeEvent::Payload(payload) => Received::Payload(Bytes::copy_from_slice(payload)),
            DecodeEvent::Error(err) => Received::Error(*err),
        }
    }
}

/// Owned counterpart of [`DecodeEvent`], for readers and streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Payload(Bytes),
    Error(DecodeError),
}

/// Incremental decoder for one byte stream.
///
/// Bytes may arrive in chunks of any size; the events produced depend only
/// on the byte sequence, not on how it was split (with the receive timeout
/// disabled). One decoder tracks one in-flight frame. Use one decoder per
/// stream.
#[derive(Debug)]
pub struct FrameDecoder<C = SystemClock> {
    stage: Stage,
    target_len: usize,
    declared_crc: u16,
    payload: PayloadBuffer,
    /// A completed payload was handed out and must be reclaimed first.
    lent: bool,
    last_activity: Option<Instant>,
    config: FrameConfig,
    clock: C,
}

impl FrameDecoder<SystemClock> {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for FrameDecoder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FrameDecoder<C> {
    /// Create a decoder that tracks receive timeouts against `clock`.
    pub fn with_clock(config: FrameConfig, clock: C) -> Self {
        Self {
            stage: Stage::AwaitStart,
            target_len: 0,
            declared_crc: 0,
            payload: PayloadBuffer::new(config.max_payload_size, config.allocation),
            lent: false,
            last_activity: None,
            config,
            clock,
        }
    }

    /// Decode a chunk of received bytes, in order.
    ///
    /// The clock is sampled once, before the first byte. Each completed
    /// payload is lent to `on_event` and reclaimed as soon as it returns.
    /// An empty chunk only checks the receive timeout.
    pub fn feed<F>(&mut self, chunk: &[u8], mut on_event: F)
    where
        F: FnMut(DecodeEvent<'_>),
    {
        if let Some(err) = self.sample_clock(!chunk.is_empty()) {
            on_event(DecodeEvent::Error(err));
        }
        for &byte in chunk {
            if let Some(event) = self.step(byte) {
                on_event(event);
            }
        }
    }

    /// Decode one byte.
    ///
    /// Counts as receive activity: with a receive timeout configured, the
    /// clock is read once per call. Pair with [`poll_timeout`](Self::poll_timeout)
    /// to detect stalls.
    pub fn push_byte(&mut self, byte: u8) -> Option<DecodeEvent<'_>> {
        if self.config.receive_timeout.is_some() {
            self.last_activity = Some(self.clock.now());
        }
        self.step(byte)
    }

    fn step(&mut self, byte: u8) -> Option<DecodeEvent<'_>> {
        if self.lent {
            self.payload.release();
            self.lent = false;
        }

        match self.stage {
            Stage::AwaitStart => match byte {
                START_SHORT => self.stage = Stage::LenShort,
                START_LONG => self.stage = Stage::LenHi,
                _ => trace!(byte, "skipping byte outside frame"),
            },
            Stage::LenShort => return self.begin_payload(usize::from(byte)),
            Stage::LenHi => {
                self.target_len = usize::from(byte) << 8;
                self.stage = Stage::LenLo;
            }
            Stage::LenLo => return self.begin_payload(self.target_len | usize::from(byte)),
            Stage::Payload => {
                self.payload.push(byte);
                if self.payload.len() >= self.target_len {
                    self.stage = Stage::CrcHi;
                }
            }
            Stage::CrcHi => {
                self.declared_crc = u16::from(byte) << 8;
                self.stage = Stage::CrcLo;
            }
            Stage::CrcLo => {
                self.declared_crc |= u16::from(byte);
                self.stage = Stage::AwaitEnd;
            }
            Stage::AwaitEnd => return self.finish(byte),
        }
        None
    }

    /// Check the receive timeout without feeding bytes.
    ///
    /// Returns `ReceiveTimeout` if an open frame went stale; the decoder has
    /// already been reset when it does.
    pub fn poll_timeout(&mut self) -> Option<DecodeError> {
        self.sample_clock(false)
    }

    /// Drop any in-flight frame and wait for the next start delimiter.
    pub fn reset(&mut self) {
        self.stage = Stage::AwaitStart;
        self.target_len = 0;
        self.declared_crc = 0;
        self.payload.release();
        self.lent = false;
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether a frame has been started and not yet finished.
    pub fn in_frame(&self) -> bool {
        self.stage != Stage::AwaitStart
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Clock used for receive timeouts.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn begin_payload(&mut self, len: usize) -> Option<DecodeEvent<'_>> {
        self.target_len = len;
        if let Err(err) = self.payload.begin(len) {
            debug!(declared = len, capacity = self.payload.capacity(), "frame too large");
            self.stage = Stage::AwaitStart;
            return Some(DecodeEvent::Error(err));
        }
        self.stage = if len == 0 {
            Stage::CrcHi
        } else {
            Stage::Payload
        };
        None
    }

    fn finish(&mut self, byte: u8) -> Option<DecodeEvent<'_>> {
        self.stage = Stage::AwaitStart;

        if byte != END {
            self.payload.release();
            return Some(DecodeEvent::Error(DecodeError::EndByte { found: byte }));
        }

        let computed = checksum(self.payload.as_slice());
        if computed != self.declared_crc {
            self.payload.release();
            return Some(DecodeEvent::Error(DecodeError::Crc {
                declared: self.declared_crc,
                computed,
            }));
        }

        debug!(len = self.payload.len(), "frame complete");
        self.lent = true;
        Some(DecodeEvent::Payload(self.payload.as_slice()))
    }

    fn sample_clock(&mut self, received: bool) -> Option<DecodeError> {
        let timeout = self.config.receive_timeout?;
        let now = self.clock.now();

        let mut expired = None;
        if let Some(last) = self.last_activity {
            if self.in_frame() && now.saturating_duration_since(last) > timeout {
                debug!(stage = ?self.stage, "receive timeout, dropping frame");
                self.reset();
                expired = Some(DecodeError::ReceiveTimeout);
            }
        }

        if received || !self.in_frame() {
            self.last_activity = Some(now);
        }
        expired
    }
}
