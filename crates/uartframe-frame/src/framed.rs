//! `tokio_util::codec` adapter.
//!
//! Wrap any `AsyncRead`/`AsyncWrite` with `FramedRead`/`FramedWrite` and this
//! codec. Damaged frames come through the stream as [`Received::Error`] items
//! rather than ending it.

use std::collections::VecDeque;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, FrameConfig};
use crate::decoder::{FrameDecoder, Received};
use crate::error::{FrameError, Result};

/// Streaming codec over the delimited frame format.
///
/// Receive timeouts are not tracked here; wrap the stream in
/// `tokio::time::timeout` if a stalled line needs detecting.
#[derive(Debug)]
pub struct FrameCodec {
    decoder: FrameDecoder,
    pending: VecDeque<Received>,
    max_payload_size: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        let max_payload_size = config.max_payload_size;
        Self {
            decoder: FrameDecoder::with_config(FrameConfig {
                receive_timeout: None,
                ..config
            }),
            pending: VecDeque::new(),
            max_payload_size,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Received;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Received>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        // Bytes are consumed as soon as the decoder has seen them; partial
        // frames live in the decoder, not in `src`.
        let pending = &mut self.pending;
        self.decoder
            .feed(src.as_ref(), |event| pending.push_back(event.to_received()));
        src.advance(src.len());

        Ok(self.pending.pop_front())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Received>> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }
        if self.decoder.in_frame() {
            self.decoder.reset();
            return Err(FrameError::ConnectionClosed);
        }
        Ok(None)
    }
}

impl<T: AsRef<[u8]>> Encoder<T> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: T, dst: &mut BytesMut) -> Result<()> {
        let payload = payload.as_ref();
        if payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::error::DecodeError;

    fn encoded(payloads: &[&[u8]]) -> BytesMut {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        for payload in payloads {
            codec.encode(*payload, &mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn decodes_every_frame_in_buffer() {
        let mut codec = FrameCodec::new();
        let mut src = encoded(&[b"one", b"two"]);

        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(Received::Payload(Bytes::from_static(b"one")))
        );
        assert!(src.is_empty());
        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(Received::Payload(Bytes::from_static(b"two")))
        );
        assert_eq!(codec.decode(&mut src).unwrap(), None);
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut codec = FrameCodec::new();
        let full = encoded(&[b"split"]);
        let mut src = BytesMut::from(&full[..4]);

        assert_eq!(codec.decode(&mut src).unwrap(), None);
        src.extend_from_slice(&full[4..]);
        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(Received::Payload(Bytes::from_static(b"split")))
        );
    }

    #[test]
    fn damaged_frame_is_an_item_not_an_error() {
        let mut codec = FrameCodec::new();
        let mut src = encoded(&[b"bad"]);
        let last = src.len() - 1;
        src[last] = 0x00;

        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(Received::Error(DecodeError::EndByte { found: 0x00 }))
        );
    }

    #[test]
    fn eof_mid_frame_is_connection_closed() {
        let mut codec = FrameCodec::new();
        let full = encoded(&[b"cut"]);
        let mut src = BytesMut::from(&full[..3]);

        let err = codec.decode_eof(&mut src).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn clean_eof_ends_stream() {
        let mut codec = FrameCodec::new();
        let mut src = BytesMut::new();
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn encoder_respects_max_payload() {
        let mut codec = FrameCodec::with_config(FrameConfig {
            max_payload_size: 2,
            ..FrameConfig::default()
        });
        let mut dst = BytesMut::new();
        let err = codec.encode(&b"abc"[..], &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 3, max: 2 }));
    }

    #[tokio::test]
    async fn framed_read_yields_items_in_order() {
        use futures_util::StreamExt;
        use tokio_util::codec::FramedRead;

        let mut damaged = encoded(&[b"bad"]);
        let last = damaged.len() - 1;
        damaged[last] = 0x00;

        let mut wire = encoded(&[b"first"]).to_vec();
        wire.extend_from_slice(&damaged);
        wire.extend_from_slice(&encoded(&[b"second"]));

        let mut framed = FramedRead::new(wire.as_slice(), FrameCodec::new());
        let mut items = Vec::new();
        while let Some(item) = framed.next().await {
            items.push(item.unwrap());
        }

        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Received::Payload(Bytes::from_static(b"first")));
        assert_eq!(items[1], Received::Error(DecodeError::EndByte { found: 0x00 }));
        assert_eq!(items[2], Received::Payload(Bytes::from_static(b"second")));
    }
}
