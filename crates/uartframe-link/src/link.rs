use std::io::{ErrorKind as IoErrorKind, Read};

use serde::Serialize;
use tracing::{debug, warn};
use uartframe_frame::{
    write_frame, Clock, DecodeEvent, ErrorKind, FrameConfig, FrameDecoder, FrameError,
    SystemClock,
};
use uartframe_transport::ByteSink;

use crate::dispatcher::{Dispatcher, MessageHandler};
use crate::reporter::{ErrorObserver, ErrorReporter};

const PUMP_CHUNK_SIZE: usize = 256;

/// Running totals for one link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Frames that passed the checksum.
    pub frames: u64,
    /// Messages a handler accepted.
    pub dispatched: u64,
    pub receive_timeouts: u64,
    pub crc_errors: u64,
    pub end_byte_errors: u64,
    pub unhandled_messages: u64,
    pub memory_errors: u64,
}

impl LinkStats {
    /// All errors, of any kind.
    pub fn errors(&self) -> u64 {
        [
            self.receive_timeouts,
            self.crc_errors,
            self.end_byte_errors,
            self.unhandled_messages,
            self.memory_errors,
        ]
        .into_iter()
        .fold(0, u64::saturating_add)
    }

    fn record(&mut self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::ReceiveTimeout => &mut self.receive_timeouts,
            ErrorKind::CrcError => &mut self.crc_errors,
            ErrorKind::EndByteError => &mut self.end_byte_errors,
            ErrorKind::UnhandledMessage => &mut self.unhandled_messages,
            ErrorKind::MemoryError => &mut self.memory_errors,
        };
        *counter = counter.saturating_add(1);
    }
}

/// One framed connection: a decoder plus the handler and observer it feeds.
///
/// Create one `Link` per transport. Each link has its own handler and
/// observer slots, so several links can run side by side.
#[derive(Debug)]
pub struct Link<C = SystemClock> {
    decoder: FrameDecoder<C>,
    dispatcher: Dispatcher,
    reporter: ErrorReporter,
    stats: LinkStats,
}

impl Link<SystemClock> {
    /// Create a link with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a link with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self::with_decoder(FrameDecoder::with_config(config))
    }
}

impl Default for Link<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Link<C> {
    /// Create a link around an existing decoder (e.g. one with a custom clock).
    pub fn with_decoder(decoder: FrameDecoder<C>) -> Self {
        Self {
            decoder,
            dispatcher: Dispatcher::new(),
            reporter: ErrorReporter::new(),
            stats: LinkStats::default(),
        }
    }

    /// Register the message handler, replacing any previous one.
    pub fn on_message(&mut self, handler: impl MessageHandler + 'static) -> &mut Self {
        self.dispatcher.set_handler(handler);
        self
    }

    /// Register the error observer, replacing any previous one.
    pub fn on_error(&mut self, observer: impl ErrorObserver + 'static) -> &mut Self {
        self.reporter.set_observer(observer);
        self
    }

    /// Feed received bytes.
    ///
    /// Each completed payload is dispatched before the next byte is decoded;
    /// each error is reported exactly once. Returns the number of messages a
    /// handler accepted.
    pub fn receive(&mut self, bytes: &[u8]) -> usize {
        let dispatcher = &mut self.dispatcher;
        let reporter = &mut self.reporter;
        let stats = &mut self.stats;
        let mut accepted = 0usize;

        self.decoder.feed(bytes, |event| match event {
            DecodeEvent::Payload(payload) => {
                stats.frames = stats.frames.saturating_add(1);
                match dispatcher.dispatch(payload) {
                    Ok(()) => {
                        stats.dispatched = stats.dispatched.saturating_add(1);
                        accepted += 1;
                    }
                    Err(err) => {
                        debug!(%err, "message not handled");
                        stats.record(ErrorKind::UnhandledMessage);
                        reporter.report(ErrorKind::UnhandledMessage);
                    }
                }
            }
            DecodeEvent::Error(err) => {
                debug!(%err, "frame dropped");
                stats.record(err.kind());
                reporter.report(err.kind());
            }
        });

        accepted
    }

    /// Check the receive timeout without new bytes.
    pub fn poll(&mut self) -> usize {
        self.receive(&[])
    }

    /// Read one chunk from `source` and feed it.
    ///
    /// Returns the number of bytes read. `WouldBlock`/`TimedOut` reads count
    /// as an idle poll and return `Ok(0)`; end-of-stream is
    /// `FrameError::ConnectionClosed`.
    pub fn pump<R: Read + ?Sized>(&mut self, source: &mut R) -> Result<usize, FrameError> {
        let mut chunk = [0u8; PUMP_CHUNK_SIZE];
        loop {
            match source.read(&mut chunk) {
                Ok(0) => {
                    if self.decoder.in_frame() {
                        warn!("stream closed mid-frame");
                    }
                    self.decoder.reset();
                    return Err(FrameError::ConnectionClosed);
                }
                Ok(n) => {
                    self.receive(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == IoErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), IoErrorKind::WouldBlock | IoErrorKind::TimedOut) => {
                    self.poll();
                    return Ok(0);
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Encode `payload` into `sink` and flush it.
    ///
    /// Sending touches no decoder state.
    pub fn send<S: ByteSink + ?Sized>(&self, sink: &mut S, payload: &[u8]) -> Result<(), FrameError> {
        write_frame(payload, sink)?;
        sink.flush().map_err(FrameError::Io)
    }

    /// Drop any in-flight frame.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn decoder(&self) -> &FrameDecoder<C> {
        &self.decoder
    }

    pub fn config(&self) -> &FrameConfig {
        self.decoder.config()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use uartframe_frame::{ManualClock, START_SHORT};

    use super::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_frame(payload, &mut out).unwrap();
        out
    }

    type Messages = Arc<Mutex<Vec<(u8, Vec<u8>)>>>;
    type Errors = Arc<Mutex<Vec<ErrorKind>>>;

    fn recording_link<C: Clock>(mut link: Link<C>, accept: bool) -> (Link<C>, Messages, Errors) {
        let messages: Messages = Arc::default();
        let errors: Errors = Arc::default();
        let m = Arc::clone(&messages);
        let e = Arc::clone(&errors);

        link.on_message(move |id: u8, body: &[u8]| {
            m.lock().unwrap().push((id, body.to_vec()));
            accept
        })
        .on_error(move |kind: ErrorKind| e.lock().unwrap().push(kind));

        (link, messages, errors)
    }

    #[test]
    fn dispatches_concrete_frame_byte_by_byte() {
        let (mut link, messages, errors) = recording_link(Link::new(), true);

        for byte in frame(&[0x01, 0x02, 0x03]) {
            link.receive(&[byte]);
        }

        assert_eq!(*messages.lock().unwrap(), vec![(0x01, vec![0x02, 0x03])]);
        assert!(errors.lock().unwrap().is_empty());
        assert_eq!(link.stats().dispatched, 1);
    }

    #[test]
    fn receive_counts_accepted_messages() {
        let (mut link, _messages, _errors) = recording_link(Link::new(), true);
        let mut stream = frame(&[0x10, 0xAA]);
        stream.extend(frame(&[0x11]));

        assert_eq!(link.receive(&stream), 2);
    }

    #[test]
    fn rejection_reports_unhandled_message() {
        let (mut link, messages, errors) = recording_link(Link::new(), false);

        assert_eq!(link.receive(&frame(&[0x42, 1])), 0);

        assert_eq!(messages.lock().unwrap().len(), 1);
        assert_eq!(*errors.lock().unwrap(), vec![ErrorKind::UnhandledMessage]);
        assert_eq!(link.stats().unhandled_messages, 1);
    }

    #[test]
    fn missing_handler_reports_unhandled_message() {
        let errors: Errors = Arc::default();
        let e = Arc::clone(&errors);
        let mut link = Link::new();
        link.on_error(move |kind: ErrorKind| e.lock().unwrap().push(kind));

        link.receive(&frame(&[0x01]));
        assert_eq!(*errors.lock().unwrap(), vec![ErrorKind::UnhandledMessage]);
    }

    #[test]
    fn empty_payload_reports_unhandled_message() {
        let (mut link, messages, errors) = recording_link(Link::new(), true);

        link.receive(&frame(&[]));

        assert!(messages.lock().unwrap().is_empty());
        assert_eq!(*errors.lock().unwrap(), vec![ErrorKind::UnhandledMessage]);
        assert_eq!(link.stats().frames, 1);
    }

    #[test]
    fn each_framing_error_reported_once() {
        let config = FrameConfig {
            max_payload_size: 32,
            ..FrameConfig::default()
        };
        let (mut link, messages, errors) = recording_link(Link::with_config(config), true);

        let mut bad_crc = frame(&[0x01, 0x02]);
        let crc = bad_crc.len() - 2;
        bad_crc[crc] ^= 0x04;
        let mut bad_end = frame(&[0x03]);
        let last = bad_end.len() - 1;
        bad_end[last] = 0x55;

        let mut stream = bad_crc;
        stream.extend(bad_end);
        stream.extend([START_SHORT, 33]);
        stream.extend(frame(&[0x07, 0x08]));
        link.receive(&stream);

        assert_eq!(
            *errors.lock().unwrap(),
            vec![
                ErrorKind::CrcError,
                ErrorKind::EndByteError,
                ErrorKind::MemoryError
            ]
        );
        assert_eq!(*messages.lock().unwrap(), vec![(0x07, vec![0x08])]);

        let stats = link.stats();
        assert_eq!(stats.errors(), 3);
        assert_eq!(stats.frames, 1);
    }

    #[test]
    fn poll_reports_receive_timeout() {
        let clock = ManualClock::new();
        let config = FrameConfig {
            receive_timeout: Some(Duration::from_millis(50)),
            ..FrameConfig::default()
        };
        let link = Link::with_decoder(FrameDecoder::with_clock(config, clock.clone()));
        let (mut link, messages, errors) = recording_link(link, true);

        link.receive(&frame(&[0x01, 0x02])[..3]);
        clock.advance(Duration::from_millis(60));
        link.poll();
        link.receive(&frame(&[0x09]));

        assert_eq!(*errors.lock().unwrap(), vec![ErrorKind::ReceiveTimeout]);
        assert_eq!(*messages.lock().unwrap(), vec![(0x09, vec![])]);
        assert_eq!(link.stats().receive_timeouts, 1);
    }

    #[test]
    fn independent_links_keep_independent_handlers() {
        let (mut left, left_messages, _) = recording_link(Link::new(), true);
        let (mut right, right_messages, _) = recording_link(Link::new(), true);

        left.receive(&frame(&[0x01]));
        right.receive(&frame(&[0x02]));

        assert_eq!(*left_messages.lock().unwrap(), vec![(0x01, vec![])]);
        assert_eq!(*right_messages.lock().unwrap(), vec![(0x02, vec![])]);
    }

    #[test]
    fn send_then_receive_round_trips() {
        let (mut link, messages, _errors) = recording_link(Link::new(), true);
        let mut line = Vec::new();

        link.send(&mut line, &[0x20, 0x01, 0x02]).unwrap();
        link.receive(&line);

        assert_eq!(*messages.lock().unwrap(), vec![(0x20, vec![0x01, 0x02])]);
    }

    #[test]
    fn pump_reads_until_closed() {
        let (mut link, messages, _errors) = recording_link(Link::new(), true);
        let mut stream = frame(&[0x01]);
        stream.extend(frame(&[0x02]));
        let mut source = Cursor::new(stream);

        loop {
            match link.pump(&mut source) {
                Ok(_) => continue,
                Err(FrameError::ConnectionClosed) => break,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(messages.lock().unwrap().len(), 2);
    }

    #[test]
    fn pump_treats_timed_out_read_as_poll() {
        let mut link = Link::new();
        let mut source = TimedOutSource;
        assert_eq!(link.pump(&mut source).unwrap(), 0);
    }

    #[test]
    fn stats_counters_saturate() {
        let (mut link, _messages, _errors) = recording_link(Link::new(), true);
        link.stats = LinkStats {
            frames: u64::MAX,
            dispatched: u64::MAX,
            crc_errors: u64::MAX,
            memory_errors: 1,
            ..LinkStats::default()
        };

        link.receive(&frame(&[0x01]));

        let stats = link.stats();
        assert_eq!(stats.frames, u64::MAX);
        assert_eq!(stats.dispatched, u64::MAX);
        assert_eq!(stats.errors(), u64::MAX);
    }

    #[test]
    fn stats_serialize_as_flat_object() {
        let stats = LinkStats {
            frames: 3,
            dispatched: 2,
            unhandled_messages: 1,
            ..LinkStats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["frames"], 3);
        assert_eq!(json["unhandled_messages"], 1);
        assert_eq!(json["crc_errors"], 0);
    }

    struct TimedOutSource;

    impl Read for TimedOutSource {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(IoErrorKind::TimedOut))
        }
    }
}
