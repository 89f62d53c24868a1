/// Errors from encoding frames or moving them over a stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured or wire-level maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended; any in-flight frame was discarded.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// A framing failure detected while decoding.
///
/// None of these are fatal: the decoder drops the in-flight frame, returns
/// to scanning for a start delimiter and keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// No byte arrived within the receive timeout while a frame was open.
    #[error("receive timed out mid-frame")]
    ReceiveTimeout,

    /// The frame was well formed but its checksum did not match.
    #[error("checksum mismatch (declared {declared:#06x}, computed {computed:#06x})")]
    Crc { declared: u16, computed: u16 },

    /// The byte after the checksum was not the end delimiter.
    #[error("expected end delimiter, got {found:#04x}")]
    EndByte { found: u8 },

    /// The declared length does not fit the payload buffer.
    #[error("declared length {declared} exceeds buffer capacity {capacity}")]
    Memory { declared: usize, capacity: usize },
}

impl DecodeError {
    /// Classification reported to error observers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::ReceiveTimeout => ErrorKind::ReceiveTimeout,
            DecodeError::Crc { .. } => ErrorKind::CrcError,
            DecodeError::EndByte { .. } => ErrorKind::EndByteError,
            DecodeError::Memory { .. } => ErrorKind::MemoryError,
        }
    }
}

/// Classified link error, as seen by an error observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ReceiveTimeout,
    CrcError,
    EndByteError,
    UnhandledMessage,
    MemoryError,
}

impl ErrorKind {
    /// Stable lowercase name, used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ReceiveTimeout => "receive_timeout",
            ErrorKind::CrcError => "crc_error",
            ErrorKind::EndByteError => "end_byte_error",
            ErrorKind::UnhandledMessage => "unhandled_message",
            ErrorKind::MemoryError => "memory_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
