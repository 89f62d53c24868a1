/// Why a completed payload did not reach application code.
///
/// Every variant is reported to the error observer as
/// `ErrorKind::UnhandledMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The payload had no message id byte.
    #[error("empty payload carries no message id")]
    EmptyPayload,

    /// No message handler is registered.
    #[error("no handler registered for message {0:#04x}")]
    NoHandler(u8),

    /// The handler declined the message.
    #[error("handler rejected message {0:#04x}")]
    Rejected(u8),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
