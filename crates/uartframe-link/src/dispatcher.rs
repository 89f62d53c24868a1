//! Routing of completed payloads to application code.
//!
//! The first payload byte is the message id; the rest is the body. A single
//! handler slot receives every message and answers whether it took it.
//!
//! # Example
//!
//! ```
//! use uartframe_link::Dispatcher;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.set_handler(|id: u8, body: &[u8]| id == 0x04 && !body.is_empty());
//!
//! assert!(dispatcher.dispatch(&[0x04, 0xFF]).is_ok());
//! assert!(dispatcher.dispatch(&[0x05]).is_err());
//! ```

use tracing::debug;

use crate::error::{DispatchError, Result};

/// Application code that consumes messages.
pub trait MessageHandler: Send {
    /// Handle one message. Return `true` to accept it.
    ///
    /// `body` is only valid for the duration of the call.
    fn handle(&mut self, id: u8, body: &[u8]) -> bool;
}

impl<F> MessageHandler for F
where
    F: FnMut(u8, &[u8]) -> bool + Send,
{
    fn handle(&mut self, id: u8, body: &[u8]) -> bool {
        self(id, body)
    }
}

/// Split a payload into message id and body.
pub fn split_message(payload: &[u8]) -> Option<(u8, &[u8])> {
    payload.split_first().map(|(id, body)| (*id, body))
}

/// Holds the message handler slot for one link.
#[derive(Default)]
pub struct Dispatcher {
    handler: Option<Box<dyn MessageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the message handler, replacing any previous one.
    pub fn set_handler(&mut self, handler: impl MessageHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Remove the message handler. Later messages are unhandled.
    pub fn clear_handler(&mut self) {
        self.handler = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Hand a completed payload to the handler.
    pub fn dispatch(&mut self, payload: &[u8]) -> Result<()> {
        let (id, body) = split_message(payload).ok_or(DispatchError::EmptyPayload)?;
        let handler = self.handler.as_mut().ok_or(DispatchError::NoHandler(id))?;

        if handler.handle(id, body) {
            debug!(id, len = body.len(), "message dispatched");
            Ok(())
        } else {
            Err(DispatchError::Rejected(id))
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}
