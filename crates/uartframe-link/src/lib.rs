//! Message-level API over a framed serial link.
//!
//! A [`Link`] owns one [`FrameDecoder`](uartframe_frame::FrameDecoder) and
//! routes what it produces: completed payloads go to the registered
//! [`MessageHandler`], errors go to the registered [`ErrorObserver`].
//!
//! ```
//! use uartframe_link::Link;
//!
//! let mut link = Link::new();
//! link.on_message(|id: u8, body: &[u8]| id == 0x01 && body == [0x02, 0x03]);
//!
//! let mut wire = Vec::new();
//! link.send(&mut wire, &[0x01, 0x02, 0x03]).unwrap();
//! assert_eq!(link.receive(&wire), 1);
//! ```

pub mod dispatcher;
pub mod error;
pub mod link;
pub mod reporter;

pub use dispatcher::{split_message, Dispatcher, MessageHandler};
pub use error::{DispatchError, Result};
pub use link::{Link, LinkStats};
pub use reporter::{ErrorObserver, ErrorReporter};
pub use uartframe_frame::ErrorKind;
