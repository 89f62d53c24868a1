use tracing::warn;
use uartframe_frame::ErrorKind;

/// Application code that wants to hear about link errors.
pub trait ErrorObserver: Send {
    fn on_error(&mut self, kind: ErrorKind);
}

impl<F> ErrorObserver for F
where
    F: FnMut(ErrorKind) + Send,
{
    fn on_error(&mut self, kind: ErrorKind) {
        self(kind)
    }
}

/// Holds the error observer slot for one link.
///
/// Reporting is observational only; nothing here changes decoder state.
#[derive(Default)]
pub struct ErrorReporter {
    observer: Option<Box<dyn ErrorObserver>>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl ErrorObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Forward `kind` to the registered observer, if any.
    pub fn report(&mut self, kind: ErrorKind) {
        warn!(kind = kind.as_str(), observed = self.has_observer(), "link error");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_error(kind);
        }
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("has_observer", &self.has_observer())
            .finish()
    }
}
