//! Toast sink.
//!
//! The store reports every user-initiated mutation outcome through this
//! trait, exactly once per action: a success toast or a failure toast,
//! never both, never silence. Read-only refreshes bypass it entirely.

use std::sync::Mutex;

/// Fire-and-forget user feedback channel.
pub trait Notifier {
    fn success(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// CLI sink: successes to stdout, the rest to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Toast severity, for sinks that record rather than print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Warn,
    Error,
}

/// Recording sink for tests and embedding hosts that render toasts
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<(ToastKind, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        MemoryNotifier::default()
    }

    pub fn events(&self) -> Vec<(ToastKind, String)> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == ToastKind::Error)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == ToastKind::Success)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn success(&self, message: &str) {
        self.events.lock().unwrap().push((ToastKind::Success, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.events.lock().unwrap().push((ToastKind::Warn, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.events.lock().unwrap().push((ToastKind::Error, message.to_string()));
    }
}
