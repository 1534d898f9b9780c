//! Callbacks into the embedding host.
//!
//! Two host callbacks are consumed by the layer:
//!
//! - a [`HistorySink`] that receives `container/member` candidates
//!   discovered while selecting a member from an archive, so a UI can list
//!   every disk image reachable inside it;
//! - a [`Notifier`] that is told, exactly once per layer, that the optional
//!   DEFLATE codec is missing.
//!
//! Both are implemented for plain closures.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use arcvfs::FileLayer;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let layer = FileLayer::builder()
//!     .history(move |path: &str| sink.lock().unwrap().push(path.to_string()))
//!     .build();
//! # drop(layer);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

/// Messages the layer may raise to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Notice {
    /// No DEFLATE codec is available; compressed files open as plain files.
    CodecUnavailable,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CodecUnavailable => {
                f.write_str("no DEFLATE codec available, compressed files are unsupported")
            }
        }
    }
}

/// Receives archive members discovered during selection.
pub trait HistorySink: Send + Sync {
    /// Records a `container/member` path. Failures are the sink's own business.
    fn record_candidate(&self, path: &str);
}

impl<F> HistorySink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn record_candidate(&self, path: &str) {
        self(path)
    }
}

/// Shows a message to the user.
pub trait Notifier: Send + Sync {
    /// Displays `notice`.
    fn notify(&self, notice: Notice);
}

impl<F> Notifier for F
where
    F: Fn(Notice) + Send + Sync,
{
    fn notify(&self, notice: Notice) {
        self(notice)
    }
}

/// Latch that lets a notice through at most once.
#[derive(Debug, Default)]
pub struct NotifyOnce {
    fired: AtomicBool,
}

impl NotifyOnce {
    /// Creates an armed latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `notice` unless the latch already fired. Returns true if it
    /// was delivered on this call.
    pub fn fire(&self, notifier: Option<&dyn Notifier>, notice: Notice) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        log::warn!("{}", notice);
        if let Some(notifier) = notifier {
            notifier.notify(notice);
        }
        true
    }

    /// Returns true if the latch has fired.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
