//! The host side of a `speak` call: event interest, event delivery, and the
//! abort flag. The core consumes these; it never gets a handle back into the
//! host's own synthesis entry point.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::SiteError;

/// Interest bit for bookmark events.
pub const EVENT_INTEREST_BOOKMARK: u64 = 1 << 4;

/// Action bit the host sets to abort rendering.
pub const ACTION_ABORT: u32 = 1;

/// A bookmark event raised back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkEvent {
    /// Numeric marker parsed from the bookmark text (0 when not numeric).
    pub marker: i64,
    /// Literal bookmark text.
    pub text: String,
}

/// Host-owned cancellation signal. Never cached: query it on every poll.
pub trait AbortSignal {
    fn abort_requested(&self) -> bool;
}

impl AbortSignal for AtomicBool {
    fn abort_requested(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// A host action bitmask; abort when `ACTION_ABORT` is set.
impl AbortSignal for AtomicU32 {
    fn abort_requested(&self) -> bool {
        self.load(Ordering::Relaxed) & ACTION_ABORT != 0
    }
}

/// Callbacks the host hands to one `speak` invocation.
pub trait EngineSite: AbortSignal {
    /// Bitmask of event classes the host wants to receive.
    fn event_interest(&self) -> Result<u64, SiteError>;

    fn add_event(&self, event: BookmarkEvent) -> Result<(), SiteError>;
}
