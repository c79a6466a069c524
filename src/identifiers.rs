//! Type-safe identifiers for host and extension entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Identifies |
//! |------|------------|
//! | [`WindowId`] | A host browser window |
//! | [`TabId`] | A tab within a window |
//! | [`DocumentId`] | A document object (top-level or frame) |
//! | [`FrameId`] | An iframe element within a document |
//! | [`ListenerId`] | A registered event listener (removal token) |
//! | [`TaskId`] | A deferred task in the scheduler |
//!
//! Host-object IDs are allocated from process-wide monotonic counters, so
//! two live objects never share an ID even across windows.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

// ============================================================================
// Counters
// ============================================================================

static NEXT_WINDOW_ID: AtomicU32 = AtomicU32::new(1);
static NEXT_TAB_ID: AtomicU32 = AtomicU32::new(1);
static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// Macro
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $repr:ty, $counter:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name($repr);

        impl $name {
            /// Allocates the next identifier.
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Wraps a raw value.
            #[inline]
            #[must_use]
            pub const fn new(raw: $repr) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            #[inline]
            #[must_use]
            pub const fn raw(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

// ============================================================================
// Identifier Types
// ============================================================================

define_id! {
    /// Identifies a host browser window.
    WindowId, u32, NEXT_WINDOW_ID, "window-"
}

define_id! {
    /// Identifies a tab within a window.
    TabId, u32, NEXT_TAB_ID, "tab-"
}

define_id! {
    /// Identifies a document object, top-level or frame.
    DocumentId, u64, NEXT_DOCUMENT_ID, "document-"
}

define_id! {
    /// Identifies an iframe element within a document.
    FrameId, u64, NEXT_FRAME_ID, "frame-"
}

define_id! {
    /// Removal token for a registered event listener.
    ListenerId, u64, NEXT_LISTENER_ID, "listener-"
}

define_id! {
    /// Identifies a deferred task in the scheduler.
    TaskId, u64, NEXT_TASK_ID, "task-"
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let a = DocumentId::next();
        let b = DocumentId::next();
        assert!(b > a);
    }

    #[test]
    fn test_display_includes_kind() {
        assert_eq!(TabId::new(7).to_string(), "tab-7");
        assert_eq!(WindowId::new(3).to_string(), "window-3");
        assert_eq!(ListenerId::new(12).to_string(), "listener-12");
    }

    #[test]
    fn test_raw_round_trip() {
        let id = FrameId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(FrameId::new(id.raw()), id);
    }
}
