//! Error types for noisy-tabs.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//!
//! Most failure modes in this crate deliberately do **not** surface here:
//! event-path failures (stale handles, missing UI anchors, re-entrant
//! attach/detach) degrade to silent no-ops so a misbehaving page can never
//! destabilize the host UI. `Error` covers the host-facing seams where the
//! caller can act on the failure.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Lifecycle | [`Error::AlreadyActive`] |
//! | Staleness | [`Error::StaleTab`], [`Error::StaleDocument`], [`Error::WindowClosed`] |
//! | Frame access | [`Error::CrossOriginFrame`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{DocumentId, FrameId, TabId, WindowId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The extension is already activated.
    ///
    /// Returned when `activate` is called while bindings are live.
    #[error("Extension is already active")]
    AlreadyActive,

    // ========================================================================
    // Staleness Errors
    // ========================================================================
    /// Tab handle refers to a closed tab.
    #[error("Stale tab: {tab_id}")]
    StaleTab {
        /// The closed tab's ID.
        tab_id: TabId,
    },

    /// Document handle refers to a torn-down document.
    ///
    /// A document is torn down when its tab navigates away or closes.
    #[error("Stale document: {document_id}")]
    StaleDocument {
        /// The torn-down document's ID.
        document_id: DocumentId,
    },

    /// Window handle refers to a closed window.
    #[error("Window closed: {window_id}")]
    WindowClosed {
        /// The closed window's ID.
        window_id: WindowId,
    },

    // ========================================================================
    // Frame Access Errors
    // ========================================================================
    /// Same-origin access to a frame's content document was denied.
    ///
    /// Recursive walks treat the frame as an unreachable subtree.
    #[error("Cross-origin frame access denied: {frame_id}")]
    CrossOriginFrame {
        /// The inaccessible frame's ID.
        frame_id: FrameId,
    },
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a stale tab error.
    #[inline]
    pub fn stale_tab(tab_id: TabId) -> Self {
        Self::StaleTab { tab_id }
    }

    /// Creates a stale document error.
    #[inline]
    pub fn stale_document(document_id: DocumentId) -> Self {
        Self::StaleDocument { document_id }
    }

    /// Creates a window closed error.
    #[inline]
    pub fn window_closed(window_id: WindowId) -> Self {
        Self::WindowClosed { window_id }
    }

    /// Creates a cross-origin frame error.
    #[inline]
    pub fn cross_origin_frame(frame_id: FrameId) -> Self {
        Self::CrossOriginFrame { frame_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a staleness error.
    ///
    /// Stale errors mean the referenced host object no longer exists; on the
    /// event path they are swallowed rather than propagated.
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Self::StaleTab { .. } | Self::StaleDocument { .. } | Self::WindowClosed { .. }
        )
    }

    /// Returns `true` if this error is silently skippable during tree walks.
    #[inline]
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        self.is_stale() || matches!(self, Self::CrossOriginFrame { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
