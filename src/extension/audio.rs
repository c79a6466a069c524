//! Aggregate audio state: the probe and the deep mute toggle.
//!
//! The probe never tracks deltas. Every call recomputes the aggregate from
//! the live tree, so duplicate, reordered, or missed events self-correct on
//! the next probe.

// ============================================================================
// Imports
// ============================================================================

use std::ops::ControlFlow;

use tracing::trace;

use crate::host::Document;

use super::walk::visit_documents;

// ============================================================================
// AggregateState
// ============================================================================

/// Tri-valued audio summary of a document and all reachable nested frames.
///
/// Precedence: `Playing` > `PlayingMuted` > `NotPlaying`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateState {
    /// At least one active unmuted media element exists somewhere.
    Playing,
    /// Active media exists somewhere, all of it muted.
    PlayingMuted,
    /// No active media anywhere.
    NotPlaying,
}

impl AggregateState {
    /// Merges two levels' results under the precedence order.
    #[must_use]
    pub fn merge(self, other: AggregateState) -> AggregateState {
        use AggregateState::{NotPlaying, Playing, PlayingMuted};
        match (self, other) {
            (Playing, _) | (_, Playing) => Playing,
            (PlayingMuted, _) | (_, PlayingMuted) => PlayingMuted,
            (NotPlaying, NotPlaying) => NotPlaying,
        }
    }

    /// Returns `true` if any active media exists (muted or not).
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, AggregateState::NotPlaying)
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Computes the aggregate audio state of `root` and its frame tree.
#[must_use]
pub fn probe(root: &Document) -> AggregateState {
    let mut state = AggregateState::NotPlaying;
    let _ = visit_documents(root, &mut |doc| {
        state = state.merge(scan_document(doc));
        // Playing dominates; nothing deeper can change the result.
        if state == AggregateState::Playing {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    trace!(document_id = %root.id(), ?state, "Probe");
    state
}

/// Scans one document level, without recursing.
fn scan_document(doc: &Document) -> AggregateState {
    let mut any_active = false;
    for media in doc.media_elements() {
        if media.is_active() {
            any_active = true;
            if !media.is_muted() {
                return AggregateState::Playing;
            }
        }
    }
    if any_active {
        AggregateState::PlayingMuted
    } else {
        AggregateState::NotPlaying
    }
}

// ============================================================================
// Mute Toggle
// ============================================================================

/// Sets the muted flag on every media element in `root` and every reachable
/// same-origin nested frame. Idempotent.
pub fn set_muted_deep(root: &Document, muted: bool) {
    let _ = visit_documents(root, &mut |doc| {
        for media in doc.media_elements() {
            media.set_muted(muted);
        }
        ControlFlow::Continue(())
    });
}

// ============================================================================
// Tests
// ============================================================================
