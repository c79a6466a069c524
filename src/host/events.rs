//! Host event kinds and listener registries.
//!
//! Every subscription in the host hands back a [`ListenerId`] token so the
//! exact listener can be removed later; bindings store these tokens and
//! unwind them as a unit on teardown.
//!
//! # Event Kinds
//!
//! | Type | Source |
//! |------|--------|
//! | [`MediaEventKind`] | Media elements (playback transitions) |
//! | [`KeyInput`] | Content document keyboard |
//! | [`MouseButton`] | Tab strip icon presses |
//! | [`MutationRecord`] | Document subtree removals |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;

use crate::identifiers::ListenerId;

// ============================================================================
// MediaEventKind
// ============================================================================

/// The media element events the host surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    /// Playback started or resumed.
    Playing,
    /// Muted flag or volume changed.
    VolumeChange,
    /// Playback paused.
    Pause,
    /// Media was unloaded.
    Emptied,
    /// First frame of data became available.
    LoadedData,
    /// A seek operation began.
    Seeking,
}

impl MediaEventKind {
    /// Every media event kind, in registration order.
    pub const ALL: [MediaEventKind; 6] = [
        MediaEventKind::Playing,
        MediaEventKind::VolumeChange,
        MediaEventKind::Pause,
        MediaEventKind::Emptied,
        MediaEventKind::LoadedData,
        MediaEventKind::Seeking,
    ];

    /// Returns the DOM event name.
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            MediaEventKind::Playing => "playing",
            MediaEventKind::VolumeChange => "volumechange",
            MediaEventKind::Pause => "pause",
            MediaEventKind::Emptied => "emptied",
            MediaEventKind::LoadedData => "loadeddata",
            MediaEventKind::Seeking => "seeking",
        }
    }
}

// ============================================================================
// KeyInput
// ============================================================================

/// A keyboard input delivered to a content document's keyup listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    /// Whether Ctrl was held.
    pub ctrl: bool,
    /// Legacy key code of the released key.
    pub key_code: u32,
}

impl KeyInput {
    /// A plain key release.
    #[inline]
    #[must_use]
    pub const fn plain(key_code: u32) -> Self {
        Self {
            ctrl: false,
            key_code,
        }
    }

    /// A key release with Ctrl held.
    #[inline]
    #[must_use]
    pub const fn with_ctrl(key_code: u32) -> Self {
        Self {
            ctrl: true,
            key_code,
        }
    }
}

// ============================================================================
// MouseButton
// ============================================================================

/// Mouse button of a press on the tab strip icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Left button.
    Primary,
    /// Middle button.
    Auxiliary,
    /// Right button.
    Secondary,
}

// ============================================================================
// Mutations
// ============================================================================

/// Kind of a node removed from a document subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A `video` element.
    Video,
    /// An `audio` element.
    Audio,
    /// An `iframe` element.
    Iframe,
}

/// A batch of subtree removals reported to mutation observers.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// Kinds of the removed nodes.
    pub removed: Vec<NodeKind>,
}

impl MutationRecord {
    /// A record for a single removed node.
    #[inline]
    #[must_use]
    pub fn removal(kind: NodeKind) -> Self {
        Self {
            removed: vec![kind],
        }
    }
}

// ============================================================================
// ListenerSet
// ============================================================================

/// A token-indexed set of listeners.
///
/// `snapshot` clones the listener list out of the lock so dispatch can call
/// listeners that re-enter the host.
pub(crate) struct ListenerSet<F: ?Sized> {
    entries: Mutex<Vec<(ListenerId, Arc<F>)>>,
}

impl<F: ?Sized> Default for ListenerSet<F> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> ListenerSet<F> {
    /// Registers a listener, returning its removal token.
    pub(crate) fn add(&self, listener: Arc<F>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.lock().push((id, listener));
        id
    }

    /// Removes the listener with the given token.
    ///
    /// Returns `false` if no such listener is registered.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Clones the current listeners out of the lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Returns the number of registered listeners.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_event_names() {
        assert_eq!(MediaEventKind::Playing.name(), "playing");
        assert_eq!(MediaEventKind::VolumeChange.name(), "volumechange");
        assert_eq!(MediaEventKind::ALL.len(), 6);
    }

    #[test]
    fn test_listener_set_add_remove() {
        let set: ListenerSet<dyn Fn() + Send + Sync> = ListenerSet::default();
        let a = set.add(Arc::new(|| {}));
        let b = set.add(Arc::new(|| {}));
        assert_eq!(set.len(), 2);

        assert!(set.remove(a));
        assert_eq!(set.len(), 1);
        assert!(!set.remove(a));
        assert!(set.remove(b));
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_snapshot_is_detached_from_set() {
        let set: ListenerSet<dyn Fn() + Send + Sync> = ListenerSet::default();
        let id = set.add(Arc::new(|| {}));
        let snapshot = set.snapshot();
        set.remove(id);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(set.len(), 0);
    }
}
