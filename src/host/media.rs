//! Media element handles.
//!
//! A [`MediaElement`] models the playback-engine surface the tracker
//! consumes: the paused/muted/seeking/audio-track flags plus the playback
//! transitions that emit media events to the owning document's listeners.
//!
//! An element is **active** when it reports an audio track (the track flag
//! is not strictly "no track"), is not paused, and is not seeking. Active
//! elements are what the probe counts as audible or muted-audible.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use super::document::{Document, DocumentInner};
use super::events::{MediaEventKind, NodeKind};

// ============================================================================
// MediaKind
// ============================================================================

/// Whether an element is a `video` or `audio` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// A `video` element.
    Video,
    /// An `audio` element.
    Audio,
}

impl MediaKind {
    /// Returns the element tag name.
    #[inline]
    #[must_use]
    pub fn tag_name(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// Returns the mutation-record node kind for this element.
    #[inline]
    #[must_use]
    pub fn node_kind(self) -> NodeKind {
        match self {
            MediaKind::Video => NodeKind::Video,
            MediaKind::Audio => NodeKind::Audio,
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// Mutable playback flags.
struct MediaState {
    /// Whether playback is paused.
    paused: bool,
    /// Whether output is muted.
    muted: bool,
    /// Whether a seek is in progress.
    seeking: bool,
    /// Audio track presence: `None` = unknown, `Some(false)` = definitely none.
    audio_track: Option<bool>,
}

/// Internal shared state for a media element.
pub(crate) struct MediaInner {
    /// Element kind.
    kind: MediaKind,
    /// Playback flags.
    state: Mutex<MediaState>,
    /// Owning document while attached.
    owner: Mutex<Weak<DocumentInner>>,
}

// ============================================================================
// MediaElement
// ============================================================================

/// Handle to a media element.
///
/// Cheap to clone. Elements start detached, paused, unmuted, with unknown
/// audio track presence; playback transitions dispatch the corresponding
/// media event through the owning document.
#[derive(Clone)]
pub struct MediaElement {
    pub(crate) inner: Arc<MediaInner>,
}

/// Weak handle to a media element.
#[derive(Clone)]
pub struct WeakMediaElement(Weak<MediaInner>);

impl WeakMediaElement {
    /// Upgrades to a strong handle if the element is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<MediaElement> {
        self.0.upgrade().map(|inner| MediaElement { inner })
    }
}

impl fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MediaElement")
            .field("kind", &self.inner.kind)
            .field("paused", &state.paused)
            .field("muted", &state.muted)
            .field("seeking", &state.seeking)
            .field("audio_track", &state.audio_track)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MediaElement - Constructor
// ============================================================================

impl MediaElement {
    /// Creates a detached element.
    #[must_use]
    pub fn new(kind: MediaKind) -> Self {
        Self {
            inner: Arc::new(MediaInner {
                kind,
                state: Mutex::new(MediaState {
                    paused: true,
                    muted: false,
                    seeking: false,
                    audio_track: None,
                }),
                owner: Mutex::new(Weak::new()),
            }),
        }
    }

    /// Downgrades to a weak handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakMediaElement {
        WeakMediaElement(Arc::downgrade(&self.inner))
    }

    /// Returns `true` if both handles refer to the same element.
    #[inline]
    #[must_use]
    pub fn same(&self, other: &MediaElement) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// MediaElement - Accessors
// ============================================================================

impl MediaElement {
    /// Returns the element kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    /// Returns `true` while playback is paused.
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    /// Returns `true` while output is muted.
    #[inline]
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.inner.state.lock().muted
    }

    /// Returns `true` while a seek is in progress.
    #[inline]
    #[must_use]
    pub fn is_seeking(&self) -> bool {
        self.inner.state.lock().seeking
    }

    /// Returns the audio-track presence flag.
    #[inline]
    #[must_use]
    pub fn audio_track(&self) -> Option<bool> {
        self.inner.state.lock().audio_track
    }

    /// Returns `true` unless the element definitely has no audio track.
    #[inline]
    #[must_use]
    pub fn has_audible_track(&self) -> bool {
        self.inner.state.lock().audio_track != Some(false)
    }

    /// Returns `true` if the element counts toward aggregate audio state:
    /// a usable audio track, not paused, not seeking.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let state = self.inner.state.lock();
        state.audio_track != Some(false) && !state.paused && !state.seeking
    }

    /// Returns `true` while the element is attached to a document.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.owner.lock().strong_count() > 0
    }
}

// ============================================================================
// MediaElement - Playback Transitions
// ============================================================================

impl MediaElement {
    /// Starts or resumes playback.
    pub fn play(&self) {
        self.inner.state.lock().paused = false;
        self.dispatch(MediaEventKind::Playing);
    }

    /// Pauses playback.
    pub fn pause(&self) {
        self.inner.state.lock().paused = true;
        self.dispatch(MediaEventKind::Pause);
    }

    /// Sets the muted flag.
    pub fn set_muted(&self, muted: bool) {
        self.inner.state.lock().muted = muted;
        self.dispatch(MediaEventKind::VolumeChange);
    }

    /// Begins or ends a seek. Only entering a seek dispatches an event.
    pub fn set_seeking(&self, seeking: bool) {
        self.inner.state.lock().seeking = seeking;
        if seeking {
            self.dispatch(MediaEventKind::Seeking);
        }
    }

    /// Sets the audio-track presence flag without dispatching.
    pub fn set_audio_track(&self, audio_track: Option<bool>) {
        self.inner.state.lock().audio_track = audio_track;
    }

    /// Completes loading with the given audio-track presence.
    pub fn finish_loading(&self, has_audio: bool) {
        self.inner.state.lock().audio_track = Some(has_audio);
        self.dispatch(MediaEventKind::LoadedData);
    }

    /// Unloads the media: playback stops and the track flag resets.
    pub fn unload(&self) {
        {
            let mut state = self.inner.state.lock();
            state.paused = true;
            state.audio_track = None;
        }
        self.dispatch(MediaEventKind::Emptied);
    }
}

// ============================================================================
// MediaElement - Internal
// ============================================================================

impl MediaElement {
    /// Adopts the element into a document. Called on append.
    pub(crate) fn set_owner(&self, owner: Weak<DocumentInner>) {
        *self.inner.owner.lock() = owner;
    }

    /// Detaches the element from its document. Called on removal.
    pub(crate) fn clear_owner(&self) {
        *self.inner.owner.lock() = Weak::new();
    }

    /// Dispatches a media event through the owning document, if attached.
    fn dispatch(&self, kind: MediaEventKind) {
        let owner = self.inner.owner.lock().upgrade();
        if let Some(inner) = owner {
            trace!(event = kind.name(), tag = self.inner.kind.tag_name(), "Media event");
            Document::from_inner(inner).dispatch_media_event(kind);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_element_is_detached_and_paused() {
        let media = MediaElement::new(MediaKind::Video);
        assert!(media.is_paused());
        assert!(!media.is_attached());
        assert!(!media.is_active());
    }

    #[test]
    fn test_active_requires_track_and_playback() {
        let media = MediaElement::new(MediaKind::Audio);
        media.play();
        // Unknown track presence counts as audible, mirroring a track flag
        // that is not strictly false.
        assert!(media.is_active());

        media.set_audio_track(Some(false));
        assert!(!media.is_active());

        media.set_audio_track(Some(true));
        assert!(media.is_active());

        media.set_seeking(true);
        assert!(!media.is_active());
        media.set_seeking(false);
        assert!(media.is_active());

        media.pause();
        assert!(!media.is_active());
    }

    #[test]
    fn test_unload_resets_playback() {
        let media = MediaElement::new(MediaKind::Video);
        media.finish_loading(true);
        media.play();
        assert!(media.is_active());

        media.unload();
        assert!(media.is_paused());
        assert_eq!(media.audio_track(), None);
    }

    #[test]
    fn test_weak_handle_upgrades_while_alive() {
        let media = MediaElement::new(MediaKind::Audio);
        let weak = media.downgrade();
        assert!(weak.upgrade().is_some());
        drop(media);
        assert!(weak.upgrade().is_none());
    }
}
