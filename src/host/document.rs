//! Document and frame handles.
//!
//! A [`Document`] models one document object — top-level or nested frame —
//! as the tracker consumes it: contained media elements, child frames
//! (same-origin or cross-origin), per-event-kind media listeners, keyup
//! listeners, subtree-removal observers, and the element-creation hook that
//! lets the tracker observe media elements a page creates but never inserts.
//!
//! Documents carry a liveness flag. Navigation and teardown mark the old
//! document dead; every consumer checks liveness before acting, so a
//! callback that fires late degrades to a no-op instead of touching a
//! torn-down tree.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{DocumentId, FrameId, ListenerId};

use super::events::{KeyInput, ListenerSet, MediaEventKind, MutationRecord, NodeKind};
use super::media::{MediaElement, MediaKind};
use super::scheduler::Scheduler;
use super::window::{Window, WindowInner};

// ============================================================================
// Callback Aliases
// ============================================================================

/// Listener for one media event kind.
pub type MediaCallback = dyn Fn(MediaEventKind) + Send + Sync;

/// Listener for key releases in a content document.
pub type KeyupCallback = dyn Fn(&Document, KeyInput) + Send + Sync;

/// Observer for subtree removals.
pub type MutationCallback = dyn Fn(&MutationRecord) + Send + Sync;

/// Hook invoked for every media element the document creates.
pub type CreationHook = dyn Fn(&MediaElement) + Send + Sync;

// ============================================================================
// Media Listener Registry
// ============================================================================

/// Media listeners keyed by event kind, with token-based removal.
#[derive(Default)]
struct MediaListenerSet {
    entries: Mutex<Vec<(ListenerId, MediaEventKind, Arc<MediaCallback>)>>,
}

impl MediaListenerSet {
    fn add(&self, kind: MediaEventKind, listener: Arc<MediaCallback>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.lock().push((id, kind, listener));
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _, _)| *entry_id != id);
        entries.len() != before
    }

    fn snapshot(&self, kind: MediaEventKind) -> Vec<Arc<MediaCallback>> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry_kind, _)| *entry_kind == kind)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a document.
pub(crate) struct DocumentInner {
    /// Unique identifier.
    id: DocumentId,
    /// Shared deferred-task scheduler.
    scheduler: Scheduler,
    /// Parent document when this document is a nested frame's content.
    parent: Mutex<Weak<DocumentInner>>,
    /// Owning window, set when the document is adopted by a tab.
    window: Mutex<Weak<WindowInner>>,
    /// Whether the body exists yet.
    body: Mutex<bool>,
    /// Attached media elements.
    media: Mutex<Vec<MediaElement>>,
    /// Child frame elements.
    frames: Mutex<Vec<FrameElement>>,
    /// Media event listeners, keyed by kind.
    media_listeners: MediaListenerSet,
    /// Keyup listeners.
    keyup_listeners: ListenerSet<KeyupCallback>,
    /// Subtree-removal observers.
    mutation_observers: ListenerSet<MutationCallback>,
    /// Element-creation hook.
    creation_hook: Mutex<Option<Arc<CreationHook>>>,
    /// Instrumentation marker.
    instrumented: AtomicBool,
    /// Liveness flag; set on navigation away or teardown.
    dead: AtomicBool,
}

// ============================================================================
// Document
// ============================================================================

/// Handle to a document object.
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Document {
    pub(crate) inner: Arc<DocumentInner>,
}

/// Weak handle to a document.
#[derive(Clone)]
pub struct WeakDocument(Weak<DocumentInner>);

impl WeakDocument {
    /// Upgrades to a strong handle if the document is still referenced.
    #[must_use]
    pub fn upgrade(&self) -> Option<Document> {
        self.0.upgrade().map(|inner| Document { inner })
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id)
            .field("dead", &self.inner.dead.load(Ordering::Relaxed))
            .field("media", &self.inner.media.lock().len())
            .field("frames", &self.inner.frames.lock().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Document - Constructor
// ============================================================================

impl Document {
    /// Creates a fresh top-level document with a body.
    pub(crate) fn new(scheduler: Scheduler) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                id: DocumentId::next(),
                scheduler,
                parent: Mutex::new(Weak::new()),
                window: Mutex::new(Weak::new()),
                body: Mutex::new(true),
                media: Mutex::new(Vec::new()),
                frames: Mutex::new(Vec::new()),
                media_listeners: MediaListenerSet::default(),
                keyup_listeners: ListenerSet::default(),
                mutation_observers: ListenerSet::default(),
                creation_hook: Mutex::new(None),
                instrumented: AtomicBool::new(false),
                dead: AtomicBool::new(false),
            }),
        }
    }

    /// Rebuilds a handle from inner state.
    pub(crate) fn from_inner(inner: Arc<DocumentInner>) -> Self {
        Self { inner }
    }

    /// Downgrades to a weak handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument(Arc::downgrade(&self.inner))
    }

    /// Returns `true` if both handles refer to the same document.
    #[inline]
    #[must_use]
    pub fn same(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// Document - Accessors
// ============================================================================

impl Document {
    /// Returns the document ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.inner.id
    }

    /// Returns `true` once the document has been torn down.
    #[inline]
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.inner.dead.load(Ordering::Acquire)
    }

    /// Returns `true` while the body exists.
    #[inline]
    #[must_use]
    pub fn has_body(&self) -> bool {
        *self.inner.body.lock()
    }

    /// Sets body presence. Documents mid-parse have no body yet.
    pub fn set_has_body(&self, has_body: bool) {
        *self.inner.body.lock() = has_body;
    }

    /// Returns `true` if this document is not the content of a nested frame.
    #[inline]
    #[must_use]
    pub fn is_top(&self) -> bool {
        self.inner.parent.lock().strong_count() == 0
    }

    /// Returns the top-level document of this document's frame chain.
    #[must_use]
    pub fn top(&self) -> Document {
        let mut current = Arc::clone(&self.inner);
        loop {
            let parent = current.parent.lock().upgrade();
            match parent {
                Some(parent) => current = parent,
                None => return Document { inner: current },
            }
        }
    }

    /// Returns the attached media elements.
    #[must_use]
    pub fn media_elements(&self) -> Vec<MediaElement> {
        self.inner.media.lock().clone()
    }

    /// Returns the child frame elements.
    #[must_use]
    pub fn frames(&self) -> Vec<FrameElement> {
        self.inner.frames.lock().clone()
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }
}

// ============================================================================
// Document - Lifecycle
// ============================================================================

impl Document {
    /// Marks this document and every same-origin descendant dead.
    pub fn mark_dead(&self) {
        if self.inner.dead.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(document_id = %self.inner.id, "Document torn down");
        for frame in self.frames() {
            if let Ok(child) = frame.content_document() {
                child.mark_dead();
            }
        }
    }

    /// Adopts this document and its same-origin subtree into a window.
    pub(crate) fn adopt_window(&self, window: Weak<WindowInner>) {
        *self.inner.window.lock() = window.clone();
        for frame in self.frames() {
            if let Ok(child) = frame.content_document() {
                child.adopt_window(window.clone());
            }
        }
    }

    pub(crate) fn owning_window(&self) -> Option<Window> {
        self.inner
            .window
            .lock()
            .upgrade()
            .map(Window::from_inner)
    }
}

// ============================================================================
// Document - Element Tree
// ============================================================================

impl Document {
    /// Creates a detached media element, running the creation hook.
    ///
    /// The hook is how the tracker observes elements a page creates but
    /// never inserts into the tree.
    pub fn create_element(&self, kind: MediaKind) -> MediaElement {
        let element = MediaElement::new(kind);
        let hook = self.inner.creation_hook.lock().clone();
        if let Some(hook) = hook {
            hook(&element);
        }
        element
    }

    /// Appends a media element to the body.
    pub fn append_media(&self, element: &MediaElement) {
        element.set_owner(Arc::downgrade(&self.inner));
        self.inner.media.lock().push(element.clone());
        trace!(document_id = %self.inner.id, tag = element.kind().tag_name(), "Media appended");
    }

    /// Removes a media element, notifying mutation observers.
    ///
    /// Returns `false` if the element was not attached here.
    pub fn remove_media(&self, element: &MediaElement) -> bool {
        let removed = {
            let mut media = self.inner.media.lock();
            let before = media.len();
            media.retain(|attached| !attached.same(element));
            media.len() != before
        };
        if removed {
            element.clear_owner();
            self.notify_mutation(&MutationRecord::removal(element.kind().node_kind()));
        }
        removed
    }

    /// Appends a frame element, adopting same-origin content into this
    /// document's window context and announcing its load.
    pub fn append_frame(&self, frame: FrameElement) {
        if let Ok(child) = frame.content_document() {
            *child.inner.parent.lock() = Arc::downgrade(&self.inner);
            child.adopt_window(self.inner.window.lock().clone());
        }
        self.inner.frames.lock().push(frame.clone());

        // Frame content announces itself through the window's document-load
        // event, which is what arms instrumentation for nested frames.
        if let Ok(child) = frame.content_document()
            && !child.is_dead()
            && let Some(window) = self.owning_window()
        {
            window.notify_document_load(&child);
        }
    }

    /// Removes a frame element, tearing down same-origin content and
    /// notifying mutation observers.
    ///
    /// Returns `false` if the frame was not attached here.
    pub fn remove_frame(&self, frame: &FrameElement) -> bool {
        let removed = {
            let mut frames = self.inner.frames.lock();
            let before = frames.len();
            frames.retain(|attached| !attached.same(frame));
            frames.len() != before
        };
        if removed {
            if let Ok(child) = frame.content_document() {
                child.mark_dead();
            }
            self.notify_mutation(&MutationRecord::removal(NodeKind::Iframe));
        }
        removed
    }
}

// ============================================================================
// Document - Listeners
// ============================================================================

impl Document {
    /// Registers a listener for one media event kind.
    pub fn add_media_listener(
        &self,
        kind: MediaEventKind,
        listener: Arc<MediaCallback>,
    ) -> ListenerId {
        self.inner.media_listeners.add(kind, listener)
    }

    /// Removes a media listener by token.
    pub fn remove_media_listener(&self, id: ListenerId) -> bool {
        self.inner.media_listeners.remove(id)
    }

    /// Registers a keyup listener.
    pub fn add_keyup_listener(&self, listener: Arc<KeyupCallback>) -> ListenerId {
        self.inner.keyup_listeners.add(listener)
    }

    /// Removes a keyup listener by token.
    pub fn remove_keyup_listener(&self, id: ListenerId) -> bool {
        self.inner.keyup_listeners.remove(id)
    }

    /// Registers a subtree-removal observer.
    pub fn add_mutation_observer(&self, observer: Arc<MutationCallback>) -> ListenerId {
        self.inner.mutation_observers.add(observer)
    }

    /// Removes a mutation observer by token.
    pub fn remove_mutation_observer(&self, id: ListenerId) -> bool {
        self.inner.mutation_observers.remove(id)
    }

    /// Installs the element-creation hook, replacing any previous one.
    pub fn set_creation_hook(&self, hook: Arc<CreationHook>) {
        *self.inner.creation_hook.lock() = Some(hook);
    }

    /// Removes the element-creation hook.
    pub fn clear_creation_hook(&self) {
        *self.inner.creation_hook.lock() = None;
    }

    /// Total registered media listeners. Exposed for binding accounting.
    #[must_use]
    pub fn media_listener_count(&self) -> usize {
        self.inner.media_listeners.len()
    }

    /// Registered mutation observers. Exposed for binding accounting.
    #[must_use]
    pub fn mutation_observer_count(&self) -> usize {
        self.inner.mutation_observers.len()
    }

    /// Registered keyup listeners. Exposed for binding accounting.
    #[must_use]
    pub fn keyup_listener_count(&self) -> usize {
        self.inner.keyup_listeners.len()
    }
}

// ============================================================================
// Document - Dispatch
// ============================================================================

impl Document {
    /// Delivers a media event to this document's listeners for that kind.
    pub(crate) fn dispatch_media_event(&self, kind: MediaEventKind) {
        for listener in self.inner.media_listeners.snapshot(kind) {
            listener(kind);
        }
    }

    /// Delivers a key release to this document's keyup listeners.
    pub fn dispatch_keyup(&self, input: KeyInput) {
        for listener in self.inner.keyup_listeners.snapshot() {
            listener(self, input);
        }
    }

    fn notify_mutation(&self, record: &MutationRecord) {
        for observer in self.inner.mutation_observers.snapshot() {
            observer(record);
        }
    }
}

// ============================================================================
// Document - Instrumentation Marker
// ============================================================================

impl Document {
    /// Returns `true` while the instrumentation marker is set.
    #[inline]
    #[must_use]
    pub fn is_instrumented(&self) -> bool {
        self.inner.instrumented.load(Ordering::Acquire)
    }

    /// Sets or clears the instrumentation marker.
    pub(crate) fn set_instrumented(&self, instrumented: bool) {
        self.inner.instrumented.store(instrumented, Ordering::Release);
    }
}

// ============================================================================
// FrameElement
// ============================================================================

/// Content behind a frame element.
enum FrameContent {
    /// Same-origin content; the document is reachable.
    SameOrigin(Document),
    /// Cross-origin content; access fails.
    CrossOrigin,
}

/// Internal shared state for a frame element.
struct FrameInner {
    id: FrameId,
    content: FrameContent,
}

/// Handle to an `iframe` element.
#[derive(Clone)]
pub struct FrameElement {
    inner: Arc<FrameInner>,
}

impl fmt::Debug for FrameElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match self.inner.content {
            FrameContent::SameOrigin(_) => "same-origin",
            FrameContent::CrossOrigin => "cross-origin",
        };
        f.debug_struct("FrameElement")
            .field("id", &self.inner.id)
            .field("origin", &origin)
            .finish()
    }
}

impl FrameElement {
    /// Creates a frame with same-origin content.
    #[must_use]
    pub fn same_origin(content: Document) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                id: FrameId::next(),
                content: FrameContent::SameOrigin(content),
            }),
        }
    }

    /// Creates a frame whose content is cross-origin.
    #[must_use]
    pub fn cross_origin() -> Self {
        Self {
            inner: Arc::new(FrameInner {
                id: FrameId::next(),
                content: FrameContent::CrossOrigin,
            }),
        }
    }

    /// Returns the frame ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.inner.id
    }

    /// Returns the content document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CrossOriginFrame`] when same-origin access is denied.
    pub fn content_document(&self) -> Result<Document> {
        match &self.inner.content {
            FrameContent::SameOrigin(document) => Ok(document.clone()),
            FrameContent::CrossOrigin => Err(Error::cross_origin_frame(self.inner.id)),
        }
    }

    /// Returns `true` if both handles refer to the same frame.
    #[inline]
    #[must_use]
    pub fn same(&self, other: &FrameElement) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// Tests
// ============================================================================
