//! Browser window handles.
//!
//! A [`Window`] models the windowing-subsystem surface the tracker consumes
//! per window: its kind (only browser windows qualify for binding), the tab
//! list, and the four window-level event subscriptions — document-load,
//! page-hide, tab-move, and tab-attribute-modified.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::identifiers::{ListenerId, TabId, WindowId};

use super::document::Document;
use super::events::ListenerSet;
use super::scheduler::Scheduler;
use super::tab::Tab;

// ============================================================================
// Callback Aliases
// ============================================================================

/// Listener for document-level window events (load, page-hide).
pub type DocumentCallback = dyn Fn(&Document) + Send + Sync;

/// Listener for tab-level window events (move, attribute-modified).
pub type TabCallback = dyn Fn(&Tab) + Send + Sync;

// ============================================================================
// WindowKind
// ============================================================================

/// What kind of window this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// A main browsing window with a tab strip.
    Browser,
    /// A popup window.
    Popup,
    /// A dialog window.
    Dialog,
}

impl WindowKind {
    /// Returns `true` for main browsing windows, the only kind bound.
    #[inline]
    #[must_use]
    pub fn is_browser(self) -> bool {
        matches!(self, WindowKind::Browser)
    }
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a window.
pub(crate) struct WindowInner {
    /// Unique identifier.
    id: WindowId,
    /// Diagnostic UUID.
    uuid: Uuid,
    /// Window kind.
    kind: WindowKind,
    /// Shared deferred-task scheduler.
    scheduler: Scheduler,
    /// Tabs, in strip order.
    tabs: Mutex<Vec<Tab>>,
    /// Document-load listeners.
    document_load: ListenerSet<DocumentCallback>,
    /// Page-hide listeners.
    page_hide: ListenerSet<DocumentCallback>,
    /// Tab-move listeners.
    tab_move: ListenerSet<TabCallback>,
    /// Tab-attribute-modified listeners.
    tab_attr_modified: ListenerSet<TabCallback>,
    /// Set once the window closes.
    closed: AtomicBool,
}

// ============================================================================
// Window
// ============================================================================

/// Handle to a browser window.
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Window {
    pub(crate) inner: Arc<WindowInner>,
}

/// Weak handle to a window.
#[derive(Clone)]
pub struct WeakWindow(Weak<WindowInner>);

impl WeakWindow {
    /// Upgrades to a strong handle if the window is still referenced.
    #[must_use]
    pub fn upgrade(&self) -> Option<Window> {
        self.0.upgrade().map(Window::from_inner)
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.inner.id)
            .field("uuid", &self.inner.uuid)
            .field("kind", &self.inner.kind)
            .field("tabs", &self.inner.tabs.lock().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Window - Constructor
// ============================================================================

impl Window {
    /// Creates a window. Announced to listeners by the host.
    pub(crate) fn new(kind: WindowKind, scheduler: Scheduler) -> Self {
        let id = WindowId::next();
        let uuid = Uuid::new_v4();
        debug!(window_id = %id, uuid = %uuid, ?kind, "Window created");
        Self {
            inner: Arc::new(WindowInner {
                id,
                uuid,
                kind,
                scheduler,
                tabs: Mutex::new(Vec::new()),
                document_load: ListenerSet::default(),
                page_hide: ListenerSet::default(),
                tab_move: ListenerSet::default(),
                tab_attr_modified: ListenerSet::default(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<WindowInner>) -> Self {
        Self { inner }
    }

    /// Downgrades to a weak handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakWindow {
        WeakWindow(Arc::downgrade(&self.inner))
    }
}

// ============================================================================
// Window - Accessors
// ============================================================================

impl Window {
    /// Returns the window ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> WindowId {
        self.inner.id
    }

    /// Returns the diagnostic UUID.
    #[inline]
    #[must_use]
    pub fn uuid(&self) -> &Uuid {
        &self.inner.uuid
    }

    /// Returns the window kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> WindowKind {
        self.inner.kind
    }

    /// Returns the shared scheduler.
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Returns `true` once the window has closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

// ============================================================================
// Window - Tab Management
// ============================================================================

impl Window {
    /// Returns the tabs in strip order.
    #[must_use]
    pub fn tabs(&self) -> Vec<Tab> {
        self.inner.tabs.lock().clone()
    }

    /// Returns the number of tabs.
    #[inline]
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.inner.tabs.lock().len()
    }

    /// Creates a new tab at the end of the strip.
    pub fn new_tab(&self) -> Tab {
        let tab = Tab::new(TabId::next(), Arc::downgrade(&self.inner));
        debug!(window_id = %self.inner.id, tab_id = %tab.id(), "New tab created");
        self.inner.tabs.lock().push(tab.clone());
        tab
    }

    /// Moves a tab to a new strip position, announcing the move.
    ///
    /// Returns `false` if the tab is not in this window.
    pub fn move_tab(&self, tab: &Tab, to_index: usize) -> bool {
        let moved = {
            let mut tabs = self.inner.tabs.lock();
            match tabs.iter().position(|candidate| candidate.same(tab)) {
                Some(from) => {
                    let tab = tabs.remove(from);
                    let to_index = to_index.min(tabs.len());
                    tabs.insert(to_index, tab);
                    true
                }
                None => false,
            }
        };
        if moved {
            debug!(window_id = %self.inner.id, tab_id = %tab.id(), to_index, "Tab moved");
            self.notify_tab_move(tab);
        }
        moved
    }

    /// Marks the window closed and closes every tab. Called by the host
    /// after close listeners have run.
    pub(crate) fn mark_closed(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(window_id = %self.inner.id, "Window closed");
        for tab in self.tabs() {
            tab.close();
        }
    }
}

// ============================================================================
// Window - Subscriptions
// ============================================================================

impl Window {
    /// Subscribes to document-load events.
    pub fn on_document_load(&self, listener: Arc<DocumentCallback>) -> ListenerId {
        self.inner.document_load.add(listener)
    }

    /// Removes a document-load listener by token.
    pub fn remove_document_load_listener(&self, id: ListenerId) -> bool {
        self.inner.document_load.remove(id)
    }

    /// Subscribes to page-hide events.
    pub fn on_page_hide(&self, listener: Arc<DocumentCallback>) -> ListenerId {
        self.inner.page_hide.add(listener)
    }

    /// Removes a page-hide listener by token.
    pub fn remove_page_hide_listener(&self, id: ListenerId) -> bool {
        self.inner.page_hide.remove(id)
    }

    /// Subscribes to tab-move events.
    pub fn on_tab_move(&self, listener: Arc<TabCallback>) -> ListenerId {
        self.inner.tab_move.add(listener)
    }

    /// Removes a tab-move listener by token.
    pub fn remove_tab_move_listener(&self, id: ListenerId) -> bool {
        self.inner.tab_move.remove(id)
    }

    /// Subscribes to tab-attribute-modified events.
    pub fn on_tab_attr_modified(&self, listener: Arc<TabCallback>) -> ListenerId {
        self.inner.tab_attr_modified.add(listener)
    }

    /// Removes a tab-attribute-modified listener by token.
    pub fn remove_tab_attr_modified_listener(&self, id: ListenerId) -> bool {
        self.inner.tab_attr_modified.remove(id)
    }
}

// ============================================================================
// Window - Dispatch
// ============================================================================

impl Window {
    pub(crate) fn notify_document_load(&self, document: &Document) {
        for listener in self.inner.document_load.snapshot() {
            listener(document);
        }
    }

    pub(crate) fn notify_page_hide(&self, document: &Document) {
        for listener in self.inner.page_hide.snapshot() {
            listener(document);
        }
    }

    pub(crate) fn notify_tab_move(&self, tab: &Tab) {
        for listener in self.inner.tab_move.snapshot() {
            listener(tab);
        }
    }

    pub(crate) fn notify_tab_attr_modified(&self, tab: &Tab) {
        for listener in self.inner.tab_attr_modified.snapshot() {
            listener(tab);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::host::events::MouseButton;

    fn browser_window() -> Window {
        Window::new(WindowKind::Browser, Scheduler::new())
    }

    #[test]
    fn test_new_tab_joins_strip() {
        let window = browser_window();
        let tab = window.new_tab();
        assert_eq!(window.tab_count(), 1);
        assert!(window.tabs()[0].same(&tab));
        assert!(tab.window().expect("window").inner.id == window.id());
    }

    #[test]
    fn test_navigation_dispatches_page_hide_then_load() {
        let window = browser_window();
        let tab = window.new_tab();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        window.on_page_hide(Arc::new(move |_doc: &Document| o.lock().push("pagehide")));
        let o = Arc::clone(&order);
        window.on_document_load(Arc::new(move |_doc: &Document| o.lock().push("load")));

        let first = Document::new(window.scheduler().clone());
        tab.navigate(first.clone());
        assert_eq!(*order.lock(), vec!["load"]);

        let second = Document::new(window.scheduler().clone());
        tab.navigate(second);
        assert_eq!(*order.lock(), vec!["load", "pagehide", "load"]);
        assert!(first.is_dead());
    }

    #[test]
    fn test_move_tab_announces() {
        let window = browser_window();
        let a = window.new_tab();
        let b = window.new_tab();

        let moved = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&moved);
        window.on_tab_move(Arc::new(move |tab: &Tab| sink.lock().push(tab.id())));

        assert!(window.move_tab(&b, 0));
        assert!(window.tabs()[0].same(&b));
        assert!(window.tabs()[1].same(&a));
        assert_eq!(*moved.lock(), vec![b.id()]);
    }

    #[test]
    fn test_listener_removal_stops_dispatch() {
        let window = browser_window();
        let tab = window.new_tab();

        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let id = window.on_tab_attr_modified(Arc::new(move |_tab: &Tab| *sink.lock() += 1));

        tab.set_attribute("noisy", "true");
        assert_eq!(*count.lock(), 1);

        assert!(window.remove_tab_attr_modified_listener(id));
        tab.set_attribute("noisy", "false");
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_icon_requires_label() {
        let window = browser_window();
        let tab = window.new_tab();
        tab.set_label_rendered(false);
        assert!(!tab.insert_icon(crate::host::tab::IconNode::new()));

        tab.set_label_rendered(true);
        assert!(tab.insert_icon(crate::host::tab::IconNode::new()));
        // At most one icon per tab.
        assert!(!tab.insert_icon(crate::host::tab::IconNode::new()));
    }

    #[test]
    fn test_unconsumed_icon_press_selects_tab() {
        let window = browser_window();
        let tab = window.new_tab();
        assert!(!tab.click_icon(MouseButton::Primary));
        assert!(tab.is_selected());
    }

    #[test]
    fn test_close_tears_down_tabs() {
        let window = browser_window();
        let tab = window.new_tab();
        let doc = Document::new(window.scheduler().clone());
        tab.navigate(doc.clone());

        window.mark_closed();
        assert!(window.is_closed());
        assert!(tab.is_closed());
        assert!(doc.is_dead());
        assert!(tab.content_document().is_err());
    }
}
