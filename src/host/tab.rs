//! Tab handles and the tab-strip icon node.
//!
//! A [`Tab`] models the tab-strip surface the tracker consumes: an
//! attribute map, the label anchor an icon attaches next to, the linked
//! content document (replaced on navigation), and selection state. The
//! [`IconNode`] is the one visual affordance this crate owns: an image
//! source, a tooltip, an opacity, and press/hover handlers.
//!
//! Navigation dispatches through the owning window: the old document is
//! torn down and announced via page-hide, then the new document is
//! announced via document-load.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::TabId;

use super::document::Document;
use super::events::MouseButton;
use super::window::{Window, WindowInner};

// ============================================================================
// IconAsset
// ============================================================================

/// Image source of the tab-strip icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconAsset {
    /// The "tab is audible" icon.
    Noisy,
    /// The "tab is muted" icon.
    Muted,
}

impl IconAsset {
    /// Returns the asset path.
    #[inline]
    #[must_use]
    pub fn src(self) -> &'static str {
        match self {
            IconAsset::Noisy => "content/tab_icon.png",
            IconAsset::Muted => "content/tab_icon_muted.png",
        }
    }
}

// ============================================================================
// IconNode
// ============================================================================

/// Press handler: returns `true` when the press was consumed.
pub type IconPressCallback = dyn Fn(MouseButton) -> bool + Send + Sync;

/// Hover handler; receives the icon so it can adjust presentation.
pub type IconHoverCallback = dyn Fn(&IconNode) + Send + Sync;

/// Internal shared state for an icon node.
struct IconInner {
    src: Mutex<Option<IconAsset>>,
    tooltip: Mutex<Option<String>>,
    opacity: Mutex<f32>,
    on_press: Mutex<Option<Arc<IconPressCallback>>>,
    on_pointer_over: Mutex<Option<Arc<IconHoverCallback>>>,
    on_pointer_out: Mutex<Option<Arc<IconHoverCallback>>>,
}

/// Handle to the icon node attached next to a tab's label.
#[derive(Clone)]
pub struct IconNode {
    inner: Arc<IconInner>,
}

impl fmt::Debug for IconNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconNode")
            .field("src", &*self.inner.src.lock())
            .field("tooltip", &*self.inner.tooltip.lock())
            .field("opacity", &*self.inner.opacity.lock())
            .finish_non_exhaustive()
    }
}

impl Default for IconNode {
    fn default() -> Self {
        Self::new()
    }
}

impl IconNode {
    /// Creates an empty icon node at full opacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(IconInner {
                src: Mutex::new(None),
                tooltip: Mutex::new(None),
                opacity: Mutex::new(1.0),
                on_press: Mutex::new(None),
                on_pointer_over: Mutex::new(None),
                on_pointer_out: Mutex::new(None),
            }),
        }
    }

    /// Returns the current image source.
    #[inline]
    #[must_use]
    pub fn src(&self) -> Option<IconAsset> {
        *self.inner.src.lock()
    }

    /// Sets or clears the image source.
    pub fn set_src(&self, src: Option<IconAsset>) {
        *self.inner.src.lock() = src;
    }

    /// Returns the current tooltip text.
    #[must_use]
    pub fn tooltip(&self) -> Option<String> {
        self.inner.tooltip.lock().clone()
    }

    /// Sets the tooltip text.
    pub fn set_tooltip(&self, tooltip: impl Into<String>) {
        *self.inner.tooltip.lock() = Some(tooltip.into());
    }

    /// Returns the current opacity.
    #[inline]
    #[must_use]
    pub fn opacity(&self) -> f32 {
        *self.inner.opacity.lock()
    }

    /// Sets the opacity.
    pub fn set_opacity(&self, opacity: f32) {
        *self.inner.opacity.lock() = opacity;
    }

    /// Installs the press handler.
    pub fn set_press_handler(&self, handler: Arc<IconPressCallback>) {
        *self.inner.on_press.lock() = Some(handler);
    }

    /// Installs the hover handlers.
    pub fn set_hover_handlers(
        &self,
        over: Arc<IconHoverCallback>,
        out: Arc<IconHoverCallback>,
    ) {
        *self.inner.on_pointer_over.lock() = Some(over);
        *self.inner.on_pointer_out.lock() = Some(out);
    }

    /// Delivers a press. Returns `true` when the handler consumed it.
    #[must_use]
    pub fn press(&self, button: MouseButton) -> bool {
        let handler = self.inner.on_press.lock().clone();
        match handler {
            Some(handler) => handler(button),
            None => false,
        }
    }

    /// Delivers pointer-over.
    pub fn pointer_over(&self) {
        let handler = self.inner.on_pointer_over.lock().clone();
        if let Some(handler) = handler {
            handler(self);
        }
    }

    /// Delivers pointer-out.
    pub fn pointer_out(&self) {
        let handler = self.inner.on_pointer_out.lock().clone();
        if let Some(handler) = handler {
            handler(self);
        }
    }
}

// ============================================================================
// Tab
// ============================================================================

/// Internal shared state for a tab.
pub(crate) struct TabInner {
    /// Unique identifier.
    id: TabId,
    /// Owning window.
    window: Mutex<Weak<WindowInner>>,
    /// Linked content document.
    document: Mutex<Option<Document>>,
    /// Extension-visible attributes.
    attributes: Mutex<FxHashMap<String, String>>,
    /// Whether the label anchor has rendered yet.
    label_rendered: Mutex<bool>,
    /// Attached icon node, at most one.
    icon: Mutex<Option<IconNode>>,
    /// Whether the tab is selected.
    selected: Mutex<bool>,
    /// Close-button selected attribute (cosmetic mirror of `selected`).
    close_button_selected: Mutex<bool>,
    /// Set once the tab closes.
    closed: AtomicBool,
}

/// Handle to a tab.
///
/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Tab {
    pub(crate) inner: Arc<TabInner>,
}

/// Weak handle to a tab.
#[derive(Clone)]
pub struct WeakTab(Weak<TabInner>);

impl WeakTab {
    /// Upgrades to a strong handle if the tab is still referenced.
    #[must_use]
    pub fn upgrade(&self) -> Option<Tab> {
        self.0.upgrade().map(|inner| Tab { inner })
    }
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("id", &self.inner.id)
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .field("selected", &*self.inner.selected.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tab - Constructor
// ============================================================================

impl Tab {
    /// Creates a tab owned by `window`, with a rendered label and no document.
    pub(crate) fn new(id: TabId, window: Weak<WindowInner>) -> Self {
        Self {
            inner: Arc::new(TabInner {
                id,
                window: Mutex::new(window),
                document: Mutex::new(None),
                attributes: Mutex::new(FxHashMap::default()),
                label_rendered: Mutex::new(true),
                icon: Mutex::new(None),
                selected: Mutex::new(false),
                close_button_selected: Mutex::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Downgrades to a weak handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakTab {
        WeakTab(Arc::downgrade(&self.inner))
    }

    /// Returns `true` if both handles refer to the same tab.
    #[inline]
    #[must_use]
    pub fn same(&self, other: &Tab) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// Tab - Accessors
// ============================================================================

impl Tab {
    /// Returns the tab ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TabId {
        self.inner.id
    }

    /// Returns the owning window, if it still exists.
    #[must_use]
    pub fn window(&self) -> Option<Window> {
        self.inner.window.lock().upgrade().map(Window::from_inner)
    }

    /// Returns `true` once the tab has closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns the linked content document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleTab`] when the tab is closed or has no document.
    pub fn content_document(&self) -> Result<Document> {
        if self.is_closed() {
            return Err(Error::stale_tab(self.inner.id));
        }
        self.inner
            .document
            .lock()
            .clone()
            .ok_or(Error::stale_tab(self.inner.id))
    }

    /// Returns `true` while the tab is selected.
    #[inline]
    #[must_use]
    pub fn is_selected(&self) -> bool {
        *self.inner.selected.lock()
    }

    /// Returns the close-button selected attribute.
    #[inline]
    #[must_use]
    pub fn close_button_selected(&self) -> bool {
        *self.inner.close_button_selected.lock()
    }

    /// Sets the close-button selected attribute. Dispatches nothing.
    pub fn set_close_button_selected(&self, selected: bool) {
        *self.inner.close_button_selected.lock() = selected;
    }
}

// ============================================================================
// Tab - Attributes
// ============================================================================

impl Tab {
    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.lock().get(name).cloned()
    }

    /// Sets an attribute, announcing the modification to the window.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        self.inner
            .attributes
            .lock()
            .insert(name.to_string(), value.into());
        self.notify_attr_modified();
    }

    /// Removes an attribute. Announces only if it was present.
    pub fn remove_attribute(&self, name: &str) -> bool {
        let removed = self.inner.attributes.lock().remove(name).is_some();
        if removed {
            self.notify_attr_modified();
        }
        removed
    }
}

// ============================================================================
// Tab - Label & Icon
// ============================================================================

impl Tab {
    /// Returns `true` once the label anchor has rendered.
    #[inline]
    #[must_use]
    pub fn has_label(&self) -> bool {
        *self.inner.label_rendered.lock()
    }

    /// Sets label render state. Icons cannot attach before the label exists.
    pub fn set_label_rendered(&self, rendered: bool) {
        *self.inner.label_rendered.lock() = rendered;
    }

    /// Returns the attached icon node.
    #[must_use]
    pub fn icon(&self) -> Option<IconNode> {
        self.inner.icon.lock().clone()
    }

    /// Attaches an icon node next to the label.
    ///
    /// Fails (returns `false`) when the label has not rendered, the tab is
    /// closed, or an icon is already attached.
    pub fn insert_icon(&self, icon: IconNode) -> bool {
        if self.is_closed() || !self.has_label() {
            return false;
        }
        let mut slot = self.inner.icon.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(icon);
        true
    }

    /// Removes the icon node. Returns `false` if none was attached.
    pub fn remove_icon(&self) -> bool {
        self.inner.icon.lock().take().is_some()
    }

    /// Delivers a press on the icon region. An unconsumed press falls
    /// through to tab selection, as a press on the tab itself would.
    ///
    /// Returns `true` when the icon consumed the press.
    pub fn click_icon(&self, button: MouseButton) -> bool {
        let consumed = match self.icon() {
            Some(icon) => icon.press(button),
            None => false,
        };
        if !consumed {
            self.set_selected(true);
        }
        consumed
    }

    /// Sets selection, announcing the modification to the window.
    pub fn set_selected(&self, selected: bool) {
        *self.inner.selected.lock() = selected;
        self.notify_attr_modified();
    }
}

// ============================================================================
// Tab - Lifecycle
// ============================================================================

impl Tab {
    /// Replaces the linked document.
    ///
    /// The old document is torn down and announced via page-hide; the new
    /// document is adopted and announced via document-load. No-op on a
    /// closed tab.
    pub fn navigate(&self, document: Document) {
        if self.is_closed() {
            return;
        }
        debug!(tab_id = %self.inner.id, document_id = %document.id(), "Tab navigating");

        let window_weak = self.inner.window.lock().clone();
        document.adopt_window(window_weak);
        let old = self.inner.document.lock().replace(document.clone());

        let window = self.window();
        if let Some(old) = old {
            old.mark_dead();
            if let Some(window) = &window {
                window.notify_page_hide(&old);
            }
        }
        if let Some(window) = &window {
            window.notify_document_load(&document);
        }
    }

    /// Closes the tab, tearing down its document.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(tab_id = %self.inner.id, "Tab closed");
        if let Some(document) = self.inner.document.lock().clone() {
            document.mark_dead();
        }
    }

    fn notify_attr_modified(&self) {
        if let Some(window) = self.window() {
            window.notify_tab_attr_modified(self);
        }
    }
}
