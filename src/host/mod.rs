//! Host browser surface model.
//!
//! The tracker's boundary is host-callback based: it consumes a windowing
//! subsystem, documents with media elements and frames, and a tab strip
//! that accepts one icon per tab. This module makes that surface concrete
//! as an owned object tree with handle types and token-based event
//! subscription.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Host`] | Root: window registry, open/close notifications, scheduler |
//! | [`Window`] | Browser window: kind, tab list, window-level events |
//! | [`Tab`] | Tab: attributes, label anchor, icon slot, linked document |
//! | [`Document`] | Document: media elements, frames, listeners, observers |
//! | [`MediaElement`] | Media element: playback flags and transitions |
//! | [`FrameElement`] | `iframe`: same-origin or cross-origin content |
//! | [`IconNode`] | The tab-strip icon affordance |
//! | [`Scheduler`] | Virtual-clock deferred-task queue |
//!
//! Everything runs on one cooperative event loop; deferrals go through the
//! host's [`Scheduler`] and only fire when the loop is driven.

// ============================================================================
// Submodules
// ============================================================================

/// Document and frame handles.
pub mod document;

/// Event kinds and listener registries.
pub mod events;

/// Media element handles.
pub mod media;

/// Deferred-task scheduler.
pub mod scheduler;

/// Tab and icon handles.
pub mod tab;

/// Window handles.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use document::{Document, FrameElement, WeakDocument};
pub use events::{KeyInput, MediaEventKind, MouseButton, MutationRecord, NodeKind};
pub use media::{MediaElement, MediaKind, WeakMediaElement};
pub use scheduler::Scheduler;
pub use tab::{IconAsset, IconNode, Tab, WeakTab};
pub use window::{WeakWindow, Window, WindowKind};

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::identifiers::ListenerId;

use events::ListenerSet;

// ============================================================================
// Callback Alias
// ============================================================================

/// Listener for window open/close notifications.
pub type WindowCallback = dyn Fn(&Window) + Send + Sync;

// ============================================================================
// Host
// ============================================================================

/// Internal shared state for the host.
struct HostInner {
    /// Shared deferred-task scheduler.
    scheduler: Scheduler,
    /// Open windows.
    windows: Mutex<Vec<Window>>,
    /// Window-open listeners.
    window_open: ListenerSet<WindowCallback>,
    /// Window-close listeners.
    window_close: ListenerSet<WindowCallback>,
}

/// Root handle to the host browser surface.
///
/// Owns the window registry and the shared scheduler. A window-open
/// notification fires once the window's own load has completed, so
/// subscribers can bind immediately.
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("windows", &self.inner.windows.lock().len())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Host - Implementation
// ============================================================================

impl Host {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HostInner {
                scheduler: Scheduler::new(),
                windows: Mutex::new(Vec::new()),
                window_open: ListenerSet::default(),
                window_close: ListenerSet::default(),
            }),
        }
    }

    /// Returns the shared scheduler.
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Advances the shared event loop's virtual clock.
    pub fn advance(&self, delta: Duration) {
        self.inner.scheduler.advance(delta);
    }

    /// Runs every pending deferred task.
    pub fn run_until_idle(&self) {
        self.inner.scheduler.run_until_idle();
    }

    /// Returns the currently open windows.
    #[must_use]
    pub fn windows(&self) -> Vec<Window> {
        self.inner.windows.lock().clone()
    }

    /// Creates a fresh top-level document.
    #[must_use]
    pub fn new_document(&self) -> Document {
        Document::new(self.inner.scheduler.clone())
    }

    /// Opens a window and announces it once loaded.
    pub fn open_window(&self, kind: WindowKind) -> Window {
        let window = Window::new(kind, self.inner.scheduler.clone());
        self.inner.windows.lock().push(window.clone());
        info!(window_id = %window.id(), ?kind, "Window opened");
        for listener in self.inner.window_open.snapshot() {
            listener(&window);
        }
        window
    }

    /// Closes a window: close listeners run first, while the window is
    /// still usable, then the window and its tabs are torn down.
    pub fn close_window(&self, window: &Window) {
        let found = {
            let mut windows = self.inner.windows.lock();
            let before = windows.len();
            windows.retain(|open| !Arc::ptr_eq(&open.inner, &window.inner));
            windows.len() != before
        };
        if !found {
            return;
        }
        debug!(window_id = %window.id(), "Window closing");
        for listener in self.inner.window_close.snapshot() {
            listener(window);
        }
        window.mark_closed();
    }

    /// Subscribes to window-open notifications.
    pub fn on_window_open(&self, listener: Arc<WindowCallback>) -> ListenerId {
        self.inner.window_open.add(listener)
    }

    /// Removes a window-open listener by token.
    pub fn remove_window_open_listener(&self, id: ListenerId) -> bool {
        self.inner.window_open.remove(id)
    }

    /// Subscribes to window-close notifications.
    pub fn on_window_close(&self, listener: Arc<WindowCallback>) -> ListenerId {
        self.inner.window_close.add(listener)
    }

    /// Removes a window-close listener by token.
    pub fn remove_window_close_listener(&self, id: ListenerId) -> bool {
        self.inner.window_close.remove(id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_window_announces() {
        let host = Host::new();
        let opened = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&opened);
        host.on_window_open(Arc::new(move |window: &Window| {
            sink.lock().push(window.id());
        }));

        let window = host.open_window(WindowKind::Browser);
        assert_eq!(*opened.lock(), vec![window.id()]);
        assert_eq!(host.windows().len(), 1);
    }

    #[test]
    fn test_close_listeners_run_before_teardown() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();

        let usable = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&usable);
        host.on_window_close(Arc::new(move |window: &Window| {
            // Tabs are still reachable while close listeners run.
            *sink.lock() = Some(window.tabs().len());
        }));

        host.close_window(&window);
        assert_eq!(*usable.lock(), Some(1));
        assert!(window.is_closed());
        assert!(tab.is_closed());
        assert!(host.windows().is_empty());
    }

    #[test]
    fn test_close_unknown_window_is_noop() {
        let host = Host::new();
        let other = Host::new();
        let window = other.open_window(WindowKind::Popup);
        host.close_window(&window);
        assert!(!window.is_closed());
    }

    #[test]
    fn test_unsubscribed_listener_not_called() {
        let host = Host::new();
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let id = host.on_window_open(Arc::new(move |_window: &Window| {
            *sink.lock() += 1;
        }));
        assert!(host.remove_window_open_listener(id));
        host.open_window(WindowKind::Browser);
        assert_eq!(*count.lock(), 0);
    }
}
