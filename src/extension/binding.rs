//! Per-window binding: plugging tabs and reacting to window-level events.
//!
//! A [`WindowBinding`] wires one browser window into the tracker. Binding
//! plugs every existing tab (instrumenting its document tree and painting
//! its icon) and subscribes to the four window-level events:
//!
//! * document-load — instrument the new document, after a settle delay
//! * page-hide — release the old document, repaint after the delay
//! * tab-move — repaint immediately
//! * tab-attribute-modified — mirror selection onto the close button
//!
//! The settle delay gives a freshly loaded page a beat to finish wiring
//! itself up before listeners land. Deferred work captures weak handles
//! only, so a window or tab that disappears mid-delay degrades to a no-op.

// ============================================================================
// Imports
// ============================================================================

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::host::{Document, Tab, Window};
use crate::identifiers::ListenerId;

use super::icon;
use super::instrument::{attach, detach};
use super::registry::DocumentRegistry;
use super::walk::visit_documents;

// ============================================================================
// Constants
// ============================================================================

/// Settle delay between a page event and the deferred reaction to it.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// Tab Plugging
// ============================================================================

/// Instruments a tab's whole same-origin document tree and paints its icon.
///
/// Tabs without a usable document are skipped; the document-load event
/// plugs them once a page arrives.
pub(crate) fn plug(tab: &Tab, registry: &DocumentRegistry) {
    let Ok(document) = tab.content_document() else {
        return;
    };
    if document.is_dead() {
        return;
    }
    let _ = visit_documents(&document, &mut |doc| {
        attach(doc, tab, registry);
        ControlFlow::Continue(())
    });
    icon::update_tab(tab);
}

/// Releases a tab's document tree and removes its icon.
///
/// The icon is cleared unconditionally; teardown must not depend on the
/// document still being reachable.
pub(crate) fn unplug(tab: &Tab, registry: &DocumentRegistry) {
    if let Ok(document) = tab.content_document() {
        detach(&document, registry);
    }
    icon::clear(tab);
}

// ============================================================================
// Tab Resolution
// ============================================================================

/// Finds the tab whose content is the frame chain containing `document`.
pub(crate) fn tab_for_document(window: &Window, document: &Document) -> Option<Tab> {
    let top = document.top();
    window.tabs().into_iter().find(|tab| {
        tab.content_document()
            .map(|content| content.same(&top))
            .unwrap_or(false)
    })
}

// ============================================================================
// WindowBinding
// ============================================================================

/// An active binding to one browser window.
///
/// Created by [`WindowBinding::bind`]; [`WindowBinding::unbind`] unwinds
/// every listener and plugged tab.
pub struct WindowBinding {
    window: Window,
    registry: DocumentRegistry,
    document_load: ListenerId,
    page_hide: ListenerId,
    tab_move: ListenerId,
    tab_attr_modified: ListenerId,
}

impl WindowBinding {
    /// Binds a window: plugs every tab and subscribes to window events.
    pub fn bind(window: &Window, registry: &DocumentRegistry) -> WindowBinding {
        debug!(window_id = %window.id(), "Binding window");
        for tab in window.tabs() {
            plug(&tab, registry);
        }

        let document_load = {
            let weak_window = window.downgrade();
            let registry = registry.clone();
            let scheduler = window.scheduler().clone();
            window.on_document_load(Arc::new(move |document: &Document| {
                trace!(document_id = %document.id(), "Document loaded");
                let weak_window = weak_window.clone();
                let registry = registry.clone();
                let weak_document = document.downgrade();
                scheduler.schedule(SETTLE_DELAY, move || {
                    let Some(window) = weak_window.upgrade() else {
                        return;
                    };
                    let Some(document) = weak_document.upgrade() else {
                        return;
                    };
                    if document.is_dead() {
                        return;
                    }
                    let Some(tab) = tab_for_document(&window, &document) else {
                        return;
                    };
                    attach(&document, &tab, &registry);
                    icon::update_tab(&tab);
                });
            }))
        };

        let page_hide = {
            let registry = registry.clone();
            let scheduler = window.scheduler().clone();
            window.on_page_hide(Arc::new(move |document: &Document| {
                trace!(document_id = %document.id(), "Page hidden");
                // Resolve the tab before the registry entry goes away.
                let tab = registry.tab_for(document.id());
                detach(document, &registry);
                let Some(tab) = tab else {
                    return;
                };
                let weak_tab = tab.downgrade();
                scheduler.schedule(SETTLE_DELAY, move || {
                    if let Some(tab) = weak_tab.upgrade() {
                        icon::update_tab(&tab);
                    }
                });
            }))
        };

        let tab_move = window.on_tab_move(Arc::new(|tab: &Tab| {
            icon::update_tab(tab);
        }));

        // Keep the close button's selected styling in step with the tab.
        let tab_attr_modified = window.on_tab_attr_modified(Arc::new(|tab: &Tab| {
            tab.set_close_button_selected(tab.is_selected());
        }));

        WindowBinding {
            window: window.clone(),
            registry: registry.clone(),
            document_load,
            page_hide,
            tab_move,
            tab_attr_modified,
        }
    }

    /// Returns the bound window.
    #[inline]
    #[must_use]
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Unbinds the window: removes listeners, then unplugs every tab.
    pub fn unbind(self) {
        debug!(window_id = %self.window.id(), "Unbinding window");
        self.window
            .remove_document_load_listener(self.document_load);
        self.window.remove_page_hide_listener(self.page_hide);
        self.window.remove_tab_move_listener(self.tab_move);
        self.window
            .remove_tab_attr_modified_listener(self.tab_attr_modified);

        for tab in self.window.tabs() {
            unplug(&tab, &self.registry);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::extension::icon::NOISY_ATTRIBUTE;
    use crate::host::{FrameElement, Host, IconAsset, MediaElement, MediaKind, WindowKind};

    fn playing_media(doc: &Document) -> MediaElement {
        let media = MediaElement::new(MediaKind::Video);
        media.set_audio_track(Some(true));
        doc.append_media(&media);
        media.play();
        media
    }

    #[test]
    fn test_bind_plugs_existing_tabs() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let doc = host.new_document();
        playing_media(&doc);
        tab.navigate(doc.clone());

        let registry = DocumentRegistry::new();
        let binding = WindowBinding::bind(&window, &registry);

        assert!(doc.is_instrumented());
        assert_eq!(tab.icon().expect("icon").src(), Some(IconAsset::Noisy));

        binding.unbind();
        assert!(!doc.is_instrumented());
        assert!(tab.icon().is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_bind_plugs_nested_frames() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let doc = host.new_document();
        let frame_doc = host.new_document();
        doc.append_frame(FrameElement::same_origin(frame_doc.clone()));
        tab.navigate(doc);

        let registry = DocumentRegistry::new();
        let _binding = WindowBinding::bind(&window, &registry);
        assert!(frame_doc.is_instrumented());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_navigation_attaches_after_settle_delay() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let registry = DocumentRegistry::new();
        let _binding = WindowBinding::bind(&window, &registry);

        let doc = host.new_document();
        playing_media(&doc);
        tab.navigate(doc.clone());

        // Not yet: the settle delay has not elapsed.
        assert!(!doc.is_instrumented());
        assert!(tab.icon().is_none());

        host.advance(SETTLE_DELAY);
        assert!(doc.is_instrumented());
        assert_eq!(tab.icon().expect("icon").src(), Some(IconAsset::Noisy));
    }

    #[test]
    fn test_navigation_away_releases_old_document() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let registry = DocumentRegistry::new();
        let _binding = WindowBinding::bind(&window, &registry);

        let first = host.new_document();
        playing_media(&first);
        tab.navigate(first.clone());
        host.advance(SETTLE_DELAY);
        assert_eq!(registry.len(), 1);
        assert_eq!(tab.attribute(NOISY_ATTRIBUTE).as_deref(), Some("true"));

        let second = host.new_document();
        tab.navigate(second.clone());
        host.advance(SETTLE_DELAY);

        // Old document released, new one attached, icon reverted to empty.
        assert!(!registry.contains(first.id()));
        assert!(second.is_instrumented());
        assert_eq!(tab.icon().expect("icon").src(), None);
        assert!(tab.attribute(NOISY_ATTRIBUTE).is_none());
    }

    #[test]
    fn test_frame_added_later_gets_instrumented() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        tab.navigate(host.new_document());
        let registry = DocumentRegistry::new();
        let _binding = WindowBinding::bind(&window, &registry);

        let doc = tab.content_document().expect("doc");
        let frame_doc = host.new_document();
        playing_media(&frame_doc);
        doc.append_frame(FrameElement::same_origin(frame_doc.clone()));

        host.advance(SETTLE_DELAY);
        assert!(frame_doc.is_instrumented());
        assert_eq!(tab.icon().expect("icon").src(), Some(IconAsset::Noisy));
    }

    #[test]
    fn test_tab_move_repaints() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let a = window.new_tab();
        let b = window.new_tab();
        let doc = host.new_document();
        playing_media(&doc);
        b.navigate(doc);

        let registry = DocumentRegistry::new();
        let _binding = WindowBinding::bind(&window, &registry);
        b.remove_icon();

        assert!(window.move_tab(&b, 0));
        // The move handler re-probed and repainted immediately.
        assert_eq!(b.icon().expect("icon").src(), Some(IconAsset::Noisy));
        assert!(a.icon().is_none());
    }

    #[test]
    fn test_selection_mirrors_to_close_button() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let registry = DocumentRegistry::new();
        let _binding = WindowBinding::bind(&window, &registry);

        tab.set_selected(true);
        assert!(tab.close_button_selected());
        tab.set_selected(false);
        assert!(!tab.close_button_selected());
    }

    #[test]
    fn test_unbind_stops_event_reactions() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let registry = DocumentRegistry::new();
        let binding = WindowBinding::bind(&window, &registry);
        binding.unbind();

        let doc = host.new_document();
        playing_media(&doc);
        tab.navigate(doc.clone());
        host.advance(SETTLE_DELAY);

        assert!(!doc.is_instrumented());
        assert!(tab.icon().is_none());
    }

    #[test]
    fn test_tab_closed_during_settle_delay_is_tolerated() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let registry = DocumentRegistry::new();
        let _binding = WindowBinding::bind(&window, &registry);

        let doc = host.new_document();
        tab.navigate(doc.clone());
        tab.close();
        host.advance(SETTLE_DELAY);
        assert!(!doc.is_instrumented());
    }
}
