//! Per-document instrumentation: attach and detach.
//!
//! Attaching wires one document into the tracker: six media-event
//! listeners, a subtree-removal observer, the mute hotkey, and the
//! element-creation hook that catches media a page creates but never
//! inserts. Every listener funnels into the same refresh path — resolve
//! the owning tab through the registry, re-probe, repaint — so the exact
//! event that fired never matters.
//!
//! Detaching unwinds exactly what attach registered, recursing through
//! same-origin frames, and tolerates documents that were never attached.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::host::{Document, KeyInput, MediaElement, MediaEventKind, Tab};

use super::icon;
use super::registry::{DocumentBinding, DocumentRegistry};

// ============================================================================
// Constants
// ============================================================================

/// Key code for the mute hotkey (Ctrl+M).
pub const MUTE_KEY_CODE: u32 = 77;

/// Grace period before force-inserting a created-but-detached element.
pub const FORCE_ATTACH_DELAY: Duration = Duration::from_millis(500);

// ============================================================================
// Attach
// ============================================================================

/// Instruments a document for the given tab.
///
/// Returns `false` without side effects when the document is dead, still
/// lacks a body, is already instrumented, or the tab has closed. Callers
/// retry on the next triggering event.
pub fn attach(document: &Document, tab: &Tab, registry: &DocumentRegistry) -> bool {
    if document.is_dead() || tab.is_closed() {
        return false;
    }
    if !document.has_body() || document.is_instrumented() {
        return false;
    }

    // One refresh closure serves all six event kinds. The registry lookup
    // disarms it once the document detaches or the tab closes.
    let refresh: Arc<crate::host::document::MediaCallback> = {
        let registry = registry.clone();
        let document_id = document.id();
        Arc::new(move |kind: MediaEventKind| {
            trace!(document_id = %document_id, event = kind.name(), "Media event");
            if let Some(tab) = registry.tab_for(document_id) {
                icon::update_tab(&tab);
            }
        })
    };
    let media = MediaEventKind::ALL
        .iter()
        .map(|&kind| document.add_media_listener(kind, Arc::clone(&refresh)))
        .collect();

    // The host only reports media and frame removals, each of which can
    // silence the tab, so any removal record triggers a refresh.
    let mutation = {
        let registry = registry.clone();
        let document_id = document.id();
        document.add_mutation_observer(Arc::new(move |record| {
            if record.removed.is_empty() {
                return;
            }
            if let Some(tab) = registry.tab_for(document_id) {
                icon::update_tab(&tab);
            }
        }))
    };

    let keyup = {
        let registry = registry.clone();
        document.add_keyup_listener(Arc::new(move |target: &Document, input: KeyInput| {
            if !input.ctrl || input.key_code != MUTE_KEY_CODE {
                return;
            }
            if let Some(tab) = registry.tab_for(target.id()) {
                icon::toggle_from_attribute(&tab);
            }
        }))
    };

    // A page can create a media element, start it, and never insert it.
    // After the grace period, adopt any still-detached element into the
    // document so the probe can see it.
    {
        let scheduler = document.scheduler().clone();
        let weak_document = document.downgrade();
        document.set_creation_hook(Arc::new(move |element: &MediaElement| {
            let weak_document = weak_document.clone();
            let weak_element = element.downgrade();
            scheduler.schedule(FORCE_ATTACH_DELAY, move || {
                let Some(document) = weak_document.upgrade() else {
                    return;
                };
                let Some(element) = weak_element.upgrade() else {
                    return;
                };
                if document.is_dead() || !document.has_body() || element.is_attached() {
                    return;
                }
                debug!(document_id = %document.id(), "Force-attaching detached media element");
                document.append_media(&element);
            });
        }));
    }

    registry.insert(
        document.id(),
        tab,
        DocumentBinding {
            media,
            mutation,
            keyup,
        },
    );
    document.set_instrumented(true);
    debug!(document_id = %document.id(), tab_id = %tab.id(), "Document instrumented");
    true
}

// ============================================================================
// Detach
// ============================================================================

/// Unwinds instrumentation from a document and its same-origin frames.
///
/// Removes exactly the listeners attach registered and clears the marker
/// and creation hook. Safe to call on documents that were never attached.
pub fn detach(document: &Document, registry: &DocumentRegistry) {
    if let Some(binding) = registry.remove(document.id()) {
        for id in binding.media {
            document.remove_media_listener(id);
        }
        document.remove_mutation_observer(binding.mutation);
        document.remove_keyup_listener(binding.keyup);
        debug!(document_id = %document.id(), "Document released");
    }
    document.clear_creation_hook();
    document.set_instrumented(false);

    for frame in document.frames() {
        let Ok(child) = frame.content_document() else {
            continue;
        };
        if !child.is_top() {
            detach(&child, registry);
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
    use crate::host::{FrameElement, Host, IconAsset, MediaKind, Window, WindowKind};

    fn attached_tab(host: &Host) -> (Window, Tab, Document, DocumentRegistry) {
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        tab.navigate(host.new_document());
        let doc = tab.content_document().expect("doc");
        let registry = DocumentRegistry::new();
        assert!(attach(&doc, &tab, &registry));
        (window, tab, doc, registry)
    }

    #[test]
    fn test_attach_registers_full_listener_set() {
        let host = Host::new();
        let (_window, _tab, doc, registry) = attached_tab(&host);

        assert_eq!(doc.media_listener_count(), MediaEventKind::ALL.len());
        assert_eq!(doc.mutation_observer_count(), 1);
        assert_eq!(doc.keyup_listener_count(), 1);
        assert!(doc.is_instrumented());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let host = Host::new();
        let (_window, tab, doc, registry) = attached_tab(&host);

        assert!(!attach(&doc, &tab, &registry));
        assert_eq!(doc.media_listener_count(), MediaEventKind::ALL.len());
        assert_eq!(doc.keyup_listener_count(), 1);
    }

    #[test]
    fn test_attach_waits_for_body() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let doc = host.new_document();
        doc.set_has_body(false);
        tab.navigate(doc.clone());

        let registry = DocumentRegistry::new();
        assert!(!attach(&doc, &tab, &registry));
        assert!(!doc.is_instrumented());

        doc.set_has_body(true);
        assert!(attach(&doc, &tab, &registry));
    }

    #[test]
    fn test_attach_rejects_dead_doc_and_closed_tab() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        tab.navigate(host.new_document());
        let doc = tab.content_document().expect("doc");
        let registry = DocumentRegistry::new();

        let dead = host.new_document();
        dead.mark_dead();
        assert!(!attach(&dead, &tab, &registry));

        tab.close();
        assert!(!attach(&doc, &tab, &registry));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_media_event_repaints_tab() {
        let host = Host::new();
        let (_window, tab, doc, _registry) = attached_tab(&host);

        let media = MediaElement::new(MediaKind::Video);
        media.set_audio_track(Some(true));
        doc.append_media(&media);
        media.play();

        let icon = tab.icon().expect("icon");
        assert_eq!(icon.src(), Some(IconAsset::Noisy));
        assert_eq!(tab.attribute(NOISY_ATTRIBUTE).as_deref(), Some("true"));

        media.pause();
        assert_eq!(tab.icon().expect("icon").src(), None);
        assert!(tab.attribute(NOISY_ATTRIBUTE).is_none());
    }

    #[test]
    fn test_removal_mutation_repaints_tab() {
        let host = Host::new();
        let (_window, tab, doc, _registry) = attached_tab(&host);

        let media = MediaElement::new(MediaKind::Audio);
        media.set_audio_track(Some(true));
        doc.append_media(&media);
        media.play();
        assert_eq!(tab.attribute(NOISY_ATTRIBUTE).as_deref(), Some("true"));

        doc.remove_media(&media);
        assert_eq!(tab.icon().expect("icon").src(), None);
        assert!(tab.attribute(NOISY_ATTRIBUTE).is_none());
    }

    #[test]
    fn test_hotkey_mutes_the_tab() {
        let host = Host::new();
        let (_window, tab, doc, _registry) = attached_tab(&host);

        let media = MediaElement::new(MediaKind::Video);
        media.set_audio_track(Some(true));
        doc.append_media(&media);
        media.play();
        assert_eq!(tab.attribute(NOISY_ATTRIBUTE).as_deref(), Some("true"));

        doc.dispatch_keyup(KeyInput::with_ctrl(MUTE_KEY_CODE));
        assert!(media.is_muted());
        // The volumechange listener repaints to the muted presentation.
        assert_eq!(tab.icon().expect("icon").src(), Some(IconAsset::Muted));
        assert_eq!(tab.attribute(NOISY_ATTRIBUTE).as_deref(), Some("false"));

        // Toggling again restores audio.
        doc.dispatch_keyup(KeyInput::with_ctrl(MUTE_KEY_CODE));
        assert!(!media.is_muted());
        assert_eq!(tab.icon().expect("icon").src(), Some(IconAsset::Noisy));
    }

    #[test]
    fn test_hotkey_ignores_other_keys() {
        let host = Host::new();
        let (_window, _tab, doc, _registry) = attached_tab(&host);

        let media = MediaElement::new(MediaKind::Video);
        media.set_audio_track(Some(true));
        doc.append_media(&media);
        media.play();

        doc.dispatch_keyup(KeyInput::plain(MUTE_KEY_CODE));
        doc.dispatch_keyup(KeyInput::with_ctrl(78));
        assert!(!media.is_muted());
    }

    #[test]
    fn test_detached_element_is_force_attached() {
        let host = Host::new();
        let (_window, tab, doc, _registry) = attached_tab(&host);

        let element = doc.create_element(MediaKind::Audio);
        element.set_audio_track(Some(true));
        element.play();
        assert!(!element.is_attached());
        assert!(tab.icon().is_none());

        host.advance(FORCE_ATTACH_DELAY);
        assert!(element.is_attached());
        // Its next event now reaches the document's listeners.
        element.pause();
        element.play();
        assert_eq!(tab.icon().expect("icon").src(), Some(IconAsset::Noisy));
    }

    #[test]
    fn test_force_attach_skips_inserted_and_dead() {
        let host = Host::new();
        let (_window, _tab, doc, _registry) = attached_tab(&host);

        let inserted = doc.create_element(MediaKind::Video);
        doc.append_media(&inserted);
        let orphan = doc.create_element(MediaKind::Video);

        doc.mark_dead();
        host.advance(FORCE_ATTACH_DELAY);
        assert!(!orphan.is_attached());
        assert_eq!(doc.media_elements().len(), 1);
    }

    #[test]
    fn test_detach_unwinds_everything() {
        let host = Host::new();
        let (_window, _tab, doc, registry) = attached_tab(&host);

        detach(&doc, &registry);
        assert_eq!(doc.media_listener_count(), 0);
        assert_eq!(doc.mutation_observer_count(), 0);
        assert_eq!(doc.keyup_listener_count(), 0);
        assert!(!doc.is_instrumented());
        assert_eq!(registry.len(), 0);

        // Idempotent.
        detach(&doc, &registry);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_detach_recurses_into_frames() {
        let host = Host::new();
        let (_window, tab, doc, registry) = attached_tab(&host);

        let frame_doc = host.new_document();
        doc.append_frame(FrameElement::same_origin(frame_doc.clone()));
        assert!(attach(&frame_doc, &tab, &registry));
        assert_eq!(registry.len(), 2);

        detach(&doc, &registry);
        assert_eq!(frame_doc.media_listener_count(), 0);
        assert!(!frame_doc.is_instrumented());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_detach_preserves_foreign_listeners() {
        let host = Host::new();
        let (_window, _tab, doc, registry) = attached_tab(&host);

        // A listener the tracker did not register must survive detach.
        let foreign = doc.add_media_listener(MediaEventKind::Playing, Arc::new(|_| {}));

        detach(&doc, &registry);
        assert_eq!(doc.media_listener_count(), 1);
        assert!(doc.remove_media_listener(foreign));
    }
}
