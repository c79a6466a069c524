//! Icon controller: the per-tab visual affordance.
//!
//! Maps aggregate state onto the icon node and the tab's noisy attribute:
//!
//! | State | Icon | Tooltip | Attribute |
//! |-------|------|---------|-----------|
//! | Playing | noisy asset | "Mute this tab" | `"true"` |
//! | PlayingMuted | muted asset | "Unmute this tab" | `"false"` |
//! | NotPlaying | cleared | unchanged | removed |
//!
//! A silent tab never gets an icon created just to show silence: the
//! not-playing presentation only applies to an icon that already exists.
//! The icon node itself stays attached and merely goes visually empty.
//!
//! A primary-button press toggles mute using the displayed attribute as the
//! pre-toggle state. That value can drift from the real muted flags if the
//! page changes them between probe and click; the drift is accepted rather
//! than re-probing on click.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::host::{IconAsset, IconNode, MouseButton, Tab};

use super::audio::{AggregateState, probe, set_muted_deep};

// ============================================================================
// Constants
// ============================================================================

/// Tab attribute tracking displayed noisy state.
pub const NOISY_ATTRIBUTE: &str = "noisy";

/// Tooltip while the tab is audible.
pub const NOISY_TOOLTIP: &str = "Mute this tab";

/// Tooltip while the tab is muted.
pub const MUTED_TOOLTIP: &str = "Unmute this tab";

/// Icon opacity at rest.
const NORMAL_OPACITY: f32 = 0.75;

/// Icon opacity under the pointer.
const HOVER_OPACITY: f32 = 1.0;

// ============================================================================
// Icon Lifecycle
// ============================================================================

/// Ensures the tab has an icon, creating one next to the label if needed.
///
/// Returns `false` when creation fails because the label anchor has not
/// rendered yet; the caller retries on the next triggering event.
pub fn ensure_icon(tab: &Tab) -> bool {
    if tab.icon().is_some() {
        return true;
    }

    let icon = IconNode::new();
    icon.set_opacity(NORMAL_OPACITY);

    let weak = tab.downgrade();
    icon.set_press_handler(Arc::new(move |button: MouseButton| {
        if button != MouseButton::Primary {
            return false;
        }
        if let Some(tab) = weak.upgrade() {
            toggle_from_attribute(&tab);
        }
        // Consumed either way; the press must not select the tab.
        true
    }));

    icon.set_hover_handlers(
        Arc::new(|icon: &IconNode| icon.set_opacity(HOVER_OPACITY)),
        Arc::new(|icon: &IconNode| icon.set_opacity(NORMAL_OPACITY)),
    );

    tab.insert_icon(icon)
}

/// Removes the icon node and the noisy attribute. Called on tab teardown.
pub fn clear(tab: &Tab) {
    if tab.remove_icon() {
        tab.remove_attribute(NOISY_ATTRIBUTE);
    }
}

// ============================================================================
// Painting
// ============================================================================

/// Paints the aggregate state onto the tab's icon and attribute.
pub fn paint(tab: &Tab, state: AggregateState) {
    match state {
        AggregateState::Playing => {
            if ensure_icon(tab)
                && let Some(icon) = tab.icon()
            {
                icon.set_src(Some(IconAsset::Noisy));
                icon.set_tooltip(NOISY_TOOLTIP);
                tab.set_attribute(NOISY_ATTRIBUTE, "true");
            }
        }
        AggregateState::PlayingMuted => {
            if ensure_icon(tab)
                && let Some(icon) = tab.icon()
            {
                icon.set_src(Some(IconAsset::Muted));
                icon.set_tooltip(MUTED_TOOLTIP);
                tab.set_attribute(NOISY_ATTRIBUTE, "false");
            }
        }
        AggregateState::NotPlaying => {
            // Only an existing icon reverts to the empty presentation.
            if let Some(icon) = tab.icon() {
                tab.remove_attribute(NOISY_ATTRIBUTE);
                icon.set_src(None);
            }
        }
    }
}

/// Recomputes the tab's aggregate state and repaints.
///
/// Tolerates closed tabs and torn-down documents; both degrade to no-ops.
pub fn update_tab(tab: &Tab) {
    if tab.is_closed() {
        return;
    }
    let Ok(document) = tab.content_document() else {
        return;
    };
    if document.is_dead() {
        return;
    }
    paint(tab, probe(&document));
}

// ============================================================================
// Mute Toggle
// ============================================================================

/// Toggles mute for the tab, using the displayed attribute as the
/// pre-toggle state. No attribute means no icon and nothing to toggle.
pub(crate) fn toggle_from_attribute(tab: &Tab) {
    let Some(value) = tab.attribute(NOISY_ATTRIBUTE) else {
        return;
    };
    let mute = value == "true";
    let Ok(document) = tab.content_document() else {
        return;
    };
    if document.is_dead() {
        return;
    }
    debug!(tab_id = %tab.id(), mute, "Toggling tab mute");
    set_muted_deep(&document, mute);
}

// ============================================================================
// Tests
// ============================================================================
