//! The tracker itself: aggregate-state probing, icon painting, document
//! instrumentation, window binding, and the activation lifecycle.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`audio`] | The probe and the deep mute toggle |
//! | [`icon`] | Icon painting and the press-to-toggle affordance |
//! | [`instrument`] | Per-document attach/detach |
//! | [`binding`] | Per-window binding and event reactions |
//!
//! [`Extension`] ties it together: activating binds every open browser
//! window and follows window open/close from then on; deactivating unwinds
//! every listener, icon, and marker it ever placed.

// ============================================================================
// Submodules
// ============================================================================

/// Aggregate audio state.
pub mod audio;

/// Window binding.
pub mod binding;

/// Icon painting.
pub mod icon;

/// Document instrumentation.
pub mod instrument;

pub(crate) mod registry;
pub(crate) mod walk;

// ============================================================================
// Re-exports
// ============================================================================

pub use audio::{AggregateState, probe, set_muted_deep};
pub use binding::{SETTLE_DELAY, WindowBinding};
pub use instrument::{FORCE_ATTACH_DELAY, MUTE_KEY_CODE, attach, detach};

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::error::{Error, Result};
use crate::host::{Host, Window};
use crate::identifiers::ListenerId;

use registry::DocumentRegistry;

// ============================================================================
// Extension
// ============================================================================

/// State held while the extension is active.
struct ActiveState {
    /// Bindings for currently bound windows. Shared with the host
    /// listeners, which add and remove bindings as windows come and go.
    bindings: Arc<Mutex<Vec<WindowBinding>>>,
    /// Window-open subscription token.
    window_open: ListenerId,
    /// Window-close subscription token.
    window_close: ListenerId,
}

/// The noisy-tab tracker.
///
/// One instance activates against one [`Host`] at a time. Everything the
/// active extension places — listeners, icons, markers — is removed again
/// by [`Extension::deactivate`], restoring the host to its prior state.
#[derive(Default)]
pub struct Extension {
    state: Mutex<Option<ActiveState>>,
}

impl Extension {
    /// Creates an inactive extension.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while activated.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Activates against a host: binds every open browser window and
    /// subscribes to window open/close.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyActive`] if already activated.
    pub fn activate(&self, host: &Host) -> Result<()> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(Error::AlreadyActive);
        }

        let registry = DocumentRegistry::new();
        let bindings = Arc::new(Mutex::new(Vec::new()));

        for window in host.windows() {
            if window.kind().is_browser() && !window.is_closed() {
                bindings.lock().push(WindowBinding::bind(&window, &registry));
            }
        }

        let window_open = {
            let registry = registry.clone();
            let bindings = Arc::clone(&bindings);
            host.on_window_open(Arc::new(move |window: &Window| {
                // Only main browsing windows carry a tab strip worth binding.
                if window.kind().is_browser() {
                    bindings.lock().push(WindowBinding::bind(window, &registry));
                }
            }))
        };

        let window_close = {
            let bindings = Arc::clone(&bindings);
            host.on_window_close(Arc::new(move |window: &Window| {
                let binding = {
                    let mut bindings = bindings.lock();
                    bindings
                        .iter()
                        .position(|binding| binding.window().id() == window.id())
                        .map(|index| bindings.remove(index))
                };
                if let Some(binding) = binding {
                    binding.unbind();
                }
            }))
        };

        info!(windows = bindings.lock().len(), "Extension activated");
        *state = Some(ActiveState {
            bindings,
            window_open,
            window_close,
        });
        Ok(())
    }

    /// Deactivates: unsubscribes from the host, then unbinds every window.
    ///
    /// No-op when inactive.
    pub fn deactivate(&self, host: &Host) {
        let Some(state) = self.state.lock().take() else {
            return;
        };
        host.remove_window_open_listener(state.window_open);
        host.remove_window_close_listener(state.window_close);

        let bindings: Vec<WindowBinding> = state.bindings.lock().drain(..).collect();
        for binding in bindings {
            binding.unbind();
        }
        info!("Extension deactivated");
    }
}

// ============================================================================
// Tests
// ============================================================================
