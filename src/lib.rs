//! Noisy Tabs - Per-tab audible-media tracking with a mute toggle.
//!
//! This library flags browser tabs that are producing sound and gives the
//! user a one-press way to silence them. Each tab with audible media gets
//! a small icon in the tab strip; pressing it mutes every media element in
//! the tab, across nested same-origin frames, and pressing again unmutes.
//!
//! # Architecture
//!
//! The crate splits into two halves:
//!
//! - **Host** ([`host`]): an owned in-memory model of the browser surface
//!   the tracker consumes — windows, tabs, documents, media elements,
//!   frames, a tab-strip icon slot, and a virtual-clock scheduler.
//! - **Extension** ([`extension`]): the tracker proper — the probe that
//!   folds a frame tree into one aggregate audio state, the icon
//!   controller, per-document instrumentation, and per-window binding.
//!
//! Key design principles:
//!
//! - State is re-derived, never tracked: every repaint re-probes the live
//!   tree, so missed or duplicated events self-correct
//! - Stale handles degrade to no-ops: late callbacks on closed tabs or
//!   torn-down documents do nothing
//! - Everything the active extension places is removed on deactivation
//!
//! # Quick Start
//!
//! ```
//! use noisy_tabs::{Extension, Host, MediaKind, WindowKind};
//!
//! let host = Host::new();
//! let window = host.open_window(WindowKind::Browser);
//! let tab = window.new_tab();
//! tab.navigate(host.new_document());
//!
//! let extension = Extension::new();
//! extension.activate(&host)?;
//!
//! // A page starts playing audible video...
//! let doc = tab.content_document()?;
//! let media = doc.create_element(MediaKind::Video);
//! media.set_audio_track(Some(true));
//! doc.append_media(&media);
//! media.play();
//!
//! // ...and the tab now carries a clickable noisy icon.
//! assert!(tab.icon().is_some());
//! # Ok::<(), noisy_tabs::Error>(())
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`extension`] | The tracker: probe, icon, instrumentation, binding |
//! | [`host`] | Host browser surface: [`Window`], [`Tab`], [`Document`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Error types and Result alias.
pub mod error;

/// The tracker: aggregate probe, icon controller, instrumentation,
/// window binding, and the [`Extension`] lifecycle.
pub mod extension;

/// Host browser surface model.
///
/// This module contains the concrete surface the tracker runs against:
///
/// - [`Host`] - Root window registry and scheduler
/// - [`Window`] / [`Tab`] - Windowing subsystem and tab strip
/// - [`Document`] / [`MediaElement`] / [`FrameElement`] - Content tree
pub mod host;

/// Type-safe ID wrappers.
pub mod identifiers;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use extension::{AggregateState, Extension, probe, set_muted_deep};
pub use host::{
    Document, FrameElement, Host, IconAsset, IconNode, MediaElement, MediaKind, Tab, Window,
    WindowKind,
};
