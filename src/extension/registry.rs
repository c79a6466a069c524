//! Reverse index from instrumented documents to their tabs and bindings.
//!
//! Instrumentation callbacks fire with only a document in hand; this index
//! answers "which tab does that document belong to" without scanning every
//! window. An entry also carries the listener tokens the attach registered,
//! so detach can remove exactly those listeners. Entries are added on
//! attach and dropped on detach; dropping an entry disarms any callback
//! still pending for that document.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::host::{Tab, WeakTab};
use crate::identifiers::{DocumentId, ListenerId};

// ============================================================================
// DocumentBinding
// ============================================================================

/// Listener tokens registered on one instrumented document.
#[derive(Debug)]
pub(crate) struct DocumentBinding {
    /// The six media-event listeners.
    pub media: Vec<ListenerId>,
    /// The subtree-removal observer.
    pub mutation: ListenerId,
    /// The hotkey listener.
    pub keyup: ListenerId,
}

/// One registry entry: the owning tab plus the registered tokens.
struct Entry {
    tab: WeakTab,
    binding: DocumentBinding,
}

// ============================================================================
// DocumentRegistry
// ============================================================================

/// Shared DocumentId → (tab, binding) index.
///
/// A document has an entry here iff its listeners are currently attached.
#[derive(Clone, Default)]
pub(crate) struct DocumentRegistry {
    entries: Arc<Mutex<FxHashMap<DocumentId, Entry>>>,
}

impl DocumentRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Indexes an instrumented document under its owning tab.
    pub(crate) fn insert(&self, document_id: DocumentId, tab: &Tab, binding: DocumentBinding) {
        self.entries.lock().insert(
            document_id,
            Entry {
                tab: tab.downgrade(),
                binding,
            },
        );
    }

    /// Removes a document's entry, returning its binding for unwinding.
    pub(crate) fn remove(&self, document_id: DocumentId) -> Option<DocumentBinding> {
        self.entries
            .lock()
            .remove(&document_id)
            .map(|entry| entry.binding)
    }

    /// Returns `true` while the document is indexed.
    pub(crate) fn contains(&self, document_id: DocumentId) -> bool {
        self.entries.lock().contains_key(&document_id)
    }

    /// Resolves the tab owning a document.
    ///
    /// Returns `None` for unindexed documents and for tabs that have since
    /// closed or been dropped.
    pub(crate) fn tab_for(&self, document_id: DocumentId) -> Option<Tab> {
        self.entries
            .lock()
            .get(&document_id)
            .and_then(|entry| entry.tab.upgrade())
            .filter(|tab| !tab.is_closed())
    }

    /// Number of indexed documents.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::host::{Host, WindowKind};

    fn binding() -> DocumentBinding {
        DocumentBinding {
            media: Vec::new(),
            mutation: ListenerId::next(),
            keyup: ListenerId::next(),
        }
    }

    #[test]
    fn test_insert_and_resolve() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let doc = host.new_document();

        let registry = DocumentRegistry::new();
        registry.insert(doc.id(), &tab, binding());
        assert!(registry.contains(doc.id()));
        assert!(registry.tab_for(doc.id()).expect("tab").same(&tab));

        assert!(registry.remove(doc.id()).is_some());
        assert!(!registry.contains(doc.id()));
        assert!(registry.tab_for(doc.id()).is_none());
        assert!(registry.remove(doc.id()).is_none());
    }

    #[test]
    fn test_closed_tab_resolves_to_none() {
        let host = Host::new();
        let window = host.open_window(WindowKind::Browser);
        let tab = window.new_tab();
        let doc = host.new_document();

        let registry = DocumentRegistry::new();
        registry.insert(doc.id(), &tab, binding());
        tab.close();
        assert!(registry.tab_for(doc.id()).is_none());
        // The entry itself stays until detach unwinds it.
        assert!(registry.contains(doc.id()));
    }
}
