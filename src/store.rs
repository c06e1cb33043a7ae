//! Session-owned holder of the current notebook
//!
//! The store is the only shared mutable state of a session. It is a cheap,
//! cloneable handle: every clone sees the same value. Writes are
//! last-writer-wins with no merging; a fetched notebook replaces whatever was
//! there, unsaved local edits included.

use crate::Notebook;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Snapshot of the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub notebook: Option<Notebook>,

    /// Set while a whole-notebook protocol is in flight
    pub is_loading: bool,

    /// Cells/columns with an execute protocol in flight, counted per target
    /// so overlapping executes of the same target stay busy until the last ends
    pub busy: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    inner: Arc<RwLock<StoreState>>,
}

impl DocumentStore {
    /// Create an empty store (no notebook, not loading)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a notebook
    pub fn with_notebook(notebook: Notebook) -> Self {
        let store = Self::new();
        store.set(Some(notebook));
        store
    }

    /// Snapshot of the whole state
    pub fn get(&self) -> StoreState {
        self.inner.read().clone()
    }

    /// Copy of the current notebook
    pub fn notebook(&self) -> Option<Notebook> {
        self.inner.read().notebook.clone()
    }

    /// ID of the current notebook without cloning the document
    pub fn notebook_id(&self) -> Option<String> {
        self.inner.read().notebook.as_ref().map(|nb| nb.id.clone())
    }

    /// Replace the notebook wholesale
    pub fn set(&self, notebook: Option<Notebook>) {
        self.inner.write().notebook = notebook;
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.inner.write().is_loading = is_loading;
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().is_loading
    }

    pub fn is_busy(&self, target_id: &str) -> bool {
        self.inner.read().busy.contains_key(target_id)
    }

    /// Apply a local transform to the current notebook.
    ///
    /// Read and write happen under one lock, so a concurrent fetch either
    /// lands before (and is transformed) or after (and wins). Returns `false`
    /// when there is no notebook.
    pub fn update(&self, transform: impl FnOnce(&Notebook) -> Notebook) -> bool {
        let mut state = self.inner.write();
        match state.notebook.as_ref() {
            Some(current) => {
                let next = transform(current);
                state.notebook = Some(next);
                true
            }
            None => false,
        }
    }

    /// Set the loading flag until the guard is dropped
    pub fn loading(&self) -> LoadingGuard {
        self.set_loading(true);
        LoadingGuard {
            store: self.clone(),
        }
    }

    /// Mark a cell/column as busy until the guard is dropped
    pub fn busy(&self, target_id: &str) -> BusyGuard {
        *self
            .inner
            .write()
            .busy
            .entry(target_id.to_string())
            .or_insert(0) += 1;
        BusyGuard {
            store: self.clone(),
            target_id: target_id.to_string(),
        }
    }
}

/// Clears the loading flag on drop, on every exit path
#[derive(Debug)]
#[must_use = "the loading flag is cleared as soon as the guard is dropped"]
pub struct LoadingGuard {
    store: DocumentStore,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

/// Releases one busy count on drop; the target is cleared at zero
#[derive(Debug)]
#[must_use = "the target stops being busy as soon as the guard is dropped"]
pub struct BusyGuard {
    store: DocumentStore,
    target_id: String,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut state = self.store.inner.write();
        if let Some(count) = state.busy.get_mut(&self.target_id) {
            *count -= 1;
            if *count == 0 {
                state.busy.remove(&self.target_id);
            }
        }
    }
}
