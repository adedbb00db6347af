//! Copy-on-write branches over a [StateHandle].
//!
//! A branch buffers writes in an overlay and reads through to its parent for anything it has
//! not written. It ends in exactly one of two ways: [Branch::commit] writes the overlay into the
//! parent as one batch, or dropping the [Branch] guard discards it. Afterwards every handle to
//! the branch is inert and fails with [Error::BranchClosed].

use crate::state::{State, StateHandle, Status};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};
use tollgate_types::{Error, Key, Value};
use tracing::debug;

static NEXT_BRANCH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fate {
    Open,
    Committed,
    Discarded,
}

struct Overlay {
    fate: Fate,
    pending: BTreeMap<Key, Status>,
}

struct BranchInner {
    id: u64,
    parent: StateHandle,
    overlay: Mutex<Overlay>,
}

/// Shared handle to a branch's overlay, installed on contexts.
#[derive(Clone)]
pub struct BranchStore {
    inner: Arc<BranchInner>,
}

impl BranchStore {
    fn new(parent: StateHandle) -> Self {
        Self {
            inner: Arc::new(BranchInner {
                id: NEXT_BRANCH_ID.fetch_add(1, Ordering::Relaxed),
                parent,
                overlay: Mutex::new(Overlay {
                    fate: Fate::Open,
                    pending: BTreeMap::new(),
                }),
            }),
        }
    }

    fn overlay(&self) -> MutexGuard<'_, Overlay> {
        self.inner
            .overlay
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_overlay(&self) -> Result<MutexGuard<'_, Overlay>, Error> {
        let overlay = self.overlay();
        if overlay.fate != Fate::Open {
            return Err(Error::BranchClosed);
        }
        Ok(overlay)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn fate(&self) -> Fate {
        self.overlay().fate
    }

    /// Number of buffered writes (including deletes).
    pub fn pending(&self) -> usize {
        self.overlay().pending.len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl State for BranchStore {
    fn get(&self, key: &Key) -> Result<Option<Value>, Error> {
        let buffered = self.open_overlay()?.pending.get(key).cloned();
        match buffered {
            Some(Status::Update(value)) => Ok(Some(value)),
            Some(Status::Delete) => Ok(None),
            None => self.inner.parent.get(key),
        }
    }

    fn insert(&self, key: Key, value: Value) -> Result<(), Error> {
        self.open_overlay()?
            .pending
            .insert(key, Status::Update(value));
        Ok(())
    }

    fn delete(&self, key: &Key) -> Result<(), Error> {
        self.open_overlay()?
            .pending
            .insert(key.clone(), Status::Delete);
        Ok(())
    }

    fn scan(&self, matches: &dyn Fn(&Key) -> bool) -> Result<BTreeMap<Key, Value>, Error> {
        let mut merged = self.inner.parent.scan(matches)?;
        let overlay = self.open_overlay()?;
        for (key, status) in overlay.pending.iter().filter(|(key, _)| matches(key)) {
            match status {
                Status::Update(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                Status::Delete => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged)
    }

    fn apply(&self, changes: Vec<(Key, Status)>) -> Result<(), Error> {
        let mut overlay = self.open_overlay()?;
        overlay.pending.extend(changes);
        Ok(())
    }
}

/// Owner of a branch's fate. Commit consumes it; dropping it uncommitted discards the branch.
#[must_use = "dropping a branch discards its writes"]
pub struct Branch {
    store: BranchStore,
    committed: bool,
}

impl Branch {
    pub fn new(parent: impl Into<StateHandle>) -> Self {
        let store = BranchStore::new(parent.into());
        debug!(branch = store.id(), "opened state branch");
        Self {
            store,
            committed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.store.id()
    }

    pub fn store(&self) -> &BranchStore {
        &self.store
    }

    /// Handle suitable for installing on a context.
    pub fn handle(&self) -> StateHandle {
        StateHandle::Branch(self.store.clone())
    }

    /// Write every buffered change into the parent as one batch and close the branch.
    ///
    /// Returns the number of changes written. Fails with [Error::BranchClosed] if the branch
    /// (or the branch it was opened from) is no longer open, in which case nothing is written.
    pub fn commit(mut self) -> Result<usize, Error> {
        let changes: Vec<(Key, Status)> = {
            let mut overlay = self.store.open_overlay()?;
            overlay.fate = Fate::Committed;
            std::mem::take(&mut overlay.pending).into_iter().collect()
        };
        self.committed = true;

        let writes = changes.len();
        let stores: BTreeSet<&'static str> =
            changes.iter().map(|(key, _)| key.store()).collect();
        if let Err(err) = self.store.inner.parent.apply(changes) {
            self.store.overlay().fate = Fate::Discarded;
            return Err(err);
        }
        debug!(branch = self.store.id(), writes, ?stores, "committed state branch");
        Ok(writes)
    }
}

impl Drop for Branch {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut overlay = self.store.overlay();
        if overlay.fate == Fate::Open {
            overlay.fate = Fate::Discarded;
            let discarded = overlay.pending.len();
            overlay.pending.clear();
            debug!(branch = self.store.id(), discarded, "discarded state branch");
        }
    }
}
