use crate::branch::BranchStore;
use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};
use tollgate_types::{Error, Key, Value};

/// Key-value access shared by the root store and its branches.
///
/// Handles are shared between context values, so mutation goes through `&self`.
pub trait State {
    fn get(&self, key: &Key) -> Result<Option<Value>, Error>;
    fn insert(&self, key: Key, value: Value) -> Result<(), Error>;
    fn delete(&self, key: &Key) -> Result<(), Error>;

    /// Merged view of every entry whose key matches, ordered by key.
    fn scan(&self, matches: &dyn Fn(&Key) -> bool) -> Result<BTreeMap<Key, Value>, Error>;

    /// Apply a batch of changes. Implementations apply the whole batch or none of it.
    fn apply(&self, changes: Vec<(Key, Status)>) -> Result<(), Error> {
        for (key, status) in changes {
            match status {
                Status::Update(value) => self.insert(key, value)?,
                Status::Delete => self.delete(&key)?,
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Status {
    Update(Value),
    Delete,
}

#[derive(Default)]
struct RootInner {
    data: RwLock<BTreeMap<Key, Value>>,
    commits: AtomicU64,
}

/// The durable root store. Cloning yields another handle to the same data.
#[derive(Clone, Default)]
pub struct RootStore {
    inner: Arc<RootInner>,
}

impl RootStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Key, Value>> {
        self.inner
            .data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Key, Value>> {
        self.inner
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of batches applied (one per branch commit into this store).
    pub fn commits(&self) -> u64 {
        self.inner.commits.load(Ordering::Acquire)
    }

    /// Copy of the full contents, for comparisons.
    pub fn snapshot(&self) -> BTreeMap<Key, Value> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl State for RootStore {
    fn get(&self, key: &Key) -> Result<Option<Value>, Error> {
        Ok(self.read().get(key).cloned())
    }

    fn insert(&self, key: Key, value: Value) -> Result<(), Error> {
        self.write().insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &Key) -> Result<(), Error> {
        self.write().remove(key);
        Ok(())
    }

    fn scan(&self, matches: &dyn Fn(&Key) -> bool) -> Result<BTreeMap<Key, Value>, Error> {
        Ok(self
            .read()
            .iter()
            .filter(|(key, _)| matches(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn apply(&self, changes: Vec<(Key, Status)>) -> Result<(), Error> {
        let mut data = self.write();
        for (key, status) in changes {
            match status {
                Status::Update(value) => {
                    data.insert(key, value);
                }
                Status::Delete => {
                    data.remove(&key);
                }
            }
        }
        self.inner.commits.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// The state a context reads and writes: the root store or a branch of it.
#[derive(Clone)]
pub enum StateHandle {
    Root(RootStore),
    Branch(BranchStore),
}

impl StateHandle {
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    /// True when both handles refer to the same underlying store.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Root(a), Self::Root(b)) => a.ptr_eq(b),
            (Self::Branch(a), Self::Branch(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<RootStore> for StateHandle {
    fn from(store: RootStore) -> Self {
        Self::Root(store)
    }
}

impl From<BranchStore> for StateHandle {
    fn from(store: BranchStore) -> Self {
        Self::Branch(store)
    }
}

impl fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(_) => f.write_str("Root"),
            Self::Branch(branch) => write!(f, "Branch({})", branch.id()),
        }
    }
}

impl State for StateHandle {
    fn get(&self, key: &Key) -> Result<Option<Value>, Error> {
        match self {
            Self::Root(store) => store.get(key),
            Self::Branch(store) => store.get(key),
        }
    }

    fn insert(&self, key: Key, value: Value) -> Result<(), Error> {
        match self {
            Self::Root(store) => store.insert(key, value),
            Self::Branch(store) => store.insert(key, value),
        }
    }

    fn delete(&self, key: &Key) -> Result<(), Error> {
        match self {
            Self::Root(store) => store.delete(key),
            Self::Branch(store) => store.delete(key),
        }
    }

    fn scan(&self, matches: &dyn Fn(&Key) -> bool) -> Result<BTreeMap<Key, Value>, Error> {
        match self {
            Self::Root(store) => store.scan(matches),
            Self::Branch(store) => store.scan(matches),
        }
    }

    fn apply(&self, changes: Vec<(Key, Status)>) -> Result<(), Error> {
        match self {
            Self::Root(store) => store.apply(changes),
            Self::Branch(store) => store.apply(changes),
        }
    }
}
