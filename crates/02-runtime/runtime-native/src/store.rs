//! Level stores for native hosts.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use guest_abi::{LevelStore, StorageError, StoreFuture, Value};
use parking_lot::Mutex;

type WriteFuture = LocalBoxFuture<'static, Result<(), StorageError>>;
type PendingWrite = Shared<WriteFuture>;

/// Stores each key as a file named after it under one directory.
///
/// Text and byte values are written verbatim; anything else as JSON. Writes
/// start in the order [`LevelStore::store`] was called and each one waits for
/// the previous to finish, so the last call always wins on disk. Clones share
/// the same queue.
#[derive(Clone)]
pub struct FileLevelStore {
    dir: PathBuf,
    tail: Rc<RefCell<PendingWrite>>,
}

impl FileLevelStore {
    /// Store rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let idle: WriteFuture = async { Ok(()) }.boxed_local();
        Self {
            dir: dir.into(),
            tail: Rc::new(RefCell::new(idle.shared())),
        }
    }

    /// File that backs `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Resolves once every write issued so far has finished, successfully or not.
    pub fn settled(&self) -> impl Future<Output = ()> + 'static {
        let tail = self.tail.borrow().clone();
        async move {
            let _ = tail.await;
        }
    }
}

impl fmt::Debug for FileLevelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLevelStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

fn encode(value: &Value) -> Result<Vec<u8>, StorageError> {
    match value.as_bytes() {
        Some(bytes) => Ok(bytes.to_vec()),
        None => serde_json::to_vec(value).map_err(|err| StorageError::Rejected(err.to_string())),
    }
}

async fn write_file(dir: &Path, path: &Path, value: &Value) -> Result<(), StorageError> {
    let bytes = encode(value)?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| StorageError::Io(format!("{}: {err}", dir.display())))?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|err| StorageError::Io(format!("{}: {err}", path.display())))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "level stored");
    Ok(())
}

impl LevelStore for FileLevelStore {
    fn store(&self, key: &str, value: Value) -> StoreFuture {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            let key = key.to_owned();
            return async move { Err(StorageError::Rejected(format!("invalid key {key:?}"))) }
                .boxed_local();
        }

        let dir = self.dir.clone();
        let path = self.path_for(key);
        let previous = self.tail.borrow().clone();
        let write: WriteFuture = async move {
            let _ = previous.await;
            write_file(&dir, &path, &value).await
        }
        .boxed_local();
        let write = write.shared();
        *self.tail.borrow_mut() = write.clone();
        write.boxed_local()
    }
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryLevelStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryLevelStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing was stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl LevelStore for MemoryLevelStore {
    fn store(&self, key: &str, value: Value) -> StoreFuture {
        self.entries.lock().insert(key.to_owned(), value);
        async { Ok(()) }.boxed_local()
    }
}
