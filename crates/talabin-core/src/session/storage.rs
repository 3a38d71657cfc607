// ── Session storage backends ──
//
// Flat string key/value persistence underneath the `SessionStore`.
// `MemoryStorage` handles share one map and broadcast each write to the
// other handles, the way browser tabs share localStorage. `FileStorage`
// keeps the map in a JSON file so separate processes see one session;
// they notice each other's writes by polling `reload`, and serialize
// their writes through a lock file next to the session file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::error::CoreError;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const TOKEN_EXPIRES_AT_KEY: &str = "token_expires_at";
pub const USER_KEY: &str = "user";
pub const REDIRECT_KEY: &str = "redirectAfterLogin";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

const LOCK_WAIT: Duration = Duration::from_secs(2);
const LOCK_POLL: Duration = Duration::from_millis(10);
const LOCK_STALE_AFTER: Duration = Duration::from_secs(10);

/// A write made through another handle of the same storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    /// The key that changed, or `None` when changes were missed and
    /// everything should be re-read.
    pub key: Option<String>,
    origin: u64,
}

/// Receives changes made by *other* handles; a handle never sees its own
/// writes, matching the browser `storage` event.
pub struct StorageWatch {
    rx: broadcast::Receiver<StorageChange>,
    own: u64,
}

impl StorageWatch {
    /// Wait for the next foreign change. `None` once every handle is gone.
    pub async fn changed(&mut self) -> Option<StorageChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.origin == self.own => {}
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "storage watcher lagged");
                    return Some(StorageChange {
                        key: None,
                        origin: 0,
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Durable key/value storage for the session.
pub trait SessionStorage: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Apply several writes at once; `None` removes the key.
    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), CoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.apply(&[(key, Some(value))])
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.apply(&[(key, None)])
    }

    /// Push notifications for writes made elsewhere, if the backend can
    /// deliver them. Backends returning `None` are polled via [`reload`].
    ///
    /// [`reload`]: SessionStorage::reload
    fn watch(&self) -> Option<StorageWatch> {
        None
    }

    /// Check the backing medium for outside writes. Returns `true` when
    /// something changed since the last call or the last local write.
    fn reload(&self) -> Result<bool, CoreError> {
        Ok(false)
    }
}

// ── MemoryStorage ────────────────────────────────────────────────────

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// In-process storage. Clone-like [`handle`](Self::handle)s share the map
/// and observe each other's writes.
pub struct MemoryStorage {
    map: Arc<Mutex<BTreeMap<String, String>>>,
    changes: broadcast::Sender<StorageChange>,
    id: u64,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            map: Arc::new(Mutex::new(BTreeMap::new())),
            changes,
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Another view onto the same map, as a second tab would have.
    pub fn handle(&self) -> Self {
        Self {
            map: Arc::clone(&self.map),
            changes: self.changes.clone(),
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Snapshot of everything stored.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.map.lock().expect("storage lock poisoned").clone()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self
            .map
            .lock()
            .expect("storage lock poisoned")
            .get(key)
            .cloned())
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), CoreError> {
        {
            let mut map = self.map.lock().expect("storage lock poisoned");
            for (key, value) in changes {
                match value {
                    Some(value) => map.insert((*key).to_owned(), (*value).to_owned()),
                    None => map.remove(*key),
                };
            }
        }
        for (key, _) in changes {
            // No receivers is fine; nobody is watching yet.
            let _ = self.changes.send(StorageChange {
                key: Some((*key).to_owned()),
                origin: self.id,
            });
        }
        Ok(())
    }

    fn watch(&self) -> Option<StorageWatch> {
        Some(StorageWatch {
            rx: self.changes.subscribe(),
            own: self.id,
        })
    }
}

// ── FileStorage ──────────────────────────────────────────────────────

/// JSON-file storage shared between processes.
///
/// Every read goes to disk so another process's write is visible at once.
/// Writes are read-modify-write under an advisory lock file
/// (`<file>.lock`, created exclusively) and land via rename, so readers
/// never see a half-written file and concurrent writers never drop each
/// other's keys. A lock file older than ten seconds is taken to belong to
/// a crashed writer and is removed; waiting longer than two seconds for a
/// live one fails with an I/O error.
pub struct FileStorage {
    path: PathBuf,
    /// Raw file contents as of the last reload or local write.
    last_seen: Mutex<Option<String>>,
}

impl FileStorage {
    /// Open (without creating) the session file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let storage = Self {
            path: path.into(),
            last_seen: Mutex::new(None),
        };
        let raw = storage.read_raw()?;
        *storage.last_seen.lock().expect("storage lock poisoned") = raw;
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>, CoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CoreError::StorageIo {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn parse(&self, raw: Option<&str>) -> Result<BTreeMap<String, String>, CoreError> {
        match raw {
            None => Ok(BTreeMap::new()),
            Some(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Some(raw) => serde_json::from_str(raw).map_err(|e| CoreError::CorruptStorage {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn io_err(&self, source: std::io::Error) -> CoreError {
        CoreError::StorageIo {
            path: self.path.clone(),
            source,
        }
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn ensure_parent(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        Ok(())
    }

    fn write_atomic(&self, contents: &str) -> Result<(), CoreError> {
        let io_err = |source| self.io_err(source);

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(io_err)?;
            file.write_all(contents.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        restrict_permissions(&tmp).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

// ── Lock file ──

/// Exclusive hold on `<file>.lock`; released on drop.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(path: PathBuf) -> std::io::Result<Self> {
        let deadline = Instant::now() + LOCK_WAIT;
        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    // Owner pid, for whoever finds a leftover lock.
                    let _ = write!(file, "{}", std::process::id());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }

            if is_stale(&path) {
                debug!(path = %path.display(), "removing stale session lock");
                match fs::remove_file(&path) {
                    Ok(()) => continue,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(e),
                }
            }
            if Instant::now() >= deadline {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("session lock {} is held by another process", path.display()),
                ));
            }
            std::thread::sleep(LOCK_POLL);
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), "could not release session lock: {e}");
        }
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > LOCK_STALE_AFTER)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let raw = self.read_raw()?;
        Ok(self.parse(raw.as_deref())?.remove(key))
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), CoreError> {
        let mut last_seen = self.last_seen.lock().expect("storage lock poisoned");
        self.ensure_parent()?;
        let _lock = LockFile::acquire(self.lock_path()).map_err(|e| self.io_err(e))?;
        let raw = self.read_raw()?;
        let mut map = self.parse(raw.as_deref())?;
        for (key, value) in changes {
            match value {
                Some(value) => map.insert((*key).to_owned(), (*value).to_owned()),
                None => map.remove(*key),
            };
        }

        let contents = serde_json::to_string_pretty(&map).map_err(|e| CoreError::Encode {
            key: "<session file>".into(),
            reason: e.to_string(),
        })?;
        self.write_atomic(&contents)?;
        trace!(path = %self.path.display(), keys = changes.len(), "session file written");
        *last_seen = Some(contents);
        Ok(())
    }

    fn reload(&self) -> Result<bool, CoreError> {
        let mut last_seen = self.last_seen.lock().expect("storage lock poisoned");
        let raw = self.read_raw()?;
        if *last_seen == raw {
            return Ok(false);
        }
        debug!(path = %self.path.display(), "session file changed on disk");
        *last_seen = raw;
        Ok(true)
    }
}
