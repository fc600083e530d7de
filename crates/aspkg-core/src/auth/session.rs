use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

/// Contents of the session file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Session {
    /// The stored token, if it is usable
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

type PendingOp = JoinHandle<Result<()>>;

/// Handle to the process-wide session and its background persistence.
///
/// Loads and saves run as spawned tasks and are tracked in a pending queue.
/// Anything that needs a trustworthy view of the session goes through
/// [`SessionStore::is_authenticated`] or [`SessionStore::token`], which wait
/// for every queued operation first. Clone is cheap and shares the session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    session: Mutex<Session>,
    pending: Mutex<Vec<PendingOp>>,
    /// Held by whoever is waiting on the queue, so a second waiter cannot
    /// see it empty while the first still has operations in flight.
    settling: Mutex<()>,
    /// Sequence number of the snapshot currently on disk. Held while writing.
    written: Mutex<Option<u64>>,
    next_seq: AtomicU64,
    failures: AtomicUsize,
}

impl SessionStore {
    /// Start loading the session file at `path` in the background.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let inner = Arc::new(Inner {
            path: path.into(),
            session: Mutex::new(Session::default()),
            pending: Mutex::new(Vec::new()),
            settling: Mutex::new(()),
            written: Mutex::new(None),
            next_seq: AtomicU64::new(0),
            failures: AtomicUsize::new(0),
        });

        let loader = Arc::clone(&inner);
        let handle = tokio::spawn(async move { loader.load().await });
        inner.pending.lock().await.push(handle);

        Self { inner }
    }

    /// Wait for pending loads and saves, then report whether a token is stored.
    pub async fn is_authenticated(&self) -> bool {
        self.token().await.is_some()
    }

    /// Wait for pending loads and saves, then return the stored token.
    pub async fn token(&self) -> Option<String> {
        self.settle().await;
        self.inner.session.lock().await.token().map(str::to_string)
    }

    /// Store a new token and persist it in the background.
    pub async fn set_token(&self, token: String) {
        self.settle().await;
        self.inner.session.lock().await.access_token = Some(token);
        self.save().await;
    }

    /// Remove the token and persist the change in the background.
    pub async fn clear_token(&self) {
        self.settle().await;
        self.inner.session.lock().await.access_token = None;
        self.save().await;
    }

    /// Snapshot the session and queue a write of it. Does not wait for the write.
    pub async fn save(&self) {
        let snapshot = self.inner.session.lock().await.clone();
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);

        let writer = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { writer.write(seq, &snapshot).await });
        self.inner.pending.lock().await.push(handle);
    }

    /// Wait for every queued operation, including ones queued while waiting.
    ///
    /// Reports write failures that happened since the previous drain.
    pub async fn drain(&self) -> Result<()> {
        self.settle().await;
        match self.inner.failures.swap(0, Ordering::SeqCst) {
            0 => Ok(()),
            failures => Err(Error::PersistenceFailed { failures }),
        }
    }

    async fn settle(&self) {
        let _settling = self.inner.settling.lock().await;
        loop {
            let ops = std::mem::take(&mut *self.inner.pending.lock().await);
            if ops.is_empty() {
                return;
            }
            debug!(count = ops.len(), "Waiting for pending session operations");
            for result in join_all(ops).await {
                if let Err(e) = result {
                    error!(error = %e, "Session task did not complete");
                    self.inner.failures.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
    }
}

impl Inner {
    async fn load(&self) -> Result<()> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str::<Session>(&contents) {
                Ok(session) => {
                    debug!(path = ?self.path, has_token = session.token().is_some(), "Session loaded");
                    *self.session.lock().await = session;
                    return Ok(());
                }
                Err(e) => debug!(path = ?self.path, error = %e, "Session file unparsable, starting empty"),
            },
            Err(e) => debug!(path = ?self.path, error = %e, "No session file, starting empty"),
        }

        let empty = Session::default();
        *self.session.lock().await = empty.clone();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.write(seq, &empty).await
    }

    async fn write(&self, seq: u64, snapshot: &Session) -> Result<()> {
        let result = self.write_snapshot(seq, snapshot).await;
        if let Err(ref e) = result {
            warn!(path = ?self.path, error = %e, "Failed to save session");
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn write_snapshot(&self, seq: u64, snapshot: &Session) -> Result<()> {
        let mut written = self.written.lock().await;
        if matches!(*written, Some(last) if last > seq) {
            debug!(seq, "Skipping stale session snapshot");
            return Ok(());
        }

        let contents = serde_json::to_string(snapshot)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, contents).await?;
        *written = Some(seq);
        debug!(seq, path = ?self.path, "Session saved");
        Ok(())
    }
}
