//! In-memory session store
//!
//! A session groups the artifacts of one conversion batch under a random id
//! so clients can fetch individual files or the whole archive afterwards.
//! Sessions are held entirely in memory and evicted by a background sweeper
//! once their retention window passes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use avifpress_core::SessionArtifact;
use tokio::time::{interval, Instant, MissedTickBehavior};

struct Session {
    artifacts: Vec<SessionArtifact>,
    created_at: Instant,
}

/// Shared handle to the session map. Cloning is cheap; all clones see the
/// same sessions.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
    retention: Duration,
}

impl SessionStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            retention,
        }
    }

    /// Register a batch of artifacts under a fresh session id. Duplicate
    /// filenames within the batch get a numeric suffix so every artifact
    /// stays addressable.
    pub fn create(&self, artifacts: Vec<SessionArtifact>) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();

        let mut taken: HashSet<String> = HashSet::with_capacity(artifacts.len());
        let artifacts: Vec<SessionArtifact> = artifacts
            .into_iter()
            .map(|mut artifact| {
                artifact.filename = disambiguate(&artifact.filename, &taken);
                taken.insert(artifact.filename.clone());
                artifact
            })
            .collect();

        tracing::info!(
            session_id = %session_id,
            artifacts = artifacts.len(),
            "Session created"
        );

        let mut sessions = self.inner.lock().unwrap();
        sessions.insert(
            session_id.clone(),
            Session {
                artifacts,
                created_at: Instant::now(),
            },
        );
        session_id
    }

    /// Look up a single artifact by session id and final filename.
    pub fn artifact(&self, session_id: &str, filename: &str) -> Option<SessionArtifact> {
        let sessions = self.inner.lock().unwrap();
        sessions
            .get(session_id)?
            .artifacts
            .iter()
            .find(|a| a.filename == filename)
            .cloned()
    }

    /// All artifacts of a session, in conversion order.
    pub fn artifacts(&self, session_id: &str) -> Option<Vec<SessionArtifact>> {
        let sessions = self.inner.lock().unwrap();
        sessions.get(session_id).map(|s| s.artifacts.clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.lock().unwrap().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every session older than the retention window. Returns how many
    /// were removed. Removal is atomic per session: a concurrent lookup either
    /// sees the whole session or nothing.
    pub fn sweep_once(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.inner.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = now.duration_since(session.created_at) < self.retention;
            if !keep {
                tracing::info!(session_id = %id, "Evicting expired session");
            }
            keep
        });
        before - sessions.len()
    }

    /// Spawn the periodic eviction task. The task stops when the returned
    /// handle is dropped or `stop` is called.
    pub fn start_sweeper(&self, sweep_interval: Duration) -> SweeperHandle {
        let store = self.clone();
        let handle = tokio::spawn(async move {
            let mut tick = interval(sweep_interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so a fresh store is
            // not swept at startup.
            tick.tick().await;

            loop {
                tick.tick().await;
                let removed = store.sweep_once();
                if removed > 0 {
                    tracing::info!(removed, remaining = store.len(), "Session sweep completed");
                }
            }
        });
        SweeperHandle { handle }
    }
}

/// Aborts the sweeper task on drop.
pub struct SweeperHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl SweeperHandle {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Append `-1`, `-2`, ... before the extension until the name is free.
fn disambiguate(filename: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(filename) {
        return filename.to_string();
    }

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    for n in 1.. {
        let candidate = match ext {
            Some(ext) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", stem, n),
        };
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
    unreachable!()
}
