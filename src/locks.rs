// Copyright (c) 2025 - Cowboy AI, Inc.
//! Advisory Lock Registry
//!
//! Serializes materialization batches whose write footprints overlap. A
//! token is a normalized set of target paths; acquisition is exclusive
//! against any held token sharing at least one path, and a merged token is
//! acquired atomically - either every path in it is locked or none are.
//!
//! The registry is an explicit, constructed component handed to the
//! pipeline, never a module-level singleton, so tests can run independent
//! registries side by side.
//!
//! Acquisition blocks (awaits) with no timeout; callers bound session
//! lifetime externally.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::debug;

/// A lock token: the set of normalized paths one batch will touch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathToken {
    paths: HashSet<PathBuf>,
}

impl PathToken {
    /// Create an empty token
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a token from paths
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut token = Self::new();
        for p in paths {
            token.add(p);
        }
        token
    }

    /// Add one path to the token
    pub fn add(&mut self, path: impl AsRef<Path>) {
        self.paths.insert(normalize(path.as_ref()));
    }

    /// Merge independently-derived tokens into one
    ///
    /// The combined token is what gets acquired when a request must cover
    /// several collections at once (e.g. a cross-branch move).
    pub fn merge<I: IntoIterator<Item = PathToken>>(tokens: I) -> Self {
        let mut merged = Self::new();
        for token in tokens {
            merged.paths.extend(token.paths);
        }
        merged
    }

    /// Whether two tokens share at least one path
    pub fn overlaps(&self, other: &PathToken) -> bool {
        // Iterate the smaller set.
        let (small, large) = if self.paths.len() <= other.paths.len() {
            (&self.paths, &other.paths)
        } else {
            (&other.paths, &self.paths)
        };
        small.iter().any(|p| large.contains(p))
    }

    /// The paths covered by this token
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    /// Number of paths covered
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the token covers no paths
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Lexical path normalization: strips `.` and resolves `..` where possible
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[derive(Default)]
struct Held {
    paths: HashSet<PathBuf>,
}

/// Process-wide advisory lock registry
///
/// Clone-cheap handle; all clones share one lock table.
#[derive(Clone, Default)]
pub struct LockRegistry {
    held: Arc<Mutex<Held>>,
    freed: Arc<Notify>,
}

impl LockRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a token, waiting until no held token overlaps it
    ///
    /// The whole path set is claimed atomically. The returned guard
    /// releases the token when dropped, on every exit path.
    pub async fn acquire(&self, token: PathToken) -> LockGuard {
        loop {
            // Register interest before checking the table so a release
            // between the check and the await cannot be missed.
            let freed = self.freed.notified();
            tokio::pin!(freed);
            freed.as_mut().enable();

            {
                let mut held = self
                    .held
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());

                let busy = token.paths.iter().any(|p| held.paths.contains(p));
                if !busy {
                    held.paths.extend(token.paths.iter().cloned());
                    debug!("Acquired lock over {} path(s)", token.len());
                    return LockGuard {
                        registry: self.clone(),
                        token,
                    };
                }
            }

            freed.await;
        }
    }

    fn release(&self, token: &PathToken) {
        let mut held = self
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for p in &token.paths {
            held.paths.remove(p);
        }
        drop(held);
        debug!("Released lock over {} path(s)", token.len());
        self.freed.notify_waiters();
    }
}

/// Scoped lock ownership; releases its token on drop
pub struct LockGuard {
    registry: LockRegistry,
    token: PathToken,
}

impl LockGuard {
    /// The token this guard holds
    pub fn token(&self) -> &PathToken {
        &self.token
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.registry.release(&self.token);
    }
}
