// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transactional Materialization Pipeline
//!
//! Applies a batch of generated artifacts atomically: one merged lock
//! token covers every target path, prior content is stashed before the
//! first write, every write goes through temp-file-then-rename, and any
//! hard failure rolls the whole batch back before the error surfaces.
//!
//! # State machine per apply() call
//!
//! ```text
//! key → lock → stash → write → decide ─┬─ hard failure: restore, unlock, error
//!                                      └─ ok: compile → unlock
//! ```
//!
//! Write failures are aggregated, never short-circuited, so the error
//! report names every failed artifact. Whether a failed artifact is soft
//! (warn and continue) or hard (roll back the batch) is decided by a
//! caller-supplied classifier over the owning entity - typically "hard if
//! the entity was directly requested, soft if it is only indirectly
//! affected". Whether a compile failure also rolls back the writes is a
//! caller-level choice expressed by [`CompileScope`].
//!
//! The lock is held for stash + write + restore. With
//! [`CompileScope::OutsideStash`] the compile runs after the lock is
//! released, so a long compile never stalls unrelated batches;
//! [`CompileScope::InsideStash`] keeps the lock for the compile as well,
//! since a rollback after compile must still be covered by it.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::config::BrokerConfig;
use crate::errors::{BrokerError, BrokerResult, MaterializationError, WriteFailure};
use crate::locks::{LockRegistry, PathToken};
use crate::plenary::{EntityRef, Plenary, PlenaryCollection};

pub mod compile;

pub use compile::{CompileOutcome, Compiler, NoopCompiler, ProcessCompiler};

/// How a failed artifact write affects the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSeverity {
    /// Indirectly-affected entity: log and continue
    Soft,
    /// Directly-requested entity: batch fails and rolls back
    Hard,
}

/// Whether the compile step runs inside the rollback scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileScope {
    /// Writes stay committed if the compile fails (the common case)
    OutsideStash,
    /// A compile failure also restores every written path
    InsideStash,
}

/// Result of a successful apply() call
#[derive(Debug)]
pub struct ApplyOutcome {
    /// Artifacts written
    pub written: usize,
    /// Soft failures (logged, batch not aborted)
    pub soft_failures: Vec<WriteFailure>,
    /// Outcome of the compile step
    pub compile: CompileOutcome,
}

/// Snapshot of prior content for every path a batch touches
///
/// A manual, path-granularity transaction log scoped to one apply() call.
#[derive(Debug)]
struct Stash {
    entries: Vec<(PathBuf, Option<Vec<u8>>)>,
}

impl Stash {
    async fn capture(paths: &[PathBuf]) -> BrokerResult<Self> {
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let prior = match fs::read(path).await {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => {
                    // An existing file we cannot read cannot be restored
                    // later, so the batch must abort before any write. A
                    // non-file at the target has nothing to stash; the
                    // write itself will report the conflict.
                    match fs::metadata(path).await {
                        Ok(meta) if !meta.is_file() => None,
                        _ => return Err(BrokerError::Io(e)),
                    }
                }
            };
            entries.push((path.clone(), prior));
        }
        Ok(Self { entries })
    }

    /// Put every path back to its pre-batch state
    ///
    /// Best effort: a path that cannot be restored is logged and skipped
    /// so the original failure is never masked.
    async fn restore(&self) {
        for (path, prior) in &self.entries {
            let result = match prior {
                Some(bytes) => write_atomic(path, bytes).await,
                None => match fs::remove_file(path).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = result {
                error!("Failed to restore {}: {}", path.display(), e);
            }
        }
        debug!("Restored {} stashed path(s)", self.entries.len());
    }
}

/// Write content so a reader never observes a partial file
async fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(parent).await?;

    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp = parent.join(format!(".{}.new", file_name.to_string_lossy()));

    fs::write(&tmp, content).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// The transactional write pipeline
///
/// Owns no global state: the lock registry is injected so tests can run
/// independent pipelines side by side.
pub struct MaterializationPipeline {
    config: BrokerConfig,
    locks: LockRegistry,
}

impl MaterializationPipeline {
    /// Create a pipeline over a lock registry
    pub fn new(config: BrokerConfig, locks: LockRegistry) -> Self {
        Self { config, locks }
    }

    /// The root directory artifacts are written under
    pub fn plenary_root(&self) -> &Path {
        &self.config.plenary_root
    }

    /// Apply one or more collections as a single atomic batch
    ///
    /// Multiple collections occur when one request spans several
    /// independently-derived write footprints (e.g. a cross-branch move);
    /// their lock tokens are merged and acquired as one.
    ///
    /// `classify` decides soft vs hard per owning entity. On any hard
    /// failure every touched path is restored and the aggregated failure
    /// list is returned; soft failures are reported in the outcome without
    /// aborting. A compile failure surfaces as [`BrokerError::Compile`],
    /// distinct from write failures; whether it also rolls the writes back
    /// is governed by `scope`.
    pub async fn apply<F>(
        &self,
        collections: &[PlenaryCollection],
        branch: &str,
        classify: F,
        compiler: &dyn Compiler,
        scope: CompileScope,
    ) -> BrokerResult<ApplyOutcome>
    where
        F: Fn(&EntityRef) -> WriteSeverity,
    {
        let root = &self.config.plenary_root;

        // Keying: one merged token for the whole batch.
        let token = PathToken::merge(collections.iter().map(|c| c.key(root)));
        if token.is_empty() {
            return Ok(ApplyOutcome {
                written: 0,
                soft_failures: Vec::new(),
                compile: CompileOutcome::success(0),
            });
        }

        // De-duplicate across collections; first occurrence wins, matching
        // per-collection append semantics.
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut batch: Vec<(Plenary, PathBuf)> = Vec::new();
        for collection in collections {
            for plenary in collection.flatten() {
                let target = root.join(plenary.rel_path());
                if seen.insert(target.clone()) {
                    batch.push((plenary, target));
                }
            }
        }

        info!(
            "Applying batch of {} artifact(s) on branch '{}'",
            batch.len(),
            branch
        );

        let guard = self.locks.acquire(token).await;

        let paths: Vec<PathBuf> = batch.iter().map(|(_, t)| t.clone()).collect();
        let stash = Stash::capture(&paths).await?;

        let mut written = Vec::new();
        let mut soft_failures = Vec::new();
        let mut hard_failures = Vec::new();

        for (plenary, target) in &batch {
            match write_atomic(target, plenary.content.as_bytes()).await {
                Ok(()) => written.push(plenary.rel_path().to_string_lossy().into_owned()),
                Err(e) => {
                    let failure = WriteFailure {
                        entity: plenary.entity.label(),
                        path: target.clone(),
                        detail: e.to_string(),
                    };
                    match classify(&plenary.entity) {
                        WriteSeverity::Soft => {
                            warn!(
                                "Soft write failure for {}: {}",
                                failure.entity, failure.detail
                            );
                            soft_failures.push(failure);
                        }
                        WriteSeverity::Hard => {
                            error!(
                                "Hard write failure for {}: {}",
                                failure.entity, failure.detail
                            );
                            hard_failures.push(failure);
                        }
                    }
                }
            }
        }

        // Decision: any hard failure rolls the whole batch back.
        if !hard_failures.is_empty() {
            stash.restore().await;
            drop(guard);
            return Err(MaterializationError {
                failures: hard_failures,
            }
            .into());
        }

        let compile = match scope {
            CompileScope::OutsideStash => {
                // Long compiles must not stall unrelated batches.
                drop(guard);
                compiler.compile(branch, Some(&written)).await?
            }
            CompileScope::InsideStash => {
                let outcome = compiler.compile(branch, Some(&written)).await;
                match &outcome {
                    Ok(o) if !o.is_success() => stash.restore().await,
                    Err(_) => stash.restore().await,
                    Ok(_) => {}
                }
                drop(guard);
                outcome?
            }
        };

        if !compile.is_success() {
            return Err(BrokerError::Compile {
                compiled: compile.compiled,
                failed: compile.failed,
                total: compile.total(),
                detail: compile.detail,
            });
        }

        Ok(ApplyOutcome {
            written: written.len(),
            soft_failures,
            compile,
        })
    }
}
