// Copyright (c) 2025 - Cowboy AI, Inc.
//! External Compile Step
//!
//! After a batch of artifacts is committed, the external toolchain compiles
//! the affected branch into deployable output. The broker treats it as an
//! opaque, potentially slow process behind the [`Compiler`] trait; tests
//! substitute closure-backed fakes.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::errors::{BrokerError, BrokerResult};

/// Structured result of one compile invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    /// Units compiled successfully
    pub compiled: usize,
    /// Units that failed to compile
    pub failed: usize,
    /// Toolchain diagnostics (empty on success)
    pub detail: String,
}

impl CompileOutcome {
    /// A fully successful outcome over `compiled` units
    pub fn success(compiled: usize) -> Self {
        Self {
            compiled,
            failed: 0,
            detail: String::new(),
        }
    }

    /// Whether every unit compiled
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total units attempted
    pub fn total(&self) -> usize {
        self.compiled + self.failed
    }
}

/// The external compile toolchain
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile a branch, optionally restricted to the given artifacts
    ///
    /// `only` carries artifact identifiers (paths relative to the plenary
    /// root) so an incremental compile can skip untouched templates.
    async fn compile(&self, branch: &str, only: Option<&[String]>)
        -> BrokerResult<CompileOutcome>;
}

/// Compiler that shells out to the configured toolchain command
pub struct ProcessCompiler {
    config: BrokerConfig,
}

impl ProcessCompiler {
    /// Create a compiler from broker configuration
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Compiler for ProcessCompiler {
    async fn compile(
        &self,
        branch: &str,
        only: Option<&[String]>,
    ) -> BrokerResult<CompileOutcome> {
        let mut cmd = Command::new(&self.config.compile_command);
        cmd.args(&self.config.compile_args);
        cmd.arg(branch);
        if let Some(only) = only {
            cmd.arg("--only");
            cmd.args(only);
        }

        let units = only.map(|o| o.len()).unwrap_or(1);
        debug!("Compiling branch '{}' ({} unit(s))", branch, units);

        let output = tokio::time::timeout(self.config.compile_timeout, cmd.output())
            .await
            .map_err(|_| {
                BrokerError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("compile of branch '{branch}' timed out"),
                ))
            })??;

        if output.status.success() {
            info!("Compiled branch '{}' ({} unit(s))", branch, units);
            Ok(CompileOutcome::success(units))
        } else {
            let detail = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!("Compile of branch '{}' failed: {}", branch, detail);
            Ok(CompileOutcome {
                compiled: 0,
                failed: units,
                detail,
            })
        }
    }
}

/// Compiler that always succeeds; for call sites with nothing to compile
pub struct NoopCompiler;

#[async_trait]
impl Compiler for NoopCompiler {
    async fn compile(
        &self,
        _branch: &str,
        only: Option<&[String]>,
    ) -> BrokerResult<CompileOutcome> {
        Ok(CompileOutcome::success(only.map(|o| o.len()).unwrap_or(0)))
    }
}
