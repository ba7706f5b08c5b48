//! Fleet configuration broker
//!
//! This crate models a fleet of hosts and clusters, resolves which service
//! instances each consumer binds to through a hierarchical service map,
//! validates cluster membership and metacluster capacity, and materializes
//! generated configuration artifacts transactionally to disk.

pub mod config;
pub mod domain;
pub mod errors;
pub mod locks;
pub mod pipeline;
pub mod plenary;
pub mod resolver;
pub mod store;
pub mod validator;

// Re-export commonly used types
pub use config::BrokerConfig;
pub use errors::{BrokerError, BrokerResult, MaterializationError, WriteFailure};
pub use locks::{LockGuard, LockRegistry, PathToken};
pub use pipeline::{
    ApplyOutcome, CompileOutcome, CompileScope, Compiler, MaterializationPipeline, NoopCompiler,
    ProcessCompiler, WriteSeverity,
};
pub use plenary::{EntityRef, Plenary, PlenaryCollection};
pub use resolver::{ResolvedMap, ServiceMapResolver};
pub use store::{ConfigStore, InMemoryStore, MappingFilter};
pub use validator::ValidationError;
