// Copyright (c) 2025 - Cowboy AI, Inc.
//! Broker configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the broker's materialization surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Root directory under which all plenary artifacts are written
    pub plenary_root: PathBuf,

    /// Command invoked for the external compile step
    pub compile_command: String,

    /// Extra arguments passed before the branch name
    pub compile_args: Vec<String>,

    /// Upper bound on a single compile invocation
    #[serde(with = "duration_secs")]
    pub compile_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            plenary_root: PathBuf::from("/var/lib/fleet-broker/plenary"),
            compile_command: "panc".to_string(),
            compile_args: Vec::new(),
            compile_timeout: Duration::from_secs(600),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
