// Copyright (c) 2025 - Cowboy AI, Inc.
//! Personality and Archetype Domain Model
//!
//! A personality is a named configuration profile assigned to consumers:
//! the services it requires, who owns it, and whether its consumers must be
//! cluster members. Every personality belongs to an archetype, the
//! compile-capability classification the external toolchain keys off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Identifier for an archetype
pub type ArchetypeId = Uuid;

/// Identifier for a personality
pub type PersonalityId = Uuid;

/// A compile-capability classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archetype {
    /// Archetype identity (immutable)
    pub id: ArchetypeId,

    /// Unique archetype name
    pub name: String,

    /// Whether artifacts for this archetype are fed to the compiler
    pub is_compileable: bool,
}

impl Archetype {
    /// Create a new archetype
    pub fn new(name: impl Into<String>, is_compileable: bool) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            is_compileable,
        }
    }
}

/// A named configuration profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    /// Personality identity (immutable)
    pub id: PersonalityId,

    /// Name, unique within the owning archetype
    pub name: String,

    /// Owning archetype
    pub archetype: ArchetypeId,

    /// Service names consumers of this personality must have bound
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub required_services: BTreeSet<String>,

    /// Whether consumers of this personality must be cluster members
    pub cluster_required: bool,

    /// Owning team or user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Environment tag (e.g. prod, qa, dev)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Personality {
    /// Create a new personality under an archetype
    pub fn new(name: impl Into<String>, archetype: &Archetype) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            archetype: archetype.id,
            required_services: BTreeSet::new(),
            cluster_required: false,
            owner: None,
            environment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a required service
    pub fn require_service(&mut self, service: impl Into<String>) {
        self.required_services.insert(service.into());
        self.updated_at = Utc::now();
    }

    /// Mark consumers of this personality as cluster-only
    pub fn with_cluster_required(mut self) -> Self {
        self.cluster_required = true;
        self
    }

    /// Set the owner
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the environment tag
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_services_are_deduplicated() {
        let archetype = Archetype::new("aquilon", true);
        let mut personality = Personality::new("webserver", &archetype);

        personality.require_service("dns");
        personality.require_service("ntp");
        personality.require_service("dns");

        assert_eq!(personality.required_services.len(), 2);
    }

    #[test]
    fn test_cluster_required_flag() {
        let archetype = Archetype::new("vmhost", true);
        let personality = Personality::new("esx-node", &archetype).with_cluster_required();
        assert!(personality.cluster_required);
    }
}
