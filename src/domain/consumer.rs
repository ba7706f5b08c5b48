// Copyright (c) 2025 - Cowboy AI, Inc.
//! Consumers: Hosts, Clusters, and Metaclusters
//!
//! A consumer is anything that carries a location, a personality, a branch,
//! and a set of resolved service bindings: a single host, a cluster of
//! hosts, or a metacluster of clusters. The three are distinct record types
//! joined by the [`Consumer`] enum; aggregation rules (capacity, membership)
//! are explicit per-variant logic in the validator, not virtual dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::hostname::Hostname;
use super::location::LocationId;
use super::personality::PersonalityId;
use super::service::ServiceInstanceId;

/// Identifier for a host
pub type HostId = Uuid;

/// Identifier for a cluster
pub type ClusterId = Uuid;

/// Identifier for a metacluster
pub type MetaClusterId = Uuid;

/// A pointer into the version-controlled configuration source tree
///
/// Domains are broker-managed; sandboxes belong to a user and may track a
/// domain. Group members must all share the group's branch, which is why
/// equality here compares both the name and the sandbox author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Branch {
    Domain { name: String },
    Sandbox { name: String, author: String },
}

impl Branch {
    /// Create a domain branch
    pub fn domain(name: impl Into<String>) -> Self {
        Branch::Domain { name: name.into() }
    }

    /// Create a sandbox branch
    pub fn sandbox(name: impl Into<String>, author: impl Into<String>) -> Self {
        Branch::Sandbox {
            name: name.into(),
            author: author.into(),
        }
    }

    /// The branch name
    pub fn name(&self) -> &str {
        match self {
            Branch::Domain { name } | Branch::Sandbox { name, .. } => name,
        }
    }

    /// The sandbox author, if this is a sandbox
    pub fn author(&self) -> Option<&str> {
        match self {
            Branch::Domain { .. } => None,
            Branch::Sandbox { author, .. } => Some(author),
        }
    }
}

/// A single managed host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Host identity (immutable)
    pub id: HostId,

    /// Fully qualified hostname
    pub hostname: Hostname,

    /// Where the host physically sits
    pub location: LocationId,

    /// Configuration profile
    pub personality: PersonalityId,

    /// Configuration source branch
    pub branch: Branch,

    /// Resolved service instance bindings
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub bindings: BTreeSet<ServiceInstanceId>,

    /// Owning cluster, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Host {
    /// Create a new host
    pub fn new(
        hostname: Hostname,
        location: LocationId,
        personality: PersonalityId,
        branch: Branch,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            hostname,
            location,
            personality,
            branch,
            bindings: BTreeSet::new(),
            cluster: None,
            created_at: Utc::now(),
        }
    }
}

/// A group of hosts managed as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster identity (immutable)
    pub id: ClusterId,

    /// Unique cluster name
    pub name: String,

    /// Location constraint for members
    pub location: LocationId,

    /// Configuration profile
    pub personality: PersonalityId,

    /// Configuration source branch, shared by all members
    pub branch: Branch,

    /// Member hosts
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub members: BTreeSet<HostId>,

    /// If non-empty, only these personalities may join
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub allowed_personalities: BTreeSet<PersonalityId>,

    /// Maximum member count, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u32>,

    /// Declared per-resource capacity (resource name -> amount)
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub capacity: BTreeMap<String, u64>,

    /// Current per-resource usage (resource name -> amount)
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub usage: BTreeMap<String, u64>,

    /// How many member hosts may be down before the cluster degrades
    pub down_hosts_threshold: u32,

    /// Owning metacluster, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metacluster: Option<MetaClusterId>,

    /// Resolved service instance bindings
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub bindings: BTreeSet<ServiceInstanceId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Cluster {
    /// Create a new cluster
    pub fn new(
        name: impl Into<String>,
        location: LocationId,
        personality: PersonalityId,
        branch: Branch,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            location,
            personality,
            branch,
            members: BTreeSet::new(),
            allowed_personalities: BTreeSet::new(),
            max_members: None,
            capacity: BTreeMap::new(),
            usage: BTreeMap::new(),
            down_hosts_threshold: 0,
            metacluster: None,
            bindings: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Declare capacity for a resource
    pub fn set_capacity(&mut self, resource: impl Into<String>, amount: u64) {
        self.capacity.insert(resource.into(), amount);
    }

    /// Record usage for a resource
    pub fn set_usage(&mut self, resource: impl Into<String>, amount: u64) {
        self.usage.insert(resource.into(), amount);
    }
}

/// A grouping of clusters for wide-area failover
///
/// Metaclusters may not nest: members are always plain clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaCluster {
    /// Metacluster identity (immutable)
    pub id: MetaClusterId,

    /// Unique metacluster name
    pub name: String,

    /// Location constraint for members
    pub location: LocationId,

    /// Configuration profile
    pub personality: PersonalityId,

    /// Configuration source branch, shared by all members
    pub branch: Branch,

    /// Member clusters
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub members: BTreeSet<ClusterId>,

    /// If non-empty, only clusters of these personalities may join
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub allowed_personalities: BTreeSet<PersonalityId>,

    /// Maximum member cluster count, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_clusters: Option<u32>,

    /// When set, capacity must survive the loss of the single largest
    /// contributing building
    pub high_availability: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl MetaCluster {
    /// Create a new metacluster
    pub fn new(
        name: impl Into<String>,
        location: LocationId,
        personality: PersonalityId,
        branch: Branch,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            location,
            personality,
            branch,
            members: BTreeSet::new(),
            allowed_personalities: BTreeSet::new(),
            max_clusters: None,
            high_availability: false,
            created_at: Utc::now(),
        }
    }

    /// Enable the high-availability capacity policy
    pub fn with_high_availability(mut self) -> Self {
        self.high_availability = true;
        self
    }
}

/// Any consumer of resolved configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Consumer {
    Host(Host),
    Cluster(Cluster),
    MetaCluster(MetaCluster),
}

impl Consumer {
    /// The consumer's location
    pub fn location(&self) -> LocationId {
        match self {
            Consumer::Host(h) => h.location,
            Consumer::Cluster(c) => c.location,
            Consumer::MetaCluster(m) => m.location,
        }
    }

    /// The consumer's personality
    pub fn personality(&self) -> PersonalityId {
        match self {
            Consumer::Host(h) => h.personality,
            Consumer::Cluster(c) => c.personality,
            Consumer::MetaCluster(m) => m.personality,
        }
    }

    /// The consumer's branch
    pub fn branch(&self) -> &Branch {
        match self {
            Consumer::Host(h) => &h.branch,
            Consumer::Cluster(c) => &c.branch,
            Consumer::MetaCluster(m) => &m.branch,
        }
    }

    /// Display label, e.g. `host/web01.example.com`
    pub fn label(&self) -> String {
        match self {
            Consumer::Host(h) => format!("host/{}", h.hostname),
            Consumer::Cluster(c) => format!("cluster/{}", c.name),
            Consumer::MetaCluster(m) => format!("metacluster/{}", m.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_identity() {
        let a = Branch::sandbox("feature-x", "alice");
        let b = Branch::sandbox("feature-x", "alice");
        let c = Branch::sandbox("feature-x", "bob");
        let d = Branch::domain("prod");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(d.author(), None);
        assert_eq!(a.author(), Some("alice"));
    }

    #[test]
    fn test_consumer_label() {
        let archetype_id = Uuid::now_v7();
        let host = Host::new(
            Hostname::new("web01.example.com").unwrap(),
            Uuid::now_v7(),
            archetype_id,
            Branch::domain("prod"),
        );
        assert_eq!(
            Consumer::Host(host).label(),
            "host/web01.example.com"
        );
    }
}
