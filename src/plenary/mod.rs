// Copyright (c) 2025 - Cowboy AI, Inc.
//! Plenary Artifacts
//!
//! A plenary is the in-memory form of one generated artifact: the text
//! content destined for a deterministic path derived from the owning
//! entity's identity and type. Plenaries are created when an entity
//! changes and destroyed once written or discarded.
//!
//! A [`PlenaryCollection`] is the unit of materialization: an ordered,
//! de-duplicated set of plenaries that must be written together under one
//! lock token.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::locks::PathToken;

/// The domain entity an artifact belongs to
///
/// Target paths and error labels both derive from this, and the pipeline's
/// soft/hard failure classifier runs against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EntityRef {
    Host { hostname: String },
    Cluster { name: String },
    MetaCluster { name: String },
    Personality { archetype: String, name: String },
    ServiceInstance { service: String, instance: String },
    Network { name: String },
}

impl EntityRef {
    /// Artifact path relative to the plenary root
    ///
    /// Deterministic per entity: re-deriving the path for the same entity
    /// always yields the same result, so stale artifacts can be found and
    /// removed when an entity moves.
    pub fn rel_path(&self) -> PathBuf {
        match self {
            EntityRef::Host { hostname } => {
                PathBuf::from(format!("hosts/{hostname}.tpl"))
            }
            EntityRef::Cluster { name } => {
                PathBuf::from(format!("clusters/{name}.tpl"))
            }
            EntityRef::MetaCluster { name } => {
                PathBuf::from(format!("clusters/meta/{name}.tpl"))
            }
            EntityRef::Personality { archetype, name } => {
                PathBuf::from(format!("personality/{archetype}/{name}/config.tpl"))
            }
            EntityRef::ServiceInstance { service, instance } => {
                PathBuf::from(format!("service/{service}/{instance}/srvconfig.tpl"))
            }
            EntityRef::Network { name } => {
                PathBuf::from(format!("network/{name}.tpl"))
            }
        }
    }

    /// Display label, e.g. `host/web01.example.com`
    pub fn label(&self) -> String {
        match self {
            EntityRef::Host { hostname } => format!("host/{hostname}"),
            EntityRef::Cluster { name } => format!("cluster/{name}"),
            EntityRef::MetaCluster { name } => format!("metacluster/{name}"),
            EntityRef::Personality { archetype, name } => {
                format!("personality/{archetype}/{name}")
            }
            EntityRef::ServiceInstance { service, instance } => {
                format!("service/{service}/{instance}")
            }
            EntityRef::Network { name } => format!("network/{name}"),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One generated artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plenary {
    /// Owning entity
    pub entity: EntityRef,

    /// Rendered text content
    pub content: String,

    /// Artifacts owned by this one (e.g. a cluster's member snippets),
    /// expanded by [`PlenaryCollection::flatten`]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sub: Vec<Plenary>,
}

impl Plenary {
    /// Create a plenary for an entity
    pub fn new(entity: EntityRef, content: impl Into<String>) -> Self {
        Self {
            entity,
            content: content.into(),
            sub: Vec::new(),
        }
    }

    /// Attach owned sub-plenaries
    pub fn with_sub(mut self, sub: Vec<Plenary>) -> Self {
        self.sub = sub;
        self
    }

    /// Artifact path relative to the plenary root
    pub fn rel_path(&self) -> PathBuf {
        self.entity.rel_path()
    }
}

/// An ordered, de-duplicated set of plenaries written as one unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlenaryCollection {
    plenaries: Vec<Plenary>,
}

impl PlenaryCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plenary; a plenary targeting an already-present path is
    /// silently skipped
    pub fn append(&mut self, plenary: Plenary) {
        let path = plenary.rel_path();
        if self.plenaries.iter().any(|p| p.rel_path() == path) {
            return;
        }
        self.plenaries.push(plenary);
    }

    /// Extend with many plenaries
    pub fn extend<I: IntoIterator<Item = Plenary>>(&mut self, plenaries: I) {
        for p in plenaries {
            self.append(p);
        }
    }

    /// The plenaries, sub-plenaries expanded, still de-duplicated by path
    pub fn flatten(&self) -> Vec<Plenary> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<&Plenary> = self.plenaries.iter().rev().collect();
        while let Some(p) = stack.pop() {
            if seen.insert(p.rel_path()) {
                let mut flat = p.clone();
                flat.sub = Vec::new();
                out.push(flat);
            }
            for s in p.sub.iter().rev() {
                stack.push(s);
            }
        }
        out
    }

    /// Derive the single lock token covering every target path
    pub fn key(&self, root: &Path) -> PathToken {
        PathToken::from_paths(self.flatten().iter().map(|p| root.join(p.rel_path())))
    }

    /// Number of top-level plenaries
    pub fn len(&self) -> usize {
        self.plenaries.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.plenaries.is_empty()
    }

    /// Iterate over the top-level plenaries
    pub fn iter(&self) -> impl Iterator<Item = &Plenary> {
        self.plenaries.iter()
    }
}
