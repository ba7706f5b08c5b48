// Copyright (c) 2025 - Cowboy AI, Inc.
//! Location Topology Domain Model
//!
//! Defines the ordered vocabulary of location types (company down to desk)
//! and the location tree that every consumer, network, and service mapping
//! hangs off. The tree owns the nodes, enforces parent-type constraints and
//! acyclicity, and keeps each node's ancestor chain cached so resolution
//! never has to walk pointers at query time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Identifier for a location node
pub type LocationId = Uuid;

/// Location validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// Location id not present in the tree
    #[error("Location {0} not found")]
    NotFound(LocationId),

    /// A node's type does not permit the given parent type
    #[error("A {child} may not be parented under a {parent}")]
    InvalidParentKind {
        child: LocationType,
        parent: LocationType,
    },

    /// Only the root type may omit a parent
    #[error("A {0} requires a parent location")]
    MissingParent(LocationType),

    /// Re-parenting would create a cycle
    #[error("Moving {child} under {parent} would create a cycle")]
    CycleDetected {
        child: LocationId,
        parent: LocationId,
    },

    /// (type, name) pairs are unique within a tree
    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: LocationType, name: String },
}

/// Ordered location type vocabulary
///
/// Variants are declared most-general first; the declaration order is the
/// hierarchy order, which is why the enum derives `Ord`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    /// Root of the tree; exactly one per tree
    Company,
    /// Regional hub
    Hub,
    Continent,
    Country,
    /// A grouping of nearby cities/buildings treated as one site
    Campus,
    City,
    Building,
    Room,
    Rack,
    Desk,
}

impl LocationType {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Hub => "hub",
            Self::Continent => "continent",
            Self::Country => "country",
            Self::Campus => "campus",
            Self::City => "city",
            Self::Building => "building",
            Self::Room => "room",
            Self::Rack => "rack",
            Self::Desk => "desk",
        }
    }

    /// Location types allowed as this type's parent
    ///
    /// An empty slice means the type is the tree root.
    pub fn allowed_parents(&self) -> &'static [LocationType] {
        use LocationType::*;
        match self {
            Company => &[],
            Hub => &[Company],
            Continent => &[Hub],
            Country => &[Continent],
            Campus => &[Country, Continent],
            City => &[Country, Campus],
            Building => &[City, Campus],
            Room => &[Building],
            Rack => &[Building, Room],
            Desk => &[Rack, Room],
        }
    }

    /// Whether this type is the tree root
    pub fn is_root(&self) -> bool {
        self.allowed_parents().is_empty()
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single node in the location tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationNode {
    /// Node identity (immutable)
    pub id: LocationId,

    /// Position in the type vocabulary
    pub kind: LocationType,

    /// Name, unique per (kind, name) within the tree
    pub name: String,

    /// Parent node; None only for the root
    pub parent: Option<LocationId>,

    /// Cached ancestor ids ordered root -> immediate parent
    pub ancestors: Vec<LocationId>,
}

impl LocationNode {
    /// Full chain from root to this node, leaf last
    pub fn chain(&self) -> Vec<LocationId> {
        let mut chain = self.ancestors.clone();
        chain.push(self.id);
        chain
    }
}

/// The location tree
///
/// All structural mutation goes through the tree so the per-node ancestor
/// caches stay consistent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationTree {
    nodes: HashMap<LocationId, LocationNode>,
}

impl LocationTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new node under the given parent
    ///
    /// # Invariants
    /// - Only the root type may omit a parent
    /// - The parent's type must be allowed for the child's type
    /// - (kind, name) must be unique within the tree
    pub fn insert(
        &mut self,
        kind: LocationType,
        name: impl Into<String>,
        parent: Option<LocationId>,
    ) -> Result<LocationId, LocationError> {
        let name = name.into();

        if self
            .nodes
            .values()
            .any(|n| n.kind == kind && n.name == name)
        {
            return Err(LocationError::DuplicateName { kind, name });
        }

        let ancestors = match parent {
            None => {
                if !kind.is_root() {
                    return Err(LocationError::MissingParent(kind));
                }
                Vec::new()
            }
            Some(parent_id) => {
                let parent_node = self
                    .nodes
                    .get(&parent_id)
                    .ok_or(LocationError::NotFound(parent_id))?;
                if !kind.allowed_parents().contains(&parent_node.kind) {
                    return Err(LocationError::InvalidParentKind {
                        child: kind,
                        parent: parent_node.kind,
                    });
                }
                let mut ancestors = parent_node.ancestors.clone();
                ancestors.push(parent_id);
                ancestors
            }
        };

        let id = Uuid::now_v7();
        self.nodes.insert(
            id,
            LocationNode {
                id,
                kind,
                name,
                parent,
                ancestors,
            },
        );
        Ok(id)
    }

    /// Look up a node
    pub fn get(&self, id: LocationId) -> Result<&LocationNode, LocationError> {
        self.nodes.get(&id).ok_or(LocationError::NotFound(id))
    }

    /// Find a node by type and name
    pub fn find(&self, kind: LocationType, name: &str) -> Option<&LocationNode> {
        self.nodes
            .values()
            .find(|n| n.kind == kind && n.name == name)
    }

    /// Chain from root to the given node, leaf last
    pub fn chain(&self, id: LocationId) -> Result<Vec<LocationId>, LocationError> {
        Ok(self.get(id)?.chain())
    }

    /// All descendants of the given node, in no particular order
    pub fn offspring(&self, id: LocationId) -> Vec<LocationId> {
        self.nodes
            .values()
            .filter(|n| n.ancestors.contains(&id))
            .map(|n| n.id)
            .collect()
    }

    /// Nearest ancestor (or self) of the given type
    pub fn ancestor_of_kind(
        &self,
        id: LocationId,
        kind: LocationType,
    ) -> Result<Option<LocationId>, LocationError> {
        let node = self.get(id)?;
        if node.kind == kind {
            return Ok(Some(node.id));
        }
        // Ancestors run root -> parent, so scan from the leaf end.
        for anc in node.ancestors.iter().rev() {
            if self.get(*anc)?.kind == kind {
                return Ok(Some(*anc));
            }
        }
        Ok(None)
    }

    /// The building containing the given node, if any
    ///
    /// Capacity accounting groups contributions per building.
    pub fn building_of(&self, id: LocationId) -> Result<Option<LocationId>, LocationError> {
        self.ancestor_of_kind(id, LocationType::Building)
    }

    /// Re-parent a node, refreshing ancestor caches for the whole subtree
    ///
    /// # Invariants
    /// - The new parent's type must be allowed for the node's type
    /// - The new parent may not be the node itself or one of its descendants
    pub fn update_parent(
        &mut self,
        id: LocationId,
        new_parent: LocationId,
    ) -> Result<(), LocationError> {
        let kind = self.get(id)?.kind;
        let parent_node = self.get(new_parent)?;

        if !kind.allowed_parents().contains(&parent_node.kind) {
            return Err(LocationError::InvalidParentKind {
                child: kind,
                parent: parent_node.kind,
            });
        }
        if new_parent == id || parent_node.ancestors.contains(&id) {
            return Err(LocationError::CycleDetected {
                child: id,
                parent: new_parent,
            });
        }

        let mut new_ancestors = parent_node.ancestors.clone();
        new_ancestors.push(new_parent);

        let offspring = self.offspring(id);
        {
            let node = self.nodes.get_mut(&id).ok_or(LocationError::NotFound(id))?;
            node.parent = Some(new_parent);
            node.ancestors = new_ancestors;
        }

        // Descendant caches are rebuilt by walking each parent chain against
        // the already-updated nodes; offspring are processed shallowest-first
        // so every parent is fresh before its children.
        let mut pending: Vec<LocationId> = offspring;
        pending.sort_by_key(|child| self.get(*child).map(|n| n.ancestors.len()).unwrap_or(0));
        for child in pending {
            let Some(parent) = self.get(child)?.parent else {
                continue;
            };
            let mut ancestors = self.get(parent)?.ancestors.clone();
            ancestors.push(parent);
            self.nodes
                .get_mut(&child)
                .ok_or(LocationError::NotFound(child))?
                .ancestors = ancestors;
        }

        Ok(())
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sample_tree() -> (LocationTree, LocationId, LocationId, LocationId) {
        let mut tree = LocationTree::new();
        let company = tree.insert(LocationType::Company, "ms", None).unwrap();
        let hub = tree.insert(LocationType::Hub, "ny", Some(company)).unwrap();
        let continent = tree
            .insert(LocationType::Continent, "na", Some(hub))
            .unwrap();
        let country = tree
            .insert(LocationType::Country, "us", Some(continent))
            .unwrap();
        let city = tree.insert(LocationType::City, "nyc", Some(country)).unwrap();
        let building = tree
            .insert(LocationType::Building, "hq", Some(city))
            .unwrap();
        let rack = tree
            .insert(LocationType::Rack, "r42", Some(building))
            .unwrap();
        (tree, country, building, rack)
    }

    #[test]
    fn test_chain_runs_root_to_leaf() {
        let (tree, _, building, rack) = sample_tree();
        let chain = tree.chain(rack).unwrap();
        assert_eq!(chain.len(), 7);
        assert_eq!(*chain.last().unwrap(), rack);
        assert_eq!(chain[chain.len() - 2], building);
    }

    #[test_case(LocationType::Rack, LocationType::City ; "rack under city")]
    #[test_case(LocationType::Building, LocationType::Country ; "building under country")]
    #[test_case(LocationType::Desk, LocationType::Building ; "desk under building")]
    fn test_invalid_parent_kinds(child: LocationType, parent: LocationType) {
        assert!(!child.allowed_parents().contains(&parent));
    }

    #[test]
    fn test_insert_rejects_bad_parent_kind() {
        let (mut tree, country, _, _) = sample_tree();
        let err = tree
            .insert(LocationType::Rack, "bad", Some(country))
            .unwrap_err();
        assert!(matches!(err, LocationError::InvalidParentKind { .. }));
    }

    #[test]
    fn test_non_root_requires_parent() {
        let mut tree = LocationTree::new();
        let err = tree.insert(LocationType::City, "nyc", None).unwrap_err();
        assert_eq!(err, LocationError::MissingParent(LocationType::City));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut tree, country, _, _) = sample_tree();
        let err = tree
            .insert(LocationType::City, "nyc", Some(country))
            .unwrap_err();
        assert!(matches!(err, LocationError::DuplicateName { .. }));
    }

    #[test]
    fn test_building_of_walks_up() {
        let (tree, country, building, rack) = sample_tree();
        assert_eq!(tree.building_of(rack).unwrap(), Some(building));
        assert_eq!(tree.building_of(building).unwrap(), Some(building));
        assert_eq!(tree.building_of(country).unwrap(), None);
    }

    #[test]
    fn test_update_parent_refreshes_subtree() {
        let (mut tree, country, _, rack) = sample_tree();
        let city2 = tree
            .insert(LocationType::City, "jc", Some(country))
            .unwrap();
        let building2 = tree
            .insert(LocationType::Building, "annex", Some(city2))
            .unwrap();

        tree.update_parent(rack, building2).unwrap();

        let chain = tree.chain(rack).unwrap();
        assert!(chain.contains(&city2));
        assert!(chain.contains(&building2));
        assert_eq!(tree.building_of(rack).unwrap(), Some(building2));
    }

    #[test]
    fn test_update_parent_rejects_cycle() {
        let (mut tree, _, building, _) = sample_tree();
        let room = tree
            .insert(LocationType::Room, "101", Some(building))
            .unwrap();
        let rack2 = tree.insert(LocationType::Rack, "r1", Some(room)).unwrap();

        // A room cannot move under a rack by type, so exercise the cycle
        // check with a rack chain: rack2 -> itself.
        let err = tree.update_parent(rack2, rack2).unwrap_err();
        assert!(matches!(err, LocationError::CycleDetected { .. }));
    }

    #[test]
    fn test_offspring() {
        let (tree, country, building, rack) = sample_tree();
        let offspring = tree.offspring(country);
        assert!(offspring.contains(&building));
        assert!(offspring.contains(&rack));
        assert!(!offspring.contains(&country));
    }
}
