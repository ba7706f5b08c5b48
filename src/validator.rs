// Copyright (c) 2025 - Cowboy AI, Inc.
//! Membership and Capacity Validation
//!
//! Pure checks run before any artifact is generated: whether a candidate
//! may join a group, and whether a metacluster's declared capacity still
//! covers its usage under the high-availability policy.
//!
//! # The N-1 capacity rule
//!
//! Capacity contributions are accumulated per building (members sharing a
//! building are summed together). With high availability enabled, the
//! single largest per-building total is dropped for every resource - the
//! group must still satisfy its current load if its largest contributing
//! building disappears. Usage is summed with no building grouping, since
//! load is assumed redistributable.
//!
//! Validation is skipped entirely when the policy is disabled; enumerating
//! every member's capacity is not free.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::domain::{
    Cluster, Host, LocationError, LocationId, LocationTree, MetaCluster, Personality,
};

/// Membership or capacity rule violation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The group declares a personality allow-list and the candidate's
    /// personality is not on it
    #[error("Personality is not allowed in this group")]
    PersonalityNotAllowed,

    /// Candidate and group are on different branches or sandbox authors
    #[error("Candidate branch '{candidate}' does not match group branch '{group}'")]
    BranchMismatch { candidate: String, group: String },

    /// The candidate cluster already belongs to a metacluster
    #[error("Cluster '{0}' is already a member of a metacluster")]
    AlreadyInMetaCluster(String),

    /// Declared member ceiling reached
    #[error("Group is full: limit of {limit} members reached")]
    TooManyMembers { limit: u32 },

    /// Guaranteed capacity cannot cover current usage
    #[error("Capacity exceeded for '{resource}': wanted {wanted}, limit {limit}")]
    CapacityExceeded {
        resource: String,
        wanted: u64,
        limit: u64,
    },

    /// A cluster-required personality on a standalone host
    #[error("Personality '{0}' requires cluster membership")]
    ClusterRequired(String),

    /// Location tree fault while grouping by building
    #[error(transparent)]
    Location(#[from] LocationError),
}

/// Check whether a host may join a cluster
pub fn validate_host_membership(
    cluster: &Cluster,
    candidate: &Host,
) -> Result<(), ValidationError> {
    if !cluster.allowed_personalities.is_empty()
        && !cluster.allowed_personalities.contains(&candidate.personality)
    {
        return Err(ValidationError::PersonalityNotAllowed);
    }

    if candidate.branch != cluster.branch {
        return Err(ValidationError::BranchMismatch {
            candidate: candidate.branch.name().to_string(),
            group: cluster.branch.name().to_string(),
        });
    }

    if let Some(limit) = cluster.max_members {
        if cluster.members.len() as u32 >= limit {
            return Err(ValidationError::TooManyMembers { limit });
        }
    }

    Ok(())
}

/// Check whether a cluster may join a metacluster
///
/// Metaclusters cannot nest, so a candidate already owned by one is
/// rejected outright.
pub fn validate_cluster_membership(
    meta: &MetaCluster,
    candidate: &Cluster,
) -> Result<(), ValidationError> {
    if !meta.allowed_personalities.is_empty()
        && !meta.allowed_personalities.contains(&candidate.personality)
    {
        return Err(ValidationError::PersonalityNotAllowed);
    }

    if candidate.metacluster.is_some() {
        return Err(ValidationError::AlreadyInMetaCluster(candidate.name.clone()));
    }

    if candidate.branch != meta.branch {
        return Err(ValidationError::BranchMismatch {
            candidate: candidate.branch.name().to_string(),
            group: meta.branch.name().to_string(),
        });
    }

    if let Some(limit) = meta.max_clusters {
        if meta.members.len() as u32 >= limit {
            return Err(ValidationError::TooManyMembers { limit });
        }
    }

    Ok(())
}

/// Check a personality's cluster-membership requirement
pub fn validate_personality(
    personality: &Personality,
    in_cluster: bool,
) -> Result<(), ValidationError> {
    if personality.cluster_required && !in_cluster {
        return Err(ValidationError::ClusterRequired(personality.name.clone()));
    }
    Ok(())
}

/// Guaranteed per-resource capacity of a metacluster
///
/// Accumulates member capacity per building, then sums the per-building
/// totals for each resource, dropping the single largest total when the
/// high-availability policy is enabled.
pub fn total_capacity(
    meta: &MetaCluster,
    members: &[&Cluster],
    tree: &LocationTree,
) -> Result<HashMap<String, u64>, ValidationError> {
    // Key: owning building (None for members outside any building).
    let mut building_capacity: HashMap<Option<LocationId>, HashMap<String, u64>> =
        HashMap::new();

    for cluster in members {
        let building = tree.building_of(cluster.location)?;
        let slot = building_capacity.entry(building).or_default();
        for (resource, value) in &cluster.capacity {
            *slot.entry(resource.clone()).or_insert(0) += value;
        }
    }

    // Per-resource list of per-building totals.
    let mut resmap: HashMap<String, Vec<u64>> = HashMap::new();
    for per_building in building_capacity.values() {
        for (resource, value) in per_building {
            resmap.entry(resource.clone()).or_default().push(*value);
        }
    }

    let mut guaranteed = HashMap::new();
    for (resource, mut values) in resmap {
        values.sort_unstable();
        if meta.high_availability {
            values.pop();
        }
        guaranteed.insert(resource, values.iter().sum());
    }
    Ok(guaranteed)
}

/// Total per-resource usage of a metacluster's members
///
/// No building grouping: usage is assumed redistributable.
pub fn total_usage(members: &[&Cluster]) -> HashMap<String, u64> {
    let mut usage: HashMap<String, u64> = HashMap::new();
    for cluster in members {
        for (resource, value) in &cluster.usage {
            *usage.entry(resource.clone()).or_insert(0) += value;
        }
    }
    usage
}

/// Validate a metacluster's capacity under its availability policy
///
/// Skipped entirely when high availability is disabled. Resources absent
/// from the capacity map are unconstrained.
pub fn validate_capacity(
    meta: &MetaCluster,
    members: &[&Cluster],
    tree: &LocationTree,
) -> Result<(), ValidationError> {
    if !meta.high_availability {
        debug!("Skipping capacity validation for '{}': HA disabled", meta.name);
        return Ok(());
    }

    let capacity = total_capacity(meta, members, tree)?;
    let usage = total_usage(members);

    // Deterministic reporting order.
    let mut resources: Vec<&String> = usage.keys().collect();
    resources.sort();

    for resource in resources {
        let wanted = usage[resource];
        if let Some(&limit) = capacity.get(resource) {
            if wanted > limit {
                return Err(ValidationError::CapacityExceeded {
                    resource: resource.clone(),
                    wanted,
                    limit,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Archetype, Branch, Hostname, LocationType};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn tree_with_buildings(n: usize) -> (LocationTree, Vec<LocationId>) {
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
        let buildings = (0..n)
            .map(|i| {
                tree.insert(LocationType::Building, format!("b{i}"), Some(city))
                    .unwrap()
            })
            .collect();
        (tree, buildings)
    }

    fn cluster_at(name: &str, location: LocationId, slots: u64) -> Cluster {
        let mut cluster = Cluster::new(
            name,
            location,
            Uuid::now_v7(),
            Branch::domain("prod"),
        );
        cluster.set_capacity("slots", slots);
        cluster
    }

    fn meta_ha() -> MetaCluster {
        MetaCluster::new(
            "wide",
            Uuid::now_v7(),
            Uuid::now_v7(),
            Branch::domain("prod"),
        )
        .with_high_availability()
    }

    #[test]
    fn test_ha_drops_largest_building() {
        let (tree, buildings) = tree_with_buildings(3);
        let a = cluster_at("a", buildings[0], 10);
        let b = cluster_at("b", buildings[1], 20);
        let c = cluster_at("c", buildings[2], 30);
        let meta = meta_ha();

        let capacity = total_capacity(&meta, &[&a, &b, &c], &tree).unwrap();
        assert_eq!(capacity["slots"], 30); // 10 + 20, largest dropped
    }

    #[test]
    fn test_usage_over_guaranteed_capacity_fails() {
        let (tree, buildings) = tree_with_buildings(3);
        let a = cluster_at("a", buildings[0], 10);
        let b = cluster_at("b", buildings[1], 20);
        let mut c = cluster_at("c", buildings[2], 30);
        c.set_usage("slots", 31);
        let meta = meta_ha();

        let err = validate_capacity(&meta, &[&a, &b, &c], &tree).unwrap_err();
        assert_eq!(
            err,
            ValidationError::CapacityExceeded {
                resource: "slots".to_string(),
                wanted: 31,
                limit: 30,
            }
        );
    }

    #[test]
    fn test_usage_at_guaranteed_capacity_passes() {
        let (tree, buildings) = tree_with_buildings(3);
        let a = cluster_at("a", buildings[0], 10);
        let b = cluster_at("b", buildings[1], 20);
        let mut c = cluster_at("c", buildings[2], 30);
        c.set_usage("slots", 30);
        let meta = meta_ha();

        assert!(validate_capacity(&meta, &[&a, &b, &c], &tree).is_ok());
    }

    #[test]
    fn test_members_in_same_building_are_summed() {
        let (tree, buildings) = tree_with_buildings(2);
        // Two clusters in building 0 (total 25), one in building 1 (30).
        let a = cluster_at("a", buildings[0], 10);
        let b = cluster_at("b", buildings[0], 15);
        let c = cluster_at("c", buildings[1], 30);
        let meta = meta_ha();

        let capacity = total_capacity(&meta, &[&a, &b, &c], &tree).unwrap();
        // Largest per-building total (30) dropped, leaving 25.
        assert_eq!(capacity["slots"], 25);
    }

    #[test]
    fn test_capacity_validation_skipped_without_ha() {
        let (tree, buildings) = tree_with_buildings(1);
        let mut a = cluster_at("a", buildings[0], 1);
        a.set_usage("slots", 1000);
        let mut meta = meta_ha();
        meta.high_availability = false;

        assert!(validate_capacity(&meta, &[&a], &tree).is_ok());
    }

    #[test]
    fn test_untracked_resources_unconstrained() {
        let (tree, buildings) = tree_with_buildings(2);
        let a = cluster_at("a", buildings[0], 10);
        let mut b = cluster_at("b", buildings[1], 20);
        b.set_usage("memory", 999_999);
        let meta = meta_ha();

        assert!(validate_capacity(&meta, &[&a, &b], &tree).is_ok());
    }

    #[test]
    fn test_host_membership_allow_list() {
        let personality = Uuid::now_v7();
        let mut cluster = Cluster::new(
            "grid",
            Uuid::now_v7(),
            Uuid::now_v7(),
            Branch::domain("prod"),
        );
        cluster.allowed_personalities.insert(personality);

        let ok = Host::new(
            Hostname::new("n1.example.com").unwrap(),
            cluster.location,
            personality,
            Branch::domain("prod"),
        );
        assert!(validate_host_membership(&cluster, &ok).is_ok());

        let wrong = Host::new(
            Hostname::new("n2.example.com").unwrap(),
            cluster.location,
            Uuid::now_v7(),
            Branch::domain("prod"),
        );
        assert_eq!(
            validate_host_membership(&cluster, &wrong),
            Err(ValidationError::PersonalityNotAllowed)
        );
    }

    #[test]
    fn test_host_membership_branch_and_author() {
        let cluster = Cluster::new(
            "grid",
            Uuid::now_v7(),
            Uuid::now_v7(),
            Branch::sandbox("feature-x", "alice"),
        );

        let other_author = Host::new(
            Hostname::new("n1.example.com").unwrap(),
            cluster.location,
            cluster.personality,
            Branch::sandbox("feature-x", "bob"),
        );
        assert!(matches!(
            validate_host_membership(&cluster, &other_author),
            Err(ValidationError::BranchMismatch { .. })
        ));
    }

    #[test]
    fn test_host_membership_ceiling() {
        let mut cluster = Cluster::new(
            "grid",
            Uuid::now_v7(),
            Uuid::now_v7(),
            Branch::domain("prod"),
        );
        cluster.max_members = Some(1);
        cluster.members.insert(Uuid::now_v7());

        let candidate = Host::new(
            Hostname::new("n1.example.com").unwrap(),
            cluster.location,
            cluster.personality,
            Branch::domain("prod"),
        );
        assert_eq!(
            validate_host_membership(&cluster, &candidate),
            Err(ValidationError::TooManyMembers { limit: 1 })
        );
    }

    #[test]
    fn test_cluster_membership_allow_list() {
        let personality = Uuid::now_v7();
        let mut meta = meta_ha();
        meta.allowed_personalities.insert(personality);

        let ok = Cluster::new(
            "grid",
            Uuid::now_v7(),
            personality,
            Branch::domain("prod"),
        );
        assert!(validate_cluster_membership(&meta, &ok).is_ok());

        let wrong = Cluster::new(
            "other",
            Uuid::now_v7(),
            Uuid::now_v7(),
            Branch::domain("prod"),
        );
        assert_eq!(
            validate_cluster_membership(&meta, &wrong),
            Err(ValidationError::PersonalityNotAllowed)
        );
    }

    #[test]
    fn test_no_metacluster_nesting() {
        let meta = meta_ha();
        let mut cluster = Cluster::new(
            "grid",
            Uuid::now_v7(),
            Uuid::now_v7(),
            Branch::domain("prod"),
        );
        cluster.metacluster = Some(Uuid::now_v7());

        assert!(matches!(
            validate_cluster_membership(&meta, &cluster),
            Err(ValidationError::AlreadyInMetaCluster(_))
        ));
    }

    #[test]
    fn test_metacluster_ceiling() {
        let mut meta = meta_ha();
        meta.max_clusters = Some(2);
        meta.members.insert(Uuid::now_v7());
        meta.members.insert(Uuid::now_v7());

        let cluster = Cluster::new(
            "grid",
            Uuid::now_v7(),
            Uuid::now_v7(),
            Branch::domain("prod"),
        );
        assert_eq!(
            validate_cluster_membership(&meta, &cluster),
            Err(ValidationError::TooManyMembers { limit: 2 })
        );
    }

    #[test]
    fn test_cluster_required_personality() {
        let archetype = Archetype::new("vmhost", true);
        let personality =
            Personality::new("esx-node", &archetype).with_cluster_required();

        assert!(validate_personality(&personality, true).is_ok());
        assert!(matches!(
            validate_personality(&personality, false),
            Err(ValidationError::ClusterRequired(_))
        ));
    }
}
