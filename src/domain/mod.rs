// Copyright (c) 2025 - Cowboy AI, Inc.
//! Fleet Broker Domain Models
//!
//! The model of the managed estate: the location tree, network blocks,
//! services and their instances, mapping rules, personalities, and the
//! consumers (hosts, clusters, metaclusters) that configuration is resolved
//! for.
//!
//! # Value Objects with Invariants
//!
//! - [`Hostname`] - DNS-validated hostnames (RFC 1123)
//! - [`AddressBlock`] - IPv4/IPv6 network block with prefix validation
//! - [`LocationType`] - ordered location vocabulary with parent constraints
//! - [`MapScope`] - location-xor-network rule scope
//!
//! # Entities
//!
//! - [`LocationNode`] / [`LocationTree`] - the location hierarchy
//! - [`Network`] - independent network blocks
//! - [`Service`] / [`ServiceInstance`] - capabilities and deployments
//! - [`ServiceMapping`] - resolution rules
//! - [`Archetype`] / [`Personality`] - configuration profiles
//! - [`Host`] / [`Cluster`] / [`MetaCluster`] - consumers

pub mod consumer;
pub mod hostname;
pub mod location;
pub mod network;
pub mod personality;
pub mod service;
pub mod service_map;

pub use consumer::{
    Branch, Cluster, ClusterId, Consumer, Host, HostId, MetaCluster, MetaClusterId,
};
pub use hostname::{Hostname, HostnameError};
pub use location::{
    LocationError, LocationId, LocationNode, LocationTree, LocationType,
};
pub use network::{AddressBlock, Network, NetworkError, NetworkId};
pub use personality::{Archetype, ArchetypeId, Personality, PersonalityId};
pub use service::{Service, ServiceId, ServiceInstance, ServiceInstanceId};
pub use service_map::{MapScope, ServiceMapping, ServiceMappingId};
