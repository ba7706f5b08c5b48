// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration Store Abstraction
//!
//! The broker reads and writes its model through this trait rather than a
//! concrete database. Implementations must provide the filtered reads the
//! resolver depends on (ancestry membership, network equality, personality
//! identity) and a flush boundary the caller can treat as a consistent
//! read point.
//!
//! # Architecture
//!
//! ```text
//! Command → Resolver/Validator → ConfigStore (reads)
//!                    ↓
//!           PlenaryCollection → MaterializationPipeline (writes)
//! ```
//!
//! The in-memory implementation backs tests and embedded use; a relational
//! implementation lives behind the same trait in production deployments.

use async_trait::async_trait;

use crate::domain::{
    Host, HostId, LocationId, Network, NetworkId, Personality, PersonalityId, Service,
    ServiceId, ServiceInstance, ServiceInstanceId, ServiceMapping,
};
use crate::errors::BrokerResult;

pub mod memory;

pub use memory::InMemoryStore;

/// Filter for mapping-rule queries
///
/// `personality: Some(..)` selects only rules scoped to that personality;
/// `None` selects only generic rules. A rule matches when its scope names a
/// location in `locations` or the network in `network`.
#[derive(Debug, Clone, Default)]
pub struct MappingFilter {
    /// Restrict to rules for these services
    pub services: Vec<ServiceId>,
    /// Location ids the consumer's chain covers
    pub locations: Vec<LocationId>,
    /// The consumer's network, if any
    pub network: Option<NetworkId>,
    /// Personality scoping; None = generic rules only
    pub personality: Option<PersonalityId>,
}

/// Transactional read/write access to the broker's model
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Look up a service by its unique name
    async fn service_by_name(&self, name: &str) -> BrokerResult<Service>;

    /// Look up a service instance by id
    async fn instance(&self, id: ServiceInstanceId) -> BrokerResult<ServiceInstance>;

    /// All instances of a service
    async fn instances_of(&self, service: ServiceId) -> BrokerResult<Vec<ServiceInstance>>;

    /// Look up a personality by its unique name
    async fn personality_by_name(&self, name: &str) -> BrokerResult<Personality>;

    /// Look up a network by id
    async fn network(&self, id: NetworkId) -> BrokerResult<Network>;

    /// Look up a host by id
    async fn host(&self, id: HostId) -> BrokerResult<Host>;

    /// Mapping rules matching the filter
    async fn mappings(&self, filter: &MappingFilter) -> BrokerResult<Vec<ServiceMapping>>;

    /// Register or update a service
    async fn put_service(&self, service: Service) -> BrokerResult<()>;

    /// Register or update a service instance
    ///
    /// Enforces (service, name) uniqueness.
    async fn put_instance(&self, instance: ServiceInstance) -> BrokerResult<()>;

    /// Register or update a personality
    async fn put_personality(&self, personality: Personality) -> BrokerResult<()>;

    /// Remove a personality
    ///
    /// Fails with a constraint violation while any host references it.
    async fn delete_personality(&self, id: PersonalityId) -> BrokerResult<()>;

    /// Register or update a network
    async fn put_network(&self, network: Network) -> BrokerResult<()>;

    /// Register or update a host
    async fn put_host(&self, host: Host) -> BrokerResult<()>;

    /// Register a mapping rule
    async fn put_mapping(&self, mapping: ServiceMapping) -> BrokerResult<()>;

    /// Bind a host to a service instance
    ///
    /// Enforces the instance's effective max-client ceiling and maintains
    /// its client count.
    async fn bind_client(&self, host: HostId, instance: ServiceInstanceId) -> BrokerResult<()>;

    /// Unbind a host from a service instance
    async fn unbind_client(&self, host: HostId, instance: ServiceInstanceId)
        -> BrokerResult<()>;

    /// Flush pending writes; reads after this observe a consistent model
    async fn flush(&self) -> BrokerResult<()>;
}
