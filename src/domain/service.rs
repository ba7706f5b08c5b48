// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service and Service Instance Domain Model
//!
//! A `Service` is an abstract named capability (dns, ntp, syslog); a
//! `ServiceInstance` is a concrete deployment of it that consumers bind to.
//! Instance names are unique per service. Client-count ceilings live on
//! either level: the instance override wins, otherwise the service default
//! applies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a service
pub type ServiceId = Uuid;

/// Identifier for a service instance
pub type ServiceInstanceId = Uuid;

/// An abstract named capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service identity (immutable)
    pub id: ServiceId,

    /// Unique service name
    pub name: String,

    /// Default maximum client count for instances of this service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_clients: Option<u32>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Service {
    /// Create a new service
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            max_clients: None,
            created_at: Utc::now(),
        }
    }

    /// Set the default maximum client count
    pub fn with_max_clients(mut self, max_clients: u32) -> Self {
        self.max_clients = Some(max_clients);
        self
    }
}

/// A concrete deployment of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Instance identity (immutable)
    pub id: ServiceInstanceId,

    /// Owning service
    pub service: ServiceId,

    /// Instance name, unique within the owning service
    pub name: String,

    /// Maximum client count override; None inherits the service default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_clients: Option<u32>,

    /// Number of consumers currently bound to this instance
    ///
    /// Maintained by the store as bindings change.
    pub client_count: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ServiceInstance {
    /// Create a new instance of a service
    pub fn new(service: &Service, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            service: service.id,
            name: name.into(),
            max_clients: None,
            client_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Override the maximum client count
    pub fn with_max_clients(mut self, max_clients: u32) -> Self {
        self.max_clients = Some(max_clients);
        self
    }

    /// The effective maximum client count: instance override, else the
    /// service default, else unlimited
    pub fn enforced_max_clients(&self, service: &Service) -> Option<u32> {
        self.max_clients.or(service.max_clients)
    }

    /// Whether another client may bind to this instance
    pub fn has_capacity(&self, service: &Service) -> bool {
        match self.enforced_max_clients(service) {
            Some(max) => self.client_count < max,
            None => true,
        }
    }

    /// Qualified name for display and artifact paths
    pub fn qualified_name(&self, service: &Service) -> String {
        format!("{}/{}", service.name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_clients_inheritance() {
        let service = Service::new("dns").with_max_clients(100);
        let inherit = ServiceInstance::new(&service, "ny-prod");
        let overridden = ServiceInstance::new(&service, "ny-qa").with_max_clients(5);

        assert_eq!(inherit.enforced_max_clients(&service), Some(100));
        assert_eq!(overridden.enforced_max_clients(&service), Some(5));
    }

    #[test]
    fn test_no_ceiling_means_unlimited() {
        let service = Service::new("syslog");
        let instance = ServiceInstance::new(&service, "anywhere");
        assert_eq!(instance.enforced_max_clients(&service), None);
        assert!(instance.has_capacity(&service));
    }

    #[test]
    fn test_has_capacity_at_limit() {
        let service = Service::new("dns");
        let mut instance = ServiceInstance::new(&service, "small").with_max_clients(2);
        assert!(instance.has_capacity(&service));
        instance.client_count = 2;
        assert!(!instance.has_capacity(&service));
    }

    #[test]
    fn test_qualified_name() {
        let service = Service::new("ntp");
        let instance = ServiceInstance::new(&service, "pool1");
        assert_eq!(instance.qualified_name(&service), "ntp/pool1");
    }
}
