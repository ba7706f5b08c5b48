// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory configuration store
//!
//! Backs tests and embedded deployments. All tables live behind one RwLock
//! so a query sees one consistent snapshot; `flush` is a no-op because
//! writes are immediately visible.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{
    Host, HostId, Network, NetworkId, Personality, PersonalityId, Service, ServiceId,
    ServiceInstance, ServiceInstanceId, ServiceMapping, ServiceMappingId,
};
use crate::errors::{BrokerError, BrokerResult};

use super::{ConfigStore, MappingFilter};

#[derive(Debug, Default)]
struct Tables {
    services: HashMap<ServiceId, Service>,
    instances: HashMap<ServiceInstanceId, ServiceInstance>,
    personalities: HashMap<PersonalityId, Personality>,
    networks: HashMap<NetworkId, Network>,
    hosts: HashMap<HostId, Host>,
    mappings: HashMap<ServiceMappingId, ServiceMapping>,
}

/// In-memory [`ConfigStore`] implementation
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for InMemoryStore {
    async fn service_by_name(&self, name: &str) -> BrokerResult<Service> {
        let tables = self.tables.read().await;
        tables
            .services
            .values()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| BrokerError::not_found("service", name))
    }

    async fn instance(&self, id: ServiceInstanceId) -> BrokerResult<ServiceInstance> {
        let tables = self.tables.read().await;
        tables
            .instances
            .get(&id)
            .cloned()
            .ok_or_else(|| BrokerError::not_found("service instance", id.to_string()))
    }

    async fn instances_of(&self, service: ServiceId) -> BrokerResult<Vec<ServiceInstance>> {
        let tables = self.tables.read().await;
        Ok(tables
            .instances
            .values()
            .filter(|i| i.service == service)
            .cloned()
            .collect())
    }

    async fn personality_by_name(&self, name: &str) -> BrokerResult<Personality> {
        let tables = self.tables.read().await;
        tables
            .personalities
            .values()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| BrokerError::not_found("personality", name))
    }

    async fn network(&self, id: NetworkId) -> BrokerResult<Network> {
        let tables = self.tables.read().await;
        tables
            .networks
            .get(&id)
            .cloned()
            .ok_or_else(|| BrokerError::not_found("network", id.to_string()))
    }

    async fn host(&self, id: HostId) -> BrokerResult<Host> {
        let tables = self.tables.read().await;
        tables
            .hosts
            .get(&id)
            .cloned()
            .ok_or_else(|| BrokerError::not_found("host", id.to_string()))
    }

    async fn mappings(&self, filter: &MappingFilter) -> BrokerResult<Vec<ServiceMapping>> {
        let tables = self.tables.read().await;

        let matches = tables
            .mappings
            .values()
            .filter(|m| m.personality == filter.personality)
            .filter(|m| {
                let Some(instance) = tables.instances.get(&m.instance) else {
                    return false;
                };
                filter.services.contains(&instance.service)
            })
            .filter(|m| {
                if let Some(loc) = m.scope.location() {
                    return filter.locations.contains(&loc);
                }
                match (m.scope.network(), filter.network) {
                    (Some(rule_net), Some(query_net)) => rule_net == query_net,
                    _ => false,
                }
            })
            .cloned()
            .collect();

        Ok(matches)
    }

    async fn put_service(&self, service: Service) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .services
            .values()
            .any(|s| s.name == service.name && s.id != service.id)
        {
            return Err(BrokerError::ConstraintViolation(format!(
                "service '{}' already exists",
                service.name
            )));
        }
        tables.services.insert(service.id, service);
        Ok(())
    }

    async fn put_instance(&self, instance: ServiceInstance) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.services.contains_key(&instance.service) {
            return Err(BrokerError::not_found(
                "service",
                instance.service.to_string(),
            ));
        }
        if tables.instances.values().any(|i| {
            i.service == instance.service && i.name == instance.name && i.id != instance.id
        }) {
            return Err(BrokerError::ConstraintViolation(format!(
                "service instance '{}' already exists for this service",
                instance.name
            )));
        }
        tables.instances.insert(instance.id, instance);
        Ok(())
    }

    async fn put_personality(&self, personality: Personality) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .personalities
            .values()
            .any(|p| p.name == personality.name && p.id != personality.id)
        {
            return Err(BrokerError::ConstraintViolation(format!(
                "personality '{}' already exists",
                personality.name
            )));
        }
        tables.personalities.insert(personality.id, personality);
        Ok(())
    }

    async fn delete_personality(&self, id: PersonalityId) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;
        let in_use = tables.hosts.values().filter(|h| h.personality == id).count();
        if in_use > 0 {
            return Err(BrokerError::ConstraintViolation(format!(
                "personality is still referenced by {in_use} host(s)"
            )));
        }
        tables
            .personalities
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BrokerError::not_found("personality", id.to_string()))
    }

    async fn put_network(&self, network: Network) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;
        tables.networks.insert(network.id, network);
        Ok(())
    }

    async fn put_host(&self, host: Host) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;
        tables.hosts.insert(host.id, host);
        Ok(())
    }

    async fn put_mapping(&self, mapping: ServiceMapping) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.instances.contains_key(&mapping.instance) {
            return Err(BrokerError::not_found(
                "service instance",
                mapping.instance.to_string(),
            ));
        }
        tables.mappings.insert(mapping.id, mapping);
        Ok(())
    }

    async fn bind_client(&self, host: HostId, instance: ServiceInstanceId) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;

        let service_id = tables
            .instances
            .get(&instance)
            .map(|i| i.service)
            .ok_or_else(|| BrokerError::not_found("service instance", instance.to_string()))?;
        let service = tables
            .services
            .get(&service_id)
            .cloned()
            .ok_or_else(|| BrokerError::not_found("service", service_id.to_string()))?;

        {
            let inst = tables
                .instances
                .get_mut(&instance)
                .ok_or_else(|| BrokerError::not_found("service instance", instance.to_string()))?;
            if !inst.has_capacity(&service) {
                return Err(BrokerError::ConstraintViolation(format!(
                    "service instance '{}' is at its maximum client count",
                    inst.name
                )));
            }
            inst.client_count += 1;
        }

        let host_rec = tables
            .hosts
            .get_mut(&host)
            .ok_or_else(|| BrokerError::not_found("host", host.to_string()))?;
        host_rec.bindings.insert(instance);

        debug!("Bound host {} to instance {}", host, instance);
        Ok(())
    }

    async fn unbind_client(
        &self,
        host: HostId,
        instance: ServiceInstanceId,
    ) -> BrokerResult<()> {
        let mut tables = self.tables.write().await;

        let host_rec = tables
            .hosts
            .get_mut(&host)
            .ok_or_else(|| BrokerError::not_found("host", host.to_string()))?;
        if !host_rec.bindings.remove(&instance) {
            return Err(BrokerError::ConstraintViolation(
                "host is not bound to this instance".to_string(),
            ));
        }

        if let Some(inst) = tables.instances.get_mut(&instance) {
            inst.client_count = inst.client_count.saturating_sub(1);
        }

        debug!("Unbound host {} from instance {}", host, instance);
        Ok(())
    }

    async fn flush(&self) -> BrokerResult<()> {
        // Writes are immediately visible; nothing is buffered.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Branch, Hostname, MapScope};
    use uuid::Uuid;

    async fn store_with_service() -> (InMemoryStore, Service, ServiceInstance) {
        let store = InMemoryStore::new();
        let service = Service::new("dns").with_max_clients(1);
        let instance = ServiceInstance::new(&service, "ny-prod");
        store.put_service(service.clone()).await.unwrap();
        store.put_instance(instance.clone()).await.unwrap();
        (store, service, instance)
    }

    fn host(personality: PersonalityId) -> Host {
        Host::new(
            Hostname::new("web01.example.com").unwrap(),
            Uuid::now_v7(),
            personality,
            Branch::domain("prod"),
        )
    }

    #[tokio::test]
    async fn test_service_name_uniqueness() {
        let (store, _, _) = store_with_service().await;
        let err = store.put_service(Service::new("dns")).await.unwrap_err();
        assert!(matches!(err, BrokerError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_instance_name_unique_per_service() {
        let (store, service, _) = store_with_service().await;
        let dup = ServiceInstance::new(&service, "ny-prod");
        assert!(store.put_instance(dup).await.is_err());

        // Same instance name under a different service is fine.
        let other = Service::new("ntp");
        store.put_service(other.clone()).await.unwrap();
        let ok = ServiceInstance::new(&other, "ny-prod");
        assert!(store.put_instance(ok).await.is_ok());
    }

    #[tokio::test]
    async fn test_bind_enforces_max_clients() {
        let (store, _, instance) = store_with_service().await;

        let h1 = host(Uuid::now_v7());
        let h2 = host(Uuid::now_v7());
        store.put_host(h1.clone()).await.unwrap();
        store.put_host(h2.clone()).await.unwrap();

        store.bind_client(h1.id, instance.id).await.unwrap();
        let err = store.bind_client(h2.id, instance.id).await.unwrap_err();
        assert!(matches!(err, BrokerError::ConstraintViolation(_)));

        // Unbinding frees the slot again.
        store.unbind_client(h1.id, instance.id).await.unwrap();
        store.bind_client(h2.id, instance.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_personality_in_use() {
        let (store, _, _) = store_with_service().await;
        let archetype = crate::domain::Archetype::new("aquilon", true);
        let personality = Personality::new("webserver", &archetype);
        store.put_personality(personality.clone()).await.unwrap();

        let h = host(personality.id);
        store.put_host(h.clone()).await.unwrap();

        let err = store.delete_personality(personality.id).await.unwrap_err();
        assert!(matches!(err, BrokerError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_mapping_filter_separates_passes() {
        let (store, service, instance) = store_with_service().await;
        let personality = Uuid::now_v7();
        let loc = Uuid::now_v7();

        store
            .put_mapping(ServiceMapping::new(instance.id, MapScope::Location(loc)))
            .await
            .unwrap();
        store
            .put_mapping(ServiceMapping::for_personality(
                instance.id,
                MapScope::Location(loc),
                personality,
            ))
            .await
            .unwrap();

        let generic = store
            .mappings(&MappingFilter {
                services: vec![service.id],
                locations: vec![loc],
                network: None,
                personality: None,
            })
            .await
            .unwrap();
        assert_eq!(generic.len(), 1);
        assert!(!generic[0].is_personality_scoped());

        let scoped = store
            .mappings(&MappingFilter {
                services: vec![service.id],
                locations: vec![loc],
                network: None,
                personality: Some(personality),
            })
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert!(scoped[0].is_personality_scoped());
    }
}
