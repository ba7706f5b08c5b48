// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Map Resolver
//!
//! Given a consumer's location chain, optional network, optional
//! personality, and a set of requested services, picks the most specific
//! applicable service instance per service.
//!
//! # Resolution order
//!
//! 1. Each location in the chain gets a priority equal to its distance from
//!    the leaf (leaf = 0). A supplied network gets priority −1, so a
//!    network-scoped rule always beats any location-scoped rule.
//! 2. Personality-scoped rules are processed first; generic rules are only
//!    consulted for services the personality pass left unresolved. A
//!    personality rule therefore wins over a generic rule regardless of
//!    relative scope specificity.
//! 3. Within a pass, a strictly better priority replaces the candidate
//!    list; an equal priority appends. Exact ties are returned together and
//!    never broken here - callers choose.
//!
//! Services with no matching rule are absent from the result map. The
//! resolver never fails on missing bindings; whether an unmapped required
//! service is fatal is the caller's policy.
//!
//! The core is a pure function over rule slices; [`ServiceMapResolver`]
//! feeds it from [`ConfigStore`] queries.

use std::collections::HashMap;

use futures::future::try_join_all;
use tracing::debug;

use crate::domain::{
    LocationId, LocationTree, MapScope, NetworkId, PersonalityId, ServiceId,
    ServiceInstanceId,
};
use crate::errors::BrokerResult;
use crate::store::{ConfigStore, MappingFilter};

/// A mapping rule joined with its instance's owning service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCandidate {
    /// Service the rule's instance belongs to
    pub service: ServiceId,
    /// The offered instance
    pub instance: ServiceInstanceId,
    /// Where the rule applies
    pub scope: MapScope,
}

/// Resolved bindings: service name -> equally-specific candidate instances
pub type ResolvedMap = HashMap<String, Vec<ServiceInstanceId>>;

/// Pure resolution core over pre-fetched rule slices
///
/// `chain` runs root to leaf. `personality_pass` may be empty when the
/// consumer has no personality-scoped rules. Returns candidates keyed by
/// service id; absent key = unmapped.
pub fn resolve_mapped_instances(
    chain: &[LocationId],
    network: Option<NetworkId>,
    personality_pass: &[RuleCandidate],
    generic_pass: &[RuleCandidate],
) -> HashMap<ServiceId, Vec<ServiceInstanceId>> {
    // Priority = distance from the leaf; lower wins.
    let mut loc_priorities: HashMap<LocationId, i64> = HashMap::new();
    for (distance, loc) in chain.iter().rev().enumerate() {
        loc_priorities.insert(*loc, distance as i64);
    }

    const NETWORK_PRIORITY: i64 = -1;

    let mut results: HashMap<ServiceId, Vec<ServiceInstanceId>> = HashMap::new();
    let mut best: HashMap<ServiceId, i64> = HashMap::new();

    for pass in [personality_pass, generic_pass] {
        // A later pass never revisits services an earlier pass resolved.
        let settled: Vec<ServiceId> = results.keys().copied().collect();

        for rule in pass {
            if settled.contains(&rule.service) {
                continue;
            }

            let priority = match rule.scope {
                MapScope::Network(net) if Some(net) == network => NETWORK_PRIORITY,
                MapScope::Network(_) => continue,
                MapScope::Location(loc) => match loc_priorities.get(&loc) {
                    Some(p) => *p,
                    None => continue,
                },
            };

            let current = best.get(&rule.service).copied().unwrap_or(i64::MAX);
            if priority < current {
                results.insert(rule.service, vec![rule.instance]);
                best.insert(rule.service, priority);
            } else if priority == current {
                results.entry(rule.service).or_default().push(rule.instance);
            }
        }
    }

    results
}

/// Store-backed resolver
pub struct ServiceMapResolver<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> ServiceMapResolver<'a> {
    /// Create a resolver over a store
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self { store }
    }

    /// Resolve the requested services for a consumer
    ///
    /// Unknown service names abort with a not-found error; services that
    /// exist but have no applicable rule are simply absent from the result.
    pub async fn resolve(
        &self,
        tree: &LocationTree,
        location: LocationId,
        requested: &[&str],
        personality: Option<PersonalityId>,
        network: Option<NetworkId>,
    ) -> BrokerResult<ResolvedMap> {
        let chain = tree.chain(location)?;

        let mut names: HashMap<ServiceId, String> = HashMap::new();
        for name in requested {
            let service = self.store.service_by_name(name).await?;
            names.insert(service.id, service.name);
        }
        let service_ids: Vec<ServiceId> = names.keys().copied().collect();

        let personality_pass = match personality {
            Some(p) => {
                self.candidates(&service_ids, &chain, network, Some(p))
                    .await?
            }
            None => Vec::new(),
        };
        let generic_pass = self.candidates(&service_ids, &chain, network, None).await?;

        let by_service =
            resolve_mapped_instances(&chain, network, &personality_pass, &generic_pass);

        debug!(
            "Resolved {} of {} requested services",
            by_service.len(),
            service_ids.len()
        );

        let mut resolved = ResolvedMap::new();
        for (service, instances) in by_service {
            if let Some(name) = names.get(&service) {
                resolved.insert(name.clone(), instances);
            }
        }
        Ok(resolved)
    }

    /// Pick one instance from a set of equally-specific candidates
    ///
    /// The canonical tie-break is least-loaded: lowest current client
    /// count wins. Returns None for an empty candidate list.
    pub async fn choose_single(
        &self,
        candidates: &[ServiceInstanceId],
    ) -> BrokerResult<Option<ServiceInstanceId>> {
        let mut chosen: Option<(u32, ServiceInstanceId)> = None;
        for id in candidates {
            let instance = self.store.instance(*id).await?;
            let better = match chosen {
                None => true,
                Some((count, _)) => instance.client_count < count,
            };
            if better {
                chosen = Some((instance.client_count, *id));
            }
        }
        Ok(chosen.map(|(_, id)| id))
    }

    async fn candidates(
        &self,
        services: &[ServiceId],
        chain: &[LocationId],
        network: Option<NetworkId>,
        personality: Option<PersonalityId>,
    ) -> BrokerResult<Vec<RuleCandidate>> {
        let mappings = self
            .store
            .mappings(&MappingFilter {
                services: services.to_vec(),
                locations: chain.to_vec(),
                network,
                personality,
            })
            .await?;

        let instances =
            try_join_all(mappings.iter().map(|m| self.store.instance(m.instance))).await?;

        Ok(mappings
            .iter()
            .zip(instances)
            .map(|(mapping, instance)| RuleCandidate {
                service: instance.service,
                instance: mapping.instance,
                scope: mapping.scope,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn chain_of(len: usize) -> Vec<LocationId> {
        (0..len).map(|_| Uuid::now_v7()).collect()
    }

    fn rule(service: ServiceId, scope: MapScope) -> RuleCandidate {
        RuleCandidate {
            service,
            instance: Uuid::now_v7(),
            scope,
        }
    }

    #[test]
    fn test_more_specific_location_wins() {
        let chain = chain_of(4);
        let service = Uuid::now_v7();

        let at_root = rule(service, MapScope::Location(chain[0]));
        let at_leaf = rule(service, MapScope::Location(chain[3]));

        let resolved =
            resolve_mapped_instances(&chain, None, &[], &[at_root, at_leaf]);
        assert_eq!(resolved[&service], vec![at_leaf.instance]);

        // Order of the rule slice must not matter.
        let resolved =
            resolve_mapped_instances(&chain, None, &[], &[at_leaf, at_root]);
        assert_eq!(resolved[&service], vec![at_leaf.instance]);
    }

    #[test]
    fn test_network_beats_any_location() {
        let chain = chain_of(3);
        let network = Uuid::now_v7();
        let service = Uuid::now_v7();

        let at_leaf = rule(service, MapScope::Location(chain[2]));
        let on_net = rule(service, MapScope::Network(network));

        let resolved =
            resolve_mapped_instances(&chain, Some(network), &[], &[at_leaf, on_net]);
        assert_eq!(resolved[&service], vec![on_net.instance]);
    }

    #[test]
    fn test_other_networks_ignored() {
        let chain = chain_of(2);
        let service = Uuid::now_v7();

        let other_net = rule(service, MapScope::Network(Uuid::now_v7()));
        let at_leaf = rule(service, MapScope::Location(chain[1]));

        let resolved = resolve_mapped_instances(
            &chain,
            Some(Uuid::now_v7()),
            &[],
            &[other_net, at_leaf],
        );
        assert_eq!(resolved[&service], vec![at_leaf.instance]);
    }

    #[test]
    fn test_personality_pass_wins_regardless_of_specificity() {
        let chain = chain_of(4);
        let service = Uuid::now_v7();

        // The personality rule sits at the root, the generic rule at the
        // leaf; personality still wins.
        let scoped = rule(service, MapScope::Location(chain[0]));
        let generic = rule(service, MapScope::Location(chain[3]));

        let resolved = resolve_mapped_instances(&chain, None, &[scoped], &[generic]);
        assert_eq!(resolved[&service], vec![scoped.instance]);
    }

    #[test]
    fn test_exact_ties_return_all_candidates() {
        let chain = chain_of(3);
        let service = Uuid::now_v7();

        let a = rule(service, MapScope::Location(chain[2]));
        let b = rule(service, MapScope::Location(chain[2]));

        let resolved = resolve_mapped_instances(&chain, None, &[], &[a, b]);
        let candidates = &resolved[&service];
        assert_eq!(candidates.len(), 2);
        assert!(candidates.contains(&a.instance));
        assert!(candidates.contains(&b.instance));
    }

    #[test]
    fn test_unmapped_service_absent() {
        let chain = chain_of(2);
        let mapped = Uuid::now_v7();
        let unmapped = Uuid::now_v7();

        let only_rule = rule(mapped, MapScope::Location(chain[1]));
        let resolved = resolve_mapped_instances(&chain, None, &[], &[only_rule]);

        assert!(resolved.contains_key(&mapped));
        assert!(!resolved.contains_key(&unmapped));
    }

    #[test]
    fn test_generic_pass_fills_services_personality_missed() {
        let chain = chain_of(2);
        let covered = Uuid::now_v7();
        let uncovered = Uuid::now_v7();

        let scoped = rule(covered, MapScope::Location(chain[0]));
        let generic_covered = rule(covered, MapScope::Location(chain[1]));
        let generic_uncovered = rule(uncovered, MapScope::Location(chain[1]));

        let resolved = resolve_mapped_instances(
            &chain,
            None,
            &[scoped],
            &[generic_covered, generic_uncovered],
        );

        assert_eq!(resolved[&covered], vec![scoped.instance]);
        assert_eq!(resolved[&uncovered], vec![generic_uncovered.instance]);
    }
}
