// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Mapping Rules
//!
//! A mapping rule asserts that a service instance is a usable default for
//! consumers at a location or on a network, optionally restricted to one
//! personality. The scope is an enum so a rule bound to both a location and
//! a network (or neither) cannot be constructed at all.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::location::LocationId;
use super::network::NetworkId;
use super::personality::PersonalityId;
use super::service::ServiceInstanceId;

/// Identifier for a mapping rule
pub type ServiceMappingId = Uuid;

/// Where a mapping rule applies: a location subtree or one network
///
/// Network scopes always outrank location scopes during resolution, since
/// networks express physical placement independent of the organizational
/// hierarchy and exist to carve out exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapScope {
    Location(LocationId),
    Network(NetworkId),
}

impl MapScope {
    /// The location this scope names, if any
    pub fn location(&self) -> Option<LocationId> {
        match self {
            MapScope::Location(id) => Some(*id),
            MapScope::Network(_) => None,
        }
    }

    /// The network this scope names, if any
    pub fn network(&self) -> Option<NetworkId> {
        match self {
            MapScope::Network(id) => Some(*id),
            MapScope::Location(_) => None,
        }
    }
}

/// A rule binding a service instance to a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMapping {
    /// Rule identity (immutable)
    pub id: ServiceMappingId,

    /// The instance this rule offers
    pub instance: ServiceInstanceId,

    /// Where the rule applies
    pub scope: MapScope,

    /// If set, the rule only applies to consumers of this personality and
    /// is consulted before any generic rule for the same service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality: Option<PersonalityId>,
}

impl ServiceMapping {
    /// Create a generic mapping rule
    pub fn new(instance: ServiceInstanceId, scope: MapScope) -> Self {
        Self {
            id: Uuid::now_v7(),
            instance,
            scope,
            personality: None,
        }
    }

    /// Create a personality-scoped mapping rule
    pub fn for_personality(
        instance: ServiceInstanceId,
        scope: MapScope,
        personality: PersonalityId,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            instance,
            scope,
            personality: Some(personality),
        }
    }

    /// Whether this rule is restricted to a personality
    pub fn is_personality_scoped(&self) -> bool {
        self.personality.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_accessors() {
        let loc = Uuid::now_v7();
        let net = Uuid::now_v7();

        let by_location = MapScope::Location(loc);
        assert_eq!(by_location.location(), Some(loc));
        assert_eq!(by_location.network(), None);

        let by_network = MapScope::Network(net);
        assert_eq!(by_network.location(), None);
        assert_eq!(by_network.network(), Some(net));
    }

    #[test]
    fn test_personality_scoping() {
        let instance = Uuid::now_v7();
        let personality = Uuid::now_v7();
        let scope = MapScope::Location(Uuid::now_v7());

        assert!(!ServiceMapping::new(instance, scope).is_personality_scoped());
        assert!(
            ServiceMapping::for_personality(instance, scope, personality)
                .is_personality_scoped()
        );
    }
}
