// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Domain Model
//!
//! Networks have a lifecycle independent of the location tree: many
//! networks may sit in the same building, and a network may exist with no
//! location at all. Service mappings scoped to a network always outrank
//! location-scoped mappings during resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::location::LocationId;

/// Identifier for a network
pub type NetworkId = Uuid;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4, 0-128 for IPv6)")]
    InvalidPrefixLength(u8),
}

/// Address block value object (network address + prefix length)
///
/// Invariants:
/// - Valid IP address format
/// - Prefix length within range for the IP version
///
/// # Examples
///
/// ```rust
/// use fleet_broker::domain::AddressBlock;
///
/// let block = AddressBlock::new("10.1.4.0/24").unwrap();
/// assert!(block.contains("10.1.4.17".parse().unwrap()));
/// assert!(!block.contains("10.1.5.1".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressBlock {
    address: IpAddr,
    prefix_length: u8,
}

impl AddressBlock {
    /// Create a new address block from CIDR notation
    ///
    /// # Invariants
    /// - Valid IP address format
    /// - Prefix length 0-32 for IPv4, 0-128 for IPv6
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();

        let Some((addr_str, prefix_str)) = cidr.split_once('/') else {
            return Err(NetworkError::InvalidCidr(cidr.to_string()));
        };

        let address = IpAddr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        // Invariant: Validate prefix length based on IP version
        let max_prefix = match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_length > max_prefix {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        Ok(Self {
            address,
            prefix_length,
        })
    }

    /// Get the network address
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Get the prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Check whether an address falls inside this block
    ///
    /// Addresses of the other IP version never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.address, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let bits = u32::from(self.prefix_length);
                if bits == 0 {
                    return true;
                }
                let mask = u32::MAX << (32 - bits);
                (u32::from(net) & mask) == (u32::from(ip) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let bits = u32::from(self.prefix_length);
                if bits == 0 {
                    return true;
                }
                let mask = u128::MAX << (128 - bits);
                (u128::from(net) & mask) == (u128::from(ip) & mask)
            }
            _ => false,
        }
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix_length)
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for AddressBlock {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A network block known to the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Network identity (immutable)
    pub id: NetworkId,

    /// Human-readable name
    pub name: String,

    /// The address block this network covers
    pub block: AddressBlock,

    /// Environment tag (e.g. prod, qa, dev)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Owning location, if the network is tied to one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationId>,
}

impl Network {
    /// Create a new network
    pub fn new(name: impl Into<String>, block: AddressBlock) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            block,
            environment: None,
            location: None,
        }
    }

    /// Tie the network to a location
    pub fn with_location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }

    /// Tag the network with an environment
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}
