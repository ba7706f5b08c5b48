// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hostname Value Object with DNS Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hostname validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostnameError {
    #[error("Hostname is empty")]
    Empty,

    #[error("Hostname exceeds maximum length of 253 characters: {0}")]
    TooLong(usize),

    #[error("Label exceeds maximum length of 63 characters: {0}")]
    LabelTooLong(String),

    #[error("Invalid character in hostname: {0}")]
    InvalidCharacter(char),

    #[error("Label cannot start or end with hyphen: {0}")]
    InvalidLabelFormat(String),
}

/// Fully qualified hostname value object
///
/// A valid DNS hostname following RFC 1123:
/// - Total length ≤ 253 characters
/// - Each label ≤ 63 characters, alphanumeric and hyphens only
/// - Labels cannot start or end with hyphens
///
/// # Examples
///
/// ```rust
/// use fleet_broker::domain::Hostname;
///
/// let host = Hostname::new("web01.ny.example.com").unwrap();
/// assert_eq!(host.short(), "web01");
///
/// assert!(Hostname::new("").is_err());
/// assert!(Hostname::new("-invalid.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hostname(String);

impl Hostname {
    /// Maximum total length for FQDN (RFC 1123)
    pub const MAX_LENGTH: usize = 253;

    /// Maximum length for a single label (RFC 1123)
    pub const MAX_LABEL_LENGTH: usize = 63;

    /// Create a new hostname with validation
    pub fn new(hostname: impl Into<String>) -> Result<Self, HostnameError> {
        let hostname = hostname.into();

        if hostname.is_empty() {
            return Err(HostnameError::Empty);
        }
        if hostname.len() > Self::MAX_LENGTH {
            return Err(HostnameError::TooLong(hostname.len()));
        }

        for label in hostname.split('.') {
            Self::validate_label(label)?;
        }

        Ok(Self(hostname))
    }

    fn validate_label(label: &str) -> Result<(), HostnameError> {
        if label.is_empty() {
            return Err(HostnameError::Empty);
        }
        if label.len() > Self::MAX_LABEL_LENGTH {
            return Err(HostnameError::LabelTooLong(label.to_string()));
        }
        for ch in label.chars() {
            if !ch.is_ascii_alphanumeric() && ch != '-' {
                return Err(HostnameError::InvalidCharacter(ch));
            }
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(HostnameError::InvalidLabelFormat(label.to_string()));
        }
        Ok(())
    }

    /// Get the hostname as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first label (the unqualified host name)
    pub fn short(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_hostnames() {
        assert!(Hostname::new("localhost").is_ok());
        assert!(Hostname::new("web01.example.com").is_ok());
        assert!(Hostname::new("a-b-c.x-y-z.net").is_ok());
    }

    #[test]
    fn test_invalid_hostnames() {
        assert!(Hostname::new("").is_err());
        assert!(Hostname::new("-bad.com").is_err());
        assert!(Hostname::new("bad-.com").is_err());
        assert!(Hostname::new("under_score.com").is_err());
        assert!(Hostname::new("double..dot").is_err());
        assert!(Hostname::new("x".repeat(254)).is_err());
    }

    #[test]
    fn test_short_name() {
        let host = Hostname::new("web01.ny.example.com").unwrap();
        assert_eq!(host.short(), "web01");

        let bare = Hostname::new("standalone").unwrap();
        assert_eq!(bare.short(), "standalone");
    }
}
