//! Student identity (email) normalization
//!
//! The email is the external key for a student. It is trimmed and lowercased
//! once at the edge so store lookups and live rooms agree on the same key.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized student email
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Parse and normalize a raw email string
    pub fn parse(raw: &str) -> Result<Self> {
        let email = raw.trim().to_lowercase();
        if email.is_empty() {
            return Err(Error::InvalidInput("email is required".to_string()));
        }

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(Self(email)),
            _ => Err(Error::InvalidInput(format!("invalid email: {}", raw.trim()))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the '@', used to derive a display name
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    /// True when `email` normalizes to this identity
    pub fn matches(&self, email: &str) -> bool {
        email.trim().eq_ignore_ascii_case(&self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Identity::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}
