use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{HostError, Result};

/// Environment keys of the form `EMAIL_PORT_<identity>` carry port assignments.
pub const ENV_PREFIX: &str = "EMAIL_PORT_";

static IDENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\S+$").unwrap());

/// The static identity -> port table.
///
/// Built once at startup and never mutated afterwards. Every identity owns
/// exactly one port and no port is shared between identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortAssignments {
    by_identity: BTreeMap<String, u16>,
}

impl PortAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from explicit pairs, rejecting malformed or duplicate entries.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u16)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (identity, port) in pairs {
            let identity = identity.into();
            if table.by_identity.contains_key(identity.trim()) {
                return Err(HostError::InvalidConfig(format!(
                    "identity '{}' is assigned more than once",
                    identity.trim()
                )));
            }
            table.insert(identity, port)?;
        }
        Ok(table)
    }

    /// Extract `EMAIL_PORT_<identity>=<port>` entries from a set of environment variables.
    ///
    /// Keys without the prefix are ignored.
    pub fn from_env_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs = Vec::new();
        for (key, value) in vars {
            let Some(identity) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let port = value.as_ref().trim().parse::<u16>().map_err(|_| {
                HostError::InvalidConfig(format!(
                    "{}: '{}' is not a valid port",
                    key.as_ref(),
                    value.as_ref()
                ))
            })?;
            pairs.push((identity.to_string(), port));
        }
        Self::from_pairs(pairs)
    }

    /// Combine two tables. The same mapping may appear in both; anything else
    /// that overlaps is a conflict.
    pub fn merge(mut self, other: Self) -> Result<Self> {
        for (identity, port) in other.by_identity {
            match self.by_identity.get(&identity) {
                Some(&existing) if existing == port => continue,
                Some(&existing) => {
                    return Err(HostError::InvalidConfig(format!(
                        "identity '{identity}' is assigned both port {existing} and port {port}"
                    )));
                }
                None => self.insert(identity, port)?,
            }
        }
        Ok(self)
    }

    pub fn port_for(&self, identity: &str) -> Option<u16> {
        self.by_identity.get(identity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.by_identity.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    fn insert(&mut self, identity: String, port: u16) -> Result<()> {
        let identity = identity.trim().to_string();
        if !IDENTITY_RE.is_match(&identity) {
            return Err(HostError::InvalidConfig(format!(
                "identity '{identity}' must be non-empty and contain no whitespace"
            )));
        }
        if port == 0 {
            return Err(HostError::InvalidConfig(format!(
                "identity '{identity}' cannot be assigned port 0"
            )));
        }
        if let Some((owner, _)) = self.by_identity.iter().find(|(_, &p)| p == port) {
            return Err(HostError::InvalidConfig(format!(
                "port {port} is assigned to both '{owner}' and '{identity}'"
            )));
        }
        self.by_identity.insert(identity, port);
        Ok(())
    }
}
