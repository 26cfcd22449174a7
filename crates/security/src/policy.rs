//! Access policy: which roles may reach which resource.
//!
//! Role lists are data, not scattered literals: one [`AccessTable`] maps each
//! resource id to its [`AllowedRoles`], built and validated once at startup.

use propdesk_config::AccessConfig;
use propdesk_core::RoleSet;
use std::collections::BTreeMap;

/// A non-empty set of roles allowed through to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedRoles(RoleSet);

impl AllowedRoles {
    /// Wrap a role set. An empty set would make the resource unreachable.
    pub fn new(roles: RoleSet) -> Result<Self, AccessPolicyError> {
        if roles.is_empty() {
            return Err(AccessPolicyError::EmptyAllowedRoles {
                resource: "<unnamed>".into(),
            });
        }
        Ok(Self(roles))
    }

    pub fn from_labels<I, S>(labels: I) -> Result<Self, AccessPolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(RoleSet::from_labels(labels))
    }

    pub fn roles(&self) -> &RoleSet {
        &self.0
    }
}

/// Resource id → allowed roles.
#[derive(Debug, Clone, Default)]
pub struct AccessTable {
    resources: BTreeMap<String, AllowedRoles>,
}

impl AccessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource. Rejects an empty role list.
    pub fn insert<I, S>(&mut self, resource: impl Into<String>, labels: I) -> Result<(), AccessPolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resource = resource.into();
        let allowed = AllowedRoles::from_labels(labels).map_err(|_| {
            AccessPolicyError::EmptyAllowedRoles {
                resource: resource.clone(),
            }
        })?;
        self.resources.insert(resource, allowed);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<I, S>(mut self, resource: impl Into<String>, labels: I) -> Result<Self, AccessPolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(resource, labels)?;
        Ok(self)
    }

    /// Build the table from the `[access]` config section.
    pub fn from_config(config: &AccessConfig) -> Result<Self, AccessPolicyError> {
        let mut table = Self::new();
        for (resource, roles) in &config.resources {
            table.insert(resource.clone(), roles)?;
        }
        Ok(table)
    }

    pub fn get(&self, resource: &str) -> Result<&AllowedRoles, AccessPolicyError> {
        self.resources
            .get(resource)
            .ok_or_else(|| AccessPolicyError::UnknownResource(resource.to_string()))
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AllowedRoles)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Setup-time policy errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessPolicyError {
    #[error("Resource '{resource}' declares no allowed roles and would be unreachable")]
    EmptyAllowedRoles { resource: String },

    #[error("Resource '{0}' is not declared in the access table")]
    UnknownResource(String),
}
