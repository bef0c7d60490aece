//! Mapping entries: roles and the privileges they imply
//!
//! An entry groups the roles of one admin area under a key:
//!
//! ```text
//! key "system", category additional_permissions
//!   clear_cache -> privileges [system:clear:cache], dependencies []
//! ```
//!
//! Roles are addressed by their path `"key.role"` (`system.clear_cache`).

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::ROLE_SEPARATOR;
use crate::error::{PrivmapError, Result};

/// Where a mapping entry shows up in the role editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Per-module viewer/editor/creator/deleter grid
    Permissions,
    /// Free-standing extra permissions
    AdditionalPermissions,
}

/// Privileges and dependencies of one role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    #[serde(default)]
    pub privileges: Vec<String>,
    /// Role paths ("key.role") this role pulls in
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl RoleDefinition {
    pub fn new<P, D>(privileges: P, dependencies: D) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        RoleDefinition {
            privileges: privileges.into_iter().map(Into::into).collect(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }
}

/// Roles of an entry, kept in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roles(Vec<(String, RoleDefinition)>);

impl Roles {
    pub fn get(&self, name: &str) -> Option<&RoleDefinition> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Insert or replace; returns the replaced definition
    pub fn insert(&mut self, name: impl Into<String>, def: RoleDefinition) -> Option<RoleDefinition> {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, def)),
            None => {
                self.0.push((name, def));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoleDefinition)> {
        self.0.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, RoleDefinition)> for Roles {
    fn from_iter<I: IntoIterator<Item = (N, RoleDefinition)>>(iter: I) -> Self {
        let mut roles = Roles::default();
        for (n, d) in iter {
            roles.insert(n, d);
        }
        roles
    }
}

impl Serialize for Roles {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (n, d) in &self.0 {
            map.serialize_entry(n, d)?;
        }
        map.end()
    }
}

// JSON objects are read in document order so registration order survives
impl<'de> Deserialize<'de> for Roles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RolesVisitor;

        impl<'de> Visitor<'de> for RolesVisitor {
            type Value = Roles;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of role name to role definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Roles, A::Error> {
                let mut roles = Roles::default();
                while let Some((name, def)) = access.next_entry::<String, RoleDefinition>()? {
                    roles.insert(name, def);
                }
                Ok(roles)
            }
        }

        deserializer.deserialize_map(RolesVisitor)
    }
}

/// A mapping entry as contributed by a feature module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeMappingEntry {
    pub category: Category,
    #[serde(default)]
    pub parent: Option<String>,
    pub key: String,
    #[serde(default)]
    pub roles: Roles,
}

impl PrivilegeMappingEntry {
    pub fn new(category: Category, key: impl Into<String>) -> Self {
        PrivilegeMappingEntry { category, parent: None, key: key.into(), roles: Roles::default() }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_role(mut self, name: impl Into<String>, def: RoleDefinition) -> Self {
        self.roles.insert(name, def);
        self
    }

    /// Full paths of this entry's roles
    pub fn role_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.roles.names().map(move |r| format!("{}{}{}", self.key, ROLE_SEPARATOR, r))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_segment("key", &self.key)?;
        for name in self.roles.names() {
            validate_segment("role name", name)?;
        }
        if let Some(p) = &self.parent {
            validate_segment("parent", p)?;
        }
        Ok(())
    }
}

fn validate_segment(what: &str, s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(PrivmapError::InvalidEntry(format!("{} cannot be empty", what)));
    }
    if s.contains(ROLE_SEPARATOR) {
        return Err(PrivmapError::InvalidEntry(format!("{} '{}' contains '{}'", what, s, ROLE_SEPARATOR)));
    }
    Ok(())
}

/// Borrowed view of a role path: `key.role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RolePath<'a> {
    pub key: &'a str,
    pub role: &'a str,
}

impl<'a> RolePath<'a> {
    /// Split at the first separator. Raw privileges like `system:clear:cache`
    /// have none and yield `None`.
    pub fn parse(path: &'a str) -> Option<Self> {
        let (key, role) = path.split_once(ROLE_SEPARATOR)?;
        if key.is_empty() || role.is_empty() {
            return None;
        }
        Some(RolePath { key, role })
    }
}

impl fmt::Display for RolePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, ROLE_SEPARATOR, self.role)
    }
}
