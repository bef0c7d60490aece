//! Role records and the backing store interface

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A stored role. `privileges` mixes role paths and raw privileges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privileges: Vec<String>,
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Role { id: id.into(), name: name.into(), description: None, privileges: Vec::new() }
    }

    pub fn with_privileges<I, S>(mut self, privileges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privileges = privileges.into_iter().map(Into::into).collect();
        self
    }
}

/// Context passed along with a save; carries the re-verification token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveContext {
    pub access: String,
}

impl SaveContext {
    pub fn new(access: impl Into<String>) -> Self {
        SaveContext { access: access.into() }
    }
}

/// Backing store for roles
pub trait RoleStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Role>>;

    /// Insert or replace. The context is passed through, not validated.
    fn save(&self, role: &Role, ctx: &SaveContext) -> Result<()>;

    fn delete(&self, id: &str) -> Result<bool>;

    /// All roles ordered by id
    fn list(&self) -> Result<Vec<Role>>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    roles: Mutex<BTreeMap<String, Role>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Role>> {
        self.roles.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl RoleStore for MemoryRoleStore {
    fn get(&self, id: &str) -> Result<Option<Role>> {
        Ok(self.lock().get(id).cloned())
    }

    fn save(&self, role: &Role, _ctx: &SaveContext) -> Result<()> {
        self.lock().insert(role.id.clone(), role.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.lock().remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<Role>> {
        Ok(self.lock().values().cloned().collect())
    }
}
