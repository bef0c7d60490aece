//! Privilege mapping table
//!
//! Feature modules register their entries on a [`MappingTableBuilder`]
//! during startup. [`MappingTableBuilder::build`] validates parents and
//! freezes the result into a read-only [`PrivilegeMappingTable`].

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{PrivmapError, Result};
use crate::mapping::{PrivilegeMappingEntry, RoleDefinition, RolePath};

/// Collects mapping entries before the table is frozen
#[derive(Debug, Default)]
pub struct MappingTableBuilder {
    entries: Vec<PrivilegeMappingEntry>,
}

impl MappingTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry.
    ///
    /// A key seen before with the same category and parent has its roles
    /// merged in; a role of the same name is replaced. The same key with a
    /// different category or parent is rejected.
    pub fn add_entry(&mut self, entry: PrivilegeMappingEntry) -> Result<()> {
        entry.validate()?;

        let Some(existing) = self.entries.iter_mut().find(|e| e.key == entry.key) else {
            debug!(key = %entry.key, roles = entry.roles.len(), "registered mapping entry");
            self.entries.push(entry);
            return Ok(());
        };

        if existing.category != entry.category {
            return Err(PrivmapError::ConflictingEntry {
                key: entry.key,
                reason: format!("category {:?} differs from {:?}", entry.category, existing.category),
            });
        }
        if existing.parent != entry.parent {
            return Err(PrivmapError::ConflictingEntry {
                key: entry.key,
                reason: format!("parent {:?} differs from {:?}", entry.parent, existing.parent),
            });
        }

        for (name, def) in entry.roles.iter() {
            if existing.roles.insert(name, def.clone()).is_some() {
                warn!(key = %existing.key, role = name, "mapping role replaced by later registration");
            }
        }
        Ok(())
    }

    /// Register every entry of a JSON array
    pub fn add_entries_from_json(&mut self, json: &str) -> Result<usize> {
        let entries: Vec<PrivilegeMappingEntry> = serde_json::from_str(json)?;
        let n = entries.len();
        for e in entries {
            self.add_entry(e)?;
        }
        Ok(n)
    }

    /// Register entries from a JSON file
    pub fn add_entries_from_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        self.add_entries_from_json(&content)
    }

    /// Freeze the table. Every parent must name a registered key.
    pub fn build(self) -> Result<PrivilegeMappingTable> {
        let index: HashMap<String, usize> =
            self.entries.iter().enumerate().map(|(i, e)| (e.key.clone(), i)).collect();

        for e in &self.entries {
            if let Some(p) = &e.parent {
                if !index.contains_key(p) {
                    return Err(PrivmapError::UnknownParent { key: e.key.clone(), parent: p.clone() });
                }
            }
        }

        Ok(PrivilegeMappingTable { entries: self.entries, index })
    }
}

/// Frozen, read-only mapping table
#[derive(Debug, Default)]
pub struct PrivilegeMappingTable {
    entries: Vec<PrivilegeMappingEntry>,
    index: HashMap<String, usize>,
}

impl PrivilegeMappingTable {
    pub fn builder() -> MappingTableBuilder {
        MappingTableBuilder::new()
    }

    /// Entries in registration order
    pub fn entries(&self) -> &[PrivilegeMappingEntry] {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&PrivilegeMappingEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Look up a role by its path `"key.role"`
    pub fn role(&self, path: &str) -> Option<&RoleDefinition> {
        let p = RolePath::parse(path)?;
        self.entry(p.key)?.roles.get(p.role)
    }

    pub fn contains_role(&self, path: &str) -> bool {
        self.role(path).is_some()
    }

    /// Registration position of a role: `(entry index, role index)`
    pub fn position(&self, path: &str) -> Option<(usize, usize)> {
        let p = RolePath::parse(path)?;
        let &entry = self.index.get(p.key)?;
        let role = self.entries[entry].roles.iter().position(|(name, _)| name == p.role)?;
        Some((entry, role))
    }

    /// Every role path in registration order
    pub fn role_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().flat_map(|e| e.role_paths())
    }

    /// Direct children of a key
    pub fn children(&self, key: &str) -> impl Iterator<Item = &PrivilegeMappingEntry> + '_ {
        let key = key.to_string();
        self.entries.iter().filter(move |e| e.parent.as_deref() == Some(key.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
