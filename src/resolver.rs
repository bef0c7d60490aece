//! Role <-> privilege resolution over a frozen mapping table

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::constants::{required_privileges, ROLE_SEPARATOR};
use crate::registry::PrivilegeMappingTable;

/// Resolves role selections against a mapping table.
///
/// Cheap to clone; the table is shared.
#[derive(Debug, Clone)]
pub struct PrivilegeResolver {
    table: Arc<PrivilegeMappingTable>,
    required: Vec<String>,
}

impl PrivilegeResolver {
    /// Resolver with the default required privileges
    pub fn new(table: Arc<PrivilegeMappingTable>) -> Self {
        Self::with_required(table, &[])
    }

    /// Resolver with extra required privileges on top of the defaults
    pub fn with_required(table: Arc<PrivilegeMappingTable>, extra: &[String]) -> Self {
        PrivilegeResolver { table, required: required_privileges(extra) }
    }

    pub fn table(&self) -> &PrivilegeMappingTable {
        &self.table
    }

    pub fn required_privileges(&self) -> &[String] {
        &self.required
    }

    /// Roles visible as selected for a stored privilege list.
    ///
    /// A role is selected when its path is stored, or when it declares
    /// privileges and all of them are stored. Raw privilege strings never
    /// appear in the result. Output follows registration order.
    pub fn filter_selected_roles<I, S>(&self, raw: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<S> = raw.into_iter().collect();
        let have: HashSet<&str> = raw.iter().map(|s| s.as_ref()).collect();

        let mut out = Vec::new();
        for entry in self.table.entries() {
            for (name, def) in entry.roles.iter() {
                let path = format!("{}{}{}", entry.key, ROLE_SEPARATOR, name);
                let by_name = have.contains(path.as_str());
                let by_privileges =
                    !def.privileges.is_empty() && def.privileges.iter().all(|p| have.contains(p.as_str()));
                if by_name || by_privileges {
                    out.push(path);
                }
            }
        }
        out
    }

    /// Full privilege list to persist for a set of selected roles.
    ///
    /// Selected roles are taken in registration order, whatever order they
    /// were passed in. Each contributes its path, its privileges, then its
    /// dependencies the same way. Unknown roles are skipped. First
    /// occurrence wins; required privileges close the list.
    pub fn expand_selected_roles<I, S>(&self, selected: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: Vec<S> = selected.into_iter().collect();
        let mut roots: Vec<((usize, usize), &str)> = selected
            .iter()
            .filter_map(|s| {
                let name = s.as_ref();
                match self.table.position(name) {
                    Some(pos) => Some((pos, name)),
                    None => {
                        debug!(role = name, "ignoring unknown role");
                        None
                    }
                }
            })
            .collect();
        roots.sort_by_key(|(pos, _)| *pos);
        roots.dedup_by_key(|(pos, _)| *pos);

        let mut out = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        for (_, name) in roots {
            self.expand_into(name, &mut visited, &mut seen, &mut out);
        }
        for p in &self.required {
            push_unique(p, &mut seen, &mut out);
        }
        out
    }

    /// Transitive raw privileges of one role (no paths, no required set)
    pub fn privileges_for(&self, path: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut visited = HashSet::new();
        self.expand_into(path, &mut visited, &mut seen, &mut out);
        out.retain(|p| !self.table.contains_role(p));
        out
    }

    // Depth-first, dependencies in declared order. `visited` bounds the walk.
    fn expand_into(
        &self,
        root: &str,
        visited: &mut HashSet<String>,
        seen: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        let mut stack = vec![root];
        while let Some(path) = stack.pop() {
            if visited.contains(path) {
                continue;
            }
            let Some(def) = self.table.role(path) else {
                debug!(role = path, "ignoring unknown dependency");
                continue;
            };
            visited.insert(path.to_string());

            push_unique(path, seen, out);
            for p in &def.privileges {
                push_unique(p, seen, out);
            }
            stack.extend(def.dependencies.iter().rev().map(String::as_str));
        }
    }
}

#[inline]
fn push_unique(s: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    if seen.insert(s.to_string()) {
        out.push(s.to_string());
    }
}
