//! Headless role editor session
//!
//! Mirrors the role detail screen without any rendering: a role is loaded,
//! its visible role selections are toggled, and saving is gated on both a
//! change and a verified identity.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::auth::Verifier;
use crate::constants::ADMIN_PRIVILEGE;
use crate::error::{PrivmapError, Result};
use crate::resolver::PrivilegeResolver;
use crate::store::{Role, RoleStore, SaveContext};

/// Where the save flow currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    /// Nothing to save; the save action is disabled
    Unchanged,
    /// Edited, save can be requested
    Ready,
    /// Save requested, waiting for the user to verify their identity
    AwaitingVerification,
    Saved,
    Failed(String),
}

pub struct RoleEditor {
    resolver: PrivilegeResolver,
    role: Role,
    loaded: Vec<String>,
    selected: Vec<String>,
    state: SaveState,
}

impl RoleEditor {
    /// Load a role and compute its visible selections
    pub fn load(store: &dyn RoleStore, resolver: PrivilegeResolver, id: &str) -> Result<Self> {
        let role = store.get(id)?.ok_or_else(|| PrivmapError::RoleNotFound(id.to_string()))?;
        Ok(Self::from_role(resolver, role))
    }

    /// Editor for a role that is not yet stored
    pub fn from_role(resolver: PrivilegeResolver, role: Role) -> Self {
        let selected = resolver.filter_selected_roles(&role.privileges);
        RoleEditor { resolver, role, loaded: selected.clone(), selected, state: SaveState::Unchanged }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Visible role selections
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn state(&self) -> &SaveState {
        &self.state
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selected.iter().any(|s| s == path)
    }

    /// Select a role; unknown roles are ignored. Returns whether it changed.
    pub fn select(&mut self, path: &str) -> bool {
        if self.is_selected(path) || !self.resolver.table().contains_role(path) {
            return false;
        }
        self.selected.push(path.to_string());
        self.refresh();
        true
    }

    pub fn deselect(&mut self, path: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|s| s != path);
        let changed = self.selected.len() != before;
        if changed {
            self.refresh();
        }
        changed
    }

    pub fn toggle(&mut self, path: &str) -> bool {
        if self.is_selected(path) {
            self.deselect(path)
        } else {
            self.select(path)
        }
    }

    /// Replace the selections with `paths`: anything missing is deselected,
    /// anything new and known is selected. Returns whether anything changed.
    pub fn set_selection<I, S>(&mut self, paths: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: Vec<S> = paths.into_iter().collect();
        let keep: HashSet<&str> = wanted.iter().map(|s| s.as_ref()).collect();

        let mut changed = false;
        for path in self.selected.clone() {
            if !keep.contains(path.as_str()) {
                changed |= self.deselect(&path);
            }
        }
        for path in &wanted {
            changed |= self.select(path.as_ref());
        }
        changed
    }

    /// True when the selections differ from what was loaded
    pub fn is_dirty(&self) -> bool {
        let a: HashSet<&str> = self.loaded.iter().map(String::as_str).collect();
        let b: HashSet<&str> = self.selected.iter().map(String::as_str).collect();
        a != b
    }

    /// Privilege list a save would persist.
    ///
    /// The admin marker is not a mapped role, so it is carried over from the
    /// loaded role rather than derived from the selections.
    pub fn save_payload(&self) -> Vec<String> {
        let mut out = self.resolver.expand_selected_roles(&self.selected);
        if self.role.privileges.iter().any(|p| p == ADMIN_PRIVILEGE) {
            out.push(ADMIN_PRIVILEGE.to_string());
        }
        out
    }

    /// The save trigger: asks for identity verification when there is
    /// something to save.
    pub fn request_save(&mut self) -> &SaveState {
        if self.is_dirty() {
            self.state = SaveState::AwaitingVerification;
        }
        &self.state
    }

    /// Verify the context and write the role.
    ///
    /// Only valid after [`request_save`](Self::request_save) moved the editor
    /// to [`SaveState::AwaitingVerification`]. Raw privileges not covered by a
    /// selected role are dropped. Store failures leave the editor in
    /// [`SaveState::Failed`]; nothing is retried.
    pub fn save(&mut self, store: &dyn RoleStore, verifier: &Verifier, ctx: &SaveContext) -> Result<()> {
        if !self.is_dirty() {
            self.state = SaveState::Unchanged;
            return Ok(());
        }
        if self.state != SaveState::AwaitingVerification {
            return Err(PrivmapError::VerificationRequired);
        }
        let user = verifier.validate(ctx)?;

        let mut role = self.role.clone();
        role.privileges = self.save_payload();
        if let Err(e) = store.save(&role, ctx) {
            warn!(role = %role.id, error = %e, "role save failed");
            self.state = SaveState::Failed(e.to_string());
            return Err(e);
        }

        info!(role = %role.id, user = %user, privileges = role.privileges.len(), "role saved");
        self.role = role;
        self.loaded = self.selected.clone();
        self.state = SaveState::Saved;
        Ok(())
    }

    fn refresh(&mut self) {
        self.state = if self.is_dirty() { SaveState::Ready } else { SaveState::Unchanged };
    }
}
