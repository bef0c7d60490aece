//! Privilege checks against an effective privilege set

use std::collections::HashSet;

use crate::constants::ADMIN_PRIVILEGE;
use crate::error::{PrivmapError, Result};
use crate::resolver::PrivilegeResolver;
use crate::store::Role;

/// Effective privileges of one role or user
#[derive(Debug, Clone, Default)]
pub struct Acl {
    privileges: HashSet<String>,
    admin: bool,
}

impl Acl {
    /// Guard over an already expanded privilege list
    pub fn from_privileges<I, S>(privileges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let privileges: HashSet<String> = privileges.into_iter().map(Into::into).collect();
        let admin = privileges.contains(ADMIN_PRIVILEGE);
        Acl { privileges, admin }
    }

    /// Guard for a stored role: its visible roles are expanded again so
    /// only privileges backed by the current mapping table count.
    pub fn for_role(resolver: &PrivilegeResolver, role: &Role) -> Self {
        let selected = resolver.filter_selected_roles(&role.privileges);
        let mut acl = Self::from_privileges(resolver.expand_selected_roles(&selected));
        acl.admin = role.privileges.iter().any(|p| p == ADMIN_PRIVILEGE);
        acl
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    #[inline]
    pub fn can(&self, privilege: &str) -> bool {
        self.admin || self.privileges.contains(privilege)
    }

    pub fn can_all<'a>(&self, privileges: impl IntoIterator<Item = &'a str>) -> bool {
        privileges.into_iter().all(|p| self.can(p))
    }

    pub fn can_any<'a>(&self, privileges: impl IntoIterator<Item = &'a str>) -> bool {
        privileges.into_iter().any(|p| self.can(p))
    }

    /// Error unless the privilege is held
    pub fn require(&self, privilege: &str) -> Result<()> {
        if self.can(privilege) {
            Ok(())
        } else {
            Err(PrivmapError::AccessDenied(privilege.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.privileges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.privileges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_missing_privilege() {
        let acl = Acl::from_privileges(["payment_method:read"]);
        assert!(acl.require("payment_method:read").is_ok());
        match acl.require("payment_method:update") {
            Err(PrivmapError::AccessDenied(p)) => assert_eq!(p, "payment_method:update"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn admin_marker_grants_everything() {
        let acl = Acl::from_privileges([ADMIN_PRIVILEGE]);
        assert!(acl.is_admin());
        assert!(acl.can_all(["product:delete", "order:create:discount"]));
    }

    #[test]
    fn any_and_all() {
        let acl = Acl::from_privileges(["product:read"]);
        assert!(acl.can_any(["product:read", "product:update"]));
        assert!(!acl.can_all(["product:read", "product:update"]));
    }
}
