//! Module access scenarios for the payment settings area

use std::sync::Arc;

use privmap::*;

fn resolver() -> PrivilegeResolver {
    let mut b = MappingTableBuilder::new();
    b.add_entry(
        PrivilegeMappingEntry::new(Category::Permissions, "product")
            .with_role("viewer", RoleDefinition::new(["product:read"], Vec::<String>::new())),
    )
    .unwrap();
    b.add_entry(
        PrivilegeMappingEntry::new(Category::Permissions, "payment")
            .with_role("viewer", RoleDefinition::new(["payment_method:read"], Vec::<String>::new()))
            .with_role("editor", RoleDefinition::new(["payment_method:update"], ["payment.viewer"]))
            .with_role("creator", RoleDefinition::new(["payment_method:create"], ["payment.editor"]))
            .with_role("deleter", RoleDefinition::new(["payment_method:delete"], ["payment.viewer"])),
    )
    .unwrap();
    PrivilegeResolver::new(Arc::new(b.build().unwrap()))
}

fn acl_for(r: &PrivilegeResolver, roles: &[&str]) -> Acl {
    let role = Role::new("r", "R").with_privileges(r.expand_selected_roles(roles));
    Acl::for_role(r, &role)
}

#[test]
fn test_no_access_to_payment_module() {
    let r = resolver();
    let acl = acl_for(&r, &["product.viewer"]);
    assert!(acl.can("product:read"));
    assert!(!acl.can("payment_method:read"));
    assert!(matches!(acl.require("payment_method:read"), Err(PrivmapError::AccessDenied(_))));
}

#[test]
fn test_can_view_payment() {
    let r = resolver();
    let acl = acl_for(&r, &["payment.viewer"]);
    assert!(acl.can("payment_method:read"));
    assert!(!acl.can("payment_method:update"));
}

#[test]
fn test_can_edit_payment() {
    let r = resolver();
    let acl = acl_for(&r, &["payment.editor"]);
    assert!(acl.can_all(["payment_method:read", "payment_method:update"]));
    assert!(!acl.can("payment_method:create"));
}

#[test]
fn test_can_create_payment() {
    let r = resolver();
    let acl = acl_for(&r, &["payment.creator"]);
    assert!(acl.can_all(["payment_method:read", "payment_method:update", "payment_method:create"]));
    assert!(!acl.can("payment_method:delete"));
}

#[test]
fn test_can_delete_payment() {
    let r = resolver();
    let acl = acl_for(&r, &["payment.deleter"]);
    assert!(acl.can_all(["payment_method:read", "payment_method:delete"]));
    assert!(!acl.can("payment_method:update"));
}

#[test]
fn test_required_privileges_always_granted() {
    let r = resolver();
    let acl = acl_for(&r, &[]);
    for p in r.required_privileges() {
        assert!(acl.can(p));
    }
}

#[test]
fn test_unmapped_raw_privileges_grant_nothing() {
    let r = resolver();
    let role = Role::new("r", "R").with_privileges(["customer:update", "payment_method:update"]);
    let acl = Acl::for_role(&r, &role);
    assert!(!acl.can("customer:update"));
    assert!(acl.can("payment_method:update"));
}

#[test]
fn test_admin_role_bypasses_checks() {
    let r = resolver();
    let role = Role::new("admin", "Administrator").with_privileges([ADMIN_PRIVILEGE]);
    let acl = Acl::for_role(&r, &role);
    assert!(acl.is_admin());
    assert!(acl.require("payment_method:delete").is_ok());
}
