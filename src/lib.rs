//! privmap - role to privilege mapping for admin role editors
//!
//! Feature modules describe their roles as mapping entries. A frozen
//! [`PrivilegeMappingTable`] then answers two questions:
//!
//! - which roles does a stored privilege list show as selected
//!   ([`PrivilegeResolver::filter_selected_roles`]), and
//! - which privileges must be persisted for a set of selected roles
//!   ([`PrivilegeResolver::expand_selected_roles`]).
//!
//! ```
//! use std::sync::Arc;
//! use privmap::{Category, PrivilegeMappingEntry, PrivilegeMappingTable, PrivilegeResolver, RoleDefinition};
//!
//! let mut builder = PrivilegeMappingTable::builder();
//! builder.add_entry(
//!     PrivilegeMappingEntry::new(Category::AdditionalPermissions, "system")
//!         .with_role("clear_cache", RoleDefinition::new(["system:clear:cache"], Vec::<String>::new())),
//! ).unwrap();
//! let resolver = PrivilegeResolver::new(Arc::new(builder.build().unwrap()));
//!
//! assert_eq!(resolver.filter_selected_roles(["system:clear:cache"]), vec!["system.clear_cache"]);
//! assert!(resolver.expand_selected_roles(["system.clear_cache"]).starts_with(&[
//!     "system.clear_cache".to_string(),
//!     "system:clear:cache".to_string(),
//! ]));
//! ```

pub mod acl;
pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod editor;
pub mod error;
pub mod mapping;
pub mod registry;
pub mod resolver;
pub mod store;

pub use acl::Acl;
pub use auth::Verifier;
pub use config::Config;
pub use constants::*;
pub use db::{Lmdb, LmdbRoleStore};
pub use editor::{RoleEditor, SaveState};
pub use error::{PrivmapError, Result};
pub use mapping::{Category, PrivilegeMappingEntry, RoleDefinition, RolePath, Roles};
pub use registry::{MappingTableBuilder, PrivilegeMappingTable};
pub use resolver::PrivilegeResolver;
pub use store::{MemoryRoleStore, Role, RoleStore, SaveContext};
