//! LMDB environment and the LMDB-backed role store

use std::path::Path;

use heed::types::{Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use tracing::{debug, info};

use crate::error::{PrivmapError, Result};
use crate::store::{Role, RoleStore, SaveContext};

pub type DbStr = Database<Str, Str>;
pub type DbU64 = Database<Str, U64<byteorder::BigEndian>>;

/// All database handles
#[derive(Clone, Copy)]
pub struct Dbs {
    /// role id -> JSON role
    pub roles: DbStr,
    /// role id -> save counter
    pub revisions: DbU64,
    /// user id -> salt|hash
    pub credentials: DbStr,
    /// token hash -> user|expires_at
    pub verifications: DbStr,
}

/// An opened LMDB environment. Clone shares the environment.
#[derive(Clone)]
pub struct Lmdb {
    env: Env,
    dbs: Dbs,
}

impl Lmdb {
    /// Open (or create) the environment at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe { EnvOpenOptions::new().map_size(1 << 30).max_dbs(4).open(path)? };
        let mut tx = env.write_txn()?;
        let dbs = Dbs {
            roles: env.create_database(&mut tx, Some("roles"))?,
            revisions: env.create_database(&mut tx, Some("revisions"))?,
            credentials: env.create_database(&mut tx, Some("credentials"))?,
            verifications: env.create_database(&mut tx, Some("verifications"))?,
        };
        tx.commit()?;
        info!(path = %path.display(), "opened role database");
        Ok(Lmdb { env, dbs })
    }

    /// Execute a read-only operation
    #[inline]
    pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let tx = self.env.read_txn()?;
        f(&self.dbs, &tx)
    }

    /// Execute a write operation in one committed transaction
    #[inline]
    pub fn write<T, F: FnOnce(&Dbs, &mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.env.write_txn()?;
        let r = f(&self.dbs, &mut tx)?;
        tx.commit()?;
        Ok(r)
    }

    /// Clear all databases (for testing)
    pub fn clear_all(&self) -> Result<()> {
        self.write(|d, tx| {
            d.roles.clear(tx)?;
            d.revisions.clear(tx)?;
            d.credentials.clear(tx)?;
            d.verifications.clear(tx)?;
            Ok(())
        })
    }
}

/// Role store persisted in LMDB
#[derive(Clone)]
pub struct LmdbRoleStore {
    db: Lmdb,
}

impl LmdbRoleStore {
    pub fn new(db: Lmdb) -> Self {
        LmdbRoleStore { db }
    }

    /// Number of saves a role has seen (0 if never saved)
    pub fn revision(&self, id: &str) -> Result<u64> {
        self.db.read(|d, tx| Ok(d.revisions.get(tx, id)?.unwrap_or(0)))
    }
}

impl RoleStore for LmdbRoleStore {
    fn get(&self, id: &str) -> Result<Option<Role>> {
        self.db.read(|d, tx| match d.roles.get(tx, id)? {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        })
    }

    fn save(&self, role: &Role, _ctx: &SaveContext) -> Result<()> {
        if role.id.is_empty() {
            return Err(PrivmapError::Storage("role id cannot be empty".into()));
        }
        let json = serde_json::to_string(role)?;
        let rev = self.db.write(|d, tx| {
            let rev = d.revisions.get(tx, &role.id)?.unwrap_or(0) + 1;
            d.roles.put(tx, &role.id, &json)?;
            d.revisions.put(tx, &role.id, &rev)?;
            Ok(rev)
        })?;
        debug!(role = %role.id, revision = rev, "stored role");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.db.write(|d, tx| {
            let r = d.roles.delete(tx, id)?;
            d.revisions.delete(tx, id)?;
            Ok(r)
        })
    }

    fn list(&self) -> Result<Vec<Role>> {
        self.db.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.roles.iter(tx)? {
                let (_, json) = item?;
                r.push(serde_json::from_str(json)?);
            }
            Ok(r)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_survive_reopen_of_handles() {
        let dir = tempfile::tempdir().unwrap();
        let db = Lmdb::open(dir.path()).unwrap();
        let store = LmdbRoleStore::new(db.clone());
        let ctx = SaveContext::new("t");

        let role = Role::new("r1", "Support").with_privileges(["system.clear_cache", "system:clear:cache"]);
        store.save(&role, &ctx).unwrap();
        store.save(&role, &ctx).unwrap();

        let other = LmdbRoleStore::new(db);
        assert_eq!(other.get("r1").unwrap(), Some(role));
        assert_eq!(other.revision("r1").unwrap(), 2);
        assert_eq!(other.revision("r2").unwrap(), 0);
    }

    #[test]
    fn delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let db = Lmdb::open(dir.path()).unwrap();
        let store = LmdbRoleStore::new(db.clone());
        let ctx = SaveContext::new("t");
        store.save(&Role::new("a", "A"), &ctx).unwrap();
        store.save(&Role::new("b", "B"), &ctx).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);

        assert!(store.delete("a").unwrap());
        assert!(store.get("a").unwrap().is_none());

        db.clear_all().unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn empty_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbRoleStore::new(Lmdb::open(dir.path()).unwrap());
        assert!(store.save(&Role::new("", "x"), &SaveContext::new("t")).is_err());
    }
}
