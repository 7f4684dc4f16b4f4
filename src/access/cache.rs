//! Membership and name caches
//!
//! An explicitly constructed cache object, injected into the guard at
//! service start. Entries are TTL-bounded snapshots of backing state;
//! refreshes only ever replace an entry wholesale, so concurrent refreshes
//! from the same source are last-writer-wins safe.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use super::role::{ProjectId, Role};

/// Snapshot of one project's membership: roles by member identifier.
#[derive(Debug, Clone)]
pub struct ProjectMembership {
    pub id: ProjectId,
    pub name: String,
    pub roles: HashMap<String, Role>,
}

impl ProjectMembership {
    /// The member's role on this project, if any.
    pub fn role_of(&self, member: &str) -> Option<Role> {
        self.roles.get(member).copied()
    }
}

#[derive(Debug, Clone)]
struct MembershipEntry {
    membership: Arc<ProjectMembership>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct NameIndexEntry {
    index: Arc<HashMap<String, ProjectId>>,
    expires_at: DateTime<Utc>,
}

/// TTL-bounded, process-lifetime cache of project membership and the
/// project name→id index.
///
/// The two caches share a TTL and refresh cadence but are independently
/// keyed: invalidating or refreshing one never touches the other.
pub struct PermissionCache {
    ttl: Duration,
    memberships: RwLock<HashMap<ProjectId, MembershipEntry>>,
    name_index: RwLock<Option<NameIndexEntry>>,
}

impl PermissionCache {
    /// Creates a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            memberships: RwLock::new(HashMap::new()),
            name_index: RwLock::new(None),
        }
    }

    /// Convenience constructor from a TTL in seconds.
    pub fn with_ttl_secs(secs: u64) -> Self {
        Self::new(Duration::seconds(secs as i64))
    }

    /// Builds the cache from engine configuration.
    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        Self::with_ttl_secs(config.permission_cache_ttl_secs)
    }

    /// Splits `projects` into fresh cached memberships and the ids that
    /// need a backing-store fetch (uncached or expired).
    pub(crate) fn lookup(
        &self,
        projects: &[ProjectId],
    ) -> (HashMap<ProjectId, Arc<ProjectMembership>>, Vec<ProjectId>) {
        let now = Utc::now();
        let entries = self.read_memberships();

        let mut fresh = HashMap::new();
        let mut misses = Vec::new();
        for &project in projects {
            match entries.get(&project) {
                Some(entry) if now < entry.expires_at => {
                    fresh.insert(project, Arc::clone(&entry.membership));
                }
                _ => misses.push(project),
            }
        }
        (fresh, misses)
    }

    /// Stores freshly fetched memberships. Replaces wholesale; the value is
    /// a pure function of backing state, so last writer wins is safe.
    pub(crate) fn store(&self, memberships: Vec<ProjectMembership>) {
        let expires_at = Utc::now() + self.ttl;
        let mut entries = self.write_memberships();
        for membership in memberships {
            entries.insert(
                membership.id,
                MembershipEntry {
                    membership: Arc::new(membership),
                    expires_at,
                },
            );
        }
    }

    /// The name→id index, if present and fresh.
    pub(crate) fn name_index(&self) -> Option<Arc<HashMap<String, ProjectId>>> {
        let guard = self
            .name_index
            .read()
            .unwrap_or_else(|e| e.into_inner());
        guard.as_ref().and_then(|entry| {
            (Utc::now() < entry.expires_at).then(|| Arc::clone(&entry.index))
        })
    }

    /// Stores a freshly fetched name→id index.
    pub(crate) fn store_name_index(&self, index: HashMap<String, ProjectId>) {
        let mut guard = self
            .name_index
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *guard = Some(NameIndexEntry {
            index: Arc::new(index),
            expires_at: Utc::now() + self.ttl,
        });
    }

    /// Drops every cached entry. Part of the explicit lifecycle contract
    /// (service teardown, admin-triggered refresh).
    pub fn invalidate(&self) {
        self.write_memberships().clear();
        *self
            .name_index
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn read_memberships(&self) -> RwLockReadGuard<'_, HashMap<ProjectId, MembershipEntry>> {
        self.memberships.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_memberships(&self) -> RwLockWriteGuard<'_, HashMap<ProjectId, MembershipEntry>> {
        self.memberships.write().unwrap_or_else(|e| e.into_inner())
    }
}
