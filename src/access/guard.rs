//! Access guard
//!
//! Resolves project membership through the injected cache and denies
//! fail-closed. The guard runs to completion (allow or error) strictly
//! before any guarded query executes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::observability::Logger;
use crate::storage::BoxFuture;

use super::cache::{PermissionCache, ProjectMembership};
use super::errors::{AccessError, AccessResult};
use super::role::{ProjectId, Role};

/// Caller identity carried with each request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    member: Option<String>,
    full_access: bool,
}

impl AuthContext {
    /// Context for an authenticated member.
    pub fn authenticated(member: impl Into<String>) -> Self {
        Self {
            member: Some(member.into()),
            full_access: false,
        }
    }

    /// Context for anonymous access. Always denied by the guard.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Full-access context for administrative and test execution paths.
    /// Bypasses membership checks entirely; construct it only at explicit,
    /// narrow call sites, never as a request default.
    pub fn internal() -> Self {
        Self {
            member: None,
            full_access: true,
        }
    }

    /// The authenticated member identifier, if any.
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// Whether this context bypasses membership checks.
    pub fn has_full_access(&self) -> bool {
        self.full_access
    }
}

/// Backing store for project membership; treated as an opaque cache-fill
/// function with no assumed transport.
pub trait MembershipStore: Send + Sync {
    /// Fetch membership snapshots for the given projects. Unknown ids are
    /// simply absent from the result; the guard treats them as denied.
    fn fetch_members<'a>(
        &'a self,
        projects: &'a [ProjectId],
    ) -> BoxFuture<'a, AccessResult<Vec<ProjectMembership>>>;

    /// Fetch the complete project name→id index.
    fn fetch_name_index(&self) -> BoxFuture<'_, AccessResult<HashMap<String, ProjectId>>>;
}

/// Project-scoped authorization with cached membership resolution.
pub struct AccessGuard {
    store: Arc<dyn MembershipStore>,
    cache: Arc<PermissionCache>,
}

impl AccessGuard {
    /// Creates a guard over an injected store and cache. The cache is
    /// shared process state constructed once at service start.
    pub fn new(store: Arc<dyn MembershipStore>, cache: Arc<PermissionCache>) -> Self {
        Self { store, cache }
    }

    /// Asserts the caller holds `required` or higher on every project.
    ///
    /// Errors with a denial naming every project the caller lacks the role
    /// on. Empty project sets and anonymous callers are denied outright.
    pub async fn assert_access(
        &self,
        ctx: &AuthContext,
        projects: &[ProjectId],
        required: Role,
    ) -> AccessResult<()> {
        if ctx.has_full_access() {
            Logger::info("access.bypass", &[("required", required.as_str())]);
            return Ok(());
        }

        if projects.is_empty() {
            return Err(AccessError::EmptyProjectSet);
        }

        let Some(member) = ctx.member() else {
            let denied: Vec<String> = projects.iter().map(ProjectId::to_string).collect();
            Logger::warn("access.denied", &[("reason", "anonymous")]);
            return Err(AccessError::Denied { projects: denied });
        };

        let memberships = self.resolve_members(projects).await?;

        let mut denied = Vec::new();
        for project in projects {
            let allowed = memberships
                .get(project)
                .and_then(|m| m.role_of(member))
                .is_some_and(|role| role >= required);
            if !allowed {
                denied.push(
                    memberships
                        .get(project)
                        .map(|m| m.name.clone())
                        .unwrap_or_else(|| project.to_string()),
                );
            }
        }

        if !denied.is_empty() {
            Logger::warn(
                "access.denied",
                &[
                    ("member", member),
                    ("projects", &denied.join(",")),
                    ("required", required.as_str()),
                ],
            );
            return Err(AccessError::Denied { projects: denied });
        }

        Ok(())
    }

    /// Resolves project names to ids through the name cache.
    ///
    /// An unknown name is a denial, not a not-found: resolution must not
    /// leak which projects exist.
    pub async fn resolve_project_names(&self, names: &[&str]) -> AccessResult<Vec<ProjectId>> {
        if names.is_empty() {
            return Err(AccessError::EmptyProjectSet);
        }

        let index = match self.cache.name_index() {
            Some(index) => index,
            None => {
                let fetched = self.store.fetch_name_index().await?;
                self.cache.store_name_index(fetched.clone());
                Logger::info(
                    "access.name_index_refreshed",
                    &[("projects", &fetched.len().to_string())],
                );
                Arc::new(fetched)
            }
        };

        let mut ids = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();
        for &name in names {
            match index.get(name) {
                Some(&id) => ids.push(id),
                None => unknown.push(name.to_string()),
            }
        }

        if !unknown.is_empty() {
            return Err(AccessError::Denied { projects: unknown });
        }
        Ok(ids)
    }

    /// Resolves memberships for `projects`: cached entries are reused, the
    /// remainder is fetched from the store in one batch and cached.
    async fn resolve_members(
        &self,
        projects: &[ProjectId],
    ) -> AccessResult<HashMap<ProjectId, Arc<ProjectMembership>>> {
        let (mut resolved, misses) = self.cache.lookup(projects);

        if !misses.is_empty() {
            let fetched = self.store.fetch_members(&misses).await?;
            Logger::info(
                "access.membership_refreshed",
                &[("projects", &fetched.len().to_string())],
            );
            for membership in &fetched {
                resolved.insert(membership.id, Arc::new(membership.clone()));
            }
            self.cache.store(fetched);
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store stub counting fetches, so tests can assert batching.
    struct StubStore {
        memberships: Vec<ProjectMembership>,
        names: HashMap<String, ProjectId>,
        member_fetches: AtomicUsize,
    }

    impl StubStore {
        fn new(memberships: Vec<ProjectMembership>) -> Self {
            let names = memberships
                .iter()
                .map(|m| (m.name.clone(), m.id))
                .collect();
            Self {
                memberships,
                names,
                member_fetches: AtomicUsize::new(0),
            }
        }
    }

    impl MembershipStore for StubStore {
        fn fetch_members<'a>(
            &'a self,
            projects: &'a [ProjectId],
        ) -> BoxFuture<'a, AccessResult<Vec<ProjectMembership>>> {
            self.member_fetches.fetch_add(1, Ordering::SeqCst);
            let result = self
                .memberships
                .iter()
                .filter(|m| projects.contains(&m.id))
                .cloned()
                .collect();
            Box::pin(async move { Ok(result) })
        }

        fn fetch_name_index(&self) -> BoxFuture<'_, AccessResult<HashMap<String, ProjectId>>> {
            let names = self.names.clone();
            Box::pin(async move { Ok(names) })
        }
    }

    fn membership(id: u32, name: &str, roles: &[(&str, Role)]) -> ProjectMembership {
        ProjectMembership {
            id: ProjectId(id),
            name: name.to_string(),
            roles: roles
                .iter()
                .map(|(m, r)| (m.to_string(), *r))
                .collect(),
        }
    }

    fn guard_over(memberships: Vec<ProjectMembership>) -> (AccessGuard, Arc<StubStore>) {
        let store = Arc::new(StubStore::new(memberships));
        let cache = Arc::new(PermissionCache::with_ttl_secs(60));
        (AccessGuard::new(store.clone(), cache), store)
    }

    #[tokio::test]
    async fn test_allows_sufficient_role() {
        let (guard, _) = guard_over(vec![membership(
            1,
            "acute-care",
            &[("drperson@x.org", Role::Writer)],
        )]);
        let ctx = AuthContext::authenticated("drperson@x.org");
        guard
            .assert_access(&ctx, &[ProjectId(1)], Role::Contributor)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_denies_insufficient_role_naming_project() {
        let (guard, _) = guard_over(vec![membership(
            1,
            "acute-care",
            &[("drperson@x.org", Role::Reader)],
        )]);
        let ctx = AuthContext::authenticated("drperson@x.org");
        let err = guard
            .assert_access(&ctx, &[ProjectId(1)], Role::Writer)
            .await
            .unwrap_err();
        match err {
            AccessError::Denied { projects } => assert_eq!(projects, vec!["acute-care"]),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_project_set_fails_closed() {
        let (guard, _) = guard_over(Vec::new());
        let ctx = AuthContext::authenticated("drperson@x.org");
        let err = guard.assert_access(&ctx, &[], Role::Reader).await.unwrap_err();
        assert!(matches!(err, AccessError::EmptyProjectSet));
    }

    #[tokio::test]
    async fn test_anonymous_denied_without_store_fetch() {
        let (guard, store) = guard_over(vec![membership(1, "p", &[])]);
        let err = guard
            .assert_access(&AuthContext::anonymous(), &[ProjectId(1)], Role::Reader)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Denied { .. }));
        assert_eq!(store.member_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_project_denied_not_found_is_not_leaked() {
        let (guard, _) = guard_over(Vec::new());
        let ctx = AuthContext::authenticated("drperson@x.org");
        let err = guard
            .assert_access(&ctx, &[ProjectId(99)], Role::Reader)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Denied { .. }));
    }

    #[tokio::test]
    async fn test_full_access_bypasses_membership() {
        let (guard, store) = guard_over(Vec::new());
        guard
            .assert_access(&AuthContext::internal(), &[ProjectId(42)], Role::Admin)
            .await
            .unwrap();
        assert_eq!(store.member_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_memberships_skip_the_store() {
        let (guard, store) = guard_over(vec![membership(
            1,
            "p1",
            &[("a@x.org", Role::Reader)],
        )]);
        let ctx = AuthContext::authenticated("a@x.org");

        guard
            .assert_access(&ctx, &[ProjectId(1)], Role::Reader)
            .await
            .unwrap();
        guard
            .assert_access(&ctx, &[ProjectId(1)], Role::Reader)
            .await
            .unwrap();

        // Second call served entirely from cache: one fetch total.
        assert_eq!(store.member_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_misses_fetched_in_one_batch() {
        let (guard, store) = guard_over(vec![
            membership(1, "p1", &[("a@x.org", Role::Reader)]),
            membership(2, "p2", &[("a@x.org", Role::Reader)]),
            membership(3, "p3", &[("a@x.org", Role::Reader)]),
        ]);
        let ctx = AuthContext::authenticated("a@x.org");

        guard
            .assert_access(
                &ctx,
                &[ProjectId(1), ProjectId(2), ProjectId(3)],
                Role::Reader,
            )
            .await
            .unwrap();

        assert_eq!(store.member_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_names_fail_closed_on_unknown() {
        let (guard, _) = guard_over(vec![membership(1, "p1", &[])]);

        let ids = guard.resolve_project_names(&["p1"]).await.unwrap();
        assert_eq!(ids, vec![ProjectId(1)]);

        let err = guard
            .resolve_project_names(&["p1", "ghost"])
            .await
            .unwrap_err();
        match err {
            AccessError::Denied { projects } => assert_eq!(projects, vec!["ghost"]),
            other => panic!("expected denial, got {other:?}"),
        }
    }
}
