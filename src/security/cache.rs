//! TTL cache in front of a permission resolver

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mini_moka::sync::Cache;

use super::Caller;
use super::policy::{Action, Decision, PermissionResolver};
use crate::Result;

/// Cache key for a single permission decision
#[derive(Debug, Hash, Eq, PartialEq, Clone)]
struct DecisionKey {
    caller: String,
    roles: Vec<String>,
    node_id: String,
    action: Action,
}

/// Caches decisions from an inner resolver
///
/// Allow and Deny are both cached for the full TTL; backend errors are not.
/// A role change therefore takes up to one TTL to be reflected.
pub struct CachedPermissionResolver {
    inner: Arc<dyn PermissionResolver>,
    cache: Cache<DecisionKey, Decision>,
}

impl CachedPermissionResolver {
    #[must_use]
    pub fn new(inner: Arc<dyn PermissionResolver>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl PermissionResolver for CachedPermissionResolver {
    async fn check(&self, caller: &Caller, node_id: &str, action: Action) -> Result<Decision> {
        let key = DecisionKey {
            caller: caller.name.clone(),
            roles: caller.roles.clone(),
            node_id: node_id.to_string(),
            action,
        };

        if let Some(decision) = self.cache.get(&key) {
            return Ok(decision);
        }

        let decision = self.inner.check(caller, node_id, action).await?;
        self.cache.insert(key, decision.clone());
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PermissionResolver for CountingResolver {
        async fn check(&self, _caller: &Caller, node_id: &str, _action: Action) -> Result<Decision> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if node_id == "worker1" {
                Ok(Decision::Deny("no".to_string()))
            } else {
                Ok(Decision::Allow)
            }
        }
    }

    #[tokio::test]
    async fn repeated_checks_hit_cache() {
        let inner = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedPermissionResolver::new(inner.clone(), Duration::from_secs(60));
        let caller = Caller::new("alice", vec!["operator".to_string()]);

        for _ in 0..3 {
            assert!(cached.check(&caller, "worker2", Action::Read).await.unwrap().is_allowed());
            assert!(!cached.check(&caller, "worker1", Action::Read).await.unwrap().is_allowed());
        }

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_actions_are_cached_separately() {
        let inner = Arc::new(CountingResolver {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedPermissionResolver::new(inner.clone(), Duration::from_secs(60));
        let caller = Caller::new("alice", vec![]);

        cached.check(&caller, "worker2", Action::Read).await.unwrap();
        cached.check(&caller, "worker2", Action::Restart).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
