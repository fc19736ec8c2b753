use crate::prober::Prober;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Registry of probers keyed by namespace. Explicitly constructed so tests
/// can run isolated registries side by side; all mutation happens under the
/// internal lock and lookups hand out clones, never references into the map.
#[derive(Clone, Default)]
pub struct Manager {
    probers: Arc<RwLock<HashMap<String, Prober>>>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `prober` iff no prober is registered for its namespace.
    /// Returns false without touching the existing entry otherwise; a
    /// duplicate registration is an expected outcome of reconcile retries,
    /// not an error.
    pub async fn register(&self, prober: Prober) -> bool {
        let mut probers = self.probers.write().await;
        match probers.entry(prober.namespace().to_string()) {
            Entry::Occupied(entry) => {
                warn!(
                    "A prober for namespace {} is already registered, skipping",
                    entry.key(),
                );
                false
            }
            Entry::Vacant(entry) => {
                info!("Registered prober for namespace {}", entry.key());
                entry.insert(prober);
                true
            }
        }
    }

    /// Remove and close the prober for `namespace`. Closing is cooperative:
    /// the call does not wait for the loop to drain. Returns false with no
    /// side effect when the namespace was never registered.
    pub async fn unregister(&self, namespace: &str) -> bool {
        let mut probers = self.probers.write().await;
        if let Some(prober) = probers.remove(namespace) {
            info!("Unregistered prober for namespace {}, closing it", namespace);
            prober.close();
            true
        } else {
            false
        }
    }

    pub async fn get_prober(&self, namespace: &str) -> Option<Prober> {
        self.probers.read().await.get(namespace).cloned()
    }

    /// Snapshot of all registered probers.
    pub async fn get_all_probers(&self) -> Vec<Prober> {
        self.probers.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Manager;
    use crate::fixtures::new_prober;

    const NAMESPACE: &str = "shoot--dev--alpha";

    #[tokio::test]
    async fn registers_new_prober_which_exists_and_is_not_closed() {
        let mgr = Manager::new();
        let prober = new_prober(NAMESPACE, "internal-kubeconfig");
        assert_eq!(prober.namespace(), NAMESPACE);
        assert!(mgr.register(prober).await);

        let found = mgr.get_prober(NAMESPACE).await.expect("prober should be registered");
        assert_eq!(found.namespace(), NAMESPACE);
        assert!(!found.is_closed(), "get_prober must not close the prober");
    }

    #[tokio::test]
    async fn registration_with_same_key_does_not_overwrite_existing_prober() {
        let mgr = Manager::new();
        assert!(mgr.register(new_prober(NAMESPACE, "bingo")).await);
        assert!(
            !mgr.register(new_prober(NAMESPACE, "zingo")).await,
            "second registration for the same namespace must be rejected"
        );

        let found = mgr.get_prober(NAMESPACE).await.expect("first prober should survive");
        assert_eq!(found.config().internal_kube_config_secret_name, "bingo");
    }

    #[tokio::test]
    async fn unregister_closes_prober_and_removes_it() {
        let mgr = Manager::new();
        let prober = new_prober(NAMESPACE, "internal-kubeconfig");
        let handle = prober.clone();
        assert!(mgr.register(prober).await);

        assert!(mgr.unregister(NAMESPACE).await);
        assert!(mgr.get_prober(NAMESPACE).await.is_none());
        assert!(handle.is_closed(), "unregister must cancel the prober");
    }

    #[tokio::test]
    async fn unregister_non_existing_prober_does_not_fail() {
        let mgr = Manager::new();
        assert!(!mgr.unregister("bazingo").await);

        // Repeated unregistration after the first is a no-op too.
        assert!(mgr.register(new_prober(NAMESPACE, "internal-kubeconfig")).await);
        assert!(mgr.unregister(NAMESPACE).await);
        assert!(!mgr.unregister(NAMESPACE).await);
    }

    #[tokio::test]
    async fn get_all_probers_returns_snapshot_copy() {
        let mgr = Manager::new();
        assert!(mgr.register(new_prober(NAMESPACE, "internal-kubeconfig")).await);

        let mut snapshot = mgr.get_all_probers().await;
        assert_eq!(snapshot.len(), 1);
        snapshot.clear();
        assert!(
            mgr.get_prober(NAMESPACE).await.is_some(),
            "mutating the snapshot must not touch the registry"
        );
    }

    #[tokio::test]
    async fn concurrent_registrations_yield_one_entry_each() {
        let mgr = Manager::new();
        let mut tasks = Vec::new();
        for i in 0..16 {
            let mgr = mgr.clone();
            tasks.push(tokio::spawn(async move {
                let namespace = format!("shoot--dev--{i}");
                mgr.register(new_prober(&namespace, "internal-kubeconfig")).await
            }));
        }
        for task in tasks {
            assert!(task.await.expect("registration task should not panic"));
        }
        assert_eq!(mgr.get_all_probers().await.len(), 16);
    }
}
