//! Manager-wide registry: logical name -> entity handle.
//!
//! The keyset mirrors the remote objects matching the managed-label
//! selector, within the synchronizer's reconciliation latency. Existence
//! changes (insert/evict/reconcile) take the registry write lock; name
//! lookups take the read lock.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::BackoffPolicy;
use crate::config::ReadPolicy;
use crate::config::WritePolicy;
use crate::remote::RemoteObject;
use crate::remote::ResourceClient;
use crate::store::MapStore;

pub(crate) struct Registry {
    pub(crate) entries: RwLock<HashMap<String, Arc<MapStore>>>,
    client: Arc<dyn ResourceClient>,
    write_policy: WritePolicy,
    read_policy: ReadPolicy,
    update_backoff: BackoffPolicy,
}

impl Registry {
    pub(crate) fn new(
        client: Arc<dyn ResourceClient>,
        write_policy: WritePolicy,
        read_policy: ReadPolicy,
        update_backoff: BackoffPolicy,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            client,
            write_policy,
            read_policy,
            update_backoff,
        }
    }

    /// Builds an entity handle sharing the registry's client and policies.
    pub(crate) fn new_store(
        &self,
        object: RemoteObject,
    ) -> Arc<MapStore> {
        Arc::new(MapStore::new(
            object,
            self.client.clone(),
            self.write_policy,
            self.read_policy,
            self.update_backoff,
        ))
    }

    pub(crate) async fn lookup(
        &self,
        logical_name: &str,
    ) -> Option<Arc<MapStore>> {
        self.entries.read().await.get(logical_name).cloned()
    }

    /// Sorted logical names currently registered.
    pub(crate) async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Makes the registry match a freshly listed remote set.
    ///
    /// Upsert pass: every listed object replaces the cached copy of its
    /// entry (under that entity's lock) or materializes a new entry.
    /// Eviction pass: entries absent from the listed set are removed. Stale
    /// names are collected first and deleted after, never while iterating
    /// the live map.
    pub(crate) async fn reconcile(
        &self,
        listed: Vec<RemoteObject>,
    ) {
        let mut entries = self.entries.write().await;

        let mut live: HashSet<String> = HashSet::with_capacity(listed.len());
        for object in listed {
            let logical_name = object.logical_name().to_string();
            live.insert(logical_name.clone());

            match entries.get(&logical_name) {
                Some(store) => store.replace_object(object).await,
                None => {
                    debug!("materializing {} from remote list", logical_name);
                    entries.insert(logical_name, self.new_store(object));
                }
            }
        }

        let stale: Vec<String> = entries
            .keys()
            .filter(|name| !live.contains(*name))
            .cloned()
            .collect();

        for name in stale {
            debug!("evicting {}: no longer present on the remote", name);
            entries.remove(&name);
        }
    }

    /// Folds one authoritative object back into the registry, e.g. the
    /// version-refreshed result of a commit.
    pub(crate) async fn adopt(
        &self,
        object: RemoteObject,
    ) -> Arc<MapStore> {
        let mut entries = self.entries.write().await;
        let logical_name = object.logical_name().to_string();

        match entries.get(&logical_name) {
            Some(store) => {
                store.replace_object(object).await;
                store.clone()
            }
            None => {
                let store = self.new_store(object);
                entries.insert(logical_name, store.clone());
                store
            }
        }
    }
}
