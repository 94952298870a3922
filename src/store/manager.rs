//! Top-level registry of named key-value stores.
//!
//! The manager owns the registry and the remote client; callers obtain
//! [`MapStore`] handles by name and mutate fields through them. A spawned
//! [`WatchSynchronizer`] keeps the registry reconciled against the remote
//! collection independently of any writes in flight.
//!
//! [`WatchSynchronizer`]: crate::WatchSynchronizer

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use crate::config::Settings;
use crate::constants::CREATED_AT_FIELD;
use crate::errors::StoreError;
use crate::naming::managed_labels;
use crate::naming::managed_selector;
use crate::naming::qualify;
use crate::remote::RemoteObject;
use crate::remote::ResourceClient;
use crate::store::map_store::update_with_conflict_retry;
use crate::store::MapStore;
use crate::store::Registry;
use crate::sync::WatchSynchronizer;
use crate::Result;

pub struct StoreManager {
    client: Arc<dyn ResourceClient>,
    registry: Arc<Registry>,
    settings: Settings,
}

impl StoreManager {
    pub fn new(
        client: Arc<dyn ResourceClient>,
        settings: Settings,
    ) -> Self {
        let registry = Arc::new(Registry::new(
            client.clone(),
            settings.store.write_policy,
            settings.store.read_policy,
            settings.retry.update,
        ));

        Self {
            client,
            registry,
            settings,
        }
    }

    /// Spawns the background synchronizer mirroring the managed-label scope
    /// into this manager's registry until the token is cancelled.
    pub fn spawn_synchronizer(
        &self,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let synchronizer = WatchSynchronizer::new(
            self.client.clone(),
            self.registry.clone(),
            managed_selector(&self.settings.store.name_prefix),
            self.settings.retry.watch,
        );
        tokio::spawn(synchronizer.run(shutdown))
    }

    /// Idempotent create: returns the existing handle when `name` is
    /// already registered, without a remote call.
    ///
    /// Otherwise issues the remote create under the manager lock, so racing
    /// callers for the same name attempt exactly one create. When the
    /// remote reports the object already exists (created by another
    /// process, or not yet reflected locally), it is fetched and adopted
    /// instead of surfacing an error.
    pub async fn create_if_absent(
        &self,
        name: &str,
    ) -> Result<Arc<MapStore>> {
        if let Some(existing) = self.registry.lookup(name).await {
            return Ok(existing);
        }

        let mut entries = self.registry.entries.write().await;
        // Double-check: the synchronizer or a racing creator may have
        // registered the name while we waited for the lock
        if let Some(existing) = entries.get(name) {
            return Ok(existing.clone());
        }

        let prefix = &self.settings.store.name_prefix;
        let object = RemoteObject {
            name: qualify(prefix, name),
            labels: managed_labels(prefix),
            data: created_at_seed(),
            ..Default::default()
        };

        let created = match self.client.create(object).await {
            Ok(created) => {
                info!("created managed object {}", created.name);
                created
            }
            Err(err) if err.is_already_exists() => {
                debug!("create of {} raced, adopting the existing object", name);
                self.client.get(&qualify(prefix, name)).await?
            }
            Err(err) => return Err(err.into()),
        };

        let store = self.registry.new_store(created);
        entries.insert(name.to_string(), store.clone());
        Ok(store)
    }

    /// Deletes the remote object, then the registry entry.
    ///
    /// The name must exist locally (`NotFoundLocal` otherwise); a missing
    /// remote object surfaces as `RemoteError::NotFound` and leaves the
    /// registry entry in place for the synchronizer to evict.
    pub async fn delete(
        &self,
        name: &str,
    ) -> Result<()> {
        let mut entries = self.registry.entries.write().await;

        let store = entries
            .get(name)
            .ok_or_else(|| StoreError::NotFoundLocal {
                name: name.to_string(),
            })?;

        let qualified_name = store.current_object().await.name;
        self.client.delete(&qualified_name).await?;

        entries.remove(name);
        info!("deleted managed object {}", qualified_name);
        Ok(())
    }

    /// Registry lookup only; never consults the remote (keeping the
    /// registry current is the synchronizer's job).
    pub async fn get(
        &self,
        name: &str,
    ) -> Result<Arc<MapStore>> {
        self.registry
            .lookup(name)
            .await
            .ok_or_else(|| {
                StoreError::NotFoundLocal {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Sorted logical names of all managed stores currently registered.
    pub async fn list_names(&self) -> Vec<String> {
        self.registry.names().await
    }

    /// Pushes the entity's current in-memory field map to the remote in a
    /// single update, then folds the version-refreshed result back into the
    /// registry.
    ///
    /// This is how buffered writes are persisted; under the synchronous
    /// policy it is an idempotent re-push of the cached state. On conflict
    /// the local map is the desired state (last write wins), so only the
    /// version token is rebased before retrying.
    pub async fn commit(
        &self,
        store: &MapStore,
    ) -> Result<()> {
        let working = store.current_object().await;
        let desired = working.clone();

        let updated = update_with_conflict_retry(
            &*self.client,
            &self.settings.retry.update,
            working,
            move |fresh| {
                let mut next = desired.clone();
                next.version = fresh.version;
                next
            },
        )
        .await?;

        self.registry.adopt(updated).await;
        Ok(())
    }
}

/// Seed payload for a fresh object: creation time as unix seconds.
fn created_at_seed() -> HashMap<String, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let mut data = HashMap::new();
    data.insert(CREATED_AT_FIELD.to_string(), now.to_string());
    data
}
