//! Per-entity handle over one remote object's key-value payload.
//!
//! Every handle owns an exclusive lock guarding its cached object; all field
//! reads and writes, by foreground callers and by the reconciler, go through
//! that lock. Under [`WritePolicy::Synchronous`] the lock is held across the
//! remote round-trip so concurrent writers on the same entity serialize
//! through the full read-modify-update cycle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::debug;
use tracing::warn;

use crate::config::BackoffPolicy;
use crate::config::ReadPolicy;
use crate::config::WritePolicy;
use crate::errors::RemoteError;
use crate::errors::StoreError;
use crate::remote::RemoteObject;
use crate::remote::ResourceClient;
use crate::remote::ResourceVersion;
use crate::Result;

/// A named key-value record cached from the remote collection.
pub struct MapStore {
    object: RwLock<RemoteObject>,
    client: Arc<dyn ResourceClient>,
    write_policy: WritePolicy,
    read_policy: ReadPolicy,
    backoff: BackoffPolicy,
}

impl std::fmt::Debug for MapStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapStore")
            .field("object", &self.object)
            .field("write_policy", &self.write_policy)
            .field("read_policy", &self.read_policy)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Immutable copy of a record for inspection. Holds no lock and shares no
/// state with the live map.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    /// Qualified remote identifier
    pub name: String,
    /// Caller-facing name
    pub logical_name: String,
    pub data: HashMap<String, String>,
    pub version: ResourceVersion,
}

impl MapStore {
    pub(crate) fn new(
        object: RemoteObject,
        client: Arc<dyn ResourceClient>,
        write_policy: WritePolicy,
        read_policy: ReadPolicy,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            object: RwLock::new(object),
            client,
            write_policy,
            read_policy,
            backoff,
        }
    }

    /// Qualified remote identifier of this record.
    pub async fn name(&self) -> String {
        self.object.read().await.name.clone()
    }

    /// Inserts or overwrites a field.
    ///
    /// Synchronous policy: the mutation is pushed to the remote and the
    /// cached object is replaced only after the remote accepts it; a stale
    /// version token is retried with refresh up to the configured bound,
    /// then surfaced as `Conflict`. Buffered policy: in-memory only until
    /// the next commit.
    pub async fn upsert(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut object = self.object.write().await;

        match self.write_policy {
            WritePolicy::Buffered => {
                object.data.insert(key.to_string(), value.to_string());
                Ok(())
            }
            WritePolicy::Synchronous => {
                let mut working = object.clone();
                working.data.insert(key.to_string(), value.to_string());

                let updated =
                    update_with_conflict_retry(&*self.client, &self.backoff, working, |mut fresh| {
                        fresh.data.insert(key.to_string(), value.to_string());
                        fresh
                    })
                    .await?;

                *object = updated;
                Ok(())
            }
        }
    }

    /// Removes a field.
    ///
    /// Fails with `FieldNotFound` iff the key is absent from the field map;
    /// a delete of a present key never fails locally regardless of how much
    /// other data the map holds.
    pub async fn delete_key(
        &self,
        key: &str,
    ) -> Result<()> {
        let mut object = self.object.write().await;

        if !object.data.contains_key(key) {
            return Err(StoreError::FieldNotFound {
                name: object.logical_name().to_string(),
                key: key.to_string(),
            }
            .into());
        }

        match self.write_policy {
            WritePolicy::Buffered => {
                object.data.remove(key);
                Ok(())
            }
            WritePolicy::Synchronous => {
                let mut working = object.clone();
                working.data.remove(key);

                let updated =
                    update_with_conflict_retry(&*self.client, &self.backoff, working, |mut fresh| {
                        fresh.data.remove(key);
                        fresh
                    })
                    .await?;

                *object = updated;
                Ok(())
            }
        }
    }

    /// Returns the value of a field, or `FieldNotFound`.
    ///
    /// Under [`ReadPolicy::Refresh`] the object is re-fetched from the
    /// remote first; under [`ReadPolicy::Cache`] the local copy is served
    /// as-is (staleness bounded by the synchronizer's reconciliation
    /// latency).
    pub async fn get(
        &self,
        key: &str,
    ) -> Result<String> {
        if self.read_policy == ReadPolicy::Refresh {
            self.refresh().await?;
        }

        let object = self.object.read().await;
        object
            .data
            .get(key)
            .cloned()
            .ok_or_else(|| {
                StoreError::FieldNotFound {
                    name: object.logical_name().to_string(),
                    key: key.to_string(),
                }
                .into()
            })
    }

    /// Immutable copy of the full record.
    pub async fn snapshot(&self) -> ObjectSnapshot {
        let object = self.object.read().await;
        ObjectSnapshot {
            name: object.name.clone(),
            logical_name: object.logical_name().to_string(),
            data: object.data.clone(),
            version: object.version.clone(),
        }
    }

    /// Re-fetches the object from the remote and adopts it wholesale.
    pub async fn refresh(&self) -> Result<()> {
        let name = self.name().await;
        let fresh = self.client.get(&name).await?;

        let mut object = self.object.write().await;
        *object = fresh;
        Ok(())
    }

    /// Clone of the cached object, for commit pushes.
    pub(crate) async fn current_object(&self) -> RemoteObject {
        self.object.read().await.clone()
    }

    /// Wholesale replacement by the reconciler. Taken under the entity
    /// lock so an in-flight field operation is never interleaved.
    pub(crate) async fn replace_object(
        &self,
        object: RemoteObject,
    ) {
        let mut current = self.object.write().await;
        debug!(
            "reconciling {}: version {} -> {}",
            object.name,
            current.version.as_str(),
            object.version.as_str()
        );
        *current = object;
    }
}

/// Pushes `working` to the remote, retrying stale-version rejections with a
/// refresh: on `Conflict` the object is re-fetched and `rebase` derives the
/// next attempt from the fresh copy. Bounded by the backoff policy; the
/// final `Conflict` is surfaced to the caller once retries are exhausted.
pub(crate) async fn update_with_conflict_retry(
    client: &dyn ResourceClient,
    backoff: &BackoffPolicy,
    working: RemoteObject,
    rebase: impl Fn(RemoteObject) -> RemoteObject,
) -> std::result::Result<RemoteObject, RemoteError> {
    let mut attempts = 0;
    let mut working = working;

    loop {
        match client.update(working.clone()).await {
            Ok(updated) => return Ok(updated),
            Err(err) if err.is_conflict() && backoff.should_retry(attempts) => {
                attempts += 1;
                warn!(
                    "version conflict updating {}, refresh and retry {}/{}",
                    working.name, attempts, backoff.max_retries
                );
                sleep(backoff.delay_for(attempts)).await;

                let fresh = client.get(&working.name).await?;
                working = rebase(fresh);
            }
            Err(err) => return Err(err),
        }
    }
}
