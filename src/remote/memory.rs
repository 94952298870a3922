//! In-process [`ResourceClient`] backend.
//!
//! Useful for embedded/single-process deployments and integration tests: a
//! shared `Arc<MemoryResourceClient>` behaves like one remote collection.
//! Version tokens are a monotonically increasing counter rendered as opaque
//! strings; a stale token on update is rejected with `Conflict`, matching
//! the optimistic-concurrency contract of a real coordination API.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::errors::RemoteError;
use crate::remote::LabelSelector;
use crate::remote::RemoteObject;
use crate::remote::ResourceClient;
use crate::remote::ResourceVersion;
use crate::remote::WatchEvent;
use crate::remote::WatchStream;

/// Capacity of the watch broadcast channel. Lagged subscribers drop the
/// missed notifications; the full-relist reconciliation downstream makes
/// dropped events harmless.
const WATCH_CHANNEL_CAPACITY: usize = 256;

pub struct MemoryResourceClient {
    objects: Mutex<HashMap<String, RemoteObject>>,
    next_version: AtomicU64,
    events: broadcast::Sender<WatchEvent>,
}

impl MemoryResourceClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            objects: Mutex::new(HashMap::new()),
            next_version: AtomicU64::new(1),
            events,
        }
    }

    fn bump_version(&self) -> ResourceVersion {
        let raw = self.next_version.fetch_add(1, Ordering::SeqCst);
        ResourceVersion::new(raw.to_string())
    }

    fn notify(
        &self,
        event: WatchEvent,
    ) {
        // Err means no live subscriber, which is fine
        let _ = self.events.send(event);
    }
}

impl Default for MemoryResourceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceClient for MemoryResourceClient {
    async fn create(
        &self,
        mut object: RemoteObject,
    ) -> std::result::Result<RemoteObject, RemoteError> {
        {
            let mut objects = self.objects.lock();
            if objects.contains_key(&object.name) {
                return Err(RemoteError::AlreadyExists { name: object.name });
            }
            object.version = self.bump_version();
            objects.insert(object.name.clone(), object.clone());
        }

        debug!("created object: {}", object.name);
        self.notify(WatchEvent::Added(object.name.clone()));
        Ok(object)
    }

    async fn get(
        &self,
        qualified_name: &str,
    ) -> std::result::Result<RemoteObject, RemoteError> {
        self.objects
            .lock()
            .get(qualified_name)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                name: qualified_name.to_string(),
            })
    }

    async fn update(
        &self,
        mut object: RemoteObject,
    ) -> std::result::Result<RemoteObject, RemoteError> {
        {
            let mut objects = self.objects.lock();
            let stored = objects
                .get(&object.name)
                .ok_or_else(|| RemoteError::NotFound {
                    name: object.name.clone(),
                })?;

            if stored.version != object.version {
                return Err(RemoteError::Conflict { name: object.name });
            }

            object.version = self.bump_version();
            objects.insert(object.name.clone(), object.clone());
        }

        debug!(
            "updated object: {} (version {})",
            object.name,
            object.version.as_str()
        );
        self.notify(WatchEvent::Modified(object.name.clone()));
        Ok(object)
    }

    async fn delete(
        &self,
        qualified_name: &str,
    ) -> std::result::Result<(), RemoteError> {
        {
            let mut objects = self.objects.lock();
            if objects.remove(qualified_name).is_none() {
                return Err(RemoteError::NotFound {
                    name: qualified_name.to_string(),
                });
            }
        }

        debug!("deleted object: {}", qualified_name);
        self.notify(WatchEvent::Deleted(qualified_name.to_string()));
        Ok(())
    }

    async fn list(
        &self,
        selector: &LabelSelector,
    ) -> std::result::Result<Vec<RemoteObject>, RemoteError> {
        let mut listed: Vec<RemoteObject> = self
            .objects
            .lock()
            .values()
            .filter(|object| selector.matches(&object.labels))
            .cloned()
            .collect();

        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    async fn watch(
        &self,
        _selector: &LabelSelector,
    ) -> std::result::Result<WatchStream, RemoteError> {
        // Events carry only names, so the stream is not label-filtered here;
        // every event triggers a selector-scoped relist downstream, which
        // makes spurious wakeups harmless.
        let receiver = self.events.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(|event| event.ok());
        Ok(Box::pin(stream))
    }
}
