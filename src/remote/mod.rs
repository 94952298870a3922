//! Boundary over the cluster coordination API.
//!
//! [`ResourceClient`] is the sole external seam of the crate: get/list/
//! create/update/delete of a single named key-value object plus a watch
//! subscription, all scoped by a label selector. Calls are independent and
//! carry no cross-call atomicity; optimistic concurrency is expressed via
//! the opaque [`ResourceVersion`] token carried by every object.

mod memory;

pub use memory::*;


use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
#[cfg(test)]
use mockall::automock;

use crate::errors::RemoteError;
use crate::naming::strip_prefix;

/// Opaque version token used to detect concurrent modification.
///
/// Returned by the remote on every successful read/write; compared for
/// equality only, never ordered or interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A remote key-value object: qualified name, discovery labels, flat
/// string-to-string payload (UTF-8 text only) and the version token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteObject {
    /// Qualified identifier `<prefix>.<logical_name>`
    pub name: String,
    pub labels: HashMap<String, String>,
    pub data: HashMap<String, String>,
    pub version: ResourceVersion,
}

impl RemoteObject {
    /// Logical name derived by stripping the domain prefix.
    pub fn logical_name(&self) -> &str {
        strip_prefix(&self.name)
    }
}

/// Equality-based label selector used for list/watch scoping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    required: HashMap<String, String>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.required.insert(key.into(), value.into());
        self
    }

    /// True when every required label is present with the required value.
    pub fn matches(
        &self,
        labels: &HashMap<String, String>,
    ) -> bool {
        self.required
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

/// Change notification delivered by a watch subscription.
///
/// Carries only the qualified object name: the synchronizer re-lists the
/// full selector scope on every event, so the payload would be unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(String),
    Modified(String),
    Deleted(String),
}

impl WatchEvent {
    pub fn name(&self) -> &str {
        match self {
            WatchEvent::Added(name) => name,
            WatchEvent::Modified(name) => name,
            WatchEvent::Deleted(name) => name,
        }
    }
}

/// Stream of change notifications for a watch subscription.
pub type WatchStream = Pin<Box<dyn Stream<Item = WatchEvent> + Send>>;

/// Thin client over the coordination API.
///
/// All calls are synchronous request/response; each independently fails or
/// succeeds. Implementations must report [`RemoteError::AlreadyExists`],
/// [`RemoteError::NotFound`] and [`RemoteError::Conflict`] as their own
/// kinds so callers can branch on them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync + 'static {
    /// Creates the object; `AlreadyExists` when the name is taken. Returns
    /// the stored object with its initial version token.
    async fn create(
        &self,
        object: RemoteObject,
    ) -> std::result::Result<RemoteObject, RemoteError>;

    /// Fetches one object by qualified name.
    async fn get(
        &self,
        qualified_name: &str,
    ) -> std::result::Result<RemoteObject, RemoteError>;

    /// Replaces the object iff `object.version` matches the stored version;
    /// `Conflict` otherwise. Returns the object with a refreshed token.
    async fn update(
        &self,
        object: RemoteObject,
    ) -> std::result::Result<RemoteObject, RemoteError>;

    /// Deletes one object by qualified name; `NotFound` when absent.
    async fn delete(
        &self,
        qualified_name: &str,
    ) -> std::result::Result<(), RemoteError>;

    /// Lists all objects matching the selector.
    async fn list(
        &self,
        selector: &LabelSelector,
    ) -> std::result::Result<Vec<RemoteObject>, RemoteError>;

    /// Subscribes to change notifications for objects matching the selector.
    async fn watch(
        &self,
        selector: &LabelSelector,
    ) -> std::result::Result<WatchStream, RemoteError>;
}
