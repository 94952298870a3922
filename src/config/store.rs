use serde::Deserialize;

use crate::constants::DEFAULT_NAME_PREFIX;

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Namespace the backing resource collection lives in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Domain prefix qualifying every managed object name; also the prefix
    /// of the managed-label key
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    /// When field mutations reach the remote
    #[serde(default)]
    pub write_policy: WritePolicy,

    /// Where field reads are served from
    #[serde(default)]
    pub read_policy: ReadPolicy,
}

/// Persistence policy for field mutations. One policy per deployment; the
/// two are never mixed at runtime.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Every mutation immediately issues a remote update. Local state is
    /// replaced only after the remote accepts the write.
    #[default]
    Synchronous,

    /// Mutations stay in memory until [`StoreManager::commit`] pushes them.
    /// Known limitation: a crash before commit silently loses the buffered
    /// writes; local and remote diverge until the commit lands.
    ///
    /// [`StoreManager::commit`]: crate::StoreManager::commit
    Buffered,
}

/// Consistency policy for field reads. One policy per deployment.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicy {
    /// Serve reads from the local cache. Staleness is bounded by the
    /// synchronizer's reconciliation latency.
    #[default]
    Cache,

    /// Fetch the object from the remote before every read. Consistent with
    /// the remote at call time, at one remote round-trip per read.
    Refresh,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            name_prefix: default_name_prefix(),
            write_policy: WritePolicy::default(),
            read_policy: ReadPolicy::default(),
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.to_string()
}
