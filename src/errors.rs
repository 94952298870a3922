//! Error hierarchy for the store, categorized by where the failure lives:
//! the remote coordination API or the local registry layer.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Remote coordination API failures (create/get/update/delete/list/watch)
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Local registry and field-map failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures surfaced by the remote resource API.
///
/// `AlreadyExists`, `NotFound` and `Conflict` are distinct kinds so callers
/// can implement idempotent-create, idempotent-delete and retry-on-conflict
/// without string matching.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Create raced with another writer; the object is already present
    #[error("object {name} already exists")]
    AlreadyExists { name: String },

    /// The named object is not present on the remote
    #[error("object {name} not found")]
    NotFound { name: String },

    /// Optimistic-concurrency failure: the carried version token is stale
    #[error("version conflict updating {name}")]
    Conflict { name: String },

    /// Network/API failure, passed through unchanged
    #[error("remote call failed: {0}")]
    Api(String),
}

impl RemoteError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, RemoteError::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }
}

/// Failures local to the registry and field maps.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Name absent from the local registry. Distinct from
    /// [`RemoteError::NotFound`]: the remote was never consulted.
    #[error("store {name} does not exist in the local registry")]
    NotFoundLocal { name: String },

    /// Key absent from an entity's field map
    #[error("field {key} not found in store {name}")]
    FieldNotFound { name: String, key: String },
}

impl Error {
    /// True when the underlying failure is a stale-version rejection.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Remote(e) if e.is_conflict())
    }

    pub fn is_field_not_found(&self) -> bool {
        matches!(self, Error::Store(StoreError::FieldNotFound { .. }))
    }

    pub fn is_not_found_local(&self) -> bool {
        matches!(self, Error::Store(StoreError::NotFoundLocal { .. }))
    }
}
