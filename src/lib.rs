//! A lightweight key-value store backed by a cluster coordination resource
//! collection (ConfigMap-like namespaced key/value objects).
//!
//! Processes running inside a cluster read and write named field maps without
//! operating an external database. A background [`WatchSynchronizer`] keeps a
//! label-scoped local registry reconciled against the authoritative remote
//! state, while [`StoreManager`] / [`MapStore`] expose per-entity CRUD with
//! optimistic-concurrency writes.
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use cm_store::MemoryResourceClient;
//! use cm_store::Settings;
//! use cm_store::StoreManager;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = Arc::new(MemoryResourceClient::new());
//!     let manager = StoreManager::new(client, Settings::default());
//!
//!     // Mirror remote changes into the local registry until shutdown
//!     let shutdown = CancellationToken::new();
//!     let _sync = manager.spawn_synchronizer(shutdown.clone());
//!
//!     // Execute key-value operations
//!     let store = manager.create_if_absent("user-profiles").await.unwrap();
//!     store.upsert("1001", "Alice").await.unwrap();
//!
//!     let value = store.get("1001").await.unwrap();
//!     println!("User data: {:?}", value);
//!
//!     shutdown.cancel();
//! }
//! ```

mod config;
mod constants;
mod errors;
mod naming;
mod remote;
mod store;
mod sync;

pub use config::*;
pub use errors::*;
pub use naming::*;
pub use remote::*;
pub use store::*;
pub use sync::*;
