//! Per-entity CRUD layer and the manager-owned registry mirroring the
//! remote collection.

mod manager;
mod map_store;
mod registry;

pub use manager::*;
pub use map_store::*;
pub(crate) use registry::*;

#[cfg(test)]
mod manager_test;
