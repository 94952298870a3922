//! Background synchronization between the remote collection and the local
//! registry.

mod watcher;

pub use watcher::*;
