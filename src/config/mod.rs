//! Configuration for the store, loaded with priority:
//! 1. Default values (hardcoded)
//! 2. Optional config file
//! 3. Environment variables (highest priority, `CMSTORE_` prefix)

mod retry;
mod store;

pub use retry::*;
pub use store::*;

#[cfg(test)]
mod config_test;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Namespace scope, naming prefix and read/write policies
    #[serde(default)]
    pub store: StoreConfig,

    /// Retry policies for conflict resolution and watch resubscription
    #[serde(default)]
    pub retry: RetryPolicies,
}

impl Settings {
    /// Load configuration, merging an optional file under environment
    /// overrides (e.g. `CMSTORE_STORE__NAMESPACE=prod`).
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("CMSTORE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
