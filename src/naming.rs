//! Mapping between caller-facing logical names and qualified remote
//! identifiers, plus the managed-label set used for discovery.
//!
//! The logical name is always derived from the qualified identifier by
//! stripping the prefix; it is never stored independently, so the two cannot
//! drift apart.

use std::collections::HashMap;

use crate::constants::MANAGED_LABEL_SUFFIX;
use crate::constants::MANAGED_LABEL_VALUE;
use crate::constants::NAME_SEPARATOR;
use crate::remote::LabelSelector;

/// Builds the qualified remote identifier `<prefix>.<logical_name>`.
pub fn qualify(
    prefix: &str,
    logical_name: &str,
) -> String {
    format!("{}{}{}", prefix, NAME_SEPARATOR, logical_name)
}

/// Recovers the logical name from a qualified identifier: everything after
/// the last separator. A name with no separator is returned unchanged.
pub fn strip_prefix(qualified_name: &str) -> &str {
    match qualified_name.rsplit_once(NAME_SEPARATOR) {
        Some((_, logical_name)) => logical_name,
        None => qualified_name,
    }
}

/// Label set applied to every created object. Objects created without these
/// labels are invisible to the synchronizer.
pub fn managed_labels(prefix: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert(managed_label_key(prefix), MANAGED_LABEL_VALUE.to_string());
    labels
}

/// Selector matching exactly the managed label set.
pub fn managed_selector(prefix: &str) -> LabelSelector {
    LabelSelector::new().require(managed_label_key(prefix), MANAGED_LABEL_VALUE)
}

fn managed_label_key(prefix: &str) -> String {
    format!("{}/{}", prefix, MANAGED_LABEL_SUFFIX)
}
