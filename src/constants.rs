// -
// Naming

/// Default domain prefix qualifying every managed object name.
pub(crate) const DEFAULT_NAME_PREFIX: &str = "store.cmstore.io";

/// Separator between the domain prefix and the logical name.
pub(crate) const NAME_SEPARATOR: char = '.';

// -
// Labels

/// Label key suffix marking an object as managed (`<prefix>/managed`).
pub(crate) const MANAGED_LABEL_SUFFIX: &str = "managed";

pub(crate) const MANAGED_LABEL_VALUE: &str = "true";

// -
// Payload

/// Seed field written into every freshly created object so the remote
/// payload is never empty.
pub(crate) const CREATED_AT_FIELD: &str = "_created_at";
