use std::time::Duration;

/// Prefix for ids minted while running without a remote store.
pub const LOCAL_ID_PREFIX: &str = "local_";

/// Wire name of the creation timestamp (epoch milliseconds).
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Upper bound for one-shot remote requests.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
