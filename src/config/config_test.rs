use std::time::Duration;

use crate::BackoffPolicy;
use crate::ReadPolicy;
use crate::Settings;
use crate::WritePolicy;

#[test]
fn test_default_settings() {
    let settings = Settings::default();

    assert_eq!(settings.store.namespace, "default");
    assert_eq!(settings.store.name_prefix, "store.cmstore.io");
    assert_eq!(settings.store.write_policy, WritePolicy::Synchronous);
    assert_eq!(settings.store.read_policy, ReadPolicy::Cache);
    assert_eq!(settings.retry.update.max_retries, 3);
    // watch resubscription defaults to unlimited retries
    assert_eq!(settings.retry.watch.max_retries, 0);
}

#[test]
fn test_load_without_file_uses_defaults() {
    temp_env::with_vars_unset(
        [
            "CMSTORE_STORE__NAMESPACE",
            "CMSTORE_STORE__WRITE_POLICY",
            "CMSTORE_STORE__READ_POLICY",
        ],
        || {
            let settings = Settings::load(None).expect("Should load default settings");
            assert_eq!(settings.store.namespace, "default");
            assert_eq!(settings.store.write_policy, WritePolicy::Synchronous);
        },
    );
}

#[test]
fn test_env_overrides_take_priority() {
    temp_env::with_vars(
        [
            ("CMSTORE_STORE__NAMESPACE", Some("prod")),
            ("CMSTORE_STORE__WRITE_POLICY", Some("buffered")),
            ("CMSTORE_STORE__READ_POLICY", Some("refresh")),
        ],
        || {
            let settings = Settings::load(None).expect("Should load settings from env");
            assert_eq!(settings.store.namespace, "prod");
            assert_eq!(settings.store.write_policy, WritePolicy::Buffered);
            assert_eq!(settings.store.read_policy, ReadPolicy::Refresh);
        },
    );
}

#[test]
fn test_backoff_delay_doubles_and_caps() {
    let policy = BackoffPolicy {
        max_retries: 5,
        base_delay_ms: 100,
        max_delay_ms: 500,
    };

    assert_eq!(policy.delay_for(1), Duration::from_millis(100));
    assert_eq!(policy.delay_for(2), Duration::from_millis(200));
    assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    // capped
    assert_eq!(policy.delay_for(4), Duration::from_millis(500));
    assert_eq!(policy.delay_for(10), Duration::from_millis(500));
}

#[test]
fn test_backoff_zero_max_retries_is_unlimited() {
    let policy = BackoffPolicy {
        max_retries: 0,
        base_delay_ms: 1,
        max_delay_ms: 1,
    };
    assert!(policy.should_retry(0));
    assert!(policy.should_retry(10_000));

    let bounded = BackoffPolicy {
        max_retries: 2,
        base_delay_ms: 1,
        max_delay_ms: 1,
    };
    assert!(bounded.should_retry(1));
    assert!(!bounded.should_retry(2));
}
