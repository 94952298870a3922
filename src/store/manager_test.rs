use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing_test::traced_test;

use crate::config::Settings;
use crate::config::WritePolicy;
use crate::constants::DEFAULT_NAME_PREFIX;
use crate::errors::Error;
use crate::errors::RemoteError;
use crate::naming::qualify;
use crate::remote::MemoryResourceClient;
use crate::remote::MockResourceClient;
use crate::remote::RemoteObject;
use crate::remote::ResourceClient;
use crate::remote::ResourceVersion;
use crate::store::StoreManager;

fn buffered_settings() -> Settings {
    let mut settings = Settings::default();
    settings.store.write_policy = WritePolicy::Buffered;
    settings
}

fn memory_manager() -> (Arc<MemoryResourceClient>, StoreManager) {
    let client = Arc::new(MemoryResourceClient::new());
    let manager = StoreManager::new(client.clone(), Settings::default());
    (client, manager)
}

#[tokio::test]
async fn test_create_if_absent_is_idempotent_without_second_remote_call() {
    let mut mock = MockResourceClient::new();
    mock.expect_create().times(1).returning(|mut object| {
        object.version = ResourceVersion::new("1");
        Ok(object)
    });

    let manager = StoreManager::new(Arc::new(mock), Settings::default());

    let first = manager.create_if_absent("foo").await.unwrap();
    let second = manager.create_if_absent("foo").await.unwrap();

    // Same handle, and the mock verifies no second create was attempted
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name().await, qualify(DEFAULT_NAME_PREFIX, "foo"));
}

#[tokio::test]
#[traced_test]
async fn test_concurrent_create_if_absent_issues_exactly_one_create() {
    let mut mock = MockResourceClient::new();
    mock.expect_create().times(1).returning(|mut object| {
        object.version = ResourceVersion::new("1");
        Ok(object)
    });

    let manager = StoreManager::new(Arc::new(mock), Settings::default());

    let callers = 8;
    let handles = join_all((0..callers).map(|_| manager.create_if_absent("foo"))).await;

    let expected = qualify(DEFAULT_NAME_PREFIX, "foo");
    for handle in handles {
        let store = handle.expect("Every caller should receive a handle");
        assert_eq!(store.name().await, expected);
    }
}

#[tokio::test]
async fn test_create_if_absent_adopts_existing_remote_object() {
    let mut mock = MockResourceClient::new();
    mock.expect_create()
        .times(1)
        .returning(|object| Err(RemoteError::AlreadyExists { name: object.name }));
    mock.expect_get().times(1).returning(|qualified_name| {
        let mut data = HashMap::new();
        data.insert("a".to_string(), "1".to_string());
        Ok(RemoteObject {
            name: qualified_name.to_string(),
            data,
            version: ResourceVersion::new("7"),
            ..Default::default()
        })
    });

    let manager = StoreManager::new(Arc::new(mock), Settings::default());

    // The race is handled transparently: the caller gets the remote's object
    let store = manager.create_if_absent("foo").await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), "1");
    assert_eq!(store.snapshot().await.version, ResourceVersion::new("7"));
}

#[tokio::test]
async fn test_created_object_carries_managed_labels_and_seed_field() {
    let (client, manager) = memory_manager();
    manager.create_if_absent("foo").await.unwrap();

    let remote = client
        .get(&qualify(DEFAULT_NAME_PREFIX, "foo"))
        .await
        .unwrap();
    assert_eq!(
        remote.labels.get("store.cmstore.io/managed"),
        Some(&"true".to_string())
    );
    assert!(remote.data.contains_key("_created_at"));
}

#[tokio::test]
async fn test_get_unknown_name_is_not_found_local() {
    // No remote expectations: get must never fetch
    let manager = StoreManager::new(Arc::new(MockResourceClient::new()), Settings::default());

    let err = manager.get("ghost").await.unwrap_err();
    assert!(err.is_not_found_local());
}

#[tokio::test]
async fn test_delete_unknown_name_is_not_found_local() {
    let manager = StoreManager::new(Arc::new(MockResourceClient::new()), Settings::default());

    let err = manager.delete("ghost").await.unwrap_err();
    assert!(err.is_not_found_local());
}

#[tokio::test]
async fn test_delete_removes_remote_object_then_registry_entry() {
    let (client, manager) = memory_manager();
    manager.create_if_absent("foo").await.unwrap();

    manager.delete("foo").await.unwrap();

    assert!(manager.get("foo").await.unwrap_err().is_not_found_local());
    let err = client
        .get(&qualify(DEFAULT_NAME_PREFIX, "foo"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Registry entry is gone, so a repeat delete fails locally
    assert!(manager.delete("foo").await.unwrap_err().is_not_found_local());
}

#[tokio::test]
async fn test_delete_surfaces_remote_not_found_and_keeps_entry() {
    let (client, manager) = memory_manager();
    manager.create_if_absent("foo").await.unwrap();

    // The object disappears remotely behind the registry's back
    client
        .delete(&qualify(DEFAULT_NAME_PREFIX, "foo"))
        .await
        .unwrap();

    let err = manager.delete("foo").await.unwrap_err();
    assert!(matches!(err, Error::Remote(ref e) if e.is_not_found()));

    // The stale entry stays for the synchronizer to evict
    assert!(manager.get("foo").await.is_ok());
}

#[tokio::test]
async fn test_list_names_is_sorted() {
    let (_client, manager) = memory_manager();
    manager.create_if_absent("zulu").await.unwrap();
    manager.create_if_absent("alpha").await.unwrap();
    manager.create_if_absent("mike").await.unwrap();

    assert_eq!(manager.list_names().await, vec!["alpha", "mike", "zulu"]);
}

#[tokio::test]
async fn test_commit_persists_buffered_writes() {
    let client = Arc::new(MemoryResourceClient::new());
    let manager = StoreManager::new(client.clone(), buffered_settings());

    let store = manager.create_if_absent("x").await.unwrap();
    store.upsert("hello", "world").await.unwrap();

    // Still local only
    let remote = client
        .get(&qualify(DEFAULT_NAME_PREFIX, "x"))
        .await
        .unwrap();
    assert!(!remote.data.contains_key("hello"));

    manager.commit(&store).await.unwrap();

    let remote = client
        .get(&qualify(DEFAULT_NAME_PREFIX, "x"))
        .await
        .unwrap();
    assert_eq!(remote.data.get("hello"), Some(&"world".to_string()));

    // The refreshed version token was folded back: a second commit works
    store.upsert("hello", "again").await.unwrap();
    manager.commit(&store).await.unwrap();
    let remote = client
        .get(&qualify(DEFAULT_NAME_PREFIX, "x"))
        .await
        .unwrap();
    assert_eq!(remote.data.get("hello"), Some(&"again".to_string()));
}

#[tokio::test]
#[traced_test]
async fn test_commit_conflict_rebases_version_and_wins() {
    let client = Arc::new(MemoryResourceClient::new());
    let manager = StoreManager::new(client.clone(), buffered_settings());

    let store = manager.create_if_absent("x").await.unwrap();
    store.upsert("ours", "1").await.unwrap();

    // A concurrent writer lands first, staling our version token
    let mut remote = client
        .get(&qualify(DEFAULT_NAME_PREFIX, "x"))
        .await
        .unwrap();
    remote
        .data
        .insert("theirs".to_string(), "2".to_string());
    client.update(remote).await.unwrap();

    // Commit retries with a rebased token; the local map is the desired
    // state, so the concurrent field is overwritten (last write wins)
    manager.commit(&store).await.unwrap();

    let remote = client
        .get(&qualify(DEFAULT_NAME_PREFIX, "x"))
        .await
        .unwrap();
    assert_eq!(remote.data.get("ours"), Some(&"1".to_string()));
    assert!(!remote.data.contains_key("theirs"));
}
