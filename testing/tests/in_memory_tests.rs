//! Tests for the in-memory collaborators

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use evently_core::document::{CollectionPath, DocumentId, Fields, Filter, Patch, Precondition, Query};
use evently_core::document_store::{DocumentStore, DocumentStoreError, WriteBatch};
use evently_core::identity::{Credentials, IdentityError, IdentityProvider};
use evently_testing::helpers::init_test_tracing;
use evently_testing::{InMemoryDocumentStore, InMemoryIdentityProvider};
use serde_json::json;

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().expect("object literal")
}

fn events() -> CollectionPath {
    CollectionPath::new("events")
}

#[tokio::test]
async fn test_create_get_and_delete() {
    init_test_tracing();
    let store = InMemoryDocumentStore::new();

    let id = store
        .create(events(), fields(json!({ "title": "RustConf" })))
        .await
        .unwrap();
    let doc = store.get(events(), id.clone()).await.unwrap().unwrap();
    assert_eq!(doc.get("title"), Some(&json!("RustConf")));

    store.delete(events(), id.clone()).await.unwrap();
    assert!(store.get(events(), id.clone()).await.unwrap().is_none());

    // Deleting again is not an error
    store.delete(events(), id).await.unwrap();
}

#[tokio::test]
async fn test_update_missing_document_is_not_found() {
    let store = InMemoryDocumentStore::new();
    let result = store
        .update(events(), DocumentId::new("ghost"), Patch::new().set("title", "x"))
        .await;
    assert!(matches!(result, Err(DocumentStoreError::NotFound { .. })));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_failed_precondition_rolls_back_whole_batch() {
    let store = InMemoryDocumentStore::new();
    let event = DocumentId::new("e1");
    store.insert(events(), event.clone(), fields(json!({ "capacity": 0 })));

    let mut batch = WriteBatch::new();
    batch.create(CollectionPath::new("tickets"), fields(json!({ "eventId": "e1" })));
    batch.update_if(
        events(),
        event.clone(),
        Precondition::field_greater_than("capacity", 0),
        Patch::new().increment("capacity", -1),
    );

    let result = store.commit(batch).await;
    assert!(matches!(result, Err(DocumentStoreError::PreconditionFailed { .. })));
    assert_eq!(store.count(&CollectionPath::new("tickets")), 0);
    assert_eq!(store.document(&events(), &event).unwrap()["capacity"], json!(0));
}

#[tokio::test]
async fn test_later_writes_see_earlier_writes_in_same_batch() {
    let store = InMemoryDocumentStore::new();
    let id = DocumentId::new("u1");
    let roles = CollectionPath::new("userRoles");

    let mut batch = WriteBatch::new();
    batch
        .upsert(roles.clone(), id.clone(), Patch::new().array_union("attendingEvents", vec![json!("a")]))
        .upsert(roles.clone(), id.clone(), Patch::new().array_union("attendingEvents", vec![json!("b")]));
    store.commit(batch).await.unwrap();

    assert_eq!(
        store.document(&roles, &id).unwrap()["attendingEvents"],
        json!(["a", "b"])
    );
}

#[tokio::test]
async fn test_query_filters_and_nested_collections() {
    let store = InMemoryDocumentStore::new();
    store.insert(events(), DocumentId::new("a"), fields(json!({ "title": "Rust Meetup", "tags": ["rust"] })));
    store.insert(events(), DocumentId::new("b"), fields(json!({ "title": "Go Meetup", "tags": ["go"] })));

    let by_prefix = store
        .query(events(), Query::new().filter(Filter::starts_with("title", "Rust")))
        .await
        .unwrap();
    assert_eq!(by_prefix.len(), 1);
    assert_eq!(by_prefix[0].id, DocumentId::new("a"));

    let any_tag = store
        .query(
            events(),
            Query::new().filter(Filter::array_contains_any("tags", vec![json!("go"), json!("rust")])),
        )
        .await
        .unwrap();
    assert_eq!(any_tag.len(), 2);

    let comments = events().nested(&DocumentId::new("a"), "comments");
    store.create(comments.clone(), fields(json!({ "content": "hi" }))).await.unwrap();
    assert_eq!(store.count(&comments), 1);
    assert_eq!(store.count(&events().nested(&DocumentId::new("b"), "comments")), 0);
}

#[tokio::test]
async fn test_fail_writes_keeps_reads_working() {
    let store = InMemoryDocumentStore::new();
    store.insert(events(), DocumentId::new("a"), fields(json!({ "title": "x" })));
    store.fail_writes(true);

    let result = store.create(events(), fields(json!({}))).await;
    assert!(matches!(result, Err(DocumentStoreError::DatabaseError(_))));
    assert!(store.get(events(), DocumentId::new("a")).await.unwrap().is_some());
    assert_eq!(store.count(&events()), 1);
}

#[tokio::test]
async fn test_concurrent_decrements_never_go_negative() {
    let store = InMemoryDocumentStore::new();
    let event = DocumentId::new("e1");
    store.insert(events(), event.clone(), fields(json!({ "capacity": 3 })));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        let event = event.clone();
        handles.push(tokio::spawn(async move {
            let mut batch = WriteBatch::new();
            batch.update_if(
                events(),
                event,
                Precondition::field_greater_than("capacity", 0),
                Patch::new().increment("capacity", -1),
            );
            store.commit(batch).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 3);
    assert_eq!(store.document(&events(), &event).unwrap()["capacity"], json!(0));
}

#[tokio::test]
async fn test_identity_provider_rules() {
    let provider = InMemoryIdentityProvider::new();

    let weak = provider.register(Credentials::new("ana@example.com", "12345")).await;
    assert_eq!(weak, Err(IdentityError::WeakPassword));

    let invalid = provider.register(Credentials::new("not-an-email", "secret1")).await;
    assert!(matches!(invalid, Err(IdentityError::InvalidEmail(_))));

    let user = provider
        .register(Credentials::new("ana@example.com", "secret1"))
        .await
        .unwrap();

    let duplicate = provider.register(Credentials::new("ANA@example.com", "secret2")).await;
    assert!(matches!(duplicate, Err(IdentityError::EmailInUse(_))));

    let signed_in = provider
        .sign_in(Credentials::new("Ana@Example.com", "secret1"))
        .await
        .unwrap();
    assert_eq!(signed_in.uid, user.uid);

    let wrong = provider.sign_in(Credentials::new("ana@example.com", "nope!!")).await;
    assert_eq!(wrong, Err(IdentityError::InvalidCredentials));
    assert_eq!(provider.len(), 1);
}
