use couchlayer::{
    chrono::{DateTime, TimeZone, Utc},
    memory::InMemoryCouch,
    prelude::*,
    serde_json::{Value, json},
    uuid::Uuid,
};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Record)]
#[record(database = "users")]
struct User {
    id: String,
    firstname: String,
    lastname: String,
    email: String,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
#[record(database = "measurements")]
struct Measurement {
    label: String,
    #[record(id)]
    key: String,
    active: bool,
    count: i64,
    small: u8,
    ratio: f64,
    half: f32,
    taken_at: DateTime<Utc>,
    token: Uuid,
    extra: Value,
    note: Option<String>,
    samples: Vec<f64>,
    #[record(rename = "unit_name")]
    unit: String,
    #[record(skip)]
    scratch: u32,
}

async fn store() -> DocumentStore<InMemoryCouch> {
    let store = DocumentStore::new(InMemoryCouch::builder().build().await.unwrap());
    store.setup::<User>().await.unwrap();
    store.setup::<Measurement>().await.unwrap();
    store
}

fn user(firstname: &str, lastname: &str) -> User {
    User {
        firstname: firstname.into(),
        lastname: lastname.into(),
        email: format!("{firstname}@{lastname}.com"),
        ..User::default()
    }
}

fn selector(value: Value) -> Selector {
    Selector::try_from(value).unwrap()
}

#[tokio::test]
async fn user_lifecycle() {
    let store = store().await;

    let mut record = store.record(user("X", "Y"));
    assert_eq!(record.state(), RecordState::Unsaved);

    let created = record.save().await.unwrap();
    assert_eq!(created.kind, SaveKind::Created);
    record.set_identity(created.id.clone());
    assert_eq!(record.state(), RecordState::Persisted);

    record.firstname = "A".into();
    record.lastname = "B".into();
    record.email = "A@B.com".into();
    let updated = record.save().await.unwrap();
    assert_eq!(updated.kind, SaveKind::Updated);
    assert!(updated.revision.starts_with("2-"));

    let mut fetched = store.record(User::default());
    assert!(fetched.get(&created.id).await.unwrap());
    assert_eq!(*fetched.record(), *record.record());
    assert_eq!(fetched.revision(), record.revision());

    let mut found = store.record(User::default());
    let count = found
        .find(selector(json!({ "firstname": "A" })), Cursor::default())
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(found.email, "A@B.com");
    assert_eq!(found.id, created.id);

    record.delete().await.unwrap();
    assert_eq!(record.state(), RecordState::Deleted);
    assert!(!fetched.reload().await.unwrap());
    assert!(record.reload().await.unwrap_err().is_validation());
}

#[tokio::test]
async fn setup_is_idempotent() {
    let store = store().await;

    assert_eq!(store.setup::<User>().await.unwrap(), DatabaseSetup::AlreadyExists);
    assert_eq!(
        store.ensure_database("audit").await.unwrap(),
        DatabaseSetup::Created
    );
    assert_eq!(
        store.ensure_database("Audit").await.unwrap_err().status(),
        Some(StoreStatus::Other(400))
    );
}

#[tokio::test]
async fn create_with_identity_refuses_to_overwrite() {
    let store = store().await;

    let mut first = store.record(User { id: "potato".into(), ..user("Mister", "Potato") });
    let outcome = first.create().await.unwrap();
    assert_eq!(outcome.id, "potato");

    let mut second = store.record(User { id: "potato".into(), ..user("Other", "Potato") });
    let err = second.create().await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(second.last_error(), Some(&err));
    assert_eq!(second.revision(), "");

    let mut fetched = store.record(User::default());
    fetched.get("potato").await.unwrap();
    assert_eq!(fetched.firstname, "Mister");
}

#[tokio::test]
async fn stale_revision_is_a_conflict() {
    let store = store().await;

    let mut writer = store.record(user("X", "Y"));
    let outcome = writer.save().await.unwrap();
    writer.set_identity(outcome.id.clone());

    let mut other = store.record(User::default());
    other.get(&outcome.id).await.unwrap();

    writer.email = "new@Y.com".into();
    writer.save().await.unwrap();

    other.email = "other@Y.com".into();
    let err = other.save().await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(other.revision(), outcome.revision);

    assert!(other.reload().await.unwrap());
    assert_eq!(other.email, "new@Y.com");
    other.email = "other@Y.com".into();
    other.save().await.unwrap();
}

#[tokio::test]
async fn delete_needs_a_revision() {
    let store = store().await;

    let mut record = store.record(User { id: "u1".into(), ..user("X", "Y") });
    let err = record.delete().await.unwrap_err();

    assert_eq!(err, DocumentStoreError::Validation("No revision specified.".into()));
    assert_eq!(store.client().document_count("users").await, Some(0));
}

#[tokio::test]
async fn find_pages_through_matches() {
    let store = store().await;
    for name in ["a", "b", "c", "d", "e"] {
        let mut record = store.record(User { id: name.into(), ..user(name, "Family") });
        record.create().await.unwrap();
    }

    let mut page = store.record(User::default());
    let mut cursor = Cursor::builder().with_limit(2).build();
    let mut seen = Vec::new();

    loop {
        let count = page
            .find(selector(json!({ "lastname": "Family" })), cursor)
            .await
            .unwrap();
        if count == 0 {
            break;
        }
        seen.extend(page.rows_as().into_iter().map(|user| user.id));
        cursor = cursor.next();
    }

    assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn rows_expose_every_match_without_populating() {
    let store = store().await;
    for name in ["ann", "bob"] {
        store.record(user(name, "Smith")).save().await.unwrap();
    }

    let mut record = store.record(User::default());
    let count = record
        .find(selector(json!({ "lastname": "Smith" })), Cursor::default())
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(record.firstname, "");
    let mut firstnames = record
        .rows()
        .iter()
        .map(|row| row.get("firstname").and_then(Value::as_str).unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    firstnames.sort();
    assert_eq!(firstnames, vec!["ann", "bob"]);
}

#[tokio::test]
async fn every_field_type_survives_a_round_trip() {
    let store = store().await;
    let measurement = Measurement {
        label: "gauge".into(),
        key: "m-1".into(),
        active: true,
        count: -42,
        small: 7,
        ratio: 0.25,
        half: 0.5,
        taken_at: Utc.timestamp_opt(1_714_566_600, 123_456_789).unwrap(),
        token: Uuid::new_v4(),
        extra: json!({ "nested": [1, "two", null] }),
        note: Some("calibrated".into()),
        samples: vec![1.5, 2.5],
        unit: "kPa".into(),
        scratch: 99,
    };

    let mut record = store.record(measurement.clone());
    record.create().await.unwrap();

    let mut fetched = store.record(Measurement::default());
    assert!(fetched.get("m-1").await.unwrap());

    assert_eq!(
        fetched.into_inner(),
        Measurement { scratch: 0, ..measurement }
    );
}

#[test]
fn serialize_uses_keys_and_leaves_out_identity() {
    let measurement = Measurement { key: "m-1".into(), unit: "kPa".into(), scratch: 5, ..Measurement::default() };
    let body = measurement.serialize();

    assert!(!body.contains_key("key"));
    assert!(!body.contains_key("_id"));
    assert!(!body.contains_key("_rev"));
    assert!(!body.contains_key("scratch"));
    assert_eq!(body["unit_name"], json!("kPa"));
    assert_eq!(body["note"], Value::Null);
    assert_eq!(
        Measurement::fields().names(),
        vec![
            "label", "active", "count", "small", "ratio", "half", "taken_at", "token", "extra",
            "note", "samples", "unit_name",
        ]
    );
}

#[tokio::test]
async fn missing_or_mistyped_fields_populate_zero_values() {
    let store = store().await;
    store
        .client()
        .create(
            "measurements",
            Some("sparse"),
            json!({ "label": "only", "count": "not a number", "samples": [1, "x"] })
                .as_object()
                .cloned()
                .unwrap(),
        )
        .await
        .unwrap();

    let mut fetched = store.record(Measurement { active: true, ..Measurement::default() });
    assert!(fetched.get("sparse").await.unwrap());

    assert_eq!(fetched.label, "only");
    assert_eq!(fetched.key, "sparse");
    assert!(!fetched.active);
    assert_eq!(fetched.count, 0);
    assert!(fetched.samples.is_empty());
    assert_eq!(fetched.token, Uuid::nil());
    assert_eq!(fetched.note, None);
}

#[tokio::test]
async fn database_can_be_overridden_per_record() {
    let store = store().await;
    store.ensure_database("archive").await.unwrap();

    let mut record = store.record(user("X", "Y")).with_database("archive");
    record.save().await.unwrap();

    assert_eq!(store.client().document_count("archive").await, Some(1));
    assert_eq!(store.client().document_count("users").await, Some(0));
}

#[tokio::test]
async fn records_work_through_a_dynamic_store() {
    let client: Box<dyn StoreClient> = Box::new(InMemoryCouch::new());
    let store: DynDocumentStore = DocumentStore::new(client);
    store.setup::<User>().await.unwrap();

    let mut record = store.record(user("X", "Y"));
    let outcome = record.save().await.unwrap();

    let mut fetched = store.record(User::default());
    assert!(fetched.get(&outcome.id).await.unwrap());
    assert_eq!(fetched.firstname, "X");

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn shared_and_borrowed_clients_see_the_same_documents() {
    let client = Arc::new(InMemoryCouch::new());
    let shared: DocumentStore<Arc<InMemoryCouch>> = DocumentStore::new(client.clone());
    shared.setup::<User>().await.unwrap();

    let outcome = shared.record(user("X", "Y")).save().await.unwrap();

    let borrowed = DocumentStore::new(&*client);
    let mut fetched = borrowed.record(User::default());
    assert!(fetched.get(&outcome.id).await.unwrap());
    assert_eq!(fetched.email, "X@Y.com");
    assert_eq!(client.document_count("users").await, Some(1));

    shared.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_database_is_a_status_error() {
    let store = DocumentStore::new(InMemoryCouch::new());

    let err = store.record(user("X", "Y")).save().await.unwrap_err();

    assert_eq!(err.status(), Some(StoreStatus::NotFound));
    assert!(err.to_string().contains("Database does not exist."));
}
