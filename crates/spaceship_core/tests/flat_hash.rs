use spaceship_core::{
    CodecError, Deck, DeckCodec, DocumentCodec, FlatHashCodec, KeySpace, KeyValueStore,
    MemoryStore, Person, RecordKind, StoreError, StoreResult, Vehicle,
};
use std::cell::Cell;
use std::collections::BTreeSet;

/// Wraps a store and fails every `set` once the budget is spent.
struct FailingStore<'a> {
    inner: &'a MemoryStore,
    sets_left: Cell<usize>,
    set_adds: Cell<usize>,
}

impl<'a> FailingStore<'a> {
    fn new(inner: &'a MemoryStore, sets_left: usize) -> Self {
        Self {
            inner,
            sets_left: Cell::new(sets_left),
            set_adds: Cell::new(0),
        }
    }
}

impl KeyValueStore for FailingStore<'_> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let left = self.sets_left.get();
        if left == 0 {
            return Err(StoreError::Unavailable(format!("write to `{key}` dropped")));
        }
        self.sets_left.set(left - 1);
        self.inner.set(key, value)
    }

    fn set_add(&self, key: &str, member: &str) -> StoreResult<()> {
        self.set_adds.set(self.set_adds.get() + 1);
        self.inner.set_add(key, member)
    }

    fn set_remove(&self, key: &str, member: &str) -> StoreResult<()> {
        self.inner.set_remove(key, member)
    }

    fn set_members(&self, key: &str) -> StoreResult<BTreeSet<String>> {
        self.inner.set_members(key)
    }
}

#[test]
fn encode_writes_one_record_per_entity_and_one_set_per_parent() {
    let store = MemoryStore::new();
    let codec = FlatHashCodec::new(&store);
    codec.encode(&example_deck()).unwrap();

    assert_eq!(
        store.keys(),
        vec![
            "deck:deck-1",
            "deck:deck-1:vehicles",
            "person:p-1",
            "vehicle:rover-1",
            "vehicle:rover-1:people",
        ]
    );
    assert_eq!(store.record_count(), 3);
    assert_eq!(store.set_count(), 2);
}

#[test]
fn records_hold_only_scalar_fields_and_owner() {
    let store = MemoryStore::new();
    FlatHashCodec::new(&store).encode(&example_deck()).unwrap();

    assert_eq!(
        record_json(&store, "deck:deck-1"),
        serde_json::json!({"id": "deck-1", "name": "main"})
    );
    assert_eq!(
        record_json(&store, "vehicle:rover-1"),
        serde_json::json!({"id": "rover-1", "deck": "deck-1", "type": "rover", "capacity": 4})
    );
    assert_eq!(
        record_json(&store, "person:p-1"),
        serde_json::json!({"id": "p-1", "vehicle": "rover-1", "name": "Kara", "role": "pilot"})
    );
    assert_eq!(
        store.set_members("vehicle:rover-1:people").unwrap(),
        BTreeSet::from(["p-1".to_string()])
    );
}

#[test]
fn re_encode_adds_no_set_members() {
    let store = MemoryStore::new();
    let counting = FailingStore::new(&store, usize::MAX);
    let codec = FlatHashCodec::new(&counting);

    codec.encode(&example_deck()).unwrap();
    assert_eq!(counting.set_adds.get(), 2);

    codec.encode(&example_deck()).unwrap();
    assert_eq!(counting.set_adds.get(), 2);
    assert_eq!(store.set_members("deck:deck-1:vehicles").unwrap().len(), 1);
}

#[test]
fn re_encode_removes_stale_set_members() {
    let store = MemoryStore::new();
    let codec = FlatHashCodec::new(&store);
    let mut deck = example_deck();
    deck.add_vehicle(Vehicle::with_id("rover-2", "rover", 2).unwrap())
        .unwrap();
    codec.encode(&deck).unwrap();

    deck.vehicles.retain(|vehicle| vehicle.id != "rover-2");
    codec.encode(&deck).unwrap();

    assert_eq!(
        store.set_members("deck:deck-1:vehicles").unwrap(),
        BTreeSet::from(["rover-1".to_string()])
    );
    // The vehicle record itself stays; only the link is dropped.
    assert!(store.get("vehicle:rover-2").unwrap().is_some());
}

#[test]
fn interrupted_encode_leaves_torn_deck_that_decode_reports() {
    let store = MemoryStore::new();
    let failing = FailingStore::new(&store, 1);

    let err = FlatHashCodec::new(&failing)
        .encode(&example_deck())
        .unwrap_err();
    assert!(matches!(err, CodecError::Store(StoreError::Unavailable(_))));

    // No rollback: the deck record and its vehicle set are already written.
    assert!(store.get("deck:deck-1").unwrap().is_some());
    assert_eq!(store.set_members("deck:deck-1:vehicles").unwrap().len(), 1);

    let torn = FlatHashCodec::new(&store).decode("deck-1").unwrap_err();
    assert!(
        matches!(
            &torn,
            CodecError::NotFound { kind: RecordKind::Vehicle, id } if id == "rover-1"
        ),
        "unexpected error: {torn}"
    );
}

#[test]
fn dangling_person_reference_names_missing_id() {
    let store = MemoryStore::new();
    let codec = FlatHashCodec::new(&store);
    codec.encode(&example_deck()).unwrap();
    store.set_add("vehicle:rover-1:people", "p-9").unwrap();

    let err = codec.decode("deck-1").unwrap_err();
    assert!(matches!(
        &err,
        CodecError::NotFound { kind: RecordKind::Person, id } if id == "p-9"
    ));
    assert_eq!(err.to_string(), "person not found: p-9");
}

#[test]
fn vehicle_cannot_move_to_another_deck() {
    let store = MemoryStore::new();
    let codec = FlatHashCodec::new(&store);
    codec.encode(&example_deck()).unwrap();

    let mut other = Deck::with_id("deck-2", "lower").unwrap();
    other
        .add_vehicle(Vehicle::with_id("rover-1", "rover", 4).unwrap())
        .unwrap();

    let err = codec.encode(&other).unwrap_err();
    assert!(matches!(
        &err,
        CodecError::DuplicateId { kind: RecordKind::Vehicle, id } if id == "rover-1"
    ));
    assert!(store.get("deck:deck-2").unwrap().is_none());
    assert_eq!(codec.decode("deck-1").unwrap(), example_deck());
}

#[test]
fn nested_document_under_deck_key_is_invalid_data() {
    let store = MemoryStore::new();
    DocumentCodec::new(&store).encode(&example_deck()).unwrap();

    let err = FlatHashCodec::new(&store).decode("deck-1").unwrap_err();
    assert!(
        matches!(&err, CodecError::InvalidData(message) if message.contains("vehicles")),
        "unexpected error: {err}"
    );
}

#[test]
fn record_with_extra_field_is_invalid_data() {
    let store = MemoryStore::new();
    let codec = FlatHashCodec::new(&store);
    codec.encode(&example_deck()).unwrap();
    store
        .set(
            "person:p-1",
            br#"{"id":"p-1","vehicle":"rover-1","name":"Kara","role":"pilot","deck":"deck-1"}"#,
        )
        .unwrap();

    let err = codec.decode("deck-1").unwrap_err();
    assert!(matches!(&err, CodecError::InvalidData(message) if message.contains("person:p-1")));
}

#[test]
fn corrupted_record_is_reported_as_invalid_data() {
    let store = MemoryStore::new();
    let codec = FlatHashCodec::new(&store);
    codec.encode(&example_deck()).unwrap();
    store.set("vehicle:rover-1", b"not json").unwrap();

    let err = codec.decode("deck-1").unwrap_err();
    assert!(matches!(&err, CodecError::InvalidData(message) if message.contains("vehicle:rover-1")));
}

#[test]
fn prefixed_key_space_namespaces_every_key() {
    let store = MemoryStore::new();
    let codec = FlatHashCodec::with_key_space(&store, KeySpace::with_prefix("spaceship:test"));
    codec.encode(&example_deck()).unwrap();

    assert!(store
        .keys()
        .iter()
        .all(|key| key.starts_with("spaceship:test:")));
    assert_eq!(codec.decode("deck-1").unwrap(), example_deck());
    assert!(FlatHashCodec::new(&store).decode("deck-1").is_err());
}

fn record_json(store: &MemoryStore, key: &str) -> serde_json::Value {
    let bytes = store.get(key).unwrap().unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn example_deck() -> Deck {
    let mut deck = Deck::with_id("deck-1", "main").unwrap();
    deck.add_vehicle(Vehicle::with_id("rover-1", "rover", 4).unwrap())
        .unwrap();
    deck.add_person("rover-1", Person::with_id("p-1", "Kara", "pilot").unwrap())
        .unwrap();
    deck
}
