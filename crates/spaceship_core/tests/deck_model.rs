use spaceship_core::{Deck, DeckDocument, ModelValidationError, Person, Vehicle};

#[test]
fn generated_ids_are_unique_and_valid() {
    let first = Deck::new("main");
    let second = Deck::new("main");

    assert_ne!(first.id, second.id);
    assert!(first.validate().is_ok());
    assert!(Vehicle::new("rover", 4).people.is_empty());
    assert!(!Person::new("Kara", "pilot").id.is_empty());
}

#[test]
fn with_id_rejects_key_unsafe_ids() {
    assert_eq!(
        Deck::with_id("deck:1", "main").unwrap_err(),
        ModelValidationError::InvalidId("deck:1".to_string())
    );
    assert!(Vehicle::with_id("", "rover", 1).is_err());
    assert!(Person::with_id("p 1", "Kara", "pilot").is_err());
}

#[test]
fn add_vehicle_and_person_reject_duplicates() {
    let mut deck = example_deck();

    let vehicle_err = deck
        .add_vehicle(Vehicle::with_id("rover-1", "rover", 1).unwrap())
        .unwrap_err();
    assert_eq!(
        vehicle_err,
        ModelValidationError::DuplicateVehicle("rover-1".to_string())
    );

    let person_err = deck
        .add_person("rover-1", Person::with_id("p-1", "Kai", "cook").unwrap())
        .unwrap_err();
    assert_eq!(
        person_err,
        ModelValidationError::DuplicatePerson("p-1".to_string())
    );
    assert_eq!(deck, example_deck());
}

#[test]
fn validate_rejects_person_without_vehicle() {
    let mut deck = example_deck();
    deck.people
        .push(Person::with_id("p-2", "Bob", "engineer").unwrap());

    assert_eq!(
        deck.validate().unwrap_err(),
        ModelValidationError::UnassignedPerson("p-2".to_string())
    );
}

#[test]
fn validate_reports_first_unknown_reference() {
    let mut deck = example_deck();
    deck.vehicles[0].people.insert("p-0".to_string());

    let err = deck.validate().unwrap_err();
    assert_eq!(
        err,
        ModelValidationError::UnknownPerson {
            vehicle_id: "rover-1".to_string(),
            person_id: "p-0".to_string(),
        }
    );
    assert_eq!(err.to_string(), "vehicle `rover-1` references unknown person `p-0`");
}

#[test]
fn remove_person_unlinks_from_vehicle() {
    let mut deck = example_deck();

    let removed = deck.remove_person("p-1").unwrap();
    assert_eq!(removed.name, "Kara");
    assert!(deck.people.is_empty());
    assert!(deck.vehicle("rover-1").unwrap().people.is_empty());
    assert!(deck.validate().is_ok());
    assert_eq!(deck.remove_person("p-1"), None);
}

#[test]
fn from_document_canonicalizes_order() {
    let document: DeckDocument = serde_json::from_value(serde_json::json!({
        "id": "deck-1",
        "name": "main",
        "vehicles": [
            {"id": "rover-2", "type": "rover", "capacity": 2,
             "people": [{"id": "p-2", "name": "Bob", "role": "engineer"}]},
            {"id": "rover-1", "type": "rover", "capacity": 4,
             "people": [{"id": "p-1", "name": "Kara", "role": "pilot"}]}
        ]
    }))
    .unwrap();

    let deck = Deck::from_document(document).unwrap();
    let vehicle_ids: Vec<_> = deck.vehicles.iter().map(|v| v.id.as_str()).collect();
    let person_ids: Vec<_> = deck.people.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(vehicle_ids, ["rover-1", "rover-2"]);
    assert_eq!(person_ids, ["p-1", "p-2"]);
    assert_eq!(Deck::from_document(deck.to_document()).unwrap(), deck);
}

#[test]
fn from_document_rejects_person_listed_twice() {
    let person = Person::with_id("p-1", "Kara", "pilot").unwrap();
    let document = DeckDocument {
        id: "deck-1".to_string(),
        name: "main".to_string(),
        vehicles: vec![spaceship_core::VehicleDocument {
            id: "rover-1".to_string(),
            kind: "rover".to_string(),
            capacity: 4,
            people: vec![person.clone(), person],
        }],
    };

    assert_eq!(
        Deck::from_document(document).unwrap_err(),
        ModelValidationError::DuplicatePerson("p-1".to_string())
    );
}

#[test]
fn from_document_rejects_negative_capacity() {
    let result = serde_json::from_value::<DeckDocument>(serde_json::json!({
        "id": "deck-1",
        "name": "main",
        "vehicles": [{"id": "rover-1", "type": "rover", "capacity": -1, "people": []}]
    }));

    assert!(result.is_err());
}

fn example_deck() -> Deck {
    let mut deck = Deck::with_id("deck-1", "main").unwrap();
    deck.add_vehicle(Vehicle::with_id("rover-1", "rover", 4).unwrap())
        .unwrap();
    deck.add_person("rover-1", Person::with_id("p-1", "Kara", "pilot").unwrap())
        .unwrap();
    deck
}
