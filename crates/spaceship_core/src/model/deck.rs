//! Deck, vehicle and person domain types.
//!
//! # Responsibility
//! - Hold the in-memory graph in a normalized shape: people live on the deck,
//!   vehicles reference them by id.
//! - Convert to and from the nested document view used by document storage.
//!
//! # Invariants
//! - Builder methods keep `vehicles` and `people` sorted by id, so two graphs
//!   with the same content compare equal.
//! - `validate()` must pass before a graph is persisted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier of a deck. Embedded in record keys such as `deck:<id>`.
pub type DeckId = String;
/// Identifier of a vehicle.
pub type VehicleId = String;
/// Identifier of a person.
pub type PersonId = String;

// `:` separates key segments, so it can never appear inside an id.
static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid id regex"));

/// Returns whether `value` can be used as an entity identifier.
pub fn is_valid_id(value: &str) -> bool {
    ID_RE.is_match(value)
}

/// Graph-level validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Identifier is empty or contains characters not allowed in keys.
    InvalidId(String),
    /// Two vehicles share one id.
    DuplicateVehicle(VehicleId),
    /// Two people share one id.
    DuplicatePerson(PersonId),
    /// A person is boarded onto a vehicle that is not on the deck.
    UnknownVehicle(VehicleId),
    /// A vehicle references a person id that does not exist on the deck.
    UnknownPerson {
        vehicle_id: VehicleId,
        person_id: PersonId,
    },
    /// A person id is already claimed by another vehicle.
    PersonClaimedTwice {
        person_id: PersonId,
        first_vehicle: VehicleId,
        second_vehicle: VehicleId,
    },
    /// A person is not claimed by any vehicle.
    UnassignedPerson(PersonId),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "invalid identifier `{id}`"),
            Self::DuplicateVehicle(id) => write!(f, "duplicate vehicle id `{id}`"),
            Self::DuplicatePerson(id) => write!(f, "duplicate person id `{id}`"),
            Self::UnknownVehicle(id) => write!(f, "vehicle `{id}` is not on this deck"),
            Self::UnknownPerson {
                vehicle_id,
                person_id,
            } => write!(
                f,
                "vehicle `{vehicle_id}` references unknown person `{person_id}`"
            ),
            Self::PersonClaimedTwice {
                person_id,
                first_vehicle,
                second_vehicle,
            } => write!(
                f,
                "person `{person_id}` is claimed by both `{first_vehicle}` and `{second_vehicle}`"
            ),
            Self::UnassignedPerson(id) => write!(f, "person `{id}` is not in any vehicle"),
        }
    }
}

impl Error for ModelValidationError {}

/// One crew member or passenger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub role: String,
}

impl Person {
    /// Creates a person with a generated id.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            role: role.into(),
        }
    }

    /// Creates a person with a caller-provided id.
    ///
    /// # Errors
    /// - `InvalidId` when `id` cannot be embedded in a record key.
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> Result<Self, ModelValidationError> {
        let id = checked_id(id.into())?;
        Ok(Self {
            id,
            name: name.into(),
            role: role.into(),
        })
    }
}

/// A vehicle parked on a deck, carrying people.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Vehicle type, e.g. `rover`. Serialized as `type`.
    pub kind: String,
    /// Maximum number of people this vehicle carries.
    pub capacity: u32,
    /// Ids of the people aboard.
    pub people: BTreeSet<PersonId>,
}

impl Vehicle {
    /// Creates an empty vehicle with a generated id.
    pub fn new(kind: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            capacity,
            people: BTreeSet::new(),
        }
    }

    /// Creates an empty vehicle with a caller-provided id.
    pub fn with_id(
        id: impl Into<String>,
        kind: impl Into<String>,
        capacity: u32,
    ) -> Result<Self, ModelValidationError> {
        let id = checked_id(id.into())?;
        Ok(Self {
            id,
            kind: kind.into(),
            capacity,
            people: BTreeSet::new(),
        })
    }

    /// Returns whether one more person fits aboard.
    pub fn has_capacity(&self) -> bool {
        u32::try_from(self.people.len()).map_or(false, |aboard| aboard < self.capacity)
    }
}

/// Top-level container: a ship deck and everything on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    pub vehicles: Vec<Vehicle>,
    /// Every person on the deck; each one belongs to exactly one vehicle.
    pub people: Vec<Person>,
}

impl Deck {
    /// Creates an empty deck with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            vehicles: Vec::new(),
            people: Vec::new(),
        }
    }

    /// Creates an empty deck with a caller-provided id.
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ModelValidationError> {
        let id = checked_id(id.into())?;
        Ok(Self {
            id,
            name: name.into(),
            vehicles: Vec::new(),
            people: Vec::new(),
        })
    }

    /// Parks a vehicle on this deck, keeping vehicles sorted by id.
    ///
    /// People already listed in `vehicle.people` must be added with
    /// [`Deck::add_person`] or `validate()` will reject the graph.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<(), ModelValidationError> {
        checked_id_ref(&vehicle.id)?;
        match self
            .vehicles
            .binary_search_by(|entry| entry.id.as_str().cmp(vehicle.id.as_str()))
        {
            Ok(_) => Err(ModelValidationError::DuplicateVehicle(vehicle.id)),
            Err(index) => {
                self.vehicles.insert(index, vehicle);
                Ok(())
            }
        }
    }

    /// Adds a person to the deck and boards them onto `vehicle_id`.
    ///
    /// Capacity is not checked here; see `DeckService::board`.
    pub fn add_person(
        &mut self,
        vehicle_id: &str,
        person: Person,
    ) -> Result<(), ModelValidationError> {
        checked_id_ref(&person.id)?;
        let person_index = match self
            .people
            .binary_search_by(|entry| entry.id.as_str().cmp(person.id.as_str()))
        {
            Ok(_) => return Err(ModelValidationError::DuplicatePerson(person.id)),
            Err(index) => index,
        };
        let vehicle = self
            .vehicles
            .iter_mut()
            .find(|vehicle| vehicle.id == vehicle_id)
            .ok_or_else(|| ModelValidationError::UnknownVehicle(vehicle_id.to_string()))?;

        vehicle.people.insert(person.id.clone());
        self.people.insert(person_index, person);
        Ok(())
    }

    /// Takes a person off the deck and out of their vehicle.
    pub fn remove_person(&mut self, person_id: &str) -> Option<Person> {
        let index = self
            .people
            .binary_search_by(|entry| entry.id.as_str().cmp(person_id))
            .ok()?;
        for vehicle in &mut self.vehicles {
            vehicle.people.remove(person_id);
        }
        Some(self.people.remove(index))
    }

    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|vehicle| vehicle.id == id)
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|person| person.id == id)
    }

    /// Returns the vehicle that claims `person_id`.
    pub fn vehicle_of(&self, person_id: &str) -> Option<&Vehicle> {
        self.vehicles
            .iter()
            .find(|vehicle| vehicle.people.contains(person_id))
    }

    /// Sorts vehicles and people by id.
    pub fn canonicalize(&mut self) {
        self.vehicles.sort_by(|a, b| a.id.cmp(&b.id));
        self.people.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// Checks identifier rules and referential integrity of the whole graph.
    ///
    /// # Errors
    /// - `InvalidId` for any id that cannot be embedded in a record key.
    /// - `DuplicateVehicle` / `DuplicatePerson` for id collisions.
    /// - `UnknownPerson` when a vehicle references a person not on the deck.
    /// - `PersonClaimedTwice` when two vehicles reference one person.
    /// - `UnassignedPerson` when a person belongs to no vehicle.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        checked_id_ref(&self.id)?;

        let mut vehicle_ids = HashSet::new();
        for vehicle in &self.vehicles {
            checked_id_ref(&vehicle.id)?;
            if !vehicle_ids.insert(vehicle.id.as_str()) {
                return Err(ModelValidationError::DuplicateVehicle(vehicle.id.clone()));
            }
        }

        let mut person_ids = HashSet::new();
        for person in &self.people {
            checked_id_ref(&person.id)?;
            if !person_ids.insert(person.id.as_str()) {
                return Err(ModelValidationError::DuplicatePerson(person.id.clone()));
            }
        }

        let mut claimed: HashMap<&str, &str> = HashMap::new();
        for vehicle in &self.vehicles {
            for person_id in &vehicle.people {
                if !person_ids.contains(person_id.as_str()) {
                    return Err(ModelValidationError::UnknownPerson {
                        vehicle_id: vehicle.id.clone(),
                        person_id: person_id.clone(),
                    });
                }
                if let Some(first) = claimed.insert(person_id.as_str(), vehicle.id.as_str()) {
                    return Err(ModelValidationError::PersonClaimedTwice {
                        person_id: person_id.clone(),
                        first_vehicle: first.to_string(),
                        second_vehicle: vehicle.id.clone(),
                    });
                }
            }
        }

        if let Some(person) = self
            .people
            .iter()
            .find(|person| !claimed.contains_key(person.id.as_str()))
        {
            return Err(ModelValidationError::UnassignedPerson(person.id.clone()));
        }

        Ok(())
    }

    /// Builds the nested document view of this deck.
    ///
    /// Person ids that do not resolve are skipped; call `validate()` first
    /// when the graph comes from an untrusted source.
    pub fn to_document(&self) -> DeckDocument {
        let people: BTreeMap<&str, &Person> = self
            .people
            .iter()
            .map(|person| (person.id.as_str(), person))
            .collect();

        DeckDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            vehicles: self
                .vehicles
                .iter()
                .map(|vehicle| VehicleDocument {
                    id: vehicle.id.clone(),
                    kind: vehicle.kind.clone(),
                    capacity: vehicle.capacity,
                    people: vehicle
                        .people
                        .iter()
                        .filter_map(|id| people.get(id.as_str()).map(|person| (*person).clone()))
                        .collect(),
                })
                .collect(),
        }
    }

    /// Rebuilds a normalized deck from its nested document view.
    ///
    /// The result is canonical and validated.
    pub fn from_document(document: DeckDocument) -> Result<Self, ModelValidationError> {
        let mut deck = Self {
            id: document.id,
            name: document.name,
            vehicles: Vec::with_capacity(document.vehicles.len()),
            people: Vec::new(),
        };
        let mut owners: HashMap<PersonId, VehicleId> = HashMap::new();

        for vehicle_doc in document.vehicles {
            let mut vehicle = Vehicle {
                id: vehicle_doc.id,
                kind: vehicle_doc.kind,
                capacity: vehicle_doc.capacity,
                people: BTreeSet::new(),
            };
            for person in vehicle_doc.people {
                if let Some(first) = owners.get(&person.id) {
                    if *first == vehicle.id {
                        return Err(ModelValidationError::DuplicatePerson(person.id));
                    }
                    return Err(ModelValidationError::PersonClaimedTwice {
                        person_id: person.id,
                        first_vehicle: first.clone(),
                        second_vehicle: vehicle.id,
                    });
                }
                owners.insert(person.id.clone(), vehicle.id.clone());
                vehicle.people.insert(person.id.clone());
                deck.people.push(person);
            }
            deck.vehicles.push(vehicle);
        }

        deck.canonicalize();
        deck.validate()?;
        Ok(deck)
    }
}

/// Nested, self-contained view of a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckDocument {
    pub id: DeckId,
    pub name: String,
    pub vehicles: Vec<VehicleDocument>,
}

/// Vehicle entry of a [`DeckDocument`] with its people inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDocument {
    pub id: VehicleId,
    #[serde(rename = "type")]
    pub kind: String,
    pub capacity: u32,
    pub people: Vec<Person>,
}

fn checked_id(id: String) -> Result<String, ModelValidationError> {
    checked_id_ref(&id)?;
    Ok(id)
}

fn checked_id_ref(id: &str) -> Result<(), ModelValidationError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(ModelValidationError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_id, Deck, ModelValidationError, Person, Vehicle};

    #[test]
    fn id_rules_reject_key_separators() {
        assert!(is_valid_id("rover-1"));
        assert!(is_valid_id("p.2_b"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("deck:1"));
        assert!(!is_valid_id("-leading"));
        assert!(!is_valid_id("has space"));
    }

    #[test]
    fn builders_keep_graph_sorted() {
        let mut deck = Deck::with_id("deck-1", "main").unwrap();
        deck.add_vehicle(Vehicle::with_id("rover-2", "rover", 2).unwrap())
            .unwrap();
        deck.add_vehicle(Vehicle::with_id("rover-1", "rover", 2).unwrap())
            .unwrap();
        deck.add_person("rover-2", Person::with_id("p-2", "Ivo", "medic").unwrap())
            .unwrap();
        deck.add_person("rover-1", Person::with_id("p-1", "Kara", "pilot").unwrap())
            .unwrap();

        let vehicle_ids: Vec<_> = deck.vehicles.iter().map(|v| v.id.as_str()).collect();
        let person_ids: Vec<_> = deck.people.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(vehicle_ids, ["rover-1", "rover-2"]);
        assert_eq!(person_ids, ["p-1", "p-2"]);
        assert_eq!(deck.vehicle_of("p-2").unwrap().id, "rover-2");
    }

    #[test]
    fn add_person_rejects_unknown_vehicle() {
        let mut deck = Deck::with_id("deck-1", "main").unwrap();
        let err = deck
            .add_person("ghost", Person::with_id("p-1", "Kara", "pilot").unwrap())
            .unwrap_err();
        assert_eq!(err, ModelValidationError::UnknownVehicle("ghost".to_string()));
        assert!(deck.people.is_empty());
    }

    #[test]
    fn has_capacity_counts_people_aboard() {
        let mut vehicle = Vehicle::with_id("pod", "escape_pod", 1).unwrap();
        assert!(vehicle.has_capacity());
        vehicle.people.insert("p-1".to_string());
        assert!(!vehicle.has_capacity());

        let parked = Vehicle::with_id("crate", "cargo", 0).unwrap();
        assert!(!parked.has_capacity());
    }
}
