//! Deck use-case service.
//!
//! # Responsibility
//! - Provide storage-agnostic entry points for deck callers.
//! - Implement read-modify-write use cases on top of any `DeckCodec`.
//!
//! # Invariants
//! - Service APIs never bypass codec validation.
//! - Boarding never exceeds a vehicle's capacity.
//! - Mutations re-encode the whole deck through the codec.

use crate::codec::{CodecError, CodecResult, DeckCodec, RecordKind};
use crate::model::deck::{Deck, DeckId, Person, VehicleId};
use log::info;

/// Use-case service wrapper for deck storage.
pub struct DeckService<C: DeckCodec> {
    codec: C,
}

impl<C: DeckCodec> DeckService<C> {
    /// Creates a service using the provided storage strategy.
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Persists a whole deck graph.
    pub fn store_deck(&self, deck: &Deck) -> CodecResult<DeckId> {
        self.codec.encode(deck)
    }

    /// Loads a deck graph by id.
    pub fn load_deck(&self, deck_id: &str) -> CodecResult<Deck> {
        self.codec.decode(deck_id)
    }

    /// Boards `person` onto a vehicle of a stored deck and persists the deck.
    ///
    /// # Contract
    /// - Reads the current deck, mutates it in memory, re-encodes it whole.
    /// - Not safe against concurrent writers of the same deck.
    ///
    /// # Errors
    /// - `NotFound` when the deck or vehicle does not exist.
    /// - `NoCapacity` when the vehicle is already full.
    /// - `DuplicateId` when the person id is already on the deck.
    pub fn board(&self, deck_id: &str, vehicle_id: &str, person: Person) -> CodecResult<()> {
        let mut deck = self.codec.decode(deck_id)?;
        let vehicle = deck
            .vehicle(vehicle_id)
            .ok_or_else(|| CodecError::not_found(RecordKind::Vehicle, vehicle_id))?;
        if !vehicle.has_capacity() {
            return Err(CodecError::NoCapacity {
                vehicle_id: vehicle.id.clone(),
                capacity: vehicle.capacity,
            });
        }

        let person_id = person.id.clone();
        deck.add_person(vehicle_id, person)?;
        self.codec.encode(&deck)?;

        info!(
            "event=deck_board module=service strategy={} status=ok deck_id={deck_id} vehicle_id={vehicle_id} person_id={person_id}",
            self.codec.strategy()
        );
        Ok(())
    }

    /// Looks up one person of a stored deck and the vehicle carrying them.
    ///
    /// # Errors
    /// - `NotFound` when the deck or person does not exist.
    pub fn find_person(
        &self,
        deck_id: &str,
        person_id: &str,
    ) -> CodecResult<(Person, VehicleId)> {
        let deck = self.codec.decode(deck_id)?;
        let vehicle_id = deck
            .vehicle_of(person_id)
            .map(|vehicle| vehicle.id.clone())
            .ok_or_else(|| CodecError::not_found(RecordKind::Person, person_id))?;
        let person = deck
            .person(person_id)
            .cloned()
            .ok_or_else(|| CodecError::not_found(RecordKind::Person, person_id))?;
        Ok((person, vehicle_id))
    }

    /// Removes a person from a stored deck and persists the deck.
    ///
    /// Under the flat strategy the person record stays and keeps its vehicle,
    /// so the id can only board that same vehicle again.
    ///
    /// # Errors
    /// - `NotFound` when the deck or person does not exist.
    pub fn disembark(&self, deck_id: &str, person_id: &str) -> CodecResult<Person> {
        let mut deck = self.codec.decode(deck_id)?;
        let person = deck
            .remove_person(person_id)
            .ok_or_else(|| CodecError::not_found(RecordKind::Person, person_id))?;
        self.codec.encode(&deck)?;

        info!(
            "event=deck_disembark module=service strategy={} status=ok deck_id={deck_id} person_id={person_id}",
            self.codec.strategy()
        );
        Ok(person)
    }
}
