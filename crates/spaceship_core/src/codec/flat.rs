//! Flat-hash strategy: one flat record per entity plus relationship sets.
//!
//! # Responsibility
//! - Write scalar fields of each deck, vehicle and person to its own key.
//! - Express parent/child links as `deck:<id>:vehicles` and
//!   `vehicle:<id>:people` sets.
//!
//! # Invariants
//! - Vehicle and person records name their owner; an owner never changes.
//! - Records carry exactly their own fields; anything else, such as a nested
//!   document under `deck:<id>`, is invalid data.
//! - Writes are independent: a failed `encode` leaves earlier records in
//!   place, and a concurrent `decode` may hit a torn deck. Both surface as
//!   errors naming the missing id.

use super::{parse_record, persisted_invalid, CodecError, CodecResult, DeckCodec, RecordKind};
use crate::model::deck::{Deck, DeckId, Person, Vehicle};
use crate::store::{KeySpace, KeyValueStore};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

const STRATEGY: &str = "flat_hash";

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeckRecord {
    id: String,
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct VehicleRecord {
    id: String,
    deck: String,
    #[serde(rename = "type")]
    kind: String,
    capacity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersonRecord {
    id: String,
    vehicle: String,
    name: String,
    role: String,
}

#[derive(Debug, Default)]
struct WriteStats {
    records: usize,
    set_adds: usize,
    set_removes: usize,
}

/// Stores each deck as N flat records plus M relationship sets.
pub struct FlatHashCodec<S: KeyValueStore> {
    store: S,
    keys: KeySpace,
}

impl<S: KeyValueStore> FlatHashCodec<S> {
    pub fn new(store: S) -> Self {
        Self::with_key_space(store, KeySpace::new())
    }

    pub fn with_key_space(store: S, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    /// Rejects vehicles or people whose stored record belongs to another owner.
    fn check_owners(&self, deck: &Deck) -> CodecResult<()> {
        for vehicle in &deck.vehicles {
            let key = self.keys.vehicle(&vehicle.id);
            if let Some(bytes) = self.store.get(&key)? {
                let record: VehicleRecord = parse_record(&key, &bytes)?;
                if record.deck != deck.id {
                    warn!(
                        "event=deck_encode module=codec strategy={STRATEGY} status=rejected deck_id={} vehicle_id={} owner_deck_id={}",
                        deck.id, vehicle.id, record.deck
                    );
                    return Err(CodecError::DuplicateId {
                        kind: RecordKind::Vehicle,
                        id: vehicle.id.clone(),
                    });
                }
            }

            for person_id in &vehicle.people {
                let key = self.keys.person(person_id);
                if let Some(bytes) = self.store.get(&key)? {
                    let record: PersonRecord = parse_record(&key, &bytes)?;
                    if record.vehicle != vehicle.id {
                        warn!(
                            "event=deck_encode module=codec strategy={STRATEGY} status=rejected deck_id={} person_id={person_id} owner_vehicle_id={}",
                            deck.id, record.vehicle
                        );
                        return Err(CodecError::DuplicateId {
                            kind: RecordKind::Person,
                            id: person_id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn write(&self, deck: &Deck) -> CodecResult<WriteStats> {
        deck.validate()?;
        self.check_owners(deck)?;

        let mut stats = WriteStats::default();
        self.put(
            &self.keys.deck(&deck.id),
            &DeckRecord {
                id: deck.id.clone(),
                name: deck.name.clone(),
            },
            &mut stats,
        )?;
        self.replace_set(
            &self.keys.deck_vehicles(&deck.id),
            deck.vehicles.iter().map(|vehicle| vehicle.id.as_str()),
            &mut stats,
        )?;

        for vehicle in &deck.vehicles {
            self.write_vehicle(deck, vehicle, &mut stats)?;
        }
        Ok(stats)
    }

    fn write_vehicle(
        &self,
        deck: &Deck,
        vehicle: &Vehicle,
        stats: &mut WriteStats,
    ) -> CodecResult<()> {
        self.put(
            &self.keys.vehicle(&vehicle.id),
            &VehicleRecord {
                id: vehicle.id.clone(),
                deck: deck.id.clone(),
                kind: vehicle.kind.clone(),
                capacity: vehicle.capacity,
            },
            stats,
        )?;
        self.replace_set(
            &self.keys.vehicle_people(&vehicle.id),
            vehicle.people.iter().map(String::as_str),
            stats,
        )?;

        for person_id in &vehicle.people {
            // validate() guarantees every claimed id resolves.
            let Some(person) = deck.person(person_id) else {
                continue;
            };
            self.put(
                &self.keys.person(&person.id),
                &PersonRecord {
                    id: person.id.clone(),
                    vehicle: vehicle.id.clone(),
                    name: person.name.clone(),
                    role: person.role.clone(),
                },
                stats,
            )?;
        }
        Ok(())
    }

    fn put<T: Serialize>(&self, key: &str, record: &T, stats: &mut WriteStats) -> CodecResult<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|err| CodecError::InvalidData(format!("record `{key}`: {err}")))?;
        self.store.set(key, &bytes)?;
        stats.records += 1;
        Ok(())
    }

    /// Makes the set at `key` equal to `wanted` without duplicating members.
    fn replace_set<'a>(
        &self,
        key: &str,
        wanted: impl Iterator<Item = &'a str>,
        stats: &mut WriteStats,
    ) -> CodecResult<()> {
        let wanted: BTreeSet<&str> = wanted.collect();
        let existing = self.store.set_members(key)?;

        for member in wanted.iter().filter(|member| !existing.contains(**member)) {
            self.store.set_add(key, member)?;
            stats.set_adds += 1;
        }
        for stale in existing
            .iter()
            .filter(|member| !wanted.contains(member.as_str()))
        {
            self.store.set_remove(key, stale)?;
            stats.set_removes += 1;
        }
        Ok(())
    }

    fn read_vehicle(&self, deck_id: &str, vehicle_id: &str) -> CodecResult<VehicleRecord> {
        let key = self.keys.vehicle(vehicle_id);
        let bytes = self
            .store
            .get(&key)?
            .ok_or_else(|| CodecError::not_found(RecordKind::Vehicle, vehicle_id))?;
        let record: VehicleRecord = parse_record(&key, &bytes)?;
        if record.id != vehicle_id || record.deck != deck_id {
            return Err(CodecError::InvalidData(format!(
                "record `{key}` belongs to deck `{}`, listed under `{deck_id}`",
                record.deck
            )));
        }
        Ok(record)
    }

    fn read_person(&self, vehicle_id: &str, person_id: &str) -> CodecResult<PersonRecord> {
        let key = self.keys.person(person_id);
        let bytes = self
            .store
            .get(&key)?
            .ok_or_else(|| CodecError::not_found(RecordKind::Person, person_id))?;
        let record: PersonRecord = parse_record(&key, &bytes)?;
        if record.id != person_id || record.vehicle != vehicle_id {
            return Err(CodecError::InvalidData(format!(
                "record `{key}` belongs to vehicle `{}`, listed under `{vehicle_id}`",
                record.vehicle
            )));
        }
        Ok(record)
    }
}

impl<S: KeyValueStore> DeckCodec for FlatHashCodec<S> {
    fn strategy(&self) -> &'static str {
        STRATEGY
    }

    fn encode(&self, deck: &Deck) -> CodecResult<DeckId> {
        let started_at = Instant::now();
        match self.write(deck) {
            Ok(stats) => {
                info!(
                    "event=deck_encode module=codec strategy={STRATEGY} status=ok deck_id={} vehicles={} people={} records={} set_adds={} set_removes={} duration_ms={}",
                    deck.id,
                    deck.vehicles.len(),
                    deck.people.len(),
                    stats.records,
                    stats.set_adds,
                    stats.set_removes,
                    started_at.elapsed().as_millis()
                );
                Ok(deck.id.clone())
            }
            Err(err) => {
                // Records written before the failure stay in the store.
                error!(
                    "event=deck_encode module=codec strategy={STRATEGY} status=error deck_id={} error={err}",
                    deck.id
                );
                Err(err)
            }
        }
    }

    fn decode(&self, deck_id: &str) -> CodecResult<Deck> {
        let key = self.keys.deck(deck_id);
        let bytes = self
            .store
            .get(&key)?
            .ok_or_else(|| CodecError::not_found(RecordKind::Deck, deck_id))?;
        let record: DeckRecord = parse_record(&key, &bytes)?;
        if record.id != deck_id {
            return Err(CodecError::InvalidData(format!(
                "record `{key}` holds deck `{}`",
                record.id
            )));
        }

        let mut deck = Deck {
            id: record.id,
            name: record.name,
            vehicles: Vec::new(),
            people: Vec::new(),
        };

        for vehicle_id in self.store.set_members(&self.keys.deck_vehicles(deck_id))? {
            let vehicle_record = self.read_vehicle(deck_id, &vehicle_id)?;
            let person_ids = self
                .store
                .set_members(&self.keys.vehicle_people(&vehicle_id))?;

            for person_id in &person_ids {
                let person_record = self.read_person(&vehicle_id, person_id)?;
                deck.people.push(Person {
                    id: person_record.id,
                    name: person_record.name,
                    role: person_record.role,
                });
            }

            deck.vehicles.push(Vehicle {
                id: vehicle_record.id,
                kind: vehicle_record.kind,
                capacity: vehicle_record.capacity,
                people: person_ids,
            });
        }

        deck.canonicalize();
        deck.validate()
            .map_err(|err| persisted_invalid(deck_id, err))?;
        debug!(
            "event=deck_decode module=codec strategy={STRATEGY} status=ok deck_id={deck_id} vehicles={} people={}",
            deck.vehicles.len(),
            deck.people.len()
        );
        Ok(deck)
    }
}
