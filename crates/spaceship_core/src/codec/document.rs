//! Document strategy: one nested record per deck.
//!
//! # Invariants
//! - A deck's data occupies exactly one key, `deck:<id>`; the `decks` set
//!   only lists which deck documents exist.
//! - The document is written with a single `set`, so readers never see a
//!   partial deck.
//! - Vehicle and person ids are unique across every registered deck, and a
//!   person never moves to another vehicle while still listed.
//! - Any nested change rewrites the whole document.

use super::{parse_record, persisted_invalid, CodecError, CodecResult, DeckCodec, RecordKind};
use crate::model::deck::{Deck, DeckDocument, DeckId};
use crate::store::{KeySpace, KeyValueStore};
use log::{debug, error, info, warn};
use std::time::Instant;

const STRATEGY: &str = "document";

/// Stores each deck as a single JSON document.
pub struct DocumentCodec<S: KeyValueStore> {
    store: S,
    keys: KeySpace,
}

impl<S: KeyValueStore> DocumentCodec<S> {
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

    /// Rejects ids owned by another registered deck and people moved to a
    /// different vehicle of the same deck.
    fn check_owners(&self, deck: &Deck) -> CodecResult<()> {
        for stored_id in self.store.set_members(&self.keys.decks())? {
            let Some(stored) = self.read(&stored_id)? else {
                continue;
            };

            for vehicle in &deck.vehicles {
                if stored_id != deck.id && stored.vehicle(&vehicle.id).is_some() {
                    warn!(
                        "event=deck_encode module=codec strategy={STRATEGY} status=rejected deck_id={} vehicle_id={} owner_deck_id={stored_id}",
                        deck.id, vehicle.id
                    );
                    return Err(CodecError::DuplicateId {
                        kind: RecordKind::Vehicle,
                        id: vehicle.id.clone(),
                    });
                }

                for person_id in &vehicle.people {
                    let Some(owner) = stored.vehicle_of(person_id) else {
                        continue;
                    };
                    if stored_id != deck.id || owner.id != vehicle.id {
                        warn!(
                            "event=deck_encode module=codec strategy={STRATEGY} status=rejected deck_id={} person_id={person_id} owner_vehicle_id={}",
                            deck.id, owner.id
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

    fn write(&self, deck: &Deck) -> CodecResult<usize> {
        deck.validate()?;
        self.check_owners(deck)?;
        let bytes = serde_json::to_vec(&deck.to_document())
            .map_err(|err| CodecError::InvalidData(format!("deck `{}`: {err}", deck.id)))?;

        // Registered first: a listed id without a document is skipped on read.
        self.store.set_add(&self.keys.decks(), &deck.id)?;
        self.store.set(&self.keys.deck(&deck.id), &bytes)?;
        Ok(bytes.len())
    }

    fn read(&self, deck_id: &str) -> CodecResult<Option<Deck>> {
        let key = self.keys.deck(deck_id);
        let Some(bytes) = self.store.get(&key)? else {
            return Ok(None);
        };
        let document: DeckDocument = parse_record(&key, &bytes)?;
        if document.id != deck_id {
            return Err(CodecError::InvalidData(format!(
                "record `{key}` holds deck `{}`",
                document.id
            )));
        }

        Deck::from_document(document)
            .map(Some)
            .map_err(|err| persisted_invalid(deck_id, err))
    }
}

impl<S: KeyValueStore> DeckCodec for DocumentCodec<S> {
    fn strategy(&self) -> &'static str {
        STRATEGY
    }

    fn encode(&self, deck: &Deck) -> CodecResult<DeckId> {
        let started_at = Instant::now();
        match self.write(deck) {
            Ok(bytes) => {
                info!(
                    "event=deck_encode module=codec strategy={STRATEGY} status=ok deck_id={} vehicles={} people={} bytes={bytes} duration_ms={}",
                    deck.id,
                    deck.vehicles.len(),
                    deck.people.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(deck.id.clone())
            }
            Err(err) => {
                error!(
                    "event=deck_encode module=codec strategy={STRATEGY} status=error deck_id={} error={err}",
                    deck.id
                );
                Err(err)
            }
        }
    }

    fn decode(&self, deck_id: &str) -> CodecResult<Deck> {
        let deck = self
            .read(deck_id)?
            .ok_or_else(|| CodecError::not_found(RecordKind::Deck, deck_id))?;
        debug!(
            "event=deck_decode module=codec strategy={STRATEGY} status=ok deck_id={deck_id} vehicles={} people={}",
            deck.vehicles.len(),
            deck.people.len()
        );
        Ok(deck)
    }
}
