//! Deck encoding strategies.
//!
//! # Responsibility
//! - Define one `encode`/`decode` contract shared by every storage strategy.
//! - Map model, store and parse failures onto one caller-facing error type.
//!
//! # Invariants
//! - `encode` validates the whole graph before its first write.
//! - `decode` rejects invalid persisted state instead of masking it.
//! - Nothing is retried or rolled back; retry policy belongs to the caller.

use crate::model::deck::{Deck, DeckId, ModelValidationError};
use crate::store::StoreError;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod document;
pub mod flat;

pub use document::DocumentCodec;
pub use flat::FlatHashCodec;

pub type CodecResult<T> = Result<T, CodecError>;

/// Entity kind named by not-found and duplicate-id errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Deck,
    Vehicle,
    Person,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Deck => "deck",
            Self::Vehicle => "vehicle",
            Self::Person => "person",
        })
    }
}

#[derive(Debug)]
pub enum CodecError {
    /// Graph failed referential-integrity or id checks; nothing was written.
    Validation(ModelValidationError),
    /// A referenced record is absent at read time.
    NotFound { kind: RecordKind, id: String },
    /// Identifier collision on insert.
    DuplicateId { kind: RecordKind, id: String },
    /// Vehicle is full.
    NoCapacity { vehicle_id: String, capacity: u32 },
    /// Persisted bytes do not describe a valid record.
    InvalidData(String),
    Store(StoreError),
}

impl CodecError {
    pub(crate) fn not_found(kind: RecordKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::DuplicateId { kind, id } => write!(f, "duplicate {kind} id: {id}"),
            Self::NoCapacity {
                vehicle_id,
                capacity,
            } => write!(f, "vehicle {vehicle_id} is full (capacity {capacity})"),
            Self::InvalidData(message) => write!(f, "invalid persisted deck data: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound { .. }
            | Self::DuplicateId { .. }
            | Self::NoCapacity { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for CodecError {
    fn from(value: ModelValidationError) -> Self {
        match value {
            ModelValidationError::DuplicateVehicle(id) => Self::DuplicateId {
                kind: RecordKind::Vehicle,
                id,
            },
            ModelValidationError::DuplicatePerson(id) => Self::DuplicateId {
                kind: RecordKind::Person,
                id,
            },
            other => Self::Validation(other),
        }
    }
}

impl From<StoreError> for CodecError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Storage strategy for whole deck graphs.
pub trait DeckCodec {
    /// Stable strategy name used in log events.
    fn strategy(&self) -> &'static str;

    /// Persists `deck` and returns its id.
    fn encode(&self, deck: &Deck) -> CodecResult<DeckId>;

    /// Reads back the canonical deck stored under `deck_id`.
    fn decode(&self, deck_id: &str) -> CodecResult<Deck>;
}

impl<C: DeckCodec + ?Sized> DeckCodec for &C {
    fn strategy(&self) -> &'static str {
        (**self).strategy()
    }

    fn encode(&self, deck: &Deck) -> CodecResult<DeckId> {
        (**self).encode(deck)
    }

    fn decode(&self, deck_id: &str) -> CodecResult<Deck> {
        (**self).decode(deck_id)
    }
}

impl<C: DeckCodec + ?Sized> DeckCodec for Box<C> {
    fn strategy(&self) -> &'static str {
        (**self).strategy()
    }

    fn encode(&self, deck: &Deck) -> CodecResult<DeckId> {
        (**self).encode(deck)
    }

    fn decode(&self, deck_id: &str) -> CodecResult<Deck> {
        (**self).decode(deck_id)
    }
}

fn parse_record<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> CodecResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|err| CodecError::InvalidData(format!("record `{key}`: {err}")))
}

fn persisted_invalid(deck_id: &str, err: ModelValidationError) -> CodecError {
    CodecError::InvalidData(format!("deck `{deck_id}`: {err}"))
}
