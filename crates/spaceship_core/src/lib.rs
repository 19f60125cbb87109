//! Deck storage for a stranded spaceship crew.
//!
//! One deck -> vehicle -> person graph, persisted over a minimal key-value
//! store either as flat records plus relationship sets or as one nested
//! document.

pub mod codec;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use codec::{CodecError, CodecResult, DeckCodec, DocumentCodec, FlatHashCodec, RecordKind};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::deck::{
    Deck, DeckDocument, DeckId, ModelValidationError, Person, PersonId, Vehicle, VehicleDocument,
    VehicleId,
};
pub use service::deck_service::DeckService;
pub use store::{KeySpace, KeyValueStore, MemoryStore, SqliteStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
