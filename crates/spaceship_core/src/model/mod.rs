//! Domain model for the ship's cargo manifest.
//!
//! # Responsibility
//! - Define the deck -> vehicle -> person object graph shared by every
//!   storage strategy.
//! - Own graph validation so encoders never persist a broken graph.
//!
//! # Invariants
//! - Identifiers are unique per entity type and safe to embed in record keys.
//! - A person is claimed by exactly one vehicle of its deck.

pub mod deck;
