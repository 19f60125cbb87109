//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate codec calls into use-case level APIs.
//! - Keep callers decoupled from the chosen storage strategy.

pub mod deck_service;
