//! Record key naming.
//!
//! Layout: `deck:<id>`, `vehicle:<id>`, `person:<id>`, `deck:<id>:vehicles`,
//! `vehicle:<id>:people` and the `decks` registry set, optionally behind a
//! `<prefix>:` namespace.

/// Key builder for deck records, with an optional namespace prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpace {
    prefix: Option<String>,
}

impl KeySpace {
    /// Unprefixed key space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key space whose keys all start with `<prefix>:`.
    ///
    /// A blank prefix is treated as no prefix; surrounding `:` are trimmed.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim().trim_matches(':');
        Self {
            prefix: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn deck(&self, deck_id: &str) -> String {
        self.key(&["deck", deck_id])
    }

    pub fn vehicle(&self, vehicle_id: &str) -> String {
        self.key(&["vehicle", vehicle_id])
    }

    pub fn person(&self, person_id: &str) -> String {
        self.key(&["person", person_id])
    }

    /// Set of vehicle ids parked on a deck.
    pub fn deck_vehicles(&self, deck_id: &str) -> String {
        self.key(&["deck", deck_id, "vehicles"])
    }

    /// Set of person ids aboard a vehicle.
    pub fn vehicle_people(&self, vehicle_id: &str) -> String {
        self.key(&["vehicle", vehicle_id, "people"])
    }

    /// Set of deck ids written by the document strategy.
    pub fn decks(&self) -> String {
        self.key(&["decks"])
    }

    fn key(&self, segments: &[&str]) -> String {
        let body = segments.join(":");
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{body}"),
            None => body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::KeySpace;

    #[test]
    fn default_key_space_matches_documented_layout() {
        let keys = KeySpace::new();
        assert_eq!(keys.deck("deck-1"), "deck:deck-1");
        assert_eq!(keys.vehicle("rover-1"), "vehicle:rover-1");
        assert_eq!(keys.person("p-1"), "person:p-1");
        assert_eq!(keys.deck_vehicles("deck-1"), "deck:deck-1:vehicles");
        assert_eq!(keys.vehicle_people("rover-1"), "vehicle:rover-1:people");
        assert_eq!(keys.decks(), "decks");
    }

    #[test]
    fn prefix_is_normalized() {
        let keys = KeySpace::with_prefix(" spaceship:test: ");
        assert_eq!(keys.prefix(), Some("spaceship:test"));
        assert_eq!(keys.deck("deck-1"), "spaceship:test:deck:deck-1");
        assert_eq!(keys.decks(), "spaceship:test:decks");

        assert_eq!(KeySpace::with_prefix("  "), KeySpace::new());
    }
}
