//! The country table: loading, random draws, and name lookup.

use std::collections::HashMap;

use rand::Rng;

use crate::exclusions;
use crate::matching::normalize;
use crate::CountryError;

/// The embedded code→name table, shipped with the binary so the server
/// never depends on a data file being present at runtime.
const EMBEDDED_TABLE: &str = include_str!("../countries.json");

/// Immutable country dictionary.
///
/// Loaded once at startup and shared (behind an `Arc`) by every room.
/// All lookups are read-only, so no locking is needed.
pub struct CountryProvider {
    /// code → display name.
    names: HashMap<String, String>,
    /// Codes eligible for random draws (deny-list already applied),
    /// sorted so draws are reproducible given a seeded RNG.
    drawable: Vec<String>,
    /// normalized display name → code, for free-paint answer resolution.
    by_name: HashMap<String, String>,
}

impl CountryProvider {
    /// Loads the compiled-in table.
    ///
    /// # Errors
    /// Fails if the embedded JSON is malformed or empty — both indicate
    /// a broken build, and the server must not start.
    pub fn embedded() -> Result<Self, CountryError> {
        Self::from_json_str(EMBEDDED_TABLE)
    }

    /// Parses a `{"FR": "France", ...}` JSON object into a provider.
    pub fn from_json_str(json: &str) -> Result<Self, CountryError> {
        let names: HashMap<String, String> =
            serde_json::from_str(json).map_err(CountryError::Parse)?;
        if names.is_empty() {
            return Err(CountryError::EmptyTable);
        }

        let mut drawable: Vec<String> = names
            .keys()
            .filter(|code| !exclusions::is_excluded(code))
            .cloned()
            .collect();
        drawable.sort();

        let by_name = names
            .iter()
            .map(|(code, name)| (normalize(name), code.clone()))
            .collect();

        tracing::info!(
            countries = names.len(),
            drawable = drawable.len(),
            "country table loaded"
        );

        Ok(Self {
            names,
            drawable,
            by_name,
        })
    }

    /// Draws a uniformly random non-excluded `(code, name)` pair.
    pub fn random_country(&self) -> (&str, &str) {
        let idx = rand::rng().random_range(0..self.drawable.len());
        let code = &self.drawable[idx];
        (code, &self.names[code])
    }

    /// Resolves free text to a `(code, name)` pair by case-, accent- and
    /// punctuation-insensitive exact match. `None` if the text is not a
    /// country name in the table.
    pub fn find_by_display_name(&self, text: &str) -> Option<(&str, &str)> {
        let code = self.by_name.get(&normalize(text))?;
        Some((code, &self.names[code]))
    }

    /// Returns the display name for a code, if present.
    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Whether a code is on the question deny-list.
    pub fn is_excluded(&self, code: &str) -> bool {
        exclusions::is_excluded(code)
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty (never true for a constructed provider).
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of codes eligible for random draws.
    pub fn drawable_len(&self) -> usize {
        self.drawable.len()
    }
}
