//! Country dictionary for Geoquiz.
//!
//! This crate is the game's only source of geographic truth:
//!
//! - [`CountryProvider`] — the code→name table, loaded once at startup,
//!   with random draws for question generation and display-name lookup
//!   for free-paint answer resolution.
//! - [`matching`] — tolerant answer comparison (normalization plus a
//!   bounded Levenshtein distance) so "untied states" still counts.
//! - A fixed deny-list of micro-states that are unreasonable to ask
//!   about in a flag or map quiz.
//!
//! The provider is required infrastructure: if the table cannot be
//! loaded or is empty, construction fails and the server must not start.

mod error;
mod exclusions;
pub mod matching;
mod provider;

pub use error::CountryError;
pub use provider::CountryProvider;
