//! Error types for the country dictionary.

/// Errors that can occur while loading the country table.
///
/// These are startup errors — the provider is mandatory infrastructure,
/// so callers are expected to fail fast rather than continue without it.
#[derive(Debug, thiserror::Error)]
pub enum CountryError {
    /// The table JSON could not be parsed.
    #[error("country table parse failed: {0}")]
    Parse(#[source] serde_json::Error),

    /// The table parsed but contains no usable entries.
    #[error("country table is empty")]
    EmptyTable,
}
