//! The fixed deny-list of countries never drawn as questions.
//!
//! Micro-states and city-states whose flags and map outlines are too
//! obscure (or too small to click) for a recognition quiz. The list is
//! deliberately a compile-time constant: it is part of the game design,
//! not configuration.

/// ISO codes excluded from random draws.
pub(crate) const EXCLUDED_CODES: [&str; 17] = [
    "VA", // Vatican City
    "MC", // Monaco
    "SM", // San Marino
    "LI", // Liechtenstein
    "MT", // Malta
    "MV", // Maldives
    "KN", // Saint Kitts and Nevis
    "MH", // Marshall Islands
    "LC", // Saint Lucia
    "SG", // Singapore
    "TO", // Tonga
    "DM", // Dominica
    "BB", // Barbados
    "ST", // Sao Tome and Principe
    "KI", // Kiribati
    "NR", // Nauru
    "TV", // Tuvalu
];

pub(crate) fn is_excluded(code: &str) -> bool {
    EXCLUDED_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vatican_is_excluded() {
        assert!(is_excluded("VA"));
    }

    #[test]
    fn test_france_is_not_excluded() {
        assert!(!is_excluded("FR"));
    }

    #[test]
    fn test_exclusion_is_case_sensitive_upper() {
        // Codes in the table are uppercase; the deny-list matches exactly.
        assert!(!is_excluded("va"));
    }
}
