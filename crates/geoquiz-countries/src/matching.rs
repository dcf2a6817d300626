//! Tolerant answer matching.
//!
//! Player answers arrive as free text under time pressure. Exact string
//! comparison would punish "untied states" or "Cote d'Ivoire", so
//! answers are normalized (lowercased, accents folded, punctuation and
//! whitespace stripped) and then compared with a bounded Levenshtein
//! distance.

/// Returns `true` if `answer` matches `expected` within `max_distance`
/// edits after normalization.
pub fn fuzzy_match(answer: &str, expected: &str, max_distance: usize) -> bool {
    let answer = normalize(answer);
    let expected = normalize(expected);

    if answer == expected {
        return true;
    }

    levenshtein(&answer, &expected) <= max_distance
}

/// Normalizes a country name for comparison: lowercase, common Latin
/// accents folded to ASCII, everything except letters and digits dropped.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().flat_map(fold_accent) {
        for lc in c.to_lowercase() {
            if lc.is_alphanumeric() {
                out.push(lc);
            }
        }
    }
    out
}

/// Folds the accented Latin characters that actually occur in country
/// names down to their ASCII base. Not a general Unicode decomposition —
/// just the cases the table needs.
fn fold_accent(c: char) -> std::option::IntoIter<char> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Î' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'Ó' | 'Ô' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other,
    };
    Some(folded).into_iter()
}

/// Classic two-row Levenshtein distance over bytes of the normalized
/// (ASCII-only) strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
