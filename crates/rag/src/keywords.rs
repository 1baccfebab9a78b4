//! Domain-agnostic keyword extraction
//!
//! Heuristics only: no business vocabulary lives here.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::normalizer::normalize_generic;

/// Spanish stopwords for anchor keywords (already accent-folded)
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Prepositions
        "a", "ante", "bajo", "cabe", "con", "contra", "de", "desde", "durante", "en", "entre",
        "hacia", "hasta", "mediante", "para", "por", "segun", "sin", "so", "sobre", "tras",
        // Conjunctions and relatives
        "y", "o", "u", "e", "pero", "que", "como", "cual", "cuales",
        // Articles and pronouns
        "el", "la", "los", "las", "un", "una", "unos", "unas", "al", "del", "lo", "le", "les",
        "se", "su", "sus", "tu", "tus", "mi", "mis",
        // ser / estar / haber / tener / poder
        "es", "son", "ser", "fue", "fueron", "era", "eran", "soy", "eres", "somos", "estan",
        "esta", "estaba", "estaban", "hay", "haber", "tengo", "tiene", "tienen", "tenia",
        "tenian", "puede", "puedo", "pueden", "poder",
        // Adverbs
        "si", "no", "mas", "tambien", "ya", "aun", "solo", "muy", "menos",
        // Small numbers
        "uno", "dos", "tres", "cuatro", "cinco", "seis", "siete", "ocho", "nueve", "diez",
    ]
    .into_iter()
    .collect()
});

/// Stopwords for the focus words of a follow-up (adds demonstratives)
static FOCUS_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "ante", "bajo", "cabe", "con", "contra", "de", "del", "desde", "durante", "en",
        "entre", "hacia", "hasta", "mediante", "para", "por", "segun", "sin", "so", "sobre",
        "tras", "y", "o", "u", "e", "pero", "que", "como", "cual", "cuales", "el", "la", "los",
        "las", "un", "una", "unos", "unas", "al", "lo", "le", "les", "se", "su", "sus", "tu",
        "tus", "mi", "mis", "si", "no", "mas", "tambien", "ya", "solo", "muy", "ninguno",
        "ninguna", "ningunas", "ningunos", "este", "esta", "estos", "estas", "ese", "esa",
        "esos", "esas", "esto", "eso", "aquello", "aquel", "aquella", "aquellos", "aquellas",
    ]
    .into_iter()
    .collect()
});

/// Short list used by the keyword-only query rewrite
static QUERY_STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "como", "que", "es", "el", "la", "los", "las", "de", "en", "para", "con", "por", "una",
        "un", "se", "y", "o",
    ]
    .into_iter()
    .collect()
});

/// Whether a token is an anchor stopword
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Long tokens ending in -ar/-er/-ir are treated as bare infinitives
pub fn looks_like_infinitive(token: &str) -> bool {
    token.chars().count() > 4
        && (token.ends_with("ar") || token.ends_with("er") || token.ends_with("ir"))
}

/// Extract up to `k` keywords
///
/// Tokens shorter than 3 chars, stopwords and infinitive-looking tokens are
/// dropped. Survivors are ranked by descending frequency, then by first
/// occurrence.
pub fn extract_keywords_generic(text: &str, k: usize) -> Vec<String> {
    if text.trim().is_empty() || k == 0 {
        return Vec::new();
    }

    let normalized = normalize_generic(text);

    let mut freq: HashMap<&str, usize> = HashMap::new();
    let mut first_pos: HashMap<&str, usize> = HashMap::new();
    let mut ordered: Vec<&str> = Vec::new();

    for (i, token) in normalized.split_whitespace().enumerate() {
        if token.chars().count() < 3 || is_stopword(token) || looks_like_infinitive(token) {
            continue;
        }
        if !freq.contains_key(token) {
            first_pos.insert(token, i);
            ordered.push(token);
        }
        *freq.entry(token).or_insert(0) += 1;
    }

    ordered.sort_by(|a, b| {
        freq[b]
            .cmp(&freq[a])
            .then_with(|| first_pos[a].cmp(&first_pos[b]))
    });

    ordered.into_iter().take(k).map(str::to_string).collect()
}

/// Content words of a follow-up utterance, in order (at most `k`)
pub fn extract_focus_words(text: &str, k: usize) -> Vec<String> {
    normalize_generic(text)
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .filter(|w| !FOCUS_STOPWORDS.contains(w))
        .filter(|w| !looks_like_infinitive(w))
        .take(k)
        .map(str::to_string)
        .collect()
}

/// Short keyword-only form of a query: first `n` non-stopword tokens
///
/// Returns `None` when nothing survives filtering.
pub fn extract_main_keywords(text: &str, n: usize) -> Option<String> {
    let normalized = normalize_generic(text);
    let keywords: Vec<&str> = normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .filter(|w| !QUERY_STOPWORDS.contains(w))
        .take(n)
        .collect();

    if keywords.is_empty() {
        None
    } else {
        Some(keywords.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_by_frequency_then_position() {
        let text = "El asiento contable se registra. Cada asiento tiene fecha y el asiento se numera.";
        let kw = extract_keywords_generic(text, 8);
        assert_eq!(kw[0], "asiento");
        assert_eq!(kw[1], "contable");
        assert!(kw.contains(&"fecha".to_string()));
    }

    #[test]
    fn test_never_more_than_k() {
        let text = "uno alfa beta gamma delta epsilon zeta theta iota kappa lambda";
        assert!(extract_keywords_generic(text, 3).len() <= 3);
        assert!(extract_keywords_generic(text, 0).is_empty());
    }

    #[test]
    fn test_no_stopwords_or_infinitives() {
        let text = "Para poder cargar una cuenta hay que ingresar al menú de cuentas contables";
        let kw = extract_keywords_generic(text, 8);
        for w in &kw {
            assert!(!is_stopword(w), "stopword leaked: {w}");
            assert!(!looks_like_infinitive(w), "infinitive leaked: {w}");
            assert!(w.chars().count() >= 3);
        }
        assert!(kw.contains(&"cuenta".to_string()));
        assert!(kw.contains(&"menu".to_string()));
    }

    #[test]
    fn test_deterministic() {
        let text = "Informe de mayores. Informe de balance. Balance general.";
        assert_eq!(extract_keywords_generic(text, 8), extract_keywords_generic(text, 8));
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_keywords_generic("", 8).is_empty());
        assert!(extract_keywords_generic("   ", 8).is_empty());
    }

    #[test]
    fn test_focus_words() {
        let focus = extract_focus_words("¿y esa cuenta se puede modificar?", 4);
        assert_eq!(focus, vec!["cuenta".to_string(), "puede".to_string()]);
    }

    #[test]
    fn test_main_keywords() {
        assert_eq!(
            extract_main_keywords("como se crea una cuenta contable en el sistema", 4),
            Some("crea cuenta contable sistema".to_string())
        );
        assert_eq!(extract_main_keywords("y el", 4), None);
    }
}
