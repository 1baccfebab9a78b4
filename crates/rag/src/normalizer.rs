//! Text normalization
//!
//! Two levels:
//! - [`normalize_generic`]: neutral cleanup for keyword matching and
//!   comparisons. Folds case, accents and punctuation; never drops words.
//! - [`QueryNormalizer::normalize_for_semantics`]: retrieval-only rewrite that
//!   expands domain synonyms and maps first-person verb forms ("creo",
//!   "cargo") to their infinitive. Its output is never shown to the user.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::query_expansion::QueryExpander;

/// Marks stripped from both ends before folding
const EDGE_MARKS: &[char] = &['¿', '?', '¡', '!'];

/// First-person present → infinitive, applied on whole words
const CONJUGATION_FIXES: &[(&str, &str)] = &[
    ("creo", "crear"),
    ("cargo", "cargar"),
    ("cierro", "cerrar"),
    ("emito", "emitir"),
    ("consulto", "consultar"),
    ("defino", "definir"),
    ("doy", "dar"),
    ("agrego", "agregar"),
    ("genero", "generar"),
    ("muestro", "mostrar"),
    ("elimino", "eliminar"),
    ("borro", "borrar"),
    ("listo", "listar"),
    ("saco", "sacar"),
    ("veo", "ver"),
    ("busco", "buscar"),
    ("finalizo", "finalizar"),
    ("termino", "terminar"),
    ("registro", "registrar"),
    ("asigno", "asignar"),
    ("incorporo", "incorporar"),
    ("selecciono", "seleccionar"),
];

static CONJUGATION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CONJUGATION_FIXES
        .iter()
        .filter_map(|(conjugated, infinitive)| {
            Regex::new(&format!(r"(?i)\b{}\b", conjugated))
                .ok()
                .map(|re| (re, *infinitive))
        })
        .collect()
});

static DAR_DE_ALTA: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)\bda\s+de\s+alta\b").ok());

static COMO_CREAR: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)^\s*c[oó]mo\s+crear\b").ok());

/// Remove accents and other combining marks
///
/// Canonical decomposition first, so any precomposed letter ("ř", "Š", "ǹ")
/// splits into its base letter plus marks that are then dropped.
pub fn fold_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Neutral cleanup: trim, strip `¿?¡!` at the edges, fold accents and case,
/// turn punctuation into spaces, collapse whitespace
///
/// Idempotent. Empty input is returned unchanged.
pub fn normalize_generic(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let trimmed = text.trim().trim_matches(EDGE_MARKS);
    let folded = fold_accents(&trimmed.to_lowercase());

    let spaced: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Retrieval-side normalizer
pub struct QueryNormalizer {
    expander: QueryExpander,
}

impl QueryNormalizer {
    pub fn new(expander: QueryExpander) -> Self {
        Self { expander }
    }

    /// Synonym expansion followed by verb-form and idiom fixes
    pub fn normalize_for_semantics(&self, text: &str) -> String {
        let mut t = self.expander.expand(text.trim());

        if let Some(re) = DAR_DE_ALTA.as_ref() {
            t = re.replace_all(&t, "dar de alta").into_owned();
        }

        for (re, infinitive) in CONJUGATION_PATTERNS.iter() {
            t = re.replace_all(&t, *infinitive).into_owned();
        }

        if let Some(re) = COMO_CREAR.as_ref() {
            t = re.replace(&t, "cómo crear").into_owned();
        }

        t
    }

    /// Whether semantic normalization changes the text beyond generic cleanup
    pub fn changes(&self, text: &str) -> bool {
        normalize_generic(text) != normalize_generic(&self.normalize_for_semantics(text))
    }
}

impl Default for QueryNormalizer {
    fn default() -> Self {
        Self::new(QueryExpander::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_generic() {
        assert_eq!(normalize_generic("¿Cómo CREO una cuenta?"), "como creo una cuenta");
        assert_eq!(normalize_generic("  ¡Buenos   días!  "), "buenos dias");
        assert_eq!(normalize_generic("año, niño; pingüino."), "ano nino pinguino");
        assert_eq!(normalize_generic("asiento-contable/2024"), "asiento contable 2024");
    }

    #[test]
    fn test_normalize_generic_empty() {
        assert_eq!(normalize_generic(""), "");
        assert_eq!(normalize_generic("   "), "");
        assert_eq!(normalize_generic("¿?"), "");
    }

    #[test]
    fn test_normalize_generic_idempotent() {
        let samples = [
            "¿Cómo cierro el ejercicio 2024?",
            "Ítem: depósito Nº 3 — «urgente»",
            "e\u{0301}xito combinado",
            "ÁÉÍÓÚ ÑÜ snake_case",
            "",
            "   ",
            "1º 2ª",
        ];
        for s in samples {
            let once = normalize_generic(s);
            assert_eq!(normalize_generic(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn test_combining_marks_dropped() {
        assert_eq!(fold_accents("e\u{0301}"), "e");
        assert_eq!(normalize_generic("Cre\u{0301}o"), "creo");
    }

    #[test]
    fn test_fold_accents_beyond_spanish() {
        assert_eq!(
            normalize_generic("Dvořák Señal Škoda Zürich ǹ"),
            "dvorak senal skoda zurich n"
        );
        assert_eq!(fold_accents("Ångström"), "Angstrom");
    }

    #[test]
    fn test_normalize_for_semantics_conjugation() {
        let n = QueryNormalizer::default();
        let out = n.normalize_for_semantics("como creo una cuenta");
        assert!(out.starts_with("cómo crear una cuenta"));
        assert!(!out.split_whitespace().any(|w| w == "creo"));
    }

    #[test]
    fn test_normalize_for_semantics_idiom() {
        let n = QueryNormalizer::default();
        let out = n.normalize_for_semantics("como se da de alta un cliente");
        assert!(out.contains("dar de alta"));
    }

    #[test]
    fn test_whole_word_only() {
        let n = QueryNormalizer::default();
        let out = n.normalize_for_semantics("creolina");
        assert!(out.contains("creolina"));
    }

    #[test]
    fn test_changes() {
        let n = QueryNormalizer::default();
        assert!(n.changes("como cierro el ejercicio"));
        assert!(!n.changes("horario de atencion"));
    }
}
