//! Response validation
//!
//! Detects boilerplate refusals and strips a leading disclaimer when the rest
//! of the answer is substantive.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::prompt::REFUSAL_SENTENCE;

/// Refusal phrases that make a short answer useless
const GENERIC_PHRASES: &[&str] = &[
    "no tengo la información",
    "no puedo responder",
    "no hay información",
    "basándome en la información disponible",
    "no encuentro información",
    "no encontré información específica",
    "no se encontró información específica",
];

/// Answers at least this long are never treated as generic
const GENERIC_MAX_CHARS: usize = 200;

const DISCLAIMERS: &[&str] = &[
    "no encontré información específica en la documentación disponible",
    "no encontré información adicional específica en la documentación disponible",
    "la información que encontré no parece estar relacionada",
];

static BULLET_LINE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?m)^\s*[-•]\s+").ok());
static NUMBERED_LINE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").ok());
static PARAGRAPH_BREAK: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\n\s*\n").ok());

fn lazy_match(re: &Lazy<Option<Regex>>, text: &str) -> bool {
    re.as_ref().map_or(false, |r| r.is_match(text))
}

/// The prompt's own refusal sentence at any length, or a short answer
/// containing a boilerplate refusal phrase
pub fn is_generic_refusal(text: &str) -> bool {
    let lower = text.to_lowercase();
    if lower.contains(&REFUSAL_SENTENCE.to_lowercase()) {
        return true;
    }
    text.chars().count() < GENERIC_MAX_CHARS && GENERIC_PHRASES.iter().any(|p| lower.contains(p))
}

/// Whether the answer carries steps, lists or instructions
fn looks_substantive(text: &str) -> bool {
    let lower = text.to_lowercase();
    lazy_match(&BULLET_LINE, text)
        || lazy_match(&NUMBERED_LINE, text)
        || lower.contains("para ")
        || lower.contains("pasos")
        || lower.contains("según la documentación")
}

/// Drop a leading "no encontré información..." paragraph (or sentence when
/// there is no paragraph break) if useful content follows
///
/// Returns the input unchanged otherwise.
pub fn strip_unnecessary_disclaimer(text: &str) -> String {
    let trimmed = text.trim_start();
    let lower = trimmed.to_lowercase();

    if !DISCLAIMERS.iter().any(|d| lower.starts_with(d)) || !looks_substantive(trimmed) {
        return text.to_string();
    }

    let rest = match PARAGRAPH_BREAK.as_ref().and_then(|re| re.find(trimmed)) {
        Some(m) => &trimmed[m.end()..],
        None => match trimmed.find('.') {
            Some(idx) => &trimmed[idx + 1..],
            None => return text.to_string(),
        },
    };

    let rest = rest.trim_start();
    if rest.is_empty() {
        text.to_string()
    } else {
        rest.to_string()
    }
}
