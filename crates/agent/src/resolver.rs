//! Query resolution
//!
//! Turns an elliptical conversational turn into something a vector store can
//! answer:
//! - Acknowledgements ("sí", "dale") become an explicit "continue" intent
//! - Short follow-ups are anchored to keywords of the last informative turn
//! - Ordinal references ("el segundo") pick an item of the last listed answer
//!
//! The resolver only reads session history; it never mutates it.

use once_cell::sync::Lazy;
use regex::Regex;

use docbot_core::{ResolvedQuery, TurnRole};
use docbot_rag::{extract_focus_words, extract_keywords_generic, normalize_generic};

use crate::escalation::EscalationPolicy;
use crate::memory::Session;

/// Intent used when the user asks to keep going
pub const CONTINUE_INTENT: &str = "continuar con más detalle";

/// Focus words taken from the follow-up itself
const FOCUS_WORDS: usize = 4;

const ACKNOWLEDGEMENTS: &[&str] = &[
    "si", "sí", "ok", "dale", "de una", "claro", "por favor", "please", "hace", "hazlo", "siga",
    "segui", "sigue", "vale", "perfecto", "genial", "va",
];

const GREETINGS: &[&str] = &[
    "hola",
    "gracias",
    "chau",
    "adios",
    "buenos dias",
    "buenas tardes",
    "buenas noches",
];

/// Ordinal word forms, checked in order
const ORDINALS: &[(&str, usize)] = &[
    ("primero", 0), ("1ero", 0), ("1º", 0), ("1ro", 0), ("1°", 0), ("primer", 0), ("primera", 0),
    ("segundo", 1), ("2do", 1), ("2º", 1), ("2°", 1), ("segunda", 1),
    ("tercero", 2), ("3ero", 2), ("3º", 2), ("3°", 2), ("tercera", 2),
    ("cuarto", 3), ("4to", 3), ("4º", 3), ("4°", 3), ("cuarta", 3),
    ("quinto", 4), ("5to", 4), ("5º", 4), ("5°", 4), ("quinta", 4),
];

static TOPIC_ANNOTATION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\s*\(en el mismo tema previo\).*?$").ok());

static ANAPHORA: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"\b(el|la|los|las|del|de|sobre|ese|esa|eso|estos|estas|aquello|aquella|anterior|siguiente|puedo|eliminar|modificar|crear)\b",
    )
    .ok()
});

static LIST_ITEM: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^([-•]|\d+\.\s)\s*").ok());

static SENTENCE_BREAK: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[.;]\s+").ok());

/// Which conversational phenomenon the resolver handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Question used as typed
    Direct,
    /// "sí"/"ok" expanded into a continue intent
    Acknowledgement,
    /// Short follow-up anchored to the previous turn
    FollowUp,
    /// Ordinal reference into a listed answer
    Ordinal,
}

/// Output of resolving one turn
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Query searched as "the question itself"
    pub original: ResolvedQuery,
    /// Query carrying the prior-context anchor, if one applies
    pub anchored: ResolvedQuery,
    pub kind: ResolutionKind,
}

/// Query resolver
#[derive(Debug, Clone)]
pub struct QueryResolver {
    anchor_keywords: usize,
}

impl QueryResolver {
    pub fn new(anchor_keywords: usize) -> Self {
        Self {
            anchor_keywords: anchor_keywords.max(1),
        }
    }

    /// Short confirmation such as "sí", "ok!" or "dale"
    ///
    /// The whole utterance must be one of the known forms once case, accents
    /// and punctuation are folded. "dale, como creo una cuenta?" is a question.
    pub fn is_acknowledgement(text: &str) -> bool {
        let bare = normalize_generic(text);
        !bare.is_empty() && ACKNOWLEDGEMENTS.iter().any(|ack| normalize_generic(ack) == bare)
    }

    /// Brief utterance or one that leans on earlier context
    pub fn is_short_followup(text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        let t = match TOPIC_ANNOTATION.as_ref() {
            Some(re) => re.replace(&lower, "").into_owned(),
            None => lower,
        };

        if t.trim().is_empty() || GREETINGS.contains(&normalize_generic(&t).as_str()) {
            return false;
        }

        if t.split_whitespace().count() <= 6 {
            return true;
        }

        ANAPHORA.as_ref().map_or(false, |re| re.is_match(&t))
    }

    /// Zero-based index named by an ordinal word, if any
    pub fn ordinal_index(text: &str) -> Option<usize> {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !(c.is_alphanumeric() || c == 'º' || c == '°'))
            .filter(|t| !t.is_empty())
            .collect();

        ORDINALS
            .iter()
            .find(|(word, _)| tokens.contains(word))
            .map(|(_, idx)| *idx)
    }

    /// Last assistant turn that is not an escalation reply, or failing that
    /// the last user turn that is not an acknowledgement
    pub fn last_informative_turn<'a>(&self, session: &'a Session) -> Option<&'a str> {
        session
            .last_by_role(TurnRole::Assistant, EscalationPolicy::is_escalation_message)
            .or_else(|| session.last_by_role(TurnRole::User, Self::is_acknowledgement))
    }

    /// "continuar con más detalle" anchored to the last informative turn
    pub fn expand_acknowledgement(&self, session: &Session) -> ResolvedQuery {
        let keywords = self
            .last_informative_turn(session)
            .map(|text| extract_keywords_generic(text, self.anchor_keywords))
            .unwrap_or_default();
        ResolvedQuery::anchored(CONTINUE_INTENT, keywords)
    }

    /// Resolve "el segundo" against the items of the last informative turn
    pub fn resolve_ordinal(&self, question: &str, session: &Session) -> Option<ResolvedQuery> {
        let idx = Self::ordinal_index(question)?;
        let source = self.last_informative_turn(session)?;
        let items = split_items(source);
        let chosen = items.get(idx)?;

        let head = match SENTENCE_BREAK.as_ref() {
            Some(re) => re.split(chosen).next().unwrap_or(chosen),
            None => chosen.as_str(),
        };

        let mut keywords = extract_keywords_generic(head, self.anchor_keywords);
        if keywords.is_empty() {
            keywords = head.split_whitespace().map(str::to_string).collect();
        }

        tracing::debug!(index = idx, item = %head, "Resolved ordinal reference");
        Some(ResolvedQuery::anchored(CONTINUE_INTENT, keywords))
    }

    /// Anchor a follow-up with its own focus words plus prior keywords
    ///
    /// Returns the question unanchored when nothing can be attached.
    pub fn anchor_followup(&self, question: &str, session: &Session) -> ResolvedQuery {
        let question = question.trim();
        let normalized = normalize_generic(question);

        let mut merged: Vec<String> = Vec::new();
        if normalized.contains("modificarla") {
            merged.extend(["modificar".to_string(), "modificarla".to_string()]);
        }
        if normalized.contains("eliminarlas") {
            merged.extend(["eliminar".to_string(), "eliminarlas".to_string()]);
        }

        let focus = extract_focus_words(question, FOCUS_WORDS);
        let keywords = self
            .last_informative_turn(session)
            .map(|text| extract_keywords_generic(text, self.anchor_keywords))
            .unwrap_or_default();

        for word in focus.into_iter().chain(keywords) {
            if !merged.contains(&word) {
                merged.push(word);
            }
        }

        ResolvedQuery::anchored(question, merged)
    }

    /// Resolve one turn against the session history
    pub fn resolve(&self, question: &str, session: &Session) -> Resolution {
        if Self::is_acknowledgement(question) {
            let expanded = self.expand_acknowledgement(session);
            return Resolution {
                original: expanded.clone(),
                anchored: expanded,
                kind: ResolutionKind::Acknowledgement,
            };
        }

        let original = ResolvedQuery::new(question.trim());

        if session.is_empty() || !Self::is_short_followup(question) {
            return Resolution {
                anchored: original.clone(),
                original,
                kind: ResolutionKind::Direct,
            };
        }

        if let Some(ordinal) = self.resolve_ordinal(question, session) {
            return Resolution {
                original,
                anchored: ordinal,
                kind: ResolutionKind::Ordinal,
            };
        }

        let anchored = self.anchor_followup(question, session);
        let kind = if anchored.is_anchored() {
            ResolutionKind::FollowUp
        } else {
            ResolutionKind::Direct
        };
        Resolution {
            original,
            anchored,
            kind,
        }
    }
}

impl Default for QueryResolver {
    fn default() -> Self {
        Self::new(docbot_config::constants::conversation::ANCHOR_KEYWORDS)
    }
}

/// Bulleted or numbered lines, else paragraphs of more than three words
fn split_items(text: &str) -> Vec<String> {
    let items: Vec<String> = match LIST_ITEM.as_ref() {
        Some(re) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && re.is_match(line))
            .map(|line| re.replace(line, "").trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    if !items.is_empty() {
        return items;
    }

    text.split("\n\n")
        .map(str::trim)
        .filter(|p| p.split_whitespace().count() > 3)
        .map(str::to_string)
        .collect()
}
