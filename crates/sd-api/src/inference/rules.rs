//! Rule-based intent classifier: keyword matching with fixed precedence.
//!
//! Mutating intents need more evidence than read-only ones. An update also
//! needs a word referring to an existing booking, and anything ambiguous
//! falls through to Q&A.

use std::sync::LazyLock;

use regex::Regex;
use sd_protocol::Intent;

const SERVICE_KEYWORDS: &[&str] = &[
    "services",
    "service list",
    "offerings",
    "price list",
    "what do you offer",
];

/// Booking verbs only count with a cue that they are used as verbs.
const CREATE_PATTERNS: &[&str] = &[
    r"^book\b",
    r"\b(?:to|please|i|i'd|can i|could i)\s+book\b",
    r"\bbook\s+(?:a|an|the|me|us|my|in|for|one|two|three|\d+)\b",
    r"\breserve\b",
    r"\bschedule\s+(?:a|an|the|me|my|\d+)\b",
    r"\bto\s+schedule\b",
    r"\b(?:an|new)\s+appointment\b",
    r"\bsign\s*up\b",
    r"\benroll?\b",
];

static RE_CREATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(&CREATE_PATTERNS.join("|")).unwrap());

const UPDATE_KEYWORDS: &[&str] = &[
    "update",
    "change",
    "cancel",
    "reschedule",
    "modify",
    "move",
];

const REFERENCE_KEYWORDS: &[&str] = &["booking", "appointment", "reservation", "reference"];

/// Map an utterance to an intent. Pure: same text, same answer.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    let lower = lower.trim();

    if matches_any(lower, SERVICE_KEYWORDS) {
        return Intent::ServicesList;
    }

    let update = matches_any(lower, UPDATE_KEYWORDS);

    if RE_CREATE.is_match(lower) && !update {
        return Intent::AppointmentsCreate;
    }

    if update && matches_any(lower, REFERENCE_KEYWORDS) {
        return Intent::AppointmentsUpdate;
    }

    Intent::Qa
}

/// Check if text contains any of the given patterns.
fn matches_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}
