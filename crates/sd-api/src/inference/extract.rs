//! Booking field extraction.
//!
//! Create path: an ordered pipeline of pure rule stages (email, phone,
//! session count, name, schedule, service). Each stage only touches a field
//! that is still unknown and records either the value or "absent". The
//! pipeline stops early once every field is known. Whatever is left goes to
//! a single gap-filling chat call, the only stage allowed to leave the
//! process. Model failures never surface: fields just stay empty.
//!
//! Update path: one chat call for the booking id plus changed fields, with a
//! regex fallback that recovers the id alone.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};

use sd_protocol::{AppointmentPatch, BookingField, ExtractedBookingFields, ServiceRecord};
use sd_rag::{ChatModel, extract_json};

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static RE_PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+?\d[\d\s().-]{5,}\d").unwrap());

/// Digit runs that look like part of a phone but are dates, times or session counts.
static RE_NOT_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b\d{4}[-/.]\d{1,2}[-/.]\d{1,2}(?:[ T]\d{1,2}(?::\d{2})?\b)?",
        r"|\b\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}(?:\s\d{1,2}(?::\d{2})?\b)?",
        r"|\b\d{1,2}:\d{2}\b",
        r"|\b\d{1,2}\s*[ap]m\b",
        r"|\b\d+\s*sessions?\b",
    ))
    .unwrap()
});

static RE_PHONE_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:phone|mobile|number|tel|call)\b").unwrap());

static RE_SESSION_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*sessions?\b").unwrap());

static RE_TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btotal\s+(?:of\s+)?(\d+)\b").unwrap());

static RE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:for)\s+([A-Z][A-Za-z'-]*(?:\s+[A-Z][A-Za-z'-]*){0,2})").unwrap()
});

static RE_FIRST_SESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfirst\s+session\b[^;\n|]*").unwrap());

static RE_SESSION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsession\s*\d+").unwrap());

static RE_BOOKING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z0-9]{6,12}\b").unwrap());

static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").unwrap());

/// Capitalized words that follow "for" without being a name.
const NAME_STOPWORDS: &[&str] = &["The", "A", "An", "My", "Me", "Us", "Session", "Sessions"];

/// Minimum token-overlap score for a fuzzy service match.
const SERVICE_MATCH_THRESHOLD: f32 = 0.3;

const EXTRACTION_TEMPERATURE: f32 = 0.0;

const UPDATE_PROMPT: &str = r#"You extract booking changes from a customer message.
Respond with ONLY a JSON object (no markdown, no explanation) with exactly these keys:
{"booking_id": string|null, "name": string|null, "email": string|null, "phone": string|null, "service": string|null, "total_sessions": integer|null, "sessions_text": string|null}
booking_id is the booking reference code quoted by the customer.
Use null for every field the customer does not explicitly ask to change. Never invent values."#;

// ── Slots ─────────────────────────────────────────────────────

/// Extraction state of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// No stage has looked at this field yet.
    Pending,
    /// A stage looked and found nothing.
    Absent,
    Known(String),
}

#[derive(Debug)]
struct Draft {
    slots: BTreeMap<BookingField, Slot>,
}

impl Draft {
    fn new() -> Self {
        Self {
            slots: BookingField::ALL.into_iter().map(|f| (f, Slot::Pending)).collect(),
        }
    }

    fn is_known(&self, field: BookingField) -> bool {
        matches!(self.slots.get(&field), Some(Slot::Known(_)))
    }

    fn is_complete(&self) -> bool {
        BookingField::ALL.into_iter().all(|f| self.is_known(f))
    }

    /// Record a stage result unless the field is already known.
    fn fill(&mut self, field: BookingField, value: Option<String>) {
        if self.is_known(field) {
            return;
        }
        let slot = match value {
            Some(v) if !v.trim().is_empty() => Slot::Known(v.trim().to_string()),
            _ => Slot::Absent,
        };
        self.slots.insert(field, slot);
    }

    fn unknown(&self) -> Vec<BookingField> {
        BookingField::ALL
            .into_iter()
            .filter(|f| !self.is_known(*f))
            .collect()
    }

    fn into_fields(self) -> ExtractedBookingFields {
        let mut fields = ExtractedBookingFields::default();
        for (field, slot) in self.slots {
            let Slot::Known(value) = slot else { continue };
            match field {
                BookingField::Name => fields.name = value,
                BookingField::Email => fields.email = value,
                BookingField::Phone => fields.phone = value,
                BookingField::Service => fields.service = value,
                BookingField::TotalSessions => fields.total_sessions = value.parse().unwrap_or(0),
                BookingField::SessionsText => fields.sessions_text = value,
            }
        }
        fields
    }
}

// ── Rule stages ───────────────────────────────────────────────

struct Input<'a> {
    text: &'a str,
    lower: String,
    catalog: &'a [ServiceRecord],
}

type Stage = fn(&Input<'_>) -> Option<String>;

/// Rule stages in evaluation order.
const STAGES: [(BookingField, Stage); 6] = [
    (BookingField::Email, email),
    (BookingField::Phone, phone),
    (BookingField::TotalSessions, session_count),
    (BookingField::Name, name),
    (BookingField::SessionsText, sessions_text),
    (BookingField::Service, service),
];

fn email(input: &Input<'_>) -> Option<String> {
    RE_EMAIL.find(input.text).map(|m| m.as_str().to_string())
}

/// Longest 7–15 digit run once emails, dates, times and session counts are blanked.
fn phone(input: &Input<'_>) -> Option<String> {
    let haystack = phone_haystack(input.text);
    let mut best: Option<(usize, &str)> = None;
    for m in RE_PHONE.find_iter(&haystack) {
        let raw = m.as_str().trim();
        let digits = digit_count(raw);
        if !(7..=15).contains(&digits) {
            continue;
        }
        if best.is_none_or(|(d, _)| digits > d) {
            best = Some((digits, raw));
        }
    }
    best.map(|(_, raw)| raw.to_string())
}

fn phone_haystack(text: &str) -> String {
    let without_emails = RE_EMAIL.replace_all(text, " ");
    RE_NOT_PHONE.replace_all(&without_emails, " ").into_owned()
}

fn digit_count(text: &str) -> usize {
    text.chars().filter(char::is_ascii_digit).count()
}

fn session_count(input: &Input<'_>) -> Option<String> {
    RE_SESSION_COUNT
        .captures(input.text)
        .or_else(|| RE_TOTAL.captures(input.text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.to_string())
}

fn name(input: &Input<'_>) -> Option<String> {
    RE_NAME
        .captures_iter(input.text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|candidate| {
            candidate
                .split_whitespace()
                .next()
                .is_some_and(|first| !NAME_STOPWORDS.contains(&first))
        })
        .map(String::from)
}

/// "first session ..." clause, else every "session N ..." fragment joined by " | ".
fn sessions_text(input: &Input<'_>) -> Option<String> {
    if let Some(m) = RE_FIRST_SESSION.find(input.text) {
        return Some(trim_fragment(cut_at_contact(m.as_str())).to_string());
    }

    let starts: Vec<usize> = RE_SESSION_START.find_iter(input.text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return None;
    }
    let fragments: Vec<&str> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(input.text.len());
            let fragment = &input.text[start..end];
            let fragment = fragment.split(['\n', ';']).next().unwrap_or(fragment);
            trim_fragment(cut_at_contact(fragment))
        })
        .filter(|f| !f.is_empty())
        .collect();
    Some(fragments.join(" | "))
}

/// Drop a trailing ", <email>" or ", <phone>" from a schedule clause.
fn cut_at_contact(clause: &str) -> &str {
    clause
        .match_indices(',')
        .map(|(i, _)| i)
        .find(|&i| starts_with_contact(&clause[i + 1..]))
        .map_or(clause, |i| &clause[..i])
}

fn starts_with_contact(text: &str) -> bool {
    let text = text.trim_start();
    if RE_EMAIL.find(text).is_some_and(|m| m.start() == 0) {
        return true;
    }
    let haystack = phone_haystack(text);
    RE_PHONE
        .find(&haystack)
        .is_some_and(|m| m.start() == 0 && (7..=15).contains(&digit_count(m.as_str())))
}

fn trim_fragment(fragment: &str) -> &str {
    let mut f = fragment.trim();
    loop {
        let trimmed = f
            .trim_end_matches([',', '|', '.', ' '])
            .trim_end();
        let trimmed = trimmed
            .strip_suffix(" and")
            .or_else(|| trimmed.strip_suffix(" then"))
            .unwrap_or(trimmed);
        if trimmed == f {
            return f;
        }
        f = trimmed;
    }
}

fn service(input: &Input<'_>) -> Option<String> {
    match_service(&input.lower, input.catalog)
}

/// Resolve free text to a catalog service name.
///
/// A case-insensitive substring hit wins (longest name first). Otherwise the
/// best token-overlap score (shared tokens of 3+ chars over the catalog
/// name's token count) is accepted at 0.3 or above.
pub fn match_service(text: &str, catalog: &[ServiceRecord]) -> Option<String> {
    let lower = text.to_lowercase();
    let names: Vec<&str> = catalog.iter().filter_map(|s| s.name()).collect();

    if let Some(hit) = names
        .iter()
        .filter(|n| lower.contains(&n.to_lowercase()))
        .max_by_key(|n| n.len())
    {
        return Some(hit.to_string());
    }

    let text_tokens: HashSet<&str> = RE_TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.len() >= 3)
        .collect();

    let mut best: Option<(f32, &str)> = None;
    for name in names {
        let name_lower = name.to_lowercase();
        let tokens: Vec<&str> = RE_TOKEN.find_iter(&name_lower).map(|m| m.as_str()).collect();
        if tokens.is_empty() {
            continue;
        }
        let shared = tokens
            .iter()
            .filter(|t| t.len() >= 3 && text_tokens.contains(*t))
            .count();
        let score = shared as f32 / tokens.len() as f32;
        if best.is_none_or(|(s, _)| score > s) {
            best = Some((score, name));
        }
    }
    best.filter(|(score, _)| *score >= SERVICE_MATCH_THRESHOLD)
        .map(|(_, name)| name.to_string())
}

// ── Coercion of model output ──────────────────────────────────

fn coerce_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let placeholder = ["", "null", "none", "unknown", "n/a"].contains(&text.to_lowercase().as_str());
    (!placeholder).then_some(text)
}

fn coerce_count(value: Option<&Value>) -> Option<u32> {
    let n = match value? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => {
            let digits: String = s.chars().skip_while(|c| !c.is_ascii_digit()).take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

fn parse_object(reply: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(extract_json(reply)) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "model reply was not JSON");
            None
        }
    }
}

// ── Booking id fallback ───────────────────────────────────────

/// Best-looking booking reference in the raw text.
///
/// Uppercase tokens of 6–12 chars; mixed letters and digits rank first,
/// then all-digit tokens, then all-letter tokens (often just shouted words).
/// Values the patch writes are never the reference, and neither is an
/// all-digit token in a message that talks about a phone number.
pub fn booking_id_fallback(text: &str, patch: &AppointmentPatch) -> Option<String> {
    let written = patch_values(patch);
    let phone_cue = RE_PHONE_CUE.is_match(text);
    RE_BOOKING_ID
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|token| !written.contains(*token))
        .filter(|token| !(phone_cue && token.chars().all(|c| c.is_ascii_digit())))
        .min_by_key(|token| {
            let letters = token.chars().any(|c| c.is_ascii_alphabetic());
            let digits = token.chars().any(|c| c.is_ascii_digit());
            match (letters, digits) {
                (true, true) => 0,
                (false, true) => 1,
                _ => 2,
            }
        })
        .map(String::from)
}

/// Patch values normalized to uppercase alphanumerics.
fn patch_values(patch: &AppointmentPatch) -> HashSet<String> {
    patch
        .entries()
        .into_iter()
        .map(|(_, value)| {
            value
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_uppercase()
        })
        .collect()
}

fn is_booking_id(candidate: &str) -> bool {
    (6..=12).contains(&candidate.len()) && candidate.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

// ── Extractor ─────────────────────────────────────────────────

/// Booking id and patch parsed from an update request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    pub booking_id: Option<String>,
    pub patch: AppointmentPatch,
}

#[derive(Clone)]
pub struct FieldExtractor {
    chat: Arc<dyn ChatModel>,
}

impl FieldExtractor {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Parse booking fields for a new appointment.
    pub async fn extract_create(&self, text: &str, catalog: &[ServiceRecord]) -> ExtractedBookingFields {
        let input = Input {
            text,
            lower: text.to_lowercase(),
            catalog,
        };

        let mut draft = Draft::new();
        for (field, stage) in STAGES {
            if draft.is_complete() {
                break;
            }
            if !draft.is_known(field) {
                draft.fill(field, stage(&input));
            }
        }

        let missing = draft.unknown();
        if !missing.is_empty() {
            self.fill_gaps(text, catalog, &missing, &mut draft).await;
        }
        draft.into_fields()
    }

    async fn fill_gaps(
        &self,
        text: &str,
        catalog: &[ServiceRecord],
        missing: &[BookingField],
        draft: &mut Draft,
    ) {
        let keys: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
        let system = format!(
            "You extract booking details from a customer message.\n\
             Respond with ONLY a JSON object (no markdown, no explanation) with exactly these keys: {}.\n\
             Numbers must be JSON integers and text must be JSON strings.\n\
             Use null for anything the message does not state explicitly. Never invent values.",
            keys.join(", ")
        );

        let reply = match self.chat.complete(&system, text, EXTRACTION_TEMPERATURE).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(stage = "gap_fill", error = %e, "model gap-fill failed");
                return;
            }
        };
        let Some(object) = parse_object(&reply) else {
            tracing::warn!(stage = "gap_fill", "model gap-fill returned no object");
            return;
        };

        for field in missing {
            let raw = object.get(field.as_str());
            let value = match field {
                BookingField::TotalSessions => coerce_count(raw).map(|n| n.to_string()),
                BookingField::Service => {
                    coerce_text(raw).and_then(|s| {
                        let matched = match_service(&s, catalog);
                        if matched.is_none() {
                            tracing::debug!(service = %s, "model service not in catalog, dropped");
                        }
                        matched
                    })
                }
                _ => coerce_text(raw),
            };
            draft.fill(*field, value);
        }
    }

    /// Parse the booking id and changed fields of an update request.
    pub async fn extract_update(&self, text: &str) -> UpdateRequest {
        let (model_id, patch) = match self.chat.complete(UPDATE_PROMPT, text, EXTRACTION_TEMPERATURE).await {
            Ok(reply) => match parse_object(&reply) {
                Some(object) => (coerce_text(object.get("booking_id")), patch_from(&object)),
                None => (None, AppointmentPatch::default()),
            },
            Err(e) => {
                tracing::warn!(stage = "update_extract", error = %e, "model update extraction failed");
                (None, AppointmentPatch::default())
            }
        };

        let upper = text.to_uppercase();
        let written = patch_values(&patch);
        let booking_id = model_id
            .map(|id| id.to_uppercase())
            .filter(|id| is_booking_id(id) && upper.contains(id.as_str()) && !written.contains(id))
            .or_else(|| booking_id_fallback(text, &patch));

        UpdateRequest { booking_id, patch }
    }
}

fn patch_from(object: &Map<String, Value>) -> AppointmentPatch {
    AppointmentPatch {
        name: coerce_text(object.get("name")),
        email: coerce_text(object.get("email")),
        phone: coerce_text(object.get("phone")),
        service: coerce_text(object.get("service")),
        total_sessions: coerce_count(object.get("total_sessions")),
        sessions_text: coerce_text(object.get("sessions_text")),
    }
}
