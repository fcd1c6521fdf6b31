use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the services catalog, keyed by sheet header.
///
/// The catalog has no fixed schema; the accessor helpers look up the
/// presentation-friendly columns case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceRecord(pub BTreeMap<String, String>);

const NAME_KEYS: &[&str] = &["name", "service", "service name"];
const DURATION_KEYS: &[&str] = &["duration", "length"];
const PRICE_KEYS: &[&str] = &["price", "cost", "fee"];
const LOCATION_KEYS: &[&str] = &["location", "venue", "address"];

impl ServiceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and sample data.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Case-insensitive lookup of the first non-empty column among `keys`.
    pub fn lookup(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|wanted| {
            self.0
                .iter()
                .find(|(k, v)| k.trim().eq_ignore_ascii_case(wanted) && !v.trim().is_empty())
                .map(|(_, v)| v.trim())
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.lookup(NAME_KEYS)
    }

    pub fn duration(&self) -> Option<&str> {
        self.lookup(DURATION_KEYS)
    }

    pub fn price(&self) -> Option<&str> {
        self.lookup(PRICE_KEYS)
    }

    pub fn location(&self) -> Option<&str> {
        self.lookup(LOCATION_KEYS)
    }
}

/// A booking field that the extractor can fill and a patch can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingField {
    Name,
    Email,
    Phone,
    Service,
    TotalSessions,
    SessionsText,
}

impl BookingField {
    /// Every mutable field, in sheet column order.
    pub const ALL: [BookingField; 6] = [
        BookingField::Name,
        BookingField::Email,
        BookingField::Phone,
        BookingField::Service,
        BookingField::TotalSessions,
        BookingField::SessionsText,
    ];

    /// Fields that must be known before a booking is committed.
    pub const REQUIRED: [BookingField; 5] = [
        BookingField::Name,
        BookingField::Email,
        BookingField::Phone,
        BookingField::Service,
        BookingField::TotalSessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingField::Name => "name",
            BookingField::Email => "email",
            BookingField::Phone => "phone",
            BookingField::Service => "service",
            BookingField::TotalSessions => "total_sessions",
            BookingField::SessionsText => "sessions_text",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for BookingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured booking fields parsed out of free text.
///
/// Empty string / zero means "absent". Whether a field was attempted is
/// tracked by the extraction pipeline, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedBookingFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub total_sessions: u32,
    pub sessions_text: String,
}

impl ExtractedBookingFields {
    pub fn is_present(&self, field: BookingField) -> bool {
        match field {
            BookingField::Name => !self.name.is_empty(),
            BookingField::Email => !self.email.is_empty(),
            BookingField::Phone => !self.phone.is_empty(),
            BookingField::Service => !self.service.is_empty(),
            BookingField::TotalSessions => self.total_sessions > 0,
            BookingField::SessionsText => !self.sessions_text.is_empty(),
        }
    }

    /// Required fields that are still absent, in column order.
    pub fn missing_required(&self) -> Vec<BookingField> {
        BookingField::REQUIRED
            .into_iter()
            .filter(|f| !self.is_present(*f))
            .collect()
    }

    /// All fields (required or not) that are still absent.
    pub fn missing_any(&self) -> Vec<BookingField> {
        BookingField::ALL
            .into_iter()
            .filter(|f| !self.is_present(*f))
            .collect()
    }
}

/// A persisted appointment, one sheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub total_sessions: u32,
    pub sessions_text: String,
    /// 8-character uppercase token addressing this row.
    pub booking_id: String,
    /// Creation time, second precision.
    pub created_at: DateTime<Utc>,
}

impl AppointmentRecord {
    pub fn from_fields(
        fields: &ExtractedBookingFields,
        booking_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: fields.name.clone(),
            email: fields.email.clone(),
            phone: fields.phone.clone(),
            service: fields.service.clone(),
            total_sessions: fields.total_sessions,
            sessions_text: fields.sessions_text.clone(),
            booking_id: booking_id.into(),
            created_at,
        }
    }
}

/// Partial update for an appointment. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sessions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions_text: Option<String>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Set fields as `(field, cell text)` pairs, in column order.
    pub fn entries(&self) -> Vec<(BookingField, String)> {
        let mut out = Vec::new();
        let text_fields = [
            (BookingField::Name, &self.name),
            (BookingField::Email, &self.email),
            (BookingField::Phone, &self.phone),
            (BookingField::Service, &self.service),
        ];
        for (field, value) in text_fields {
            if let Some(v) = value {
                out.push((field, v.clone()));
            }
        }
        if let Some(n) = self.total_sessions {
            out.push((BookingField::TotalSessions, n.to_string()));
        }
        if let Some(v) = &self.sessions_text {
            out.push((BookingField::SessionsText, v.clone()));
        }
        out
    }

    /// Apply the patch to a record in place.
    pub fn apply_to(&self, record: &mut AppointmentRecord) {
        if let Some(v) = &self.name {
            record.name = v.clone();
        }
        if let Some(v) = &self.email {
            record.email = v.clone();
        }
        if let Some(v) = &self.phone {
            record.phone = v.clone();
        }
        if let Some(v) = &self.service {
            record.service = v.clone();
        }
        if let Some(n) = self.total_sessions {
            record.total_sessions = n;
        }
        if let Some(v) = &self.sessions_text {
            record.sessions_text = v.clone();
        }
    }
}
