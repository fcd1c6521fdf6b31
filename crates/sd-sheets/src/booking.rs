//! Services catalog and appointment rows on top of a `TabularStore`.
//!
//! Appointment columns are located by header name, so the sheet may reorder
//! or add columns. Lookups fail closed: a missing `Booking ID` header or a
//! row too short to hold the id never matches.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use sd_protocol::{AppointmentPatch, AppointmentRecord, BookingField, ExtractedBookingFields, ServiceRecord};

use crate::config::SheetsConfig;
use crate::error::StoreResult;
use crate::store::{CellUpdate, Table, TabularStore};

pub const BOOKING_ID_HEADER: &str = "Booking ID";
pub const CREATED_AT_HEADER: &str = "Created At";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Sheet header for each mutable appointment field.
pub fn header_for(field: BookingField) -> &'static str {
    match field {
        BookingField::Name => "Name",
        BookingField::Email => "Email",
        BookingField::Phone => "Phone",
        BookingField::Service => "Service",
        BookingField::TotalSessions => "Total Sessions",
        BookingField::SessionsText => {
            "Sessions (Format: Session 1: Date at Time | Session 2: Date at Time | etc.)"
        }
    }
}

/// New 8-character uppercase booking token (first 8 hex digits of a v4 UUID).
pub fn new_booking_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// Booking operations against the services and appointments tabs.
#[derive(Clone)]
pub struct BookingBook {
    store: Arc<dyn TabularStore>,
    services_range: String,
    appointments_tab: String,
}

impl BookingBook {
    pub fn new(store: Arc<dyn TabularStore>, config: &SheetsConfig) -> Self {
        Self {
            store,
            services_range: SheetsConfig::tab_range(&config.services_tab),
            appointments_tab: config.appointments_tab.clone(),
        }
    }

    fn appointments_range(&self) -> String {
        SheetsConfig::tab_range(&self.appointments_tab)
    }

    /// Read the services catalog fresh from the store.
    pub async fn list_services(&self) -> StoreResult<Vec<ServiceRecord>> {
        let values = self.store.read(&self.services_range).await?;
        let Some(table) = Table::from_values(values) else {
            return Ok(Vec::new());
        };
        Ok(table.records().into_iter().map(ServiceRecord).collect())
    }

    /// Append a new appointment row and return its booking id.
    pub async fn create_appointment(&self, fields: &ExtractedBookingFields) -> StoreResult<String> {
        let booking_id = new_booking_id();
        let created_at = Utc::now();
        let row = vec![
            fields.name.clone(),
            fields.email.clone(),
            fields.phone.clone(),
            fields.service.clone(),
            fields.total_sessions.to_string(),
            fields.sessions_text.clone(),
            booking_id.clone(),
            created_at.format(TIMESTAMP_FORMAT).to_string(),
        ];
        self.store.append(&self.appointments_range(), row).await?;

        tracing::info!(booking_id = %booking_id, service = %fields.service, "appointment created");
        Ok(booking_id)
    }

    /// Locate the sheet row number holding `booking_id`.
    pub async fn find_row(&self, booking_id: &str) -> StoreResult<Option<usize>> {
        let values = self.store.read(&self.appointments_range()).await?;
        Ok(Table::from_values(values).and_then(|table| locate(&table, booking_id).map(|(row, _)| row)))
    }

    /// Read one appointment back by booking id.
    pub async fn get_appointment(&self, booking_id: &str) -> StoreResult<Option<AppointmentRecord>> {
        let values = self.store.read(&self.appointments_range()).await?;
        let Some(table) = Table::from_values(values) else {
            return Ok(None);
        };
        let Some((_, index)) = locate(&table, booking_id) else {
            return Ok(None);
        };

        let row = &table.rows[index];
        let cell = |header: &str| {
            table
                .column(header)
                .and_then(|c| row.get(c))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let created_at = NaiveDateTime::parse_from_str(&cell(CREATED_AT_HEADER), TIMESTAMP_FORMAT)
            .map(|t| t.and_utc())
            .unwrap_or_default();

        Ok(Some(AppointmentRecord {
            name: cell(header_for(BookingField::Name)),
            email: cell(header_for(BookingField::Email)),
            phone: cell(header_for(BookingField::Phone)),
            service: cell(header_for(BookingField::Service)),
            total_sessions: cell(header_for(BookingField::TotalSessions))
                .parse()
                .unwrap_or(0),
            sessions_text: cell(header_for(BookingField::SessionsText)),
            booking_id: cell(BOOKING_ID_HEADER),
            created_at,
        }))
    }

    /// Patch the set fields of an appointment.
    ///
    /// Returns `false` only when the booking id is not found. Patch keys whose
    /// header is missing from the sheet are skipped; an empty patch is a no-op.
    pub async fn update_appointment(
        &self,
        booking_id: &str,
        patch: &AppointmentPatch,
    ) -> StoreResult<bool> {
        let values = self.store.read(&self.appointments_range()).await?;
        let Some(table) = Table::from_values(values) else {
            return Ok(false);
        };
        let Some((row_number, _)) = locate(&table, booking_id) else {
            tracing::info!(booking_id = %booking_id, "update for unknown booking id");
            return Ok(false);
        };

        let updates: Vec<CellUpdate> = patch
            .entries()
            .into_iter()
            .filter_map(|(field, value)| {
                let header = header_for(field);
                match table.column(header) {
                    Some(column) => Some(CellUpdate::at(
                        &self.appointments_tab,
                        column,
                        row_number,
                        value,
                    )),
                    None => {
                        tracing::warn!(header, "appointments sheet has no column for patched field");
                        None
                    }
                }
            })
            .collect();

        if !updates.is_empty() {
            self.store.patch(&updates).await?;
        }
        tracing::info!(
            booking_id = %booking_id,
            row = row_number,
            cells = updates.len(),
            "appointment updated"
        );
        Ok(true)
    }
}

/// (sheet row number, data row index) of the first row whose id cell equals `booking_id`.
fn locate(table: &Table, booking_id: &str) -> Option<(usize, usize)> {
    let column = table.column(BOOKING_ID_HEADER)?;
    let wanted = booking_id.trim();
    if wanted.is_empty() {
        return None;
    }
    table
        .rows
        .iter()
        .position(|row| row.get(column).is_some_and(|cell| cell.trim() == wanted))
        .map(|index| (Table::row_number(index), index))
}
