//! Command dispatcher: classify, then route to the store, extractor or answer engine.

use axum::http::StatusCode;
use serde::Serialize;

use sd_protocol::{
    AppointmentPatch, ExtractedBookingFields, Intent, QA_INITIALIZING, RetrievedMatch,
    ServiceRecord,
};

use crate::error::ApiResult;
use crate::inference::classify;
use crate::state::AppState;

/// Structured outcome of one dispatched utterance.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub answer: String,
    pub intent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ExtractedBookingFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patched: Option<AppointmentPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<RetrievedMatch>>,
}

impl Reply {
    fn new(intent: &'static str, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            intent,
            services: None,
            missing: None,
            parsed: None,
            booking_id: None,
            not_found: None,
            patched: None,
            matches: None,
        }
    }

    /// 503 while the answer engine warms up, 200 otherwise.
    pub fn status(&self) -> StatusCode {
        if self.intent == QA_INITIALIZING {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        }
    }
}

/// Route one utterance to its handler.
pub async fn dispatch(state: &AppState, text: &str) -> ApiResult<Reply> {
    let intent = classify(text);
    tracing::info!(intent = %intent, "dispatching");

    let result = match intent {
        Intent::ServicesList => list_services(state).await,
        Intent::AppointmentsCreate => create_appointment(state, text).await,
        Intent::AppointmentsUpdate => update_appointment(state, text).await,
        Intent::Qa => answer_question(state, text).await,
    };
    if let Err(e) = &result {
        tracing::warn!(intent = %intent, error = %e, "dispatch failed");
    }
    result
}

async fn list_services(state: &AppState) -> ApiResult<Reply> {
    let services = state.bookings.list_services().await?;
    let mut reply = Reply::new(Intent::ServicesList.as_str(), format_services(&services));
    reply.services = Some(services);
    Ok(reply)
}

/// "Available services:" followed by one bullet per named service.
pub fn format_services(services: &[ServiceRecord]) -> String {
    let bullets: Vec<String> = services
        .iter()
        .filter_map(|s| {
            let name = s.name()?;
            let details: Vec<&str> = [s.duration(), s.price(), s.location()]
                .into_iter()
                .flatten()
                .collect();
            Some(if details.is_empty() {
                format!("- {name}")
            } else {
                format!("- {name} ({})", details.join(", "))
            })
        })
        .collect();

    if bullets.is_empty() {
        "Available services: none listed right now.".to_string()
    } else {
        format!("Available services:\n{}", bullets.join("\n"))
    }
}

async fn create_appointment(state: &AppState, text: &str) -> ApiResult<Reply> {
    let intent = Intent::AppointmentsCreate.as_str();
    let catalog = state.bookings.list_services().await?;
    let fields = state.extractor.extract_create(text, &catalog).await;

    let missing = fields.missing_required();
    if !missing.is_empty() {
        let names: Vec<&'static str> = missing.iter().map(|f| f.as_str()).collect();
        tracing::info!(intent, missing = ?names, "booking incomplete");
        let mut reply = Reply::new(
            intent,
            format!("To complete your booking I still need: {}.", names.join(", ")),
        );
        reply.missing = Some(names);
        reply.parsed = Some(fields);
        return Ok(reply);
    }

    let booking_id = state.bookings.create_appointment(&fields).await?;
    let mut reply = Reply::new(
        intent,
        format!(
            "Booked {} for {}. Your booking ID is {booking_id}.",
            fields.service, fields.name
        ),
    );
    reply.booking_id = Some(booking_id);
    reply.parsed = Some(fields);
    Ok(reply)
}

async fn update_appointment(state: &AppState, text: &str) -> ApiResult<Reply> {
    let intent = Intent::AppointmentsUpdate.as_str();
    let request = state.extractor.extract_update(text).await;

    let Some(booking_id) = request.booking_id else {
        let mut reply = Reply::new(
            intent,
            "Please include your booking ID so I can find the appointment.",
        );
        reply.missing = Some(vec!["booking_id"]);
        return Ok(reply);
    };

    if !state
        .bookings
        .update_appointment(&booking_id, &request.patch)
        .await?
    {
        let mut reply = Reply::new(
            intent,
            format!("I couldn't find a booking with ID {booking_id}."),
        );
        reply.booking_id = Some(booking_id);
        reply.not_found = Some(true);
        return Ok(reply);
    }

    let changed: Vec<&str> = request
        .patch
        .entries()
        .iter()
        .map(|(field, _)| field.as_str())
        .collect();
    let answer = if changed.is_empty() {
        format!("Found booking {booking_id}, but no changes were specified.")
    } else {
        format!("Updated booking {booking_id}: {}.", changed.join(", "))
    };
    let mut reply = Reply::new(intent, answer);
    reply.booking_id = Some(booking_id);
    reply.patched = Some(request.patch);
    Ok(reply)
}

async fn answer_question(state: &AppState, text: &str) -> ApiResult<Reply> {
    let Some(engine) = state.engine.get_if_ready() else {
        let started = state.engine.ensure_build_started();
        tracing::info!(started, state = ?state.engine.state(), "answer engine not ready");
        return Ok(Reply::new(
            QA_INITIALIZING,
            "I'm still loading the knowledge base. Please try again in a moment.",
        ));
    };

    let answer = engine.ask(text).await?;
    let mut reply = Reply::new(Intent::Qa.as_str(), answer.text);
    reply.matches = Some(answer.matches);
    Ok(reply)
}
