//! Raw services catalog.

use axum::Json;
use axum::extract::State;

use sd_protocol::ServiceRecord;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/services: catalog rows keyed by sheet header.
pub async fn list_services(State(state): State<AppState>) -> ApiResult<Json<Vec<ServiceRecord>>> {
    Ok(Json(state.bookings.list_services().await?))
}
