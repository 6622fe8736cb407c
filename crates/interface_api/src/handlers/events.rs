//! Event intake

use axum::{extract::State, Json};
use tracing::{info, instrument};

use domain_sync::SyncEvent;

use crate::dto::events::EventResponse;
use crate::AppState;

/// Dispatches one platform event to the subscribed integrations
///
/// Handler failures are reported in the body; the event source always gets
/// a success status once the event was accepted.
#[instrument(skip(state, event), fields(event = %event.kind(), entity_id = %event.entity_id()))]
pub async fn receive_event(
    State(state): State<AppState>,
    Json(event): Json<SyncEvent>,
) -> Json<EventResponse> {
    let reports = state.registry.dispatch(&event).await;
    let response = EventResponse::new(event.kind(), reports);
    info!(handled = response.handled, failed = response.failed, "Event dispatched");
    Json(response)
}
