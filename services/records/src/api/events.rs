//! Server-sent pending-set notifications.
//!
//! Each event means "the pending set changed"; clients refresh their counts
//! on receipt. A subscriber that lags behind the broadcast buffer simply
//! skips ahead: the next count fetch catches it up.
use crate::api::error::ApiError;
use crate::app::AppState;
use crate::auth::policy::{Action, authorize};
use crate::model::Actor;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[utoipa::path(
    get,
    path = "/pending/events",
    tag = "pending",
    responses(
        (
            status = 200,
            description = "Stream of `pending` events (JSON PendingEvent data)",
            content_type = "text/event-stream",
            body = crate::workflow::PendingEvent
        ),
        (status = 403, description = "Admin only", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn pending_events(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    authorize(&actor, Action::ViewPendingSet)?;
    let rx = state.workflow.events().subscribe();
    tracing::debug!(actor = %actor.id, "pending event subscriber attached");

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().event("pending").json_data(&event) {
                    Ok(sse) => return Some((Ok(sse), rx)),
                    Err(err) => tracing::warn!(error = %err, "failed to encode pending event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "pending event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
