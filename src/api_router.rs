//! Combines the per-domain routers into the service's API surface.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::people::configure_people_routes())
        .merge(crate::appraisal::configure_appraisal_routes())
        .merge(crate::timeoff::configure_timeoff_routes())
        .merge(crate::calendar::configure_calendar_routes())
}
