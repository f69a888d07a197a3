pub mod health;
pub mod trigger;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/BullhornMassCandidateUpdate",
            post(trigger::handle_mass_update).get(trigger::handle_mass_update),
        )
        .with_state(state)
}
