mod analyze;
mod health;
mod metrics;
mod moles;
mod samples;
mod selection;

use crate::server::SharedState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/healthcheck", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/samples", get(samples::list_samples))
        .route("/samples/{id}/analyze", post(samples::analyze_sample))
        .route("/analyze", post(analyze::analyze_upload))
        .route(
            "/selection",
            get(selection::current_selection).delete(selection::clear_selection),
        )
        .route("/moles", get(moles::list_moles))
        .route(
            "/moles/{id}",
            get(moles::get_mole)
                .put(moles::upsert_mole)
                .delete(moles::delete_mole),
        )
}
