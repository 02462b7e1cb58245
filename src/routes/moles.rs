use crate::history::{HistoryError, MoleRecord};
use crate::server::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoleRouteError {
    #[error("no record for mole {0}")]
    NotFound(String),
    #[error("history storage failed: {0}")]
    History(#[from] HistoryError),
}

impl IntoResponse for MoleRouteError {
    fn into_response(self) -> Response {
        let status = match self {
            MoleRouteError::NotFound(_) => StatusCode::NOT_FOUND,
            MoleRouteError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct MoleRecordBody {
    recorded_at: DateTime<Utc>,
    image_filename: String,
    probabilities: Vec<f64>,
}

pub async fn list_moles(State(state): State<SharedState>) -> Json<Vec<MoleRecord>> {
    state.metrics.record_request("moles");
    Json(state.history.list())
}

pub async fn get_mole(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MoleRecord>, MoleRouteError> {
    state.metrics.record_request("get_mole");
    state
        .history
        .get(&id)
        .map(Json)
        .ok_or(MoleRouteError::NotFound(id))
}

pub async fn upsert_mole(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<MoleRecordBody>,
) -> Result<StatusCode, MoleRouteError> {
    state.metrics.record_request("upsert_mole");
    state.history.upsert(MoleRecord {
        id,
        recorded_at: body.recorded_at,
        image_filename: body.image_filename,
        probabilities: body.probabilities,
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_mole(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, MoleRouteError> {
    state.metrics.record_request("delete_mole");
    if state.history.remove(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(MoleRouteError::NotFound(id))
    }
}
