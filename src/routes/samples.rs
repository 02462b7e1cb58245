use crate::catalog::{CatalogError, SampleCategory, SampleImage};
use crate::routes::analyze::AnalysisAccepted;
use crate::server::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum SampleAnalyzeError {
    #[error("unknown sample: {0}")]
    UnknownSample(String),
    #[error("failed to load sample image: {0}")]
    Catalog(#[from] CatalogError),
}

impl IntoResponse for SampleAnalyzeError {
    fn into_response(self) -> Response {
        let status = match self {
            SampleAnalyzeError::UnknownSample(_) => StatusCode::NOT_FOUND,
            SampleAnalyzeError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Serialize)]
pub struct CategoryGroup {
    category: SampleCategory,
    title: &'static str,
    images: Vec<SampleImage>,
}

pub async fn list_samples(State(state): State<SharedState>) -> Json<Vec<CategoryGroup>> {
    state.metrics.record_request("samples");

    let groups = state
        .catalog
        .grouped()
        .into_iter()
        .map(|(category, images)| CategoryGroup {
            category,
            title: category.title(),
            images: images.into_iter().cloned().collect(),
        })
        .collect();
    Json(groups)
}

/// Selects a catalog entry by id and starts its analysis.
#[instrument(skip(state))]
pub async fn analyze_sample(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisAccepted>, SampleAnalyzeError> {
    state.metrics.record_request("analyze_sample");

    let sample = state
        .catalog
        .get(&id)
        .ok_or(SampleAnalyzeError::UnknownSample(id))?;
    let raw = state.catalog.raw_image(sample).await?;
    let request_id = state.controller.select(raw);

    Ok(Json(AnalysisAccepted { request_id }))
}
