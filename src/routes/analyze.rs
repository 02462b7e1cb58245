use crate::normalize::{ImageSource, RawImage};
use crate::server::SharedState;
use axum::{
    extract::{
        multipart::{Multipart, MultipartError},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("missing `file` part in multipart body")]
    MissingFile,
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SourceKind {
    #[default]
    Upload,
    Capture,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    source: SourceKind,
}

#[derive(Debug, Serialize)]
pub struct AnalysisAccepted {
    pub request_id: u64,
}

/// Accepts an uploaded or captured image and starts its analysis. The
/// response carries the issued request id; the result lands on
/// `GET /selection` once resolved.
#[instrument(skip(state, multipart))]
pub async fn analyze_upload(
    State(state): State<SharedState>,
    Query(query): Query<AnalyzeQuery>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisAccepted>, UploadError> {
    state.metrics.record_request("analyze");

    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| "image.jpg".to_string());
            let data = field.bytes().await?;
            file = Some((filename, data));
            break;
        }
    }
    let (filename, data) = file.ok_or(UploadError::MissingFile)?;

    let source = match query.source {
        SourceKind::Upload => ImageSource::Upload,
        SourceKind::Capture => ImageSource::Capture,
    };
    let request_id = state.controller.select(RawImage {
        data,
        filename,
        source,
    });

    Ok(Json(AnalysisAccepted { request_id }))
}
