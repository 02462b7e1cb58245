use crate::controller::SelectionState;
use crate::labels;
use crate::normalize::ImageSource;
use crate::server::SharedState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SelectionView {
    analyzing: bool,
    selection: Option<SelectedView>,
    prediction: Option<PredictionView>,
}

#[derive(Serialize)]
struct SelectedView {
    filename: String,
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_id: Option<String>,
}

#[derive(Serialize)]
struct PredictionView {
    prediction: i64,
    label: &'static str,
    full_name: &'static str,
    description: &'static str,
    confident: bool,
    max_confidence: f64,
    probabilities: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gradcam: Option<String>,
}

impl From<SelectionState> for SelectionView {
    fn from(state: SelectionState) -> Self {
        let selection = state.selection.map(|raw| SelectedView {
            filename: raw.filename,
            source: raw.source.as_str(),
            sample_id: match raw.source {
                ImageSource::Sample { id } => Some(id),
                _ => None,
            },
        });
        let prediction = state.prediction.map(|response| {
            let label = labels::prediction_label(response.prediction);
            PredictionView {
                prediction: response.prediction,
                label,
                full_name: labels::full_name(label),
                description: labels::description(label),
                confident: labels::is_confident(response.max_confidence),
                max_confidence: response.max_confidence,
                probabilities: response.probabilities,
                gradcam: response.gradcam,
            }
        });
        SelectionView {
            analyzing: state.analyzing,
            selection,
            prediction,
        }
    }
}

pub async fn current_selection(State(state): State<SharedState>) -> Json<SelectionView> {
    state.metrics.record_request("selection");
    Json(state.controller.snapshot().into())
}

pub async fn clear_selection(State(state): State<SharedState>) -> StatusCode {
    state.metrics.record_request("clear_selection");
    state.controller.clear();
    StatusCode::NO_CONTENT
}
