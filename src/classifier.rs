use crate::config::ClassifierConfig;
use crate::normalize::NormalizedImage;
use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

/// 8 diagnostic classes plus the synthetic "Not confident" class.
pub const PROBABILITY_CLASSES: usize = 9;

const PROBABILITY_SUM_TOLERANCE: f64 = 0.01;
const BODY_EXCERPT_LEN: usize = 512;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier returned HTTP {status}: {body}")]
    RemoteService { status: u16, body: String },
    #[error("failed to reach classifier: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: i64,
    pub max_confidence: f64,
    pub probabilities: Vec<f64>,
    /// Base64-encoded Grad-CAM overlay, when the service produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradcam: Option<String>,
}

impl PredictionResponse {
    /// The service is not schema-guaranteed beyond the three required
    /// fields, so a response that cannot be rendered meaningfully is
    /// rejected here instead of reaching the UI.
    fn validate(self) -> Result<Self, ClassifierError> {
        if self.probabilities.len() != PROBABILITY_CLASSES {
            return Err(ClassifierError::MalformedResponse(format!(
                "expected {} probabilities, got {}",
                PROBABILITY_CLASSES,
                self.probabilities.len()
            )));
        }
        let sum: f64 = self.probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(ClassifierError::MalformedResponse(format!(
                "probabilities sum to {sum:.4}, expected 1"
            )));
        }
        if !(0.0..=1.0).contains(&self.max_confidence) {
            return Err(ClassifierError::MalformedResponse(format!(
                "max_confidence {} out of range",
                self.max_confidence
            )));
        }
        Ok(self)
    }
}

#[async_trait]
pub trait Classifier: Send + Sync + 'static {
    async fn classify(
        &self,
        payload: NormalizedImage,
        filename: &str,
    ) -> Result<PredictionResponse, ClassifierError>;
}

pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.url.clone(),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    /// One multipart POST per invocation, no automatic retries. Retry
    /// policy belongs to the caller.
    #[instrument(skip(self, payload), fields(endpoint = %self.endpoint))]
    async fn classify(
        &self,
        payload: NormalizedImage,
        filename: &str,
    ) -> Result<PredictionResponse, ClassifierError> {
        let part = multipart::Part::bytes(payload.data.to_vec())
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("file", part);

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(BODY_EXCERPT_LEN)
                .collect();
            return Err(ClassifierError::RemoteService {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<PredictionResponse>()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;
        parsed.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::tests::test_jpeg;
    use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    fn payload() -> NormalizedImage {
        NormalizedImage {
            data: test_jpeg(32, 32),
            width: 32,
            height: 32,
        }
    }

    async fn spawn_endpoint(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/predict")
    }

    fn classifier_for(url: String) -> HttpClassifier {
        HttpClassifier::new(&ClassifierConfig { url })
    }

    #[tokio::test]
    async fn successful_round_trip_is_verbatim() {
        let probabilities = vec![0.02, 0.82, 0.01, 0.01, 0.05, 0.02, 0.02, 0.05, 0.0];
        let body = json!({
            "prediction": 1,
            "max_confidence": 0.82,
            "probabilities": probabilities.clone(),
        });
        let router = Router::new().route(
            "/predict",
            post(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        );
        let url = spawn_endpoint(router).await;

        let response = classifier_for(url)
            .classify(payload(), "image.jpg")
            .await
            .unwrap();

        assert_eq!(response.prediction, 1);
        assert_eq!(response.max_confidence, 0.82);
        assert_eq!(response.probabilities, probabilities);
        assert_eq!(response.gradcam, None);
    }

    #[tokio::test]
    async fn non_success_status_carries_status_and_body() {
        let router = Router::new().route(
            "/predict",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model exploded").into_response() }),
        );
        let url = spawn_endpoint(router).await;

        let err = classifier_for(url)
            .classify(payload(), "image.jpg")
            .await
            .unwrap_err();

        match err {
            ClassifierError::RemoteService { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "model exploded");
            }
            other => panic!("expected RemoteService, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_probability_vector_is_malformed() {
        let router = Router::new().route(
            "/predict",
            post(|| async {
                Json(json!({
                    "prediction": 0,
                    "max_confidence": 0.9,
                    "probabilities": [0.9, 0.1],
                }))
            }),
        );
        let url = spawn_endpoint(router).await;

        let err = classifier_for(url)
            .classify(payload(), "image.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn probabilities_must_sum_to_one() {
        let router = Router::new().route(
            "/predict",
            post(|| async {
                Json(json!({
                    "prediction": 2,
                    "max_confidence": 0.4,
                    "probabilities": [0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4, 0.4],
                }))
            }),
        );
        let url = spawn_endpoint(router).await;

        let err = classifier_for(url)
            .classify(payload(), "image.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn non_json_success_body_is_malformed() {
        let router = Router::new().route("/predict", post(|| async { "not json" }));
        let url = spawn_endpoint(router).await;

        let err = classifier_for(url)
            .classify(payload(), "image.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::MalformedResponse(_)));
    }

    #[test]
    fn gradcam_is_optional_on_the_wire() {
        let with: PredictionResponse = serde_json::from_value(json!({
            "prediction": 3,
            "max_confidence": 0.7,
            "probabilities": [0.7, 0.05, 0.05, 0.05, 0.05, 0.04, 0.03, 0.02, 0.01],
            "gradcam": "aGVhdG1hcA==",
        }))
        .unwrap();
        assert_eq!(with.gradcam.as_deref(), Some("aGVhdG1hcA=="));

        let without: PredictionResponse = serde_json::from_value(json!({
            "prediction": 3,
            "max_confidence": 0.7,
            "probabilities": [0.7, 0.05, 0.05, 0.05, 0.05, 0.04, 0.03, 0.02, 0.01],
        }))
        .unwrap();
        assert_eq!(without.gradcam, None);
    }
}
