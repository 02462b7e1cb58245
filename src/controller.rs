use crate::classifier::{Classifier, ClassifierError, PredictionResponse};
use crate::normalize::{self, NormalizeError, NormalizeOptions, RawImage};
use crate::telemetry::Metrics;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// The single UI-visible record. Only the controller's transitions touch it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub selection: Option<RawImage>,
    pub prediction: Option<PredictionResponse>,
    pub analyzing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Completed { request_id: u64 },
    Failed { request_id: u64, message: String },
}

struct Inner {
    counter: u64,
    state: SelectionState,
}

/// Tracks the live selection and the monotonically increasing request id.
///
/// The network call is not cooperatively cancellable, so a new selection or
/// a clear only bumps the counter; the superseded request finishes on its
/// own and `resolve` drops its result when the captured id no longer
/// matches. The id check and the state write happen under one lock
/// acquisition, so no partial state is ever observable.
pub struct SelectionController<C: Classifier> {
    inner: Arc<Mutex<Inner>>,
    classifier: Arc<C>,
    options: NormalizeOptions,
    metrics: Arc<Metrics>,
    events: broadcast::Sender<AnalysisEvent>,
}

impl<C: Classifier> Clone for SelectionController<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            classifier: Arc::clone(&self.classifier),
            options: self.options.clone(),
            metrics: Arc::clone(&self.metrics),
            events: self.events.clone(),
        }
    }
}

impl<C: Classifier> SelectionController<C> {
    pub fn new(classifier: C, options: NormalizeOptions, metrics: Arc<Metrics>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                counter: 0,
                state: SelectionState::default(),
            })),
            classifier: Arc::new(classifier),
            options,
            metrics,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SelectionState {
        self.inner.lock().state.clone()
    }

    /// Makes `raw` the live selection and starts its analysis. Returns the
    /// request id issued for this selection; any earlier in-flight request
    /// is invalidated by the counter bump.
    pub fn select(&self, raw: RawImage) -> u64 {
        let request_id = {
            let mut inner = self.inner.lock();
            inner.counter += 1;
            inner.state.selection = Some(raw.clone());
            inner.state.prediction = None;
            inner.state.analyzing = true;
            inner.counter
        };
        tracing::debug!(request_id, source = raw.source.as_str(), "selection made");

        let controller = self.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = controller.run_analysis(&raw).await;
            controller.metrics.record_analysis_duration(
                started.elapsed().as_millis() as u64,
                raw.source.as_str(),
            );
            controller.resolve(request_id, result);
        });

        request_id
    }

    /// Drops the selection and invalidates any in-flight request. The
    /// underlying network call is left to complete and be discarded.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.counter += 1;
        inner.state = SelectionState::default();
    }

    async fn run_analysis(&self, raw: &RawImage) -> Result<PredictionResponse, AnalysisError> {
        let normalized = normalize::normalize(raw, &self.options)?;
        let response = self.classifier.classify(normalized, &raw.filename).await?;
        Ok(response)
    }

    /// Applies a completed analysis, or drops it if `request_id` is stale.
    /// A stale result causes no state change and no event.
    fn resolve(&self, request_id: u64, result: Result<PredictionResponse, AnalysisError>) {
        let mut inner = self.inner.lock();
        if request_id != inner.counter {
            tracing::debug!(
                request_id,
                live_id = inner.counter,
                "discarding stale analysis result"
            );
            self.metrics.record_stale_drop();
            return;
        }

        inner.state.analyzing = false;
        match result {
            Ok(response) => {
                inner.state.prediction = Some(response);
                let _ = self.events.send(AnalysisEvent::Completed { request_id });
            }
            Err(e) => {
                // The selection stays put so the user can re-trigger it.
                tracing::warn!(request_id, error = %e, "analysis failed");
                let _ = self.events.send(AnalysisEvent::Failed {
                    request_id,
                    message: e.to_string(),
                });
            }
        }
    }
}
