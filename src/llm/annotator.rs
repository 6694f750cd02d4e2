use crate::error::{Result, VarianceError};
use crate::llm::prompts::build_explanation_prompt;
use crate::llm::types::{AnnotationEvent, CompletionRequest, ExplanationService};
use crate::schema::{ExplanationSettings, MaterialVariance, VarianceRecord};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, timeout, Instant};

pub const EXPLANATION_ERROR_PREFIX: &str = "Error: Could not generate explanation.";

/// Keeps a fixed gap after each request before the next one may start,
/// however long the request itself took.
struct RequestPacer {
    delay: Duration,
    ready_at: Mutex<Option<Instant>>,
}

impl RequestPacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            ready_at: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        loop {
            let target = {
                let mut ready_at = self.ready_at.lock().await;
                match *ready_at {
                    Some(at) if at > Instant::now() => at,
                    _ => {
                        // concurrent callers queue behind this start
                        *ready_at = Some(Instant::now() + self.delay);
                        return;
                    }
                }
            };
            sleep_until(target).await;
        }
    }

    async fn finished(&self) {
        let next = Instant::now() + self.delay;
        let mut ready_at = self.ready_at.lock().await;
        if ready_at.map_or(true, |at| at < next) {
            *ready_at = Some(next);
        }
    }
}

/// Attaches a one-sentence explanation to each material variance.
///
/// Every record gets an explanation: either the service's reply or an
/// `Error: ...` placeholder. A failing row never aborts the batch, and each
/// request is attempted once.
pub struct ExplanationAnnotator<S> {
    service: S,
    settings: ExplanationSettings,
}

impl<S: ExplanationService> ExplanationAnnotator<S> {
    pub fn new(service: S, settings: ExplanationSettings) -> Self {
        Self { service, settings }
    }

    pub fn settings(&self) -> &ExplanationSettings {
        &self.settings
    }

    pub fn request_for(&self, record: &VarianceRecord) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            prompt: build_explanation_prompt(record),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    /// Output order matches input order regardless of `max_concurrency`.
    pub async fn annotate(
        &self,
        records: Vec<MaterialVariance>,
        progress: Option<Sender<AnnotationEvent>>,
    ) -> Vec<MaterialVariance> {
        let total = records.len();
        send_event(&progress, AnnotationEvent::Starting { total }).await;

        if total > 0 {
            info!(
                "Requesting explanations for {} material variances (concurrency {})",
                total, self.settings.max_concurrency
            );
        }

        let pacer = RequestPacer::new(self.settings.request_delay());
        let concurrency = self.settings.max_concurrency.max(1);

        let outcomes: Vec<Result<String>> = stream::iter(records.iter().enumerate())
            .map(|(index, material)| self.explain_one(index, &material.record, &pacer, &progress))
            .buffered(concurrency)
            .collect()
            .await;

        let mut failed = 0;
        let annotated: Vec<MaterialVariance> = records
            .into_iter()
            .zip(outcomes)
            .map(|(material, outcome)| match outcome {
                Ok(text) => material.with_explanation(text),
                Err(e) => {
                    failed += 1;
                    material.with_explanation(format!("{} {}", EXPLANATION_ERROR_PREFIX, e))
                }
            })
            .collect();

        send_event(
            &progress,
            AnnotationEvent::Finished {
                explained: total - failed,
                failed,
            },
        )
        .await;

        annotated
    }

    async fn explain_one(
        &self,
        index: usize,
        record: &VarianceRecord,
        pacer: &RequestPacer,
        progress: &Option<Sender<AnnotationEvent>>,
    ) -> Result<String> {
        let request = self.request_for(record);

        pacer.wait_turn().await;
        send_event(
            progress,
            AnnotationEvent::Requesting {
                index,
                account: record.account_name.clone(),
            },
        )
        .await;
        debug!("Requesting explanation for '{}'", record.account_name);

        let limit = self.settings.request_timeout();
        let outcome = match timeout(limit, self.service.complete(&request)).await {
            Ok(Ok(text)) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    Err(VarianceError::ExplanationFailed(
                        "service returned an empty explanation".to_string(),
                    ))
                } else {
                    Ok(text)
                }
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(VarianceError::ExplanationFailed(format!(
                "request timed out after {}s",
                limit.as_secs()
            ))),
        };
        pacer.finished().await;

        match &outcome {
            Ok(_) => {
                send_event(
                    progress,
                    AnnotationEvent::Explained {
                        index,
                        account: record.account_name.clone(),
                    },
                )
                .await
            }
            Err(e) => {
                warn!(
                    "Explanation failed for account '{}': {}",
                    record.account_name, e
                );
                send_event(
                    progress,
                    AnnotationEvent::Failed {
                        index,
                        account: record.account_name.clone(),
                        reason: e.to_string(),
                    },
                )
                .await
            }
        }

        outcome
    }
}

async fn send_event(progress: &Option<Sender<AnnotationEvent>>, event: AnnotationEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event).await;
    }
}
