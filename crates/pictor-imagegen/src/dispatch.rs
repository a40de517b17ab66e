//! Provider dispatch: fan-out, stagger and per-slot retry

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use pictor_telemetry::{KeyValue, metrics::ImageGenMetrics};
use secrecy::SecretString;

use crate::normalize::PreparedRequest;
use crate::protocol::{ProviderResult, parse_response};
use crate::registry::Concurrency;
use crate::retry::RetryPolicy;
use crate::upstream::{TransportError, Upstream, UpstreamCall};

/// Issues upstream calls for a prepared request
pub struct Dispatcher {
    upstream: Arc<dyn Upstream>,
    retry: RetryPolicy,
    stagger: Duration,
    metrics: ImageGenMetrics,
}

impl Dispatcher {
    pub fn new(upstream: Arc<dyn Upstream>, retry: RetryPolicy, stagger: Duration, metrics: ImageGenMetrics) -> Self {
        Self {
            upstream,
            retry,
            stagger,
            metrics,
        }
    }

    /// Number of upstream calls a request turns into
    pub fn slot_count(prepared: &PreparedRequest<'_>) -> usize {
        match prepared.spec.concurrency {
            Concurrency::Single => 1,
            Concurrency::FanOut => prepared.image_count as usize,
        }
    }

    /// Dispatch every slot and wait for all of them to settle
    ///
    /// Results are in slot order regardless of completion order. A slot that
    /// exhausts its retries becomes a failed result; nothing here aborts the
    /// other slots.
    pub async fn dispatch(&self, prepared: &PreparedRequest<'_>, token: &SecretString) -> Vec<ProviderResult> {
        let slots = Self::slot_count(prepared);
        tracing::debug!(mode = prepared.spec.tag, slots, "dispatching");

        join_all((0..slots).map(|slot| self.run_slot(prepared, token, slot))).await
    }

    async fn run_slot(&self, prepared: &PreparedRequest<'_>, token: &SecretString, slot: usize) -> ProviderResult {
        let delay = self.stagger.saturating_mul(u32::try_from(slot).unwrap_or(u32::MAX));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let spec = prepared.spec;
        let outcome = self
            .retry
            .run(
                move |attempt| async move {
                    let call = UpstreamCall {
                        mode: spec.tag,
                        model: &spec.model,
                        method: spec.family.method(),
                        location: spec.location,
                        payload: &prepared.payload,
                        slot,
                        attempt,
                    };

                    let result = match self.upstream.send(&call, token).await {
                        Ok(body) => parse_response(spec.family, body),
                        Err(e) => Err(e),
                    };
                    self.record_attempt(spec.tag, &result);

                    if let Err(e) = &result {
                        tracing::warn!(mode = spec.tag, slot, attempt, error = %e, "upstream attempt failed");
                    }
                    result
                },
                TransportError::is_retryable,
            )
            .await;

        match outcome.result {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    mode = spec.tag,
                    slot,
                    attempts = outcome.attempts,
                    error = %e,
                    "slot failed after exhausting retries"
                );
                ProviderResult::transport_failure(&e)
            }
        }
    }

    fn record_attempt(&self, mode: &'static str, result: &Result<ProviderResult, TransportError>) {
        let label = match result {
            Ok(ProviderResult::Success { .. }) => "success",
            Ok(ProviderResult::Failure { .. }) => "refused",
            Err(e) if e.timed_out() => "timeout",
            Err(_) => "transport_error",
        };
        self.metrics.attempts.add(
            1,
            &[KeyValue::new("mode", mode), KeyValue::new("result", label)],
        );
    }
}
