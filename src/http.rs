use std::{fmt, time::Duration};

use async_trait::async_trait;
use backon::Retryable;
use reqwest::{header, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    client::NewsClient,
    error::{ResponseError, TransportError},
    models::{FetchFailure, FetchOutcome},
    paths::USER_AGENT,
    validator::{check_payload, error_message},
};

pub struct HttpRequest {
    base_url: Url,
    query_params: Vec<(&'static str, String)>,
}

impl HttpRequest {
    pub fn get(base_url: &Url) -> Self {
        Self {
            base_url: base_url.clone(),
            query_params: Vec::new(),
        }
    }

    #[must_use]
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query_params.push((key, value.to_string()));
        self
    }

    #[must_use]
    pub fn queries<I, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: ToString,
    {
        for (key, value) in params {
            self.query_params.push((key, value.to_string()));
        }
        self
    }

    pub fn url(&self) -> Url {
        let mut url = self.base_url.clone();
        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// Path plus query string, as reported in failures.
    pub fn path(&self) -> String {
        let url = self.url();
        match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        }
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("url", &self.url().as_str())
            .finish()
    }
}

/// A completed HTTP exchange: status plus the full body text.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one GET and reads the whole body. Deadlines and retries are layered
/// on top by [`NewsClient`](crate::client::NewsClient); implementations must
/// release the connection when the returned future is dropped.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: &HttpRequest) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, req: &HttpRequest) -> Result<RawResponse, TransportError> {
        let url = req.url();
        debug!("Sending HTTP request to {}", url);

        let res = self
            .get(url)
            .header(header::ACCEPT, mime::APPLICATION_JSON.as_ref())
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| {
                warn!("Network error occurred: {}", e);
                TransportError::Request(e)
            })?;

        let status = res.status();
        let body = res.text().await?;

        debug!("HTTP request completed with status: {}", status);

        Ok(RawResponse { status, body })
    }
}

impl NewsClient {
    /// Runs `req` with up to `max_attempts` attempts. Only transport failures
    /// are retried; any response from the upstream ends the loop.
    #[instrument(skip(self, req), fields(path = %req.path()))]
    pub(crate) async fn execute(&self, req: &HttpRequest, max_attempts: u32) -> FetchOutcome {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0u32;

        let result = (|| {
            attempt += 1;
            self.execute_single_request(req, attempt)
        })
        .retry(self.retry.backoff(max_attempts))
        .notify(|err: &TransportError, delay: Duration| {
            warn!(
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Transport failure, retrying"
            );
        })
        .await;

        match result {
            Ok(outcome) => {
                if attempt > 1 && outcome.is_success() {
                    info!(attempts = attempt, "News request succeeded after retry");
                }
                outcome
            }
            Err(err) => {
                error!(
                    error = %err,
                    attempts = attempt,
                    "News request failed after all retry attempts exhausted"
                );
                FetchFailure::exhausted(Some(&err), &req.path()).into()
            }
        }
    }

    async fn execute_single_request(
        &self,
        req: &HttpRequest,
        attempt: u32,
    ) -> Result<FetchOutcome, TransportError> {
        debug!(attempt, "Sending news request");

        // Dropping the send future on expiry aborts the in-flight connection.
        let res = match tokio::time::timeout(self.timeout, self.transport.send(req)).await {
            Ok(res) => res?,
            Err(_) => {
                warn!(attempt, "Request exceeded {}ms deadline", self.timeout.as_millis());
                return Err(TransportError::Timeout(self.timeout));
            }
        };

        Ok(decode_response(res, &req.path()))
    }
}

/// Turns a completed exchange into an outcome. Never fails: status and shape
/// errors become [`FetchOutcome::Failure`].
pub(crate) fn decode_response(res: RawResponse, request_path: &str) -> FetchOutcome {
    let body = serde_json::from_str::<Value>(&res.body);

    if !res.status.is_success() {
        let message = body
            .ok()
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| format!("Request failed with status {}", res.status.as_u16()));
        let err = ResponseError::http_status(res.status, message);
        error!("Received non-retryable HTTP error: {}", err);
        return FetchFailure::from_response(&err, request_path).into();
    }

    let checked = body
        .map_err(|e| ResponseError::invalid_shape(format!("body is not JSON: {e}")))
        .and_then(check_payload);

    match checked {
        Ok(page) => page.into(),
        Err(err) => {
            error!("Rejected successful response: {}", err);
            FetchFailure::from_response(&err, request_path).into()
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };

    use tokio::time::Instant;

    use super::*;

    pub(crate) enum Step {
        Respond(RawResponse),
        Fail(String),
        Hang,
    }

    impl Step {
        pub(crate) fn json(status: u16, body: serde_json::Value) -> Self {
            let status = StatusCode::from_u16(status).expect("valid status code");
            Self::Respond(RawResponse::new(status, body.to_string()))
        }
    }

    /// Plays back a fixed script of steps, one per call, and records when
    /// each call started. Once the script runs out the last step repeats.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        script: Mutex<VecDeque<Step>>,
        last: Mutex<Option<Step>>,
        calls: AtomicUsize,
        started: Mutex<Vec<Instant>>,
        urls: Mutex<Vec<Url>>,
        dropped_in_flight: Arc<AtomicBool>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(steps.into_iter().collect()),
                ..Default::default()
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn gaps(&self) -> Vec<Duration> {
            let started = self.started.lock().unwrap();
            started.windows(2).map(|w| w[1] - w[0]).collect()
        }

        pub(crate) fn urls(&self) -> Vec<Url> {
            self.urls.lock().unwrap().clone()
        }

        pub(crate) fn dropped_in_flight(&self) -> bool {
            self.dropped_in_flight.load(Ordering::SeqCst)
        }

        fn next_step(&self) -> Step {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match script.pop_front() {
                Some(step) => {
                    let replay = match &step {
                        Step::Respond(res) => Step::Respond(res.clone()),
                        Step::Fail(msg) => Step::Fail(msg.clone()),
                        Step::Hang => Step::Hang,
                    };
                    *last = Some(replay);
                    step
                }
                None => match last.as_ref() {
                    Some(Step::Respond(res)) => Step::Respond(res.clone()),
                    Some(Step::Fail(msg)) => Step::Fail(msg.clone()),
                    Some(Step::Hang) => Step::Hang,
                    None => Step::Fail("script exhausted".to_string()),
                },
            }
        }
    }

    struct InFlight(Arc<AtomicBool>);

    impl Drop for InFlight {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, req: &HttpRequest) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.lock().unwrap().push(Instant::now());
            self.urls.lock().unwrap().push(req.url());

            match self.next_step() {
                Step::Respond(res) => Ok(res),
                Step::Fail(msg) => Err(TransportError::connection(msg)),
                Step::Hang => {
                    let _guard = InFlight(Arc::clone(&self.dropped_in_flight));
                    std::future::pending().await
                }
            }
        }
    }
}
