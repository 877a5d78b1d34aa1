mod header_mask;
mod structured_logger;

pub use header_mask::HeaderMaskInterceptor;
pub use structured_logger::StructuredLogger;

use crate::{
    data::{RequestData, ResponseData},
    error::Error,
    report::{LogRecord, LogRecordDraft},
};
use std::{
    fmt::Debug,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::{Duration, Instant},
};
use time::OffsetDateTime;

/// A hook run around every HTTP exchange.
///
/// Stages must not fail the exchange: anything that goes wrong inside a stage
/// is its own business. The chain additionally contains panics so one broken
/// stage can't change the outcome of a test.
pub trait Interceptor: Debug + Send + Sync {
    fn before_request(&self, _exchange: &mut Exchange) {}

    fn after_response(&self, _exchange: &mut Exchange) {}
}

/// Outcome of the transport call as the interceptors see it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Response(ResponseData),
    Failure(String),
}

/// One HTTP exchange travelling through the interceptor chain.
#[derive(Debug)]
pub struct Exchange {
    number: u64,
    request: RequestData,
    logged_request: RequestData,
    started_at: Instant,
    timestamp: OffsetDateTime,
    outcome: Option<ExchangeOutcome>,
    elapsed: Duration,
    draft: Option<LogRecordDraft>,
    log_record: Option<Arc<LogRecord>>,
}

impl Exchange {
    pub fn new(number: u64, request: RequestData) -> Self {
        Self {
            number,
            logged_request: request.clone(),
            request,
            started_at: Instant::now(),
            timestamp: OffsetDateTime::now_utc(),
            outcome: None,
            elapsed: Duration::ZERO,
            draft: None,
            log_record: None,
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// The request exactly as it goes over the wire.
    pub fn request(&self) -> &RequestData {
        &self.request
    }

    /// The copy of the request that ends up in the report.
    pub fn logged_request(&self) -> &RequestData {
        &self.logged_request
    }

    pub fn logged_request_mut(&mut self) -> &mut RequestData {
        &mut self.logged_request
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn outcome(&self) -> Option<&ExchangeOutcome> {
        self.outcome.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn set_draft(&mut self, draft: LogRecordDraft) {
        self.draft = Some(draft);
    }

    pub fn take_draft(&mut self) -> Option<LogRecordDraft> {
        self.draft.take()
    }

    pub fn log_record(&self) -> Option<&Arc<LogRecord>> {
        self.log_record.as_ref()
    }

    pub fn set_log_record(&mut self, record: Arc<LogRecord>) {
        self.log_record = Some(record);
    }

    pub(crate) fn complete(&mut self, result: &Result<ResponseData, Error>) {
        self.elapsed = self.started_at.elapsed();
        self.outcome = Some(match result {
            Ok(response) => ExchangeOutcome::Response(response.clone()),
            Err(error) => ExchangeOutcome::Failure(error.to_string()),
        });
    }
}

/// Ordered interceptor stages; `before_request` and `after_response` both run
/// in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InterceptorChain {
    stages: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn push(&mut self, stage: Arc<dyn Interceptor>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn before_request(&self, exchange: &mut Exchange) {
        for stage in &self.stages {
            Self::contained(stage, "before_request", || stage.before_request(exchange));
        }
    }

    pub fn after_response(&self, exchange: &mut Exchange) {
        for stage in &self.stages {
            Self::contained(stage, "after_response", || stage.after_response(exchange));
        }
    }

    fn contained<F: FnOnce()>(stage: &Arc<dyn Interceptor>, hook: &str, call: F) {
        if panic::catch_unwind(AssertUnwindSafe(call)).is_err() {
            tracing::warn!(?stage, hook, "interceptor panicked, exchange continues");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Headers;
    use reqwest::Method;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Tracer {
        calls: Mutex<Vec<String>>,
        label: &'static str,
    }

    impl Interceptor for Tracer {
        fn before_request(&self, _exchange: &mut Exchange) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} before", self.label));
        }

        fn after_response(&self, _exchange: &mut Exchange) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} after", self.label));
        }
    }

    #[derive(Debug)]
    struct Exploding;

    impl Interceptor for Exploding {
        fn before_request(&self, _exchange: &mut Exchange) {
            panic!("boom");
        }
    }

    fn request() -> RequestData {
        RequestData {
            method: Method::GET,
            url: "https://reqres.in/api/users/2".into(),
            headers: Headers::new(),
            body: String::new(),
        }
    }

    #[test]
    fn stages_run_in_order_around_the_call() {
        let first = Arc::new(Tracer {
            label: "first",
            ..Default::default()
        });
        let second = Arc::new(Tracer {
            label: "second",
            ..Default::default()
        });
        let mut chain = InterceptorChain::new();
        assert!(chain.is_empty());
        chain.push(first.clone());
        chain.push(second.clone());
        assert!(!chain.is_empty());
        assert_eq!(chain.len(), 2);

        let mut exchange = Exchange::new(1, request());
        chain.before_request(&mut exchange);
        chain.after_response(&mut exchange);

        assert_eq!(
            *first.calls.lock().unwrap(),
            vec!["first before", "first after"]
        );
        assert_eq!(
            *second.calls.lock().unwrap(),
            vec!["second before", "second after"]
        );
    }

    #[test]
    fn panicking_stage_does_not_stop_the_chain() {
        let tracer = Arc::new(Tracer {
            label: "tracer",
            ..Default::default()
        });
        let mut chain = InterceptorChain::new();
        chain.push(Arc::new(Exploding));
        chain.push(tracer.clone());

        let mut exchange = Exchange::new(1, request());
        chain.before_request(&mut exchange);

        assert_eq!(*tracer.calls.lock().unwrap(), vec!["tracer before"]);
    }

    #[test]
    fn complete_records_failures_as_text() {
        let mut exchange = Exchange::new(3, request());

        exchange.complete(&Err(Error::Network {
            url: "https://reqres.in/api/users/2".into(),
            cause: "connection refused".into(),
        }));

        match exchange.outcome() {
            Some(ExchangeOutcome::Failure(text)) => assert!(text.contains("connection refused")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
