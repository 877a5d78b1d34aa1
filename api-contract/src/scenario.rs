//! One contract test, from the first request to the final summary.
//!
//! A [`Scenario`] owns everything a test needs: the request defaults, the
//! schema store, the HTTP client, a current-thread runtime to drive it and the
//! step reporter. Scenarios share nothing mutable with each other except the
//! report sink, so one failing scenario never affects another.

use crate::{
    configuration::{HarnessConfiguration, HarnessMode},
    data::{RequestData, ResponseData},
    error::Error,
    http_client::{HttpClient, PlaybackHttpClient, ReqwestHttpClient},
    interceptor::Exchange,
    logging,
    report::{markdown, ReportSink, ScenarioReport},
    schema::{SchemaSource, SchemaStore},
    specification::{
        build_request_defaults, build_response_defaults, RequestSpecification,
        ResponseExpectation,
    },
    step::StepReporter,
};
use serde_json::Value;
use std::{fmt::Debug, sync::Arc};
use tokio::runtime::{Builder, Runtime};

pub struct Scenario {
    name: String,
    mode: HarnessMode,
    sink: Arc<ReportSink>,
    specification: Arc<RequestSpecification>,
    response_defaults: ResponseExpectation,
    schemas: Arc<SchemaStore>,
    http_client: Arc<dyn HttpClient + Send + Sync>,
    playback: Option<Arc<PlaybackHttpClient>>,
    runtime: Runtime,
    reporter: StepReporter,
}

impl Scenario {
    pub fn begin<S: Into<String>>(
        name: S,
        configuration: HarnessConfiguration,
    ) -> Result<Self, Error> {
        logging::init();
        let name = name.into();

        let sink = match configuration.report_dir() {
            Some(report_dir) => {
                ReportSink::shared_file(report_dir.join(format!("{}.md", name)))?
            }
            None => ReportSink::console(),
        };

        let schemas = match configuration.schema_source() {
            SchemaSource::Bundled => SchemaStore::shared(),
            source => Arc::new(SchemaStore::new(source.clone())),
        };

        let mut playback = None;
        let http_client: Arc<dyn HttpClient + Send + Sync> = match configuration.http_client() {
            Some(http_client) => http_client,
            None => match configuration.mode() {
                HarnessMode::Live => Arc::new(ReqwestHttpClient::new()),
                HarnessMode::Playback => {
                    let playback_dir = configuration.playback_dir().ok_or_else(|| {
                        Error::Configuration(format!(
                            "scenario {} runs in playback mode but no playback directory is set",
                            name
                        ))
                    })?;
                    let client = Arc::new(PlaybackHttpClient::load(
                        playback_dir.join(format!("{}.md", name)),
                    )?);
                    playback = Some(client.clone());
                    client
                }
            },
        };

        let runtime = Builder::new_current_thread().enable_all().build()?;

        tracing::info!(scenario = %name, mode = ?configuration.mode(), "scenario started");

        Ok(Self {
            specification: Arc::new(build_request_defaults(&configuration, sink.clone())),
            response_defaults: build_response_defaults(),
            reporter: StepReporter::new(sink.clone()),
            mode: configuration.mode(),
            name,
            sink,
            schemas,
            http_client,
            playback,
            runtime,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> HarnessMode {
        self.mode
    }

    pub fn spec(&self) -> &RequestSpecification {
        &self.specification
    }

    pub fn response_spec(&self) -> &ResponseExpectation {
        &self.response_defaults
    }

    pub fn schemas(&self) -> &SchemaStore {
        &self.schemas
    }

    pub fn step<T, F>(&self, name: impl Into<String>, action: F) -> Result<T, Error>
    where
        T: Debug,
        F: FnOnce() -> Result<T, Error>,
    {
        self.reporter.run_step(name, action)
    }

    /// Runs one exchange through the interceptor chain and the HTTP client.
    ///
    /// The call is bounded by the specification's timeout; running out of
    /// time is a [`Error::Network`].
    pub fn send(&self, request: RequestData) -> Result<ResponseData, Error> {
        let interceptors = self.specification.interceptors();
        let timeout = self.specification.timeout();
        let mut exchange = Exchange::new(self.sink.next_interaction(), request);

        interceptors.before_request(&mut exchange);

        let result = self.runtime.block_on(async {
            match tokio::time::timeout(timeout, self.http_client.make_request(exchange.request()))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::Network {
                    url: exchange.request().url.clone(),
                    cause: format!("timed out after {} ms", timeout.as_millis()),
                }),
            }
        });

        exchange.complete(&result);
        interceptors.after_response(&mut exchange);

        if let Some(record) = exchange.log_record() {
            self.reporter.attach_exchange(record.clone());
        }

        result
    }

    pub fn expect(
        &self,
        response: &ResponseData,
        expectation: &ResponseExpectation,
    ) -> Result<Value, Error> {
        expectation.verify(response, &self.schemas)
    }

    pub fn validate(&self, body: &Value, schema_id: &str) -> Result<(), Error> {
        self.schemas.validate(body, schema_id)?.into_result()
    }

    /// Steps finished so far.
    pub fn report(&self) -> ScenarioReport {
        ScenarioReport {
            name: self.name.clone(),
            steps: self.reporter.finished(),
        }
    }

    /// Writes the summary block and returns the report.
    ///
    /// In playback mode a recording with interactions the scenario never
    /// asked for is an error: the scenario and its recording disagree.
    pub fn finish(self) -> Result<ScenarioReport, Error> {
        let report = self.report();

        if let Err(error) = self.sink.append(&markdown::render_summary(&report)) {
            tracing::warn!(scenario = %self.name, %error, "couldn't write scenario summary");
        }
        tracing::info!(
            scenario = %self.name,
            passed = report.passed(),
            steps = report.steps.len(),
            "scenario finished"
        );

        if let Some(playback) = &self.playback {
            let remaining = playback.remaining();
            if remaining > 0 {
                return Err(Error::Playback(format!(
                    "scenario {} finished with {} recorded interaction(s) never requested",
                    self.name, remaining
                )));
            }
        }

        Ok(report)
    }
}

impl Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("specification", &self.specification)
            .field("http_client", &self.http_client)
            .finish()
    }
}
