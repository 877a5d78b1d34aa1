use super::{Exchange, Interceptor};
use crate::{
    error::Error,
    report::{LogRecordDraft, ReportSink},
};
use std::sync::Arc;

/// Renders every exchange as a markdown block and appends it to the report.
#[derive(Debug)]
pub struct StructuredLogger {
    sink: Arc<ReportSink>,
}

impl StructuredLogger {
    pub fn new(sink: Arc<ReportSink>) -> Self {
        Self { sink }
    }

    fn log(&self, exchange: &mut Exchange) -> Result<(), Error> {
        let draft = match exchange.take_draft() {
            Some(draft) => draft,
            None => LogRecordDraft::from_exchange(exchange),
        };
        let outcome = exchange
            .outcome()
            .cloned()
            .ok_or_else(|| Error::LoggingFailure("exchange has no outcome yet".into()))?;

        let record = Arc::new(draft.finish(outcome, exchange.elapsed())?);
        exchange.set_log_record(record.clone());

        self.sink.append(record.rendered())
    }
}

impl Interceptor for StructuredLogger {
    fn before_request(&self, exchange: &mut Exchange) {
        tracing::debug!(
            interaction = exchange.number(),
            method = %exchange.request().method,
            url = %exchange.request().url,
            "sending request"
        );
        let draft = LogRecordDraft::from_exchange(exchange);
        exchange.set_draft(draft);
    }

    fn after_response(&self, exchange: &mut Exchange) {
        if let Err(error) = self.log(exchange) {
            tracing::warn!(
                interaction = exchange.number(),
                %error,
                "couldn't write exchange to the report"
            );
        }
    }
}
