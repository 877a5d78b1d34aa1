//! Named, individually reported units of work.
//!
//! [`StepReporter::run_step`] wraps a closure: the step is opened as pending,
//! the closure runs, and the step is closed as passed or failed. A failed step
//! keeps the error text and the exchanges that ran inside it. The closure's
//! error is handed back to the caller untouched, so `?` keeps working.
//!
//! Steps opened while another step is running become its children.

use crate::{
    error::Error,
    report::{markdown, LogRecord, ReportSink},
    util,
};
use std::{
    any::Any,
    cell::RefCell,
    fmt::Debug,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::{Duration, Instant},
};

const VALUE_SUMMARY_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Succeeded,
    Failed,
}

impl StepStatus {
    /// Moves a pending step to its terminal state. Returns `false`, leaving
    /// the status alone, when the step already finished.
    pub fn finish(&mut self, succeeded: bool) -> bool {
        if *self != StepStatus::Pending {
            return false;
        }
        *self = if succeeded {
            StepStatus::Succeeded
        } else {
            StepStatus::Failed
        };
        true
    }

    pub fn is_terminal(self) -> bool {
        self != StepStatus::Pending
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub parent: Option<String>,
    pub depth: usize,
    pub status: StepStatus,
    pub cause: Option<String>,
    pub value: Option<String>,
    pub exchanges: Vec<Arc<LogRecord>>,
    pub elapsed: Duration,
}

impl StepRecord {
    fn pending(name: String, parent: Option<String>, depth: usize) -> Self {
        Self {
            name,
            parent,
            depth,
            status: StepStatus::Pending,
            cause: None,
            value: None,
            exchanges: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Steps of one scenario. Not `Sync`: a scenario runs its steps on one thread.
#[derive(Debug)]
pub struct StepReporter {
    sink: Arc<ReportSink>,
    open: RefCell<Vec<StepRecord>>,
    finished: RefCell<Vec<StepRecord>>,
}

impl StepReporter {
    pub fn new(sink: Arc<ReportSink>) -> Self {
        Self {
            sink,
            open: RefCell::new(Vec::new()),
            finished: RefCell::new(Vec::new()),
        }
    }

    pub fn run_step<T, F>(&self, name: impl Into<String>, action: F) -> Result<T, Error>
    where
        T: Debug,
        F: FnOnce() -> Result<T, Error>,
    {
        self.open_step(name.into());
        let started = Instant::now();

        match panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(Ok(value)) => {
                let summary = util::truncate(&format!("{:?}", value), VALUE_SUMMARY_LIMIT);
                self.close_step(Ok(summary), started.elapsed());
                Ok(value)
            }
            Ok(Err(error)) => {
                self.close_step(Err(error.to_string()), started.elapsed());
                Err(error)
            }
            Err(payload) => {
                self.close_step(
                    Err(format!("panicked: {}", panic_message(&*payload))),
                    started.elapsed(),
                );
                panic::resume_unwind(payload)
            }
        }
    }

    /// Attaches an exchange to the innermost running step. Exchanges outside
    /// any step are only in the exchange log.
    pub fn attach_exchange(&self, record: Arc<LogRecord>) {
        if let Some(step) = self.open.borrow_mut().last_mut() {
            step.exchanges.push(record);
        }
    }

    pub fn current_step(&self) -> Option<String> {
        self.open.borrow().last().map(|step| step.name.clone())
    }

    /// Finished steps, in the order they finished.
    pub fn finished(&self) -> Vec<StepRecord> {
        self.finished.borrow().clone()
    }

    fn open_step(&self, name: String) {
        let mut open = self.open.borrow_mut();
        let parent = open.last().map(|step| step.name.clone());
        let depth = open.len();
        open.push(StepRecord::pending(name, parent, depth));
    }

    fn close_step(&self, outcome: Result<String, String>, elapsed: Duration) {
        let Some(mut step) = self.open.borrow_mut().pop() else {
            tracing::warn!("step closed without an open step");
            return;
        };

        step.status.finish(outcome.is_ok());
        step.elapsed = elapsed;
        match outcome {
            Ok(value) => step.value = Some(value),
            Err(cause) => step.cause = Some(cause),
        }

        if step.status == StepStatus::Failed {
            tracing::debug!(step = %step.name, cause = ?step.cause, "step failed");
        }

        if let Err(error) = self.sink.append(&markdown::render_step(&step)) {
            tracing::warn!(step = %step.name, %error, "couldn't write step to the report");
        }

        // parents see the exchanges of their children
        if let Some(parent) = self.open.borrow_mut().last_mut() {
            for record in &step.exchanges {
                if !parent.exchanges.iter().any(|r| Arc::ptr_eq(r, record)) {
                    parent.exchanges.push(record.clone());
                }
            }
        }

        self.finished.borrow_mut().push(step);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
