use super::{LogRecord, ScenarioReport};
use crate::{
    data::{Headers, ResponseData},
    error::Error,
    interceptor::ExchangeOutcome,
    step::{StepRecord, StepStatus},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    fmt::{self, Write},
    fs,
    path::Path,
};

lazy_static! {
    static ref HEADER_REGEX: Regex =
        Regex::new(r"(?m)^(?P<header_key>[a-zA-Z0-9\-]+): (?P<header_value>.*?)$").unwrap();
    static ref INTERACTION_REGEX: Regex = Regex::new(concat!(
        r"(?ms)^## Interaction (?P<interaction_number>[0-9]+): (?P<http_method>[A-Z]+) (?P<url>\S+)[ \t]*$.*?",
        r"^### Request headers recorded for playback.*?```[^\n]*\n(?P<request_headers_part>.*?)^```.*?",
        r"^### Request body recorded for playback.*?```[^\n]*\n(?P<request_body_part>.*?)^```.*?",
        r"^### Response headers recorded for playback.*?```[^\n]*\n(?P<response_headers_part>.*?)^```.*?",
        r"^### Response body recorded for playback \((?P<status_code>[0-9]+)[^)]*\).*?```[^\n]*\n(?P<response_body_part>.*?)^```",
    ))
    .unwrap();
}

/// An exchange read back from a markdown report.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedInteraction {
    pub interaction_number: u64,
    pub method: String,
    pub url: String,
    pub request_headers: Headers,
    pub request_body: String,
    /// `0` marks an exchange that failed before a response arrived; the body
    /// then holds the failure.
    pub status_code: u16,
    pub response_headers: Headers,
    pub response_body: String,
}

impl RecordedInteraction {
    pub fn response(&self) -> ResponseData {
        ResponseData {
            status_code: self.status_code,
            headers: self.response_headers.clone(),
            body: self.response_body.clone(),
        }
    }
}

pub fn render_exchange(record: &LogRecord) -> Result<String, fmt::Error> {
    let mut block = String::new();

    write!(
        block,
        "## Interaction {}: {} {}\n\n",
        record.number(),
        record.method(),
        record.url()
    )?;
    write!(
        block,
        "*{}, {} ms*\n\n",
        record.timestamp(),
        record.elapsed().as_millis()
    )?;

    write!(block, "### Request headers recorded for playback:\n\n```\n")?;
    write_headers(&mut block, record.request_headers())?;
    write!(block, "```\n\n")?;

    write!(
        block,
        "### Request body recorded for playback ({}):\n\n```\n{}\n```\n\n",
        record
            .request_headers()
            .get("content-type")
            .map(String::as_str)
            .unwrap_or(""),
        record.request_body()
    )?;

    match record.outcome() {
        ExchangeOutcome::Response(response) => {
            write!(block, "### Response headers recorded for playback:\n\n```\n")?;
            write_headers(&mut block, &response.headers)?;
            write!(block, "```\n\n")?;
            write!(
                block,
                "### Response body recorded for playback ({}: {}):\n\n```\n{}\n```\n\n",
                response.status_code,
                response
                    .headers
                    .get("content-type")
                    .map(String::as_str)
                    .unwrap_or(""),
                response.body
            )?;
        }
        ExchangeOutcome::Failure(cause) => {
            write!(
                block,
                "### Response headers recorded for playback:\n\n```\n```\n\n"
            )?;
            write!(
                block,
                "### Response body recorded for playback (0: transport failure):\n\n```\n{}\n```\n\n",
                cause
            )?;
        }
    }

    Ok(block)
}

fn write_headers(block: &mut String, headers: &Headers) -> fmt::Result {
    for (key, value) in headers {
        writeln!(block, "{}: {}", key, value)?;
    }
    Ok(())
}

pub fn render_step(step: &StepRecord) -> String {
    let status = match step.status {
        StepStatus::Pending => "pending",
        StepStatus::Succeeded => "passed",
        StepStatus::Failed => "failed",
    };
    let mut block = format!(
        "### Step [{}] {} ({} ms)\n\n",
        status,
        step.name,
        step.elapsed.as_millis()
    );

    if let Some(parent) = &step.parent {
        block.push_str(&format!("- Parent: {}\n", parent));
    }
    if let Some(value) = &step.value {
        block.push_str(&format!("- Result: `{}`\n", value));
    }
    if !step.exchanges.is_empty() {
        let numbers: Vec<String> = step
            .exchanges
            .iter()
            .map(|record| record.number().to_string())
            .collect();
        block.push_str(&format!("- Interactions: {}\n", numbers.join(", ")));
    }
    if let Some(cause) = &step.cause {
        block.push_str(&format!("- Cause: {}\n", cause));
        for record in &step.exchanges {
            block.push('\n');
            for line in record.rendered().trim_end().lines() {
                if line.is_empty() {
                    block.push_str(">\n");
                } else {
                    block.push_str(&format!("> {}\n", line));
                }
            }
        }
    }
    block.push('\n');

    block
}

pub fn render_summary(report: &ScenarioReport) -> String {
    let failed = report.failed_steps().count();
    let mut block = format!(
        "## Scenario {}: {}\n\n",
        report.name,
        if report.passed() { "passed" } else { "failed" }
    );
    block.push_str(&format!(
        "{} steps, {} failed\n\n",
        report.steps.len(),
        failed
    ));
    for step in &report.steps {
        let indent = "  ".repeat(step.depth);
        let mark = if step.status == StepStatus::Succeeded {
            "x"
        } else {
            " "
        };
        block.push_str(&format!("{}- [{}] {}\n", indent, mark, step.name));
    }
    block.push('\n');

    block
}

pub fn parse_interactions(contents: &str) -> Result<Vec<RecordedInteraction>, Error> {
    let mut data = Vec::new();

    for captures in INTERACTION_REGEX.captures_iter(contents) {
        let interaction_number = captures["interaction_number"]
            .parse()
            .map_err(|_| Error::InvalidMarkdownFormat)?;
        let status_code = captures["status_code"]
            .parse()
            .map_err(|_| Error::InvalidMarkdownFormat)?;

        data.push(RecordedInteraction {
            interaction_number,
            method: captures["http_method"].into(),
            url: captures["url"].into(),
            request_headers: parse_headers(&captures["request_headers_part"]),
            request_body: strip_fence_newline(&captures["request_body_part"]),
            status_code,
            response_headers: parse_headers(&captures["response_headers_part"]),
            response_body: strip_fence_newline(&captures["response_body_part"]),
        });
    }

    if data.is_empty() {
        Err(Error::InvalidMarkdownFormat)
    } else {
        Ok(data)
    }
}

pub fn load_interactions<P: AsRef<Path>>(path: P) -> Result<Vec<RecordedInteraction>, Error> {
    let contents = fs::read_to_string(path)?;
    parse_interactions(&contents)
}

fn parse_headers<T: AsRef<str>>(headers_part: T) -> Headers {
    let mut headers = Headers::new();

    for capture in HEADER_REGEX.captures_iter(headers_part.as_ref()) {
        headers.insert(
            capture["header_key"].trim().to_lowercase(),
            String::from(capture["header_value"].trim()),
        );
    }

    headers
}

fn strip_fence_newline(part: &str) -> String {
    let part = part.strip_suffix('\n').unwrap_or(part);
    part.strip_suffix('\r').unwrap_or(part).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::RequestData,
        interceptor::Exchange,
        report::LogRecordDraft,
    };
    use reqwest::Method;
    use std::{sync::Arc, time::Duration};

    fn record(number: u64, outcome: ExchangeOutcome) -> LogRecord {
        let mut headers = Headers::new();
        headers.insert("content-type".into(), "application/json".into());
        let exchange = Exchange::new(
            number,
            RequestData {
                method: Method::POST,
                url: "https://reqres.in/api/register".into(),
                headers,
                body: r#"{"password":"pistol"}"#.into(),
            },
        );
        LogRecordDraft::from_exchange(&exchange)
            .finish(outcome, Duration::from_millis(42))
            .unwrap()
    }

    fn bad_request() -> ExchangeOutcome {
        let mut headers = Headers::new();
        headers.insert("content-type".into(), "application/json; charset=utf-8".into());
        ExchangeOutcome::Response(ResponseData {
            status_code: 400,
            headers,
            body: r#"{"error":"Missing email or username"}"#.into(),
        })
    }

    #[test]
    fn rendered_exchange_reads_back() {
        let rendered = record(5, bad_request()).rendered().to_string();

        let interactions = parse_interactions(&rendered).unwrap();

        assert_eq!(interactions.len(), 1);
        let interaction = &interactions[0];
        assert_eq!(interaction.interaction_number, 5);
        assert_eq!(interaction.method, "POST");
        assert_eq!(interaction.url, "https://reqres.in/api/register");
        assert_eq!(interaction.request_body, r#"{"password":"pistol"}"#);
        assert_eq!(interaction.status_code, 400);
        assert_eq!(
            interaction.response_body,
            r#"{"error":"Missing email or username"}"#
        );
        assert_eq!(
            interaction.response_headers["content-type"],
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn transport_failures_render_with_status_zero() {
        let rendered = record(
            1,
            ExchangeOutcome::Failure("timed out after 10 ms".into()),
        )
        .rendered()
        .to_string();

        let interactions = parse_interactions(&rendered).unwrap();

        assert_eq!(interactions[0].status_code, 0);
        assert_eq!(interactions[0].response_body, "timed out after 10 ms");
    }

    #[test]
    fn failed_step_quotes_its_exchanges() {
        let exchange = Arc::new(record(2, bad_request()));
        let step = StepRecord {
            name: "Register without email".into(),
            parent: Some("Registration".into()),
            depth: 1,
            status: StepStatus::Failed,
            cause: Some("Unexpected status code: expected 200, got 400".into()),
            value: None,
            exchanges: vec![exchange],
            elapsed: Duration::from_millis(50),
        };

        let block = render_step(&step);

        assert!(block.starts_with("### Step [failed] Register without email"));
        assert!(block.contains("- Parent: Registration"));
        assert!(block.contains("- Cause: Unexpected status code: expected 200, got 400"));
        assert!(block.contains("> ## Interaction 2: POST https://reqres.in/api/register"));
        // quoted exchanges are not picked up as interactions
        assert!(parse_interactions(&block).is_err());
    }

    #[test]
    fn text_without_interactions_is_invalid() {
        assert!(matches!(
            parse_interactions("# nothing here"),
            Err(Error::InvalidMarkdownFormat)
        ));
    }
}
