use crate::{
    data::{RequestData, ResponseData},
    error::Error,
    report::markdown::{self, RecordedInteraction},
    util,
};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    sync::Mutex,
};

#[async_trait]
pub trait HttpClient: Debug {
    async fn make_request(&self, request_data: &RequestData) -> Result<ResponseData, Error>;
}

#[derive(Debug)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn network_error(url: &str, error: reqwest::Error) -> Error {
        Error::Network {
            url: url.to_string(),
            cause: error.to_string(),
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn make_request(&self, request_data: &RequestData) -> Result<ResponseData, Error> {
        let mut headers = HeaderMap::new();
        util::put_headers(
            &mut headers,
            request_data
                .headers
                .iter()
                .filter(|(header_name, _)| header_name.as_str() != "host"),
        )?;

        let mut request_builder = self
            .client
            .request(request_data.method.clone(), request_data.url.as_str())
            .headers(headers);
        if !request_data.body.is_empty() {
            request_builder = request_builder.body(request_data.body.clone());
        }

        let response = request_builder
            .send()
            .await
            .map_err(|e| Self::network_error(&request_data.url, e))?;

        let status_code = response.status().as_u16();
        let headers = util::extract_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::network_error(&request_data.url, e))?;

        Ok(ResponseData {
            status_code,
            headers,
            body: String::from_utf8_lossy(&body).into(),
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Answers requests from a markdown recording, in recorded order.
///
/// Each request must have the method and path of the next recorded
/// interaction. Hosts are not compared, so a recording made against one
/// deployment plays back under any base address.
#[derive(Debug)]
pub struct PlaybackHttpClient {
    script: PathBuf,
    interactions: Vec<RecordedInteraction>,
    interaction_number: Mutex<usize>,
}

impl PlaybackHttpClient {
    pub fn load<P: AsRef<Path>>(script: P) -> Result<Self, Error> {
        let interactions = markdown::load_interactions(script.as_ref()).map_err(|e| {
            Error::Playback(format!(
                "couldn't load recording {}: {}",
                script.as_ref().display(),
                e
            ))
        })?;

        Ok(Self::from_interactions(script.as_ref(), interactions))
    }

    pub fn from_interactions<P: Into<PathBuf>>(
        script: P,
        interactions: Vec<RecordedInteraction>,
    ) -> Self {
        Self {
            script: script.into(),
            interactions,
            interaction_number: Mutex::new(0),
        }
    }

    pub fn remaining(&self) -> usize {
        let played = self
            .interaction_number
            .lock()
            .map(|number| *number)
            .unwrap_or(self.interactions.len());
        self.interactions.len().saturating_sub(played)
    }

    fn next_interaction(&self, request_data: &RequestData) -> Result<&RecordedInteraction, Error> {
        let mut interaction_number = self.interaction_number.lock()?;
        let interaction = self.interactions.get(*interaction_number).ok_or_else(|| {
            Error::Playback(format!(
                "{} has no interaction left for {} {}",
                self.script.display(),
                request_data.method,
                request_data.path_and_query()
            ))
        })?;

        let recorded = RequestData {
            method: request_data.method.clone(),
            url: interaction.url.clone(),
            headers: Default::default(),
            body: String::new(),
        };
        if interaction.method != request_data.method.as_str()
            || recorded.path_and_query() != request_data.path_and_query()
        {
            return Err(Error::Playback(format!(
                "interaction {} of {} is {} {}, but the scenario sent {} {}",
                *interaction_number,
                self.script.display(),
                interaction.method,
                recorded.path_and_query(),
                request_data.method,
                request_data.path_and_query()
            )));
        }

        *interaction_number += 1;
        Ok(interaction)
    }
}

#[async_trait]
impl HttpClient for PlaybackHttpClient {
    async fn make_request(&self, request_data: &RequestData) -> Result<ResponseData, Error> {
        let interaction = self.next_interaction(request_data)?;

        if interaction.status_code == 0 {
            return Err(Error::Network {
                url: request_data.url.clone(),
                cause: interaction.response_body.clone(),
            });
        }

        Ok(interaction.response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Headers;
    use reqwest::Method;

    fn interaction(method: &str, url: &str, status_code: u16, body: &str) -> RecordedInteraction {
        RecordedInteraction {
            interaction_number: 1,
            method: method.into(),
            url: url.into(),
            request_headers: Headers::new(),
            request_body: String::new(),
            status_code,
            response_headers: Headers::new(),
            response_body: body.into(),
        }
    }

    fn get(url: &str) -> RequestData {
        RequestData {
            method: Method::GET,
            url: url.into(),
            headers: Headers::new(),
            body: String::new(),
        }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn playback_answers_in_order_regardless_of_host() {
        let client = PlaybackHttpClient::from_interactions(
            "users.md",
            vec![
                interaction("GET", "https://reqres.in/api/users/2", 200, "{\"first\":true}"),
                interaction("GET", "https://reqres.in/api/users?page=2", 200, "{\"second\":true}"),
            ],
        );

        let first = block_on(client.make_request(&get("http://localhost:9000/api/users/2"))).unwrap();
        let second = block_on(client.make_request(&get("https://reqres.in/api/users?page=2"))).unwrap();

        assert_eq!(first.body, "{\"first\":true}");
        assert_eq!(second.body, "{\"second\":true}");
        assert_eq!(client.remaining(), 0);
    }

    #[test]
    fn playback_rejects_unexpected_requests() {
        let client = PlaybackHttpClient::from_interactions(
            "users.md",
            vec![interaction("GET", "https://reqres.in/api/users/2", 200, "{}")],
        );

        let result = block_on(client.make_request(&get("https://reqres.in/api/users/3")));

        assert!(matches!(result, Err(Error::Playback(_))));
        assert_eq!(client.remaining(), 1);
    }

    #[test]
    fn playback_fails_when_exhausted() {
        let client = PlaybackHttpClient::from_interactions("empty.md", Vec::new());

        let result = block_on(client.make_request(&get("https://reqres.in/api/users")));

        assert!(matches!(result, Err(Error::Playback(message)) if message.contains("no interaction left")));
    }

    #[test]
    fn recorded_transport_failures_replay_as_network_errors() {
        let client = PlaybackHttpClient::from_interactions(
            "offline.md",
            vec![interaction("GET", "https://reqres.in/api/users", 0, "connection refused")],
        );

        let result = block_on(client.make_request(&get("https://reqres.in/api/users")));

        assert!(matches!(result, Err(Error::Network { cause, .. }) if cause == "connection refused"));
    }

    #[test]
    fn missing_recording_is_a_playback_error() {
        let result = PlaybackHttpClient::load("does/not/exist.md");

        assert!(matches!(result, Err(Error::Playback(_))));
    }
}
