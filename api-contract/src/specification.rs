//! Shared defaults for building requests and checking responses.
//!
//! A [`RequestSpecification`] is built once from the harness configuration
//! and never changes afterwards. Anything scenario specific is layered on top
//! of it through [`RequestSpecification::request`] or
//! [`RequestSpecification::derive`], both of which produce new values.

use crate::{
    configuration::HarnessConfiguration,
    data::{Headers, RequestData, ResponseData},
    error::Error,
    interceptor::{HeaderMaskInterceptor, Interceptor, InterceptorChain, StructuredLogger},
    report::ReportSink,
    schema::SchemaStore,
};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct RequestSpecification {
    base_uri: String,
    base_path: String,
    headers: Headers,
    content_type: String,
    interceptors: InterceptorChain,
    timeout: Duration,
}

impl RequestSpecification {
    /// An empty builder with no headers and no interceptors.
    pub fn builder() -> RequestSpecificationBuilder {
        RequestSpecificationBuilder::new()
    }

    /// A builder seeded with everything this specification holds. Building it
    /// leaves `self` untouched.
    pub fn derive(&self) -> RequestSpecificationBuilder {
        RequestSpecificationBuilder {
            base_uri: self.base_uri.clone(),
            base_path: self.base_path.clone(),
            headers: self.headers.clone(),
            content_type: self.content_type.clone(),
            interceptors: self.interceptors.clone(),
            timeout: self.timeout,
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn base_url(&self) -> String {
        format!("{}{}", self.base_uri, self.base_path)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn request<P: AsRef<str>>(&self, method: Method, path: P) -> RequestBuilder {
        RequestBuilder {
            method,
            url: format!(
                "{}/{}",
                self.base_url(),
                path.as_ref().trim_start_matches('/')
            ),
            headers: self.headers.clone(),
            query: Vec::new(),
            content_type: self.content_type.clone(),
            body: String::new(),
            error: None,
        }
    }

    pub fn get<P: AsRef<str>>(&self, path: P) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post<P: AsRef<str>>(&self, path: P) -> RequestBuilder {
        self.request(Method::POST, path)
    }
}

#[derive(Debug)]
pub struct RequestSpecificationBuilder {
    base_uri: String,
    base_path: String,
    headers: Headers,
    content_type: String,
    interceptors: InterceptorChain,
    timeout: Duration,
}

impl RequestSpecificationBuilder {
    fn new() -> Self {
        Self {
            base_uri: String::new(),
            base_path: String::new(),
            headers: Headers::new(),
            content_type: JSON_CONTENT_TYPE.into(),
            interceptors: InterceptorChain::new(),
            timeout: crate::configuration::DEFAULT_TIMEOUT,
        }
    }

    pub fn base_uri<S: Into<String>>(&mut self, base_uri: S) -> &mut Self {
        self.base_uri = base_uri.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_path<S: Into<String>>(&mut self, base_path: S) -> &mut Self {
        let base_path = base_path.into();
        let trimmed = base_path.trim_matches('/');
        self.base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    pub fn header<S1: Into<String>, S2: Into<String>>(
        &mut self,
        header_name: S1,
        header_value: S2,
    ) -> &mut Self {
        self.headers
            .insert(header_name.into().to_lowercase(), header_value.into());
        self
    }

    pub fn content_type<S: Into<String>>(&mut self, content_type: S) -> &mut Self {
        self.content_type = content_type.into();
        self
    }

    pub fn interceptor<I: Interceptor + 'static>(&mut self, interceptor: I) -> &mut Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    pub fn build(&self) -> RequestSpecification {
        RequestSpecification {
            base_uri: self.base_uri.clone(),
            base_path: self.base_path.clone(),
            headers: self.headers.clone(),
            content_type: self.content_type.clone(),
            interceptors: self.interceptors.clone(),
            timeout: self.timeout,
        }
    }
}

/// Accumulates one request on top of a [`RequestSpecification`].
///
/// Errors met along the way (a payload that won't serialize, a malformed
/// query) are kept and reported by [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: Headers,
    query: Vec<(String, String)>,
    content_type: String,
    body: String,
    error: Option<Error>,
}

impl RequestBuilder {
    pub fn header<S1: Into<String>, S2: Into<String>>(
        mut self,
        header_name: S1,
        header_value: S2,
    ) -> Self {
        self.headers
            .insert(header_name.into().to_lowercase(), header_value.into());
        self
    }

    pub fn query<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => self.body = body,
            Err(e) => {
                self.error = Some(Error::InvalidBody(format!(
                    "couldn't serialize request payload: {}",
                    e
                )))
            }
        }
        self
    }

    pub fn body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<RequestData, Error> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let url = if self.query.is_empty() {
            self.url
        } else {
            let mut url = Url::parse(&self.url).map_err(|e| {
                Error::Configuration(format!("invalid request url {}: {}", self.url, e))
            })?;
            url.query_pairs_mut().extend_pairs(self.query.iter());
            url.to_string()
        };

        let mut headers = self.headers;
        if !self.body.is_empty() && !headers.contains_key("content-type") {
            headers.insert("content-type".into(), self.content_type);
        }

        Ok(RequestData {
            method: self.method,
            url,
            headers,
            body: self.body,
        })
    }
}

/// What a response has to look like. Built per call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseExpectation {
    status_code: u16,
    schema_id: Option<String>,
}

impl ResponseExpectation {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            schema_id: None,
        }
    }

    pub fn with_status(&self, status_code: u16) -> Self {
        Self {
            status_code,
            schema_id: self.schema_id.clone(),
        }
    }

    pub fn with_schema<S: Into<String>>(&self, schema_id: S) -> Self {
        Self {
            status_code: self.status_code,
            schema_id: Some(schema_id.into()),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    /// Checks the status first, then the schema, and hands back the parsed
    /// body. A response without a body parses to `null` when no schema is
    /// expected.
    pub fn verify(&self, response: &ResponseData, schemas: &SchemaStore) -> Result<Value, Error> {
        if response.status_code != self.status_code {
            return Err(Error::UnexpectedStatusCode {
                expected: self.status_code,
                actual: response.status_code,
            });
        }

        let schema_id = match &self.schema_id {
            Some(schema_id) => schema_id,
            None if response.body.trim().is_empty() => return Ok(Value::Null),
            None => return response.json(),
        };

        let body = response.json()?;
        schemas.validate(&body, schema_id)?.into_result()?;

        Ok(body)
    }
}

impl Default for ResponseExpectation {
    fn default() -> Self {
        build_response_defaults()
    }
}

pub fn build_request_defaults(
    configuration: &HarnessConfiguration,
    sink: Arc<ReportSink>,
) -> RequestSpecification {
    let mut builder = RequestSpecification::builder();
    builder
        .base_uri(configuration.base_uri())
        .base_path(configuration.base_path())
        .content_type(JSON_CONTENT_TYPE)
        .header("accept", JSON_CONTENT_TYPE)
        .timeout(configuration.timeout())
        .interceptor(HeaderMaskInterceptor::new(
            configuration.masked_headers().iter().cloned(),
        ))
        .interceptor(StructuredLogger::new(sink));

    if let Some(api_key) = configuration.api_key() {
        builder.header(API_KEY_HEADER, api_key);
    }

    builder.build()
}

pub fn build_response_defaults() -> ResponseExpectation {
    ResponseExpectation::new(200)
}
