use crate::error::Error;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Header names are stored lowercase so lookups and rendering are stable.
pub type Headers = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct RequestData {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: String,
}

impl RequestData {
    /// The path and query part of the url, as recorded in playback scripts.
    pub fn path_and_query(&self) -> &str {
        match self.url.find("://") {
            Some(scheme_end) => {
                let rest = &self.url[scheme_end + 3..];
                rest.find('/').map(|idx| &rest[idx..]).unwrap_or("/")
            }
            None => &self.url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseData {
    pub status_code: u16,
    pub headers: Headers,
    pub body: String,
}

impl ResponseData {
    pub fn json(&self) -> Result<Value, Error> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::InvalidBody(format!("response body is not JSON: {}", e)))
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_str(&self.body)
            .map_err(|e| Error::InvalidBody(format!("couldn't deserialize response body: {}", e)))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_query_strips_scheme_and_host() {
        let request = RequestData {
            method: Method::GET,
            url: "https://reqres.in/api/users?page=2".into(),
            headers: Headers::new(),
            body: String::new(),
        };

        assert_eq!(request.path_and_query(), "/api/users?page=2");
    }

    #[test]
    fn json_reports_invalid_body() {
        let response = ResponseData {
            status_code: 200,
            headers: Headers::new(),
            body: "<html></html>".into(),
        };

        assert!(matches!(response.json(), Err(Error::InvalidBody(_))));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("content-type".into(), "application/json; charset=utf-8".into());
        let response = ResponseData {
            status_code: 200,
            headers,
            body: "{}".into(),
        };

        assert_eq!(
            response.header("Content-Type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(response.header("x-powered-by"), None);
    }
}
