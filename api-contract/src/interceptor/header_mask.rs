use super::{Exchange, Interceptor};

const MASK: &str = "***";

/// Replaces sensitive header values in the logged copy of a request.
#[derive(Debug)]
pub struct HeaderMaskInterceptor {
    headers: Vec<String>,
}

impl HeaderMaskInterceptor {
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(headers: I) -> Self {
        Self {
            headers: headers
                .into_iter()
                .map(|e| e.into().to_lowercase())
                .collect(),
        }
    }
}

impl Interceptor for HeaderMaskInterceptor {
    fn before_request(&self, exchange: &mut Exchange) {
        let headers = &mut exchange.logged_request_mut().headers;
        for header_name in &self.headers {
            if let Some(value) = headers.get_mut(header_name) {
                *value = MASK.to_string();
            }
        }
    }
}
