use serde::{Deserialize, Serialize};

/// Body of `POST /register`. The email is optional so the API's own
/// validation can be exercised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
}

impl Credentials {
    pub fn new<S1: Into<String>, S2: Into<String>>(email: S1, password: S2) -> Self {
        Self {
            email: Some(email.into()),
            password: password.into(),
        }
    }

    pub fn without_email<S: Into<String>>(password: S) -> Self {
        Self {
            email: None,
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisteredUser {
    pub id: u64,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_email_is_left_out_of_the_body() {
        let body = serde_json::to_string(&Credentials::without_email("pistol")).unwrap();

        assert_eq!(body, r#"{"password":"pistol"}"#);
    }
}
