use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Envelope of `GET /users/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserData {
    pub data: User,
}

/// One page of `GET /users`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UsersPage {
    pub page: u32,
    pub per_page: u32,
    pub total: u32,
    pub total_pages: u32,
    pub data: Vec<User>,
}

impl UsersPage {
    pub fn find(&self, id: u64) -> Option<&User> {
        self.data.iter().find(|user| user.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateUser {
    pub name: String,
    pub job: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdatedUser {
    pub name: String,
    pub job: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}
