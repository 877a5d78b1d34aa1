use crate::models::{Credentials, UpdateUser};
use api_contract::{Error, ResponseData, Scenario};

/// The reqres.in user endpoints, called through a scenario so every exchange
/// is intercepted, logged and bounded by the scenario's timeout.
///
/// Calls return the raw response; checking it is up to the scenario.
#[derive(Debug, Clone, Copy)]
pub struct ReqresApi<'a> {
    scenario: &'a Scenario,
}

impl<'a> ReqresApi<'a> {
    pub fn new(scenario: &'a Scenario) -> Self {
        Self { scenario }
    }

    /// `POST /register`
    pub fn register(&self, credentials: &Credentials) -> Result<ResponseData, Error> {
        let request = self
            .scenario
            .spec()
            .post("/register")
            .json(credentials)
            .build()?;

        self.scenario.send(request)
    }

    /// `GET /users/{id}`
    pub fn get_user(&self, id: u64) -> Result<ResponseData, Error> {
        let request = self.scenario.spec().get(format!("/users/{}", id)).build()?;

        self.scenario.send(request)
    }

    /// `GET /users`, or `GET /users?page={page}` when a page is given.
    pub fn list_users(&self, page: Option<u32>) -> Result<ResponseData, Error> {
        let mut request = self.scenario.spec().get("/users");
        if let Some(page) = page {
            request = request.query("page", page);
        }

        self.scenario.send(request.build()?)
    }

    /// `POST /users/{id}`
    pub fn update_user(&self, id: u64, update: &UpdateUser) -> Result<ResponseData, Error> {
        let request = self
            .scenario
            .spec()
            .post(format!("/users/{}", id))
            .json(update)
            .build()?;

        self.scenario.send(request)
    }
}
