mod models;
mod reqres_api;
#[cfg(test)]
mod scenarios;

pub use models::*;
pub use reqres_api::ReqresApi;
