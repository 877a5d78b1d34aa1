pub mod assert;
pub mod configuration;
pub mod data;
mod error;
pub mod http_client;
pub mod interceptor;
pub mod logging;
pub mod report;
pub mod scenario;
pub mod schema;
pub mod specification;
pub mod step;
mod util;

pub use api_contract_codegen::contract_test;
pub use configuration::{HarnessConfiguration, HarnessMode};
pub use data::{Headers, RequestData, ResponseData};
pub use error::Error;
pub use http_client::HttpClient;
pub use report::ScenarioReport;
pub use scenario::Scenario;
pub use schema::{SchemaStore, ValidationResult};
pub use specification::{RequestSpecification, ResponseExpectation};
pub use step::{StepReporter, StepStatus};
