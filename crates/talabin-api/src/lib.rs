// talabin-api: HTTP executor, response envelope, and wire models for the Talabin backend

pub mod config;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod ids;
pub mod models;
pub mod request;
pub mod transport;

pub use config::{ClientConfig, RetryPolicy};
pub use envelope::{ApiError, ErrorKind, GENERIC_FAILURE_MESSAGE, ResponseEnvelope};
pub use error::Error;
pub use executor::RequestExecutor;
pub use ids::{NationalId, PhoneNumber};
pub use request::{ApiRequest, FileUpload};
pub use transport::TlsMode;
