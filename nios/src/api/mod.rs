pub mod client;
pub mod common;
pub mod error;
pub mod refs;
pub mod test_helpers;

pub use client::{Client, ClientConfig, ObjectsApi};
pub use common::{ApiQueryParams, WapiObject};
pub use error::ApiError;
pub use refs::{extract_ref, ObjectRef};
