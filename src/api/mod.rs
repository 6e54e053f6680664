pub mod client;
pub mod error;
pub mod types;

pub use client::{DEFAULT_BASE_URL, SessionClient, SubmissionApi};
pub use error::ApiError;
pub use types::{ActionKind, ActionOutcome, SubmissionId};
