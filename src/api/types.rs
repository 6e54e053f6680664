//! Wire types for the submission API.
//!
//! The listing endpoint wraps its payload in a `data` envelope and uses
//! camelCase keys, so the structs here rename fields with `serde` to keep
//! snake_case on the Rust side.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key of one submission. Duplicates are passed through untouched.
pub type SubmissionId = String;

/// Body of `POST /auth/session`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `GET /submission`.
///
/// Missing `data` or `submissions` keys decode as an empty page, which the
/// producer treats as the end of the source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionListResponse {
    #[serde(default)]
    pub data: SubmissionListData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListData {
    #[serde(default)]
    pub submissions: Vec<SubmissionEntry>,
    /// Total number of submissions visible to the caller, when the server reports it.
    #[serde(default)]
    pub submission_count: Option<u64>,
}

/// One listing entry. Only the identifier is read; other fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEntry {
    pub submission_id: SubmissionId,
}

impl SubmissionListResponse {
    /// Identifiers in the order the server returned them.
    pub fn into_ids(self) -> Vec<SubmissionId> {
        self.data
            .submissions
            .into_iter()
            .map(|entry| entry.submission_id)
            .collect()
    }
}

/// A server-side migration that can be triggered for a submission.
///
/// Each kind maps to `POST /submission/{id}/migrate-{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Move the submitted source code to object storage.
    Code,
    /// Move per-case sandbox output to object storage.
    Output,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Code => "code",
            ActionKind::Output => "output",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one `(submission, action)` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The server accepted the migration (200, 202 or 204).
    Success { status: u16 },
    /// Any other status, or no response at all (`status: None`).
    Failure { status: Option<u16>, detail: String },
}
