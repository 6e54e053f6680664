use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info};

use super::error::ApiError;
use super::types::{ActionKind, ActionOutcome, LoginRequest, SubmissionId, SubmissionListResponse};

/// Default API root of a locally running judge backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

const BODY_READ_FAILED: &str = "failed to read response body";

/// Longest rejection body kept in a failure detail, in characters.
const MAX_DETAIL_CHARS: usize = 512;

/// The calls the migration pipeline makes against the backend.
///
/// Implementations are shared by every producer and worker task, so they
/// must be usable concurrently through `&self`.
pub trait SubmissionApi: Send + Sync + 'static {
    /// Fetch one page of submission ids for the window `[offset, offset + count)`.
    fn fetch_page(
        &self,
        offset: u64,
        count: u64,
    ) -> impl Future<Output = Result<Vec<SubmissionId>, ApiError>> + Send;

    /// Trigger one migration for one submission. Never fails; problems are
    /// reported in the returned outcome.
    fn invoke(
        &self,
        submission_id: &str,
        action: ActionKind,
    ) -> impl Future<Output = ActionOutcome> + Send;
}

/// HTTP client holding the session cookie issued at login.
///
/// Cloning is cheap and clones share the same connection pool and cookie store.
#[derive(Debug, Clone)]
pub struct SessionClient {
    client: Client,
    base_url: String,
}

impl SessionClient {
    /// Create a client with an empty cookie store pointing at `base_url`.
    /// No request is made; use [`SessionClient::authenticate`] to log in.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Log in and return a client whose requests carry the session cookie.
    pub async fn authenticate(
        base_url: impl Into<String>,
        username: &str,
        password: &str,
    ) -> Result<Self, ApiError> {
        let session = Self::with_base_url(base_url)?;
        session.login(username, password).await?;
        Ok(session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let url = format!("{}/auth/session", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| BODY_READ_FAILED.to_string());
            return Err(ApiError::Auth {
                status: status.as_u16(),
                body,
            });
        }

        info!(username, "login accepted, session cookie stored");
        Ok(())
    }

    /// `GET /submission?count=..&offset=..`, ids in server order.
    pub async fn fetch_submission_ids(
        &self,
        offset: u64,
        count: u64,
    ) -> Result<Vec<SubmissionId>, ApiError> {
        let url = format!("{}/submission", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("count", count), ("offset", offset)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Fetch {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let page: SubmissionListResponse = serde_json::from_str(&body)?;
        if let Some(total) = page.data.submission_count {
            debug!(total, offset, count, "listing reports total submission count");
        }
        Ok(page.into_ids())
    }

    /// `/submission/{id}/migrate-{action}` under the API root. The id is
    /// pushed as a single path segment, so `/`, `?` and `#` are percent-encoded.
    fn migration_url(&self, submission_id: &str, action: ActionKind) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| format!("invalid base url: {e}"))?;
        url.path_segments_mut()
            .map_err(|()| format!("base url cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .push("submission")
            .push(submission_id)
            .push(&format!("migrate-{action}"));
        Ok(url)
    }

    /// `POST /submission/{id}/migrate-{action}` with an empty body.
    pub async fn trigger_migration(&self, submission_id: &str, action: ActionKind) -> ActionOutcome {
        let url = match self.migration_url(submission_id, action) {
            Ok(url) => url,
            Err(detail) => return ActionOutcome::Failure { status: None, detail },
        };

        let response = match self.client.post(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return ActionOutcome::Failure {
                    status: None,
                    detail: e.to_string(),
                };
            }
        };

        let status = response.status();
        if is_migration_accepted(status) {
            return ActionOutcome::Success {
                status: status.as_u16(),
            };
        }

        let detail = response
            .text()
            .await
            .map(snippet)
            .unwrap_or_else(|_| BODY_READ_FAILED.to_string());
        ActionOutcome::Failure {
            status: Some(status.as_u16()),
            detail,
        }
    }
}

// Rejection pages can be whole HTML error documents; keep the head only.
fn snippet(mut body: String) -> String {
    if let Some((cut, _)) = body.char_indices().nth(MAX_DETAIL_CHARS) {
        body.truncate(cut);
        body.push_str("...");
    }
    body
}

fn is_migration_accepted(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT
    )
}

impl SubmissionApi for SessionClient {
    async fn fetch_page(&self, offset: u64, count: u64) -> Result<Vec<SubmissionId>, ApiError> {
        self.fetch_submission_ids(offset, count).await
    }

    async fn invoke(&self, submission_id: &str, action: ActionKind) -> ActionOutcome {
        self.trigger_migration(submission_id, action).await
    }
}
