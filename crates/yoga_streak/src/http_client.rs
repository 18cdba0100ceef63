//! HTTP implementation of [`ActivitySource`](crate::ActivitySource).
//!
//! Talks to the practice-log API: `GET {base}/api/users/{user}/activity/{kind}`
//! returns a JSON array of [`PracticeRecord`](crate::PracticeRecord).

use crate::config::Config;
use crate::retry::{RetryPolicy, is_transient};
use crate::{ActivityKind, ActivitySource, PracticeRecord, StreakError};
use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};

/// Activity source backed by the practice-log HTTP API.
#[derive(Clone, Debug)]
pub struct ReqwestActivitySource {
    base_url: String,
    api_token: SecretString,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ReqwestActivitySource {
    /// Create a new source.
    ///
    /// # Arguments
    /// * `base_url` - Root of the practice-log API (e.g., "https://api.example.com")
    /// * `api_token` - Bearer token sent with every request
    pub fn new(base_url: &str, api_token: SecretString) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url, config.api_token.clone())
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Each part is pushed as its own percent-encoded path segment, so a
    /// user id can never escape `/api/users/{user}`.
    fn activity_url(&self, user_id: &str, kind: ActivityKind) -> Result<Url, StreakError> {
        if matches!(user_id, "." | "..") {
            return Err(StreakError::InvalidInput(format!("invalid user id: {user_id}")));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StreakError::Config(format!("invalid api base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StreakError::Config("api base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["api", "users", user_id, "activity", kind.as_str()]);
        Ok(url)
    }

    async fn fetch_records(
        &self,
        user_id: &str,
        kind: ActivityKind,
    ) -> Result<Vec<PracticeRecord>, StreakError> {
        let url = self.activity_url(user_id, kind)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.api_token.expose_secret())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(resp.json::<Vec<PracticeRecord>>().await?)
    }

    /// Extract error information from a failed response.
    async fn error_from_response(resp: reqwest::Response) -> StreakError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();
        StreakError::from_status(status, body_snippet)
    }
}

#[async_trait]
impl ActivitySource for ReqwestActivitySource {
    async fn fetch_activity_timestamps(
        &self,
        user_id: &str,
        kind: ActivityKind,
    ) -> Result<Vec<String>, StreakError> {
        if user_id.trim().is_empty() {
            return Err(StreakError::InvalidInput("user id is empty".into()));
        }
        let records = self
            .retry
            .retry_if(|| self.fetch_records(user_id, kind), is_transient)
            .await?;
        tracing::debug!(%kind, user_id, count = records.len(), "fetched practice records");
        Ok(records.into_iter().map(|r| r.performed_at).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_url_trims_trailing_slash() {
        let src = ReqwestActivitySource::new("http://localhost:9000/", SecretString::new("t".into()));
        assert_eq!(
            src.activity_url("u1", ActivityKind::Series).unwrap().as_str(),
            "http://localhost:9000/api/users/u1/activity/series"
        );
    }

    #[test]
    fn activity_url_keeps_base_path_prefix() {
        let src = ReqwestActivitySource::new("http://localhost:9000/v2", SecretString::new("t".into()));
        assert_eq!(
            src.activity_url("u1", ActivityKind::Asana).unwrap().as_str(),
            "http://localhost:9000/v2/api/users/u1/activity/asana"
        );
    }

    #[test]
    fn activity_url_encodes_user_id_as_one_segment() {
        let src = ReqwestActivitySource::new("http://localhost:9000", SecretString::new("t".into()));
        let url = src.activity_url("../../admin?x=1#f", ActivityKind::Asana).unwrap();
        assert!(url.path().starts_with("/api/users/..%2F..%2Fadmin%3F"));
        assert!(url.path().ends_with("/activity/asana"));
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn dot_segments_are_rejected() {
        let src = ReqwestActivitySource::new("http://localhost:9000", SecretString::new("t".into()));
        assert!(matches!(
            src.activity_url("..", ActivityKind::Asana),
            Err(StreakError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn empty_user_id_is_rejected_without_request() {
        let src = ReqwestActivitySource::new("http://127.0.0.1:1", SecretString::new("t".into()));
        let res = src.fetch_activity_timestamps("  ", ActivityKind::Asana).await;
        assert!(matches!(res, Err(StreakError::InvalidInput(_))));
    }
}
