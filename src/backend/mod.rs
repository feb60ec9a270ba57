//! Client for the MyHorseManager product API: user profile flags and
//! per-resource counts.

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::entitlement::ResourceKind;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Session token missing or rejected")]
    Auth,
    #[error("Network error: {0}")]
    Unreachable(String),
    #[error("Backend API error ({status}): {body}")]
    Api { status: StatusCode, body: String },
    #[error("Malformed backend response: {0}")]
    Decode(String),
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Profile flags assigned by the backend. Absent fields read as false so
/// older server versions keep working.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_premium: bool,
}

/// Current count of one resource kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCount {
    pub kind: ResourceKind,
    pub count: u32,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u32,
}

/// Seam over the user-profile source so tests can supply fakes.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, token: Option<&str>) -> Result<UserProfile, BackendError>;
}

pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, BackendError> {
        let token = token.ok_or(BackendError::Auth)?;
        let url = self.endpoint(path)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(BackendError::Auth),
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| BackendError::Decode(e.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(BackendError::Api { status, body })
            }
        }
    }

    pub async fn fetch_profile(&self, token: Option<&str>) -> Result<UserProfile, BackendError> {
        self.get_json("api/users/me", token).await
    }

    pub async fn fetch_count(
        &self,
        kind: ResourceKind,
        token: Option<&str>,
    ) -> Result<u32, BackendError> {
        let response: CountResponse = self
            .get_json(&format!("api/{}/count", kind.as_str()), token)
            .await?;
        Ok(response.count)
    }

    /// Fetch the counts for every gated resource kind concurrently.
    pub async fn fetch_counts(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<ResourceCount>, BackendError> {
        try_join_all(ResourceKind::ALL.iter().map(|kind| async move {
            let count = self.fetch_count(*kind, token).await?;
            Ok(ResourceCount { kind: *kind, count })
        }))
        .await
    }
}

#[async_trait]
impl ProfileSource for ApiClient {
    async fn fetch_profile(&self, token: Option<&str>) -> Result<UserProfile, BackendError> {
        ApiClient::fetch_profile(self, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_decodes_flags() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"is_admin": true, "is_premium": false}"#).unwrap();
        assert!(profile.is_admin);
        assert!(!profile.is_premium);
    }

    #[test]
    fn test_profile_missing_flags_default_false() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"email": "rider@example.com"}"#).unwrap();
        assert!(!profile.is_admin);
        assert!(!profile.is_premium);
    }

    #[test]
    fn test_count_response_decodes() {
        let response: CountResponse = serde_json::from_str(r#"{"count": 7}"#).unwrap();
        assert_eq!(response.count, 7);
    }

    #[test]
    fn test_endpoint_joins_against_base() {
        let client = ApiClient::new(Url::parse("https://api.myhorsemanager.app").unwrap());
        let url = client.endpoint("api/horses/count").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.myhorsemanager.app/api/horses/count"
        );
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error() {
        let client = ApiClient::new(Url::parse("https://api.myhorsemanager.app").unwrap());
        let err = client.fetch_profile(None).await.unwrap_err();
        assert!(matches!(err, BackendError::Auth));
    }
}
