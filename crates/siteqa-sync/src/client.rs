//! HTTP client for the project API under `/api/v1`.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use siteqa_core::asset::AssetList;
use tracing::{debug, info};

use crate::SyncError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    /// `base_url` should be like `http://localhost:3000`; a trailing slash is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the project API.
///
/// Endpoint groups live in sibling modules as further `impl ApiClient`
/// blocks. Blob uploads go through a second client that never carries the
/// bearer token, since signed storage URLs authenticate themselves.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    blob_client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, SyncError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| SyncError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::InvalidBaseUrl(config.base_url));
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let blob_client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            blob_client,
            base,
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `<base>/api/v1/<segments...>`, each segment percent-encoded.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        url
    }

    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!(%method, url = %url, "api request");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) fn blob(&self) -> &reqwest::Client {
        &self.blob_client
    }

    /// Send and decode a JSON body, mapping non-2xx to [`SyncError::Server`].
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, SyncError> {
        let resp = check(builder.send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Send and discard the body; returns the success status code.
    pub(crate) async fn send_unit(&self, builder: RequestBuilder) -> Result<u16, SyncError> {
        let resp = check(builder.send().await?).await?;
        Ok(resp.status().as_u16())
    }

    /// `GET /assets?projectId=&type=`.
    pub async fn list_assets<T: DeserializeOwned>(&self, project: &str, asset_type: &str) -> Result<Vec<T>, SyncError> {
        let req = self
            .request(Method::GET, &["assets"])
            .query(&[("projectId", project), ("type", asset_type)]);
        let list: AssetList<T> = self.send_json(req).await?;
        info!(project, asset_type, count = list.assets.len(), "listed assets");
        Ok(list.assets)
    }
}

/// Pass 2xx responses through; turn anything else into [`SyncError::Server`].
pub(crate) async fn check(resp: Response) -> Result<Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::server(status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::Stub;
    use serde_json::json;
    use siteqa_core::asset::RawAsset;

    #[test]
    fn config_trims_trailing_slash() {
        let config = ClientConfig::new("http://localhost:3000/");
        assert_eq!(config.base_url, "http://localhost:3000");
        let client = ApiClient::new(config).unwrap();
        assert_eq!(client.url(&["assets"]).as_str(), "http://localhost:3000/api/v1/assets");
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let client = ApiClient::new(ClientConfig::new("https://qa.example.com/portal/")).unwrap();
        assert_eq!(
            client.url(&["projects", "p1"]).as_str(),
            "https://qa.example.com/portal/api/v1/projects/p1"
        );
    }

    #[test]
    fn unusable_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new(ClientConfig::new("not a url")),
            Err(SyncError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ApiClient::new(ClientConfig::new("mailto:qa@example.com")),
            Err(SyncError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = ClientConfig::new("http://x").with_token(Some(String::new()));
        assert!(config.token.is_none());
    }

    #[test]
    fn segments_are_encoded() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:3000")).unwrap();
        assert_eq!(
            client.url(&["projects", "plan 1/2", "team"]).as_str(),
            "http://localhost:3000/api/v1/projects/plan%201%2F2/team"
        );
        assert!(client.url(&["abc-_.~"]).as_str().ends_with("/abc-_.~"));
    }

    #[tokio::test]
    async fn list_assets_sends_query_and_token() {
        let server = Stub::new()
            .on(
                "GET",
                "/api/v1/assets",
                200,
                json!({"assets": [{"id": "a1", "type": "plan", "subtype": "pqp"}]}),
            )
            .start()
            .await;
        let client = ApiClient::new(ClientConfig::new(&server.base_url).with_token(Some("t0k".into()))).unwrap();

        let assets: Vec<RawAsset> = client.list_assets("p 1", "plan").await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].subtype.as_deref(), Some("pqp"));

        let req = &server.requests()[0];
        assert_eq!(req.query(), "projectId=p+1&type=plan");
        assert_eq!(req.header("authorization"), Some("Bearer t0k"));
    }

    #[tokio::test]
    async fn non_success_becomes_server_error() {
        let server = Stub::new()
            .on("GET", "/api/v1/assets", 401, json!({"error": "Unauthorized"}))
            .start()
            .await;
        let client = ApiClient::new(ClientConfig::new(&server.base_url)).unwrap();
        let err = client.list_assets::<RawAsset>("p", "plan").await.unwrap_err();
        assert!(matches!(err, SyncError::Server { status: 401, ref body } if body == "Unauthorized"));
    }
}
