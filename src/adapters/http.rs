use crate::utils::error::{BackupError, Result};
use reqwest::{Client, Method};
use url::Url;

#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("token", &"***")
            .finish()
    }
}

/// JSON API client bound to one Atlassian site.
///
/// Requests authenticate with a basic-auth header; the credentials are only
/// folded into a URL when building a download location for a storage sink.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(base_url: Url, credentials: Credentials) -> Self {
        Self {
            client: Client::new(),
            base_url,
            credentials,
        }
    }

    /// `https://{workspace}.atlassian.net`
    pub fn workspace_url(workspace: &str) -> Result<Url> {
        let raw = format!("https://{}.atlassian.net", workspace);
        Url::parse(&raw).map_err(|e| BackupError::InvalidConfigValueError {
            field: "atlassian_workspace".to_string(),
            value: workspace.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })
    }

    /// `path` is appended to the base URL's own path, so a proxy prefix survives.
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        if url.cannot_be_a_base() {
            return Err(BackupError::ParseError {
                message: format!("can't build URL for {}: {} has no path", path, url),
            });
        }
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Same as `url` with the account and token embedded as userinfo.
    pub fn url_with_credentials(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.url(path, query)?;
        url.set_username(&self.credentials.account)
            .and_then(|_| url.set_password(Some(&self.credentials.token)))
            .map_err(|_| BackupError::ParseError {
                message: format!("can't embed credentials into {}", url.host_str().unwrap_or("")),
            })?;
        Ok(url)
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = self.url(path, query)?;
        self.request(Method::GET, url, None).await
    }

    pub async fn post(&self, path: &str, body: &'static str) -> Result<String> {
        let url = self.url(path, &[])?;
        self.request(Method::POST, url, Some(body)).await
    }

    async fn request(&self, method: Method, url: Url, body: Option<&'static str>) -> Result<String> {
        tracing::debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(method, url.clone())
            .basic_auth(&self.credentials.account, Some(&self.credentials.token))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(BackupError::HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}
