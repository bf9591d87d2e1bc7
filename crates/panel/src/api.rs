use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use sitewatch_common::{
    AddSiteRequest, ApiResponse, DeleteRequest, SiteDetails, ToggleRequest, UpdateRequest,
};
use std::time::Duration;
use tracing::debug;

use crate::error::EditError;

const GENERIC_FAILURE: &str = "The server could not apply the change.";

/// The backend endpoints the panel talks to.
///
/// Every mutating call resolves to `Ok(())` only when the server confirmed
/// the change; transport problems and rejections both come back as
/// [`EditError`].
#[async_trait]
pub trait MonitorApi: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<SiteDetails>, EditError>;

    async fn update(&self, request: &UpdateRequest) -> Result<(), EditError>;

    async fn toggle_monitoring(&self, request: &ToggleRequest) -> Result<(), EditError>;

    async fn delete_site(&self, request: &DeleteRequest) -> Result<(), EditError>;

    async fn add_site(&self, request: &AddSiteRequest) -> Result<(), EditError>;
}

/// [`MonitorApi`] over HTTP/JSON.
#[derive(Clone, Debug)]
pub struct HttpMonitorApi {
    client: Client,
    base_url: String,
}

impl HttpMonitorApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EditError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), EditError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        interpret_response(status, &bytes)
    }
}

/// Decides whether a mutating call succeeded.
///
/// A 2xx is a success unless its body is an envelope with `success: false`.
/// An empty or non-JSON 2xx body counts as success. Anything else is a
/// rejection, reported with the server's message when it sent one.
pub fn interpret_response(status: StatusCode, body: &[u8]) -> Result<(), EditError> {
    let envelope: Option<ApiResponse> = serde_json::from_slice(body).ok();

    if status.is_success() {
        return match envelope {
            Some(ApiResponse {
                success: false,
                message,
            }) => Err(EditError::Application(
                message.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            )),
            _ => Ok(()),
        };
    }

    let message = envelope
        .and_then(|e| e.message)
        .unwrap_or_else(|| format!("{GENERIC_FAILURE} (HTTP {status})"));
    Err(EditError::Application(message))
}

#[async_trait]
impl MonitorApi for HttpMonitorApi {
    async fn list_sites(&self) -> Result<Vec<SiteDetails>, EditError> {
        let url = format!("{}/sites", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let bytes = response.bytes().await?;
            return Err(interpret_response(status, &bytes).err().unwrap_or_else(|| {
                EditError::Application(format!(
                    "Unexpected response while listing sites (HTTP {status})"
                ))
            }));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| EditError::Application(format!("Malformed site list: {e}")))
    }

    async fn update(&self, request: &UpdateRequest) -> Result<(), EditError> {
        self.post_json("/update", request).await
    }

    async fn toggle_monitoring(&self, request: &ToggleRequest) -> Result<(), EditError> {
        self.post_json("/toggle_monitoring", request).await
    }

    async fn delete_site(&self, request: &DeleteRequest) -> Result<(), EditError> {
        self.post_json("/delete_site", request).await
    }

    async fn add_site(&self, request: &AddSiteRequest) -> Result<(), EditError> {
        self.post_json("/add_site", request).await
    }
}
