//! HTTP client for the land queue backend.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::queue::item::QueueAction;
use crate::queue::{ActionResponse, CurrentState, LandRequestInfo, StatusUpdate};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Could not parse response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    display_name: String,
}

pub fn land_request_path(request_id: &str) -> String {
    format!("/api/landrequest/{}", request_id)
}

pub fn user_path(aaid: &str) -> String {
    format!("/api/user/{}", aaid)
}

pub const CURRENT_STATE_PATH: &str = "/api/current-state";

/// Client for the queue backend's JSON API
#[derive(Debug, Clone)]
pub struct LandQueueClient {
    client: Client,
    base_url: String,
}

impl LandQueueClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|source| ApiError::Http {
                endpoint: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        decode(response, path).await
    }

    /// Current queue contents
    pub async fn current_queue(&self) -> Result<Vec<StatusUpdate>, ApiError> {
        let state: CurrentState = self.get_json(CURRENT_STATE_PATH).await?;
        Ok(state.queue)
    }

    /// Full status history of one request
    pub async fn land_request(&self, request_id: &str) -> Result<LandRequestInfo, ApiError> {
        self.get_json(&land_request_path(request_id)).await
    }

    pub async fn user_display_name(&self, aaid: &str) -> Result<String, ApiError> {
        let user: UserInfo = self.get_json(&user_path(aaid)).await?;
        Ok(user.display_name)
    }

    /// POST a remove/cancel. The backend reports refusals in the body, often
    /// with a non-2xx status, so the body is parsed first.
    pub async fn perform(
        &self,
        action: QueueAction,
        request_id: &str,
    ) -> Result<ActionResponse, ApiError> {
        let path = action.path(request_id);
        tracing::info!("{} request {}", action.label(), request_id);

        let response = self
            .client
            .post(self.url(&path))
            .send()
            .await
            .map_err(|source| ApiError::Http {
                endpoint: path.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Http {
            endpoint: path.clone(),
            source,
        })?;

        parse_action_body(&path, status.as_u16(), &body)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn parse_action_body(endpoint: &str, status: u16, body: &str) -> Result<ActionResponse, ApiError> {
    match serde_json::from_str::<ActionResponse>(body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !(200..300).contains(&status) => Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status,
        }),
        Err(e) => Err(ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        }),
    }
}
