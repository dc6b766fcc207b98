//! Home Assistant REST action sink.
//!
//! Each [`ActionRequest`] becomes `POST <url>/api/services/<domain>/<service>`
//! with the entity id and parameters as the JSON body.

use std::error::Error;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::HomeAssistantConfig;
use crate::engine::ActionParams;
use crate::engine::ActionRequest;
use crate::runtime::ActionSink;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Home Assistant returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// JSON body of a service call
#[derive(Debug, Serialize)]
pub struct ServiceCall<'a> {
    pub entity_id: &'a str,
    #[serde(flatten)]
    pub params: &'a ActionParams,
}

pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(config: &HomeAssistantConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn service_url(&self, action: &ActionRequest) -> String {
        format!(
            "{}/api/services/{}/{}",
            self.base_url,
            action.domain(),
            action.service
        )
    }

    pub fn body(action: &ActionRequest) -> ServiceCall<'_> {
        ServiceCall {
            entity_id: &action.entity_id,
            params: &action.params,
        }
    }

    pub async fn call_service(&self, action: &ActionRequest) -> Result<(), ActionError> {
        let response = self
            .client
            .post(self.service_url(action))
            .bearer_auth(&self.token)
            .json(&Self::body(action))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ActionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ActionSink for RestClient {
    async fn call(&self, action: &ActionRequest) -> Result<(), Box<dyn Error + Send>> {
        self.call_service(action)
            .await
            .map_err(|e| Box::new(e) as Box<dyn Error + Send>)
    }
}
