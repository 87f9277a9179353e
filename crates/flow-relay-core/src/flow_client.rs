//! Client for the hosted flow-execution API.
//!
//! Two calls only: `POST .../run/{flow_id}` to execute a flow and `GET .../flows` to list the
//! account's flows. Both carry `Authorization: Bearer <application_token>`. Status 200 is the only
//! success; no timeout and no retry are applied.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::request::RunPayload;
use serde::de::IgnoredAny;
use std::sync::Arc;

/// Vendor JSON body, kept as the exact bytes received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowResponse {
    body: Vec<u8>,
}

impl FlowResponse {
    /// Wraps `body` after checking it is a JSON document.
    pub fn from_json_bytes(body: Vec<u8>) -> RelayResult<Self> {
        serde_json::from_slice::<IgnoredAny>(&body)?;
        Ok(Self { body })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    pub fn to_value(&self) -> RelayResult<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

pub struct FlowClient {
    config: Arc<RelayConfig>,
    client: reqwest::Client,
}

impl FlowClient {
    pub fn new(config: Arc<RelayConfig>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Execute `flow_id` with `payload` and return the vendor body verbatim.
    pub async fn run_flow(
        &self,
        flow_id: &str,
        payload: &RunPayload<'_>,
    ) -> RelayResult<FlowResponse> {
        let url = self.config.run_url(flow_id);
        tracing::info!(flow_id, "[flow-relay] Dispatching message to flow");

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.config.application_token)
            .json(payload)
            .send()
            .await?;

        self.read_ok_body(res).await
    }

    /// Fetch the account's flow listing as raw JSON bytes.
    pub async fn fetch_flow_listing(&self) -> RelayResult<FlowResponse> {
        let url = self.config.flows_url();
        tracing::info!("[flow-relay] Fetching flow listing for account {}", self.config.account_id);

        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.config.application_token)
            .send()
            .await?;

        self.read_ok_body(res).await
    }

    async fn read_ok_body(&self, res: reqwest::Response) -> RelayResult<FlowResponse> {
        let status = res.status();
        let body = res.bytes().await?;

        if status != reqwest::StatusCode::OK {
            tracing::warn!(
                status = status.as_u16(),
                "[flow-relay] Flow API rejected the request"
            );
            return Err(RelayError::vendor(status.as_u16(), &body));
        }

        FlowResponse::from_json_bytes(body.to_vec())
    }
}
