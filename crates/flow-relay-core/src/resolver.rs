//! Effective flow id and tweaks for one chat request.
//!
//! Flow id: request `endpoint` > configured `flow_id` > first flow of the cached listing.
//! Tweaks: request `tweaks` > configured default tweaks.
//! Overrides apply to the current call only.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::flow_cache::FlowCache;
use crate::flow_client::{FlowClient, FlowResponse};
use crate::request::{ChatRequest, RunPayload, Tweaks};
use std::sync::Arc;

pub struct FlowResolver {
    config: Arc<RelayConfig>,
    cache: Option<FlowCache>,
}

impl FlowResolver {
    pub fn new(config: Arc<RelayConfig>) -> Self {
        let cache = config.flow_cache_path.clone().map(FlowCache::new);
        Self { config, cache }
    }

    pub async fn flow_id(&self, request: &ChatRequest, client: &FlowClient) -> RelayResult<String> {
        if let Some(endpoint) = request.endpoint.as_deref().filter(|e| !e.is_empty()) {
            return Ok(endpoint.to_string());
        }
        if let Some(id) = self.config.default_flow_id() {
            return Ok(id.to_string());
        }
        match &self.cache {
            Some(cache) => cache.first_flow_id(client).await,
            None => Err(RelayError::NoFlowId),
        }
    }

    pub fn tweaks<'a>(&'a self, request: &'a ChatRequest) -> Option<&'a Tweaks> {
        request
            .tweaks
            .as_ref()
            .or(self.config.default_tweaks.as_ref())
    }
}

/// Resolution plus dispatch: the whole relay for one request.
pub struct Relay {
    client: FlowClient,
    resolver: FlowResolver,
}

impl Relay {
    pub fn new(config: Arc<RelayConfig>) -> Self {
        Self {
            client: FlowClient::new(Arc::clone(&config)),
            resolver: FlowResolver::new(config),
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> RelayResult<FlowResponse> {
        let flow_id = self.resolver.flow_id(request, &self.client).await?;
        let payload = RunPayload::new(request, self.resolver.tweaks(request));
        self.client.run_flow(&flow_id, &payload).await
    }
}
