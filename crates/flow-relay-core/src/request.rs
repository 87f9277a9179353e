//! Inbound chat request and the outbound run payload.

use serde::{Deserialize, Serialize};

/// Free-form component overrides passed through to the flow API verbatim.
pub type Tweaks = serde_json::Map<String, serde_json::Value>;

fn default_io_type() -> String {
    "chat".to_string()
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub tweaks: Option<Tweaks>,
    /// Flow id override for this call only.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_io_type")]
    pub output_type: String,
    #[serde(default = "default_io_type")]
    pub input_type: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tweaks: None,
            endpoint: None,
            output_type: default_io_type(),
            input_type: default_io_type(),
        }
    }
}

/// Body of `POST /lf/{account}/api/v1/run/{flow}`.
#[derive(Debug, Clone, Serialize)]
pub struct RunPayload<'a> {
    pub input_value: &'a str,
    pub output_type: &'a str,
    pub input_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweaks: Option<&'a Tweaks>,
}

impl<'a> RunPayload<'a> {
    /// Empty tweaks are dropped so the field is omitted rather than sent as `{}`.
    pub fn new(request: &'a ChatRequest, tweaks: Option<&'a Tweaks>) -> Self {
        Self {
            input_value: &request.message,
            output_type: &request.output_type,
            input_type: &request.input_type,
            tweaks: tweaks.filter(|t| !t.is_empty()),
        }
    }
}
