//! Flow Relay — Core library.
//! Configuration, flow resolution and the client for the hosted flow-execution API.

pub mod config;
pub mod error;
pub mod flow_cache;
pub mod flow_client;
pub mod request;
pub mod resolver;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use flow_cache::FlowCache;
pub use flow_client::{FlowClient, FlowResponse};
pub use request::{ChatRequest, RunPayload, Tweaks};
pub use resolver::{FlowResolver, Relay};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
