//! Read-through file cache of the account's flow listing.
//! Fetched once on first miss, then trusted until the file is deleted by hand.

use crate::error::{RelayError, RelayResult};
use crate::flow_client::FlowClient;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct FlowCache {
    path: PathBuf,
    // Serializes the exists-check / fetch / write sequence so one process fetches at most once.
    fill: Mutex<()>,
}

impl FlowCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fill: Mutex::new(()),
        }
    }

    /// Listing from disk, fetching and persisting it first when the file does not exist.
    pub async fn listing(&self, client: &FlowClient) -> RelayResult<Value> {
        let _guard = self.fill.lock().await;

        if tokio::fs::try_exists(&self.path).await? {
            tracing::debug!("[flow-relay] Flow listing cache hit: {}", self.path.display());
            let raw = tokio::fs::read(&self.path).await?;
            return Ok(serde_json::from_slice(&raw)?);
        }

        let fetched = client.fetch_flow_listing().await?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_whole(&self.path, fetched.as_bytes()).await?;
        tracing::info!("[flow-relay] Flow listing cached at {}", self.path.display());

        fetched.to_value()
    }

    /// Id of the first flow in the cached listing.
    pub async fn first_flow_id(&self, client: &FlowClient) -> RelayResult<String> {
        let listing = self.listing(client).await?;
        first_flow_id(&listing).ok_or(RelayError::NoFlowId)
    }
}

/// Writes a sibling temp file and renames it over `path`, so readers only ever see a complete listing.
async fn write_whole(path: &Path, bytes: &[u8]) -> RelayResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "flows.json".to_string());
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Accepts `{"flows": [...]}` or a bare array of flow objects.
fn first_flow_id(listing: &Value) -> Option<String> {
    let flows = match listing {
        Value::Array(items) => items,
        other => other.get("flows")?.as_array()?,
    };
    flows
        .first()?
        .get("id")?
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;
    use std::sync::Arc;

    fn client_for(server: &MockServer) -> FlowClient {
        FlowClient::new(Arc::new(RelayConfig {
            base_url: server.base_url(),
            account_id: "acct".into(),
            application_token: "tok".into(),
            ..RelayConfig::default()
        }))
    }

    #[test]
    fn first_flow_id_shapes() {
        assert_eq!(
            first_flow_id(&json!({"flows": [{"id": "a"}, {"id": "b"}]})),
            Some("a".to_string())
        );
        assert_eq!(first_flow_id(&json!([{"id": "x"}])), Some("x".to_string()));
        assert_eq!(first_flow_id(&json!({"flows": []})), None);
        assert_eq!(first_flow_id(&json!({"flows": [{"name": "no id"}]})), None);
        assert_eq!(first_flow_id(&json!({"other": 1})), None);
    }

    #[tokio::test]
    async fn fetches_once_then_reads_file() {
        let server = MockServer::start_async().await;
        let listing = json!({"flows": [{"id": "flow-a", "name": "Basic Prompting"}, {"id": "flow-b"}]});
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/lf/acct/api/v1/flows")
                    .header("Authorization", "Bearer tok");
                then.status(200).json_body(listing.clone());
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("flows.json");
        let cache = FlowCache::new(&path);
        let client = client_for(&server);

        assert_eq!(cache.first_flow_id(&client).await.unwrap(), "flow-a");
        mock.assert_hits_async(1).await;

        let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, listing);
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("flows.json")]);

        assert_eq!(cache.first_flow_id(&client).await.unwrap(), "flow-a");
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn concurrent_cold_start_fetches_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/lf/acct/api/v1/flows");
                then.status(200).json_body(json!({"flows": [{"id": "flow-a"}]}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FlowCache::new(dir.path().join("flows.json")));
        let client = Arc::new(client_for(&server));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move { cache.first_flow_id(&client).await }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), "flow-a");
        }
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn existing_file_is_trusted_without_fetch() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/lf/acct/api/v1/flows");
                then.status(200).json_body(json!({"flows": [{"id": "fresh"}]}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");
        std::fs::write(&path, r#"{"flows": [{"id": "stale"}]}"#).unwrap();

        let cache = FlowCache::new(&path);
        assert_eq!(cache.first_flow_id(&client_for(&server)).await.unwrap(), "stale");
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn write_whole_replaces_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");
        std::fs::write(&path, r#"{"flows": [{"id": "trunc"#).unwrap();

        write_whole(&path, br#"{"flows": [{"id": "complete"}]}"#)
            .await
            .unwrap();

        let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(first_flow_id(&on_disk), Some("complete".to_string()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn empty_listing_has_no_flow_id() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");
        std::fs::write(&path, r#"{"flows": []}"#).unwrap();

        let err = FlowCache::new(&path)
            .first_flow_id(&client_for(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NoFlowId));
    }

    #[tokio::test]
    async fn malformed_file_is_json_error() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FlowCache::new(&path)
            .first_flow_id(&client_for(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Json(_)));
    }

    #[tokio::test]
    async fn failed_fetch_writes_nothing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/lf/acct/api/v1/flows");
                then.status(401).json_body(json!({"detail": "Invalid token"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");
        let err = FlowCache::new(&path)
            .first_flow_id(&client_for(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Vendor { status: 401, .. }));
        assert!(!path.exists());
    }
}
