//! Best-effort remote copy of stored blobs
//!
//! The remote endpoint is a plain JSON key-value service:
//! - `GET {endpoint}?key=<key>` -> `{ "data": <value or null> }`
//! - `POST {endpoint}` with `{ "key": <key>, "data": <value> }`
//!
//! LocalStorage is always the source of truth. Any remote failure (network
//! error, non-OK status, non-JSON body) degrades to the local copy.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{KeyValueStore, StoreError, load_json, save_json};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("response was not valid JSON: {0}")]
    NotJson(String),
}

/// Remote sync configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Endpoint URL; `None` keeps everything local
    pub endpoint: Option<String>,
}

/// Response body of a GET
#[derive(Debug, Deserialize)]
struct FetchResponse<T> {
    data: Option<T>,
}

/// Request body of a POST
#[derive(Debug, Serialize)]
struct PushRequest<'a, T: ?Sized> {
    key: &'a str,
    data: &'a T,
}

/// HTTP transport (browser `fetch` on web, fakes in tests)
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// GET a URL, returning status and body text
    async fn get(&self, url: &str) -> Result<(u16, String), SyncError>;
    /// POST a JSON body, returning the status
    async fn post_json(&self, url: &str, body: String) -> Result<u16, SyncError>;
}

/// GET URL for a key
pub fn fetch_url(endpoint: &str, key: &str) -> String {
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{sep}key={}", urlencoding::encode(key))
}

/// Decode a GET response
pub fn parse_fetch_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, SyncError> {
    if !(200..300).contains(&status) {
        return Err(SyncError::Status(status));
    }
    let response: FetchResponse<T> =
        serde_json::from_str(body).map_err(|err| SyncError::NotJson(err.to_string()))?;
    Ok(response.data)
}

/// Where a loaded value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Local,
    Defaults,
}

impl LoadSource {
    /// Toast shown after loading settings
    pub fn toast_message(&self) -> &'static str {
        match self {
            LoadSource::Remote => "Settings loaded",
            LoadSource::Local => "Settings loaded from this device",
            LoadSource::Defaults => "No saved settings found, using defaults",
        }
    }
}

/// Pick the remote value when there is one, else the local copy
pub fn resolve<T>(remote: Result<Option<T>, SyncError>, local: Option<T>) -> (Option<T>, LoadSource) {
    match remote {
        Ok(Some(value)) => (Some(value), LoadSource::Remote),
        Ok(None) => fallback(local),
        Err(err) => {
            log::warn!("Remote sync failed, using local copy: {err}");
            fallback(local)
        }
    }
}

fn fallback<T>(local: Option<T>) -> (Option<T>, LoadSource) {
    match local {
        Some(value) => (Some(value), LoadSource::Local),
        None => (None, LoadSource::Defaults),
    }
}

/// Client for the remote JSON store
pub struct RemoteSync<T: Transport> {
    endpoint: String,
    transport: T,
}

impl<T: Transport> RemoteSync<T> {
    pub fn new(endpoint: impl Into<String>, transport: T) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    pub async fn fetch<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, SyncError> {
        let (status, body) = self.transport.get(&fetch_url(&self.endpoint, key)).await?;
        parse_fetch_response(status, &body)
    }

    pub async fn push<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<(), SyncError> {
        let body = serde_json::to_string(&PushRequest { key, data: value })
            .map_err(|err| SyncError::NotJson(err.to_string()))?;
        let status = self.transport.post_json(&self.endpoint, body).await?;
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(SyncError::Status(status))
        }
    }
}

/// Load a value, preferring the remote copy and caching it locally
pub async fn load_with_fallback<V, S, T>(
    remote: Option<&RemoteSync<T>>,
    store: &S,
    key: &str,
) -> (Option<V>, LoadSource)
where
    V: Serialize + DeserializeOwned,
    S: KeyValueStore,
    T: Transport,
{
    let local = load_json::<V>(store, key);
    let Some(remote) = remote else {
        return fallback(local);
    };

    let (value, source) = resolve(remote.fetch::<V>(key).await, local);
    if source == LoadSource::Remote {
        if let Some(value) = &value {
            if let Err(err) = save_json(store, key, value) {
                log::warn!("Failed to cache {key} locally: {err}");
            }
        }
    }
    (value, source)
}

/// Save locally, then mirror to the remote store if configured.
/// Only local failures are errors; remote failures are logged.
pub async fn save_with_mirror<V, S, T>(
    remote: Option<&RemoteSync<T>>,
    store: &S,
    key: &str,
    value: &V,
) -> Result<(), StoreError>
where
    V: Serialize + ?Sized,
    S: KeyValueStore,
    T: Transport,
{
    save_json(store, key, value)?;
    if let Some(remote) = remote {
        if let Err(err) = remote.push(key, value).await {
            log::warn!("Remote copy of {key} not updated: {err}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pollster::block_on;
    use std::cell::{Cell, RefCell};
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Pends once before completing, like a real network round trip
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    struct FakeTransport {
        get_reply: Result<(u16, String), ()>,
        post_status: u16,
        slow: Cell<bool>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                get_reply: Ok((status, body.to_string())),
                post_status: 200,
                slow: Cell::new(false),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn offline() -> Self {
            Self {
                get_reply: Err(()),
                post_status: 0,
                slow: Cell::new(false),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for FakeTransport {
        async fn get(&self, url: &str) -> Result<(u16, String), SyncError> {
            self.requests.borrow_mut().push(format!("GET {url}"));
            if self.slow.get() {
                YieldOnce(false).await;
            }
            self.get_reply
                .clone()
                .map_err(|_| SyncError::Network("offline".into()))
        }

        async fn post_json(&self, url: &str, body: String) -> Result<u16, SyncError> {
            self.requests.borrow_mut().push(format!("POST {url} {body}"));
            if self.slow.get() {
                YieldOnce(false).await;
            }
            if self.post_status == 0 {
                Err(SyncError::Network("offline".into()))
            } else {
                Ok(self.post_status)
            }
        }
    }

    #[test]
    fn test_fetch_url_encodes_key() {
        assert_eq!(
            fetch_url("https://example.test/sync", "a b&c"),
            "https://example.test/sync?key=a%20b%26c"
        );
        assert_eq!(fetch_url("/sync", "café_zip-history"), "/sync?key=caf%C3%A9_zip-history");
        assert_eq!(fetch_url("/sync?v=2", "k"), "/sync?v=2&key=k");
    }

    #[test]
    fn test_parse_fetch_response() {
        let ok: Option<Vec<String>> = parse_fetch_response(200, r#"{"data":["x"]}"#).unwrap();
        assert_eq!(ok, Some(vec!["x".to_string()]));

        let empty: Option<Vec<String>> = parse_fetch_response(200, r#"{"data":null}"#).unwrap();
        assert_eq!(empty, None);
        let missing: Option<Vec<String>> = parse_fetch_response(200, "{}").unwrap();
        assert_eq!(missing, None);

        assert!(matches!(
            parse_fetch_response::<Vec<String>>(503, "{}"),
            Err(SyncError::Status(503))
        ));
        assert!(matches!(
            parse_fetch_response::<Vec<String>>(200, "<html>"),
            Err(SyncError::NotJson(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_remote() {
        assert_eq!(resolve(Ok(Some(1)), Some(2)), (Some(1), LoadSource::Remote));
        assert_eq!(resolve(Ok(None), Some(2)), (Some(2), LoadSource::Local));
        assert_eq!(
            resolve(Err(SyncError::Status(500)), Some(2)),
            (Some(2), LoadSource::Local)
        );
        assert_eq!(resolve::<i32>(Err(SyncError::Status(500)), None), (None, LoadSource::Defaults));
    }

    #[test]
    fn test_load_caches_remote_value() {
        let store = MemoryStore::new();
        let remote = RemoteSync::new("/sync", FakeTransport::replying(200, r#"{"data":["02139"]}"#));

        let (value, source) =
            block_on(load_with_fallback::<Vec<String>, _, _>(Some(&remote), &store, "guest_zip_history"));
        assert_eq!(source, LoadSource::Remote);
        assert_eq!(value, Some(vec!["02139".to_string()]));
        assert_eq!(store.get_item("guest_zip_history").as_deref(), Some(r#"["02139"]"#));
    }

    #[test]
    fn test_load_and_save_through_pending_transport() {
        let store = MemoryStore::new();
        let transport = FakeTransport::replying(200, r#"{"data":["12 Elm Rd"]}"#);
        transport.slow.set(true);
        let remote = RemoteSync::new("/sync", transport);

        let (value, source) =
            block_on(load_with_fallback::<Vec<String>, _, _>(Some(&remote), &store, "guest_address_history"));
        assert_eq!(source, LoadSource::Remote);
        assert_eq!(value, Some(vec!["12 Elm Rd".to_string()]));

        block_on(save_with_mirror(Some(&remote), &store, "k", &vec!["z"])).unwrap();
        assert_eq!(remote.transport.requests.borrow().len(), 2);
    }

    #[test]
    fn test_load_falls_back_when_offline() {
        let store = MemoryStore::new();
        store.set_item("k", "[\"local\"]").unwrap();
        let remote = RemoteSync::new("/sync", FakeTransport::offline());

        let (value, source) = block_on(load_with_fallback::<Vec<String>, _, _>(Some(&remote), &store, "k"));
        assert_eq!(source, LoadSource::Local);
        assert_eq!(value, Some(vec!["local".to_string()]));
    }

    #[test]
    fn test_load_falls_back_on_bad_body() {
        let store = MemoryStore::new();
        let remote = RemoteSync::new("/sync", FakeTransport::replying(200, "Service Unavailable"));
        let (value, source) = block_on(load_with_fallback::<Vec<String>, _, _>(Some(&remote), &store, "k"));
        assert_eq!(source, LoadSource::Defaults);
        assert!(value.is_none());
    }

    #[test]
    fn test_load_without_remote_is_local_only() {
        let store = MemoryStore::new();
        store.set_item("k", "[\"a\"]").unwrap();
        let (value, source) =
            block_on(load_with_fallback::<Vec<String>, _, FakeTransport>(None, &store, "k"));
        assert_eq!(source, LoadSource::Local);
        assert_eq!(value, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_save_mirrors_and_tolerates_remote_failure() {
        let store = MemoryStore::new();
        let remote = RemoteSync::new("/sync", FakeTransport::replying(200, "{}"));
        block_on(save_with_mirror(Some(&remote), &store, "k", &vec!["x"])).unwrap();
        assert_eq!(store.get_item("k").as_deref(), Some(r#"["x"]"#));
        let requests = remote.transport.requests.borrow();
        assert_eq!(requests.as_slice(), [r#"POST /sync {"key":"k","data":["x"]}"#]);
        drop(requests);

        let offline = RemoteSync::new("/sync", FakeTransport::offline());
        block_on(save_with_mirror(Some(&offline), &store, "k", &vec!["y"])).unwrap();
        assert_eq!(store.get_item("k").as_deref(), Some(r#"["y"]"#));
    }

    #[test]
    fn test_toast_messages() {
        assert_eq!(LoadSource::Remote.toast_message(), "Settings loaded");
        assert_ne!(LoadSource::Local.toast_message(), LoadSource::Defaults.toast_message());
    }
}
