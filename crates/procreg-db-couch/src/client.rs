use std::time::Duration;

use procreg_storage::{DESIGN_DOC_PREFIX, StorageError};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::CouchConfig;
use crate::error::{error_for_status, transport_error};

/// HTTP access to a single CouchDB database.
///
/// Cheap to clone; cursors hold their own copy while paging.
#[derive(Debug, Clone)]
pub(crate) struct CouchClient {
    http: reqwest::Client,
    server: Url,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

impl CouchClient {
    pub(crate) fn new(config: &CouchConfig, database: &str) -> Result<Self, StorageError> {
        let server = Url::parse(&config.url)
            .map_err(|e| StorageError::validation(format!("invalid server url: {e}")))?;
        if server.cannot_be_a_base() {
            return Err(StorageError::validation(format!(
                "server url cannot address databases: {}",
                config.url
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| StorageError::connection(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            server,
            database: database.to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub(crate) fn database(&self) -> &str {
        &self.database
    }

    /// URL of `{database}/{segments...}`, each segment percent-encoded.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.server.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.database).extend(segments);
        }
        url
    }

    /// URL of a document. Design documents keep their literal slash.
    pub(crate) fn doc_url(&self, id: &str) -> Url {
        match id.strip_prefix(DESIGN_DOC_PREFIX) {
            Some(name) => self.url(&["_design", name]),
            None => self.url(&[id]),
        }
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(username) = &self.username {
            req = req.basic_auth(username, self.password.as_ref());
        }
        req.header("Accept", "application/json")
    }

    /// Sends a request and decodes a JSON success body.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        subject: &str,
        request: RequestBuilder,
    ) -> Result<T, StorageError> {
        let resp = request
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error_for_status(operation, subject, status.as_u16(), &body));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| transport_error(operation, e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::serialization(format!("{operation}: {e}")))
    }
}
