//! CouchDB `DocumentStore` implementation.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use procreg_core::{IndexDescriptor, IndexInfo, IndexOutcome, IndexType};
use procreg_storage::{
    DESIGN_DOC_PREFIX, DocumentStore, RowStream, Selector, StorageError,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use crate::client::CouchClient;
use crate::config::CouchConfig;
use crate::cursor;
use crate::error::mask_password;

/// A document store backed by one CouchDB database.
#[derive(Debug)]
pub struct CouchStore {
    client: CouchClient,
    page_size: usize,
    closed: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    rev: String,
}

#[derive(Debug, Deserialize)]
struct CreateIndexResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct IndexListResponse {
    #[serde(default)]
    indexes: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    #[serde(default)]
    ddoc: Option<String>,
    name: String,
    #[serde(rename = "type")]
    index_type: String,
    #[serde(default)]
    def: IndexDef,
}

#[derive(Debug, Default, Deserialize)]
struct IndexDef {
    #[serde(default)]
    fields: Vec<Value>,
}

impl IndexEntry {
    /// Converts a listed index, or `None` for index types this crate does not model.
    fn into_info(self) -> Option<IndexInfo> {
        let Ok(index_type) = self.index_type.parse::<IndexType>() else {
            warn!(name = %self.name, index_type = %self.index_type, "skipping index of unknown type");
            return None;
        };
        // Fields are reported as `{"name": "asc"}` objects.
        let fields = self
            .def
            .fields
            .into_iter()
            .filter_map(|field| match field {
                Value::String(name) => Some(name),
                Value::Object(map) => map.into_iter().next().map(|(name, _)| name),
                _ => None,
            })
            .collect();
        Some(IndexInfo {
            name: self.name,
            index_type,
            fields,
            design_doc: self.ddoc,
        })
    }
}

impl CouchStore {
    /// Creates a store for `database` without contacting the server.
    pub fn new(config: &CouchConfig, database: &str) -> Result<Self, StorageError> {
        Ok(Self {
            client: CouchClient::new(config, database)?,
            page_size: config.page_size.max(1),
            closed: AtomicBool::new(false),
        })
    }

    /// Creates a store and verifies that the database exists.
    #[instrument(skip(config), fields(url = %mask_password(&config.url)))]
    pub async fn connect(config: &CouchConfig, database: &str) -> Result<Self, StorageError> {
        let store = Self::new(config, database)?;
        let req = store
            .client
            .request(Method::GET, store.client.url(&[]));
        let _: Value = store.client.execute("connect", database, req).await?;
        debug!("CouchDB database reachable");
        Ok(store)
    }

    /// Returns the database this store addresses.
    pub fn database(&self) -> &str {
        self.client.database()
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::connection("store connection is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for CouchStore {
    #[instrument(skip(self), fields(db = %self.database()))]
    async fn get(&self, id: &str) -> Result<Value, StorageError> {
        self.ensure_open()?;
        let req = self.client.request(Method::GET, self.client.doc_url(id));
        self.client.execute("get", id, req).await
    }

    #[instrument(skip(self, doc), fields(db = %self.database()))]
    async fn put(&self, id: &str, doc: &Value) -> Result<String, StorageError> {
        self.ensure_open()?;
        let req = self
            .client
            .request(Method::PUT, self.client.doc_url(id))
            .json(doc);
        let resp: WriteResponse = self.client.execute("put", id, req).await?;
        Ok(resp.rev)
    }

    #[instrument(skip(self), fields(db = %self.database()))]
    async fn delete(&self, id: &str, revision: &str) -> Result<(), StorageError> {
        self.ensure_open()?;
        let req = self
            .client
            .request(Method::DELETE, self.client.doc_url(id))
            .query(&[("rev", revision)]);
        let _: Value = self.client.execute("delete", id, req).await?;
        Ok(())
    }

    async fn find(&self, selector: &Selector) -> Result<RowStream, StorageError> {
        self.ensure_open()?;
        Ok(cursor::find(
            self.client.clone(),
            selector.clone(),
            self.page_size,
        ))
    }

    async fn all_docs(&self, include_docs: bool) -> Result<RowStream, StorageError> {
        self.ensure_open()?;
        Ok(cursor::all_docs(
            self.client.clone(),
            include_docs,
            self.page_size,
        ))
    }

    #[instrument(skip(self), fields(db = %self.database()))]
    async fn create_index(
        &self,
        descriptor: &IndexDescriptor,
    ) -> Result<IndexOutcome, StorageError> {
        self.ensure_open()?;
        descriptor.validate()?;

        let mut body = Map::new();
        body.insert("index".into(), json!({ "fields": descriptor.fields }));
        body.insert("type".into(), json!(descriptor.index_type.as_str()));
        if let Some(name) = &descriptor.name {
            body.insert("name".into(), json!(name));
        }

        let subject = descriptor.name.as_deref().unwrap_or(self.database());
        let req = self
            .client
            .request(Method::POST, self.client.url(&["_index"]))
            .json(&body);
        let resp: CreateIndexResponse = self.client.execute("create_index", subject, req).await?;
        match resp.result.as_str() {
            "created" => Ok(IndexOutcome::Created),
            "exists" => Ok(IndexOutcome::AlreadyExisted),
            other => Err(StorageError::serialization(format!(
                "unexpected index result '{other}'"
            ))),
        }
    }

    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, StorageError> {
        self.ensure_open()?;
        let req = self
            .client
            .request(Method::GET, self.client.url(&["_index"]));
        let resp: IndexListResponse = self
            .client
            .execute("list_indexes", self.database(), req)
            .await?;
        Ok(resp
            .indexes
            .into_iter()
            .filter_map(IndexEntry::into_info)
            .collect())
    }

    #[instrument(skip(self), fields(db = %self.database()))]
    async fn delete_index(&self, design_doc: &str, name: &str) -> Result<(), StorageError> {
        self.ensure_open()?;
        let ddoc = design_doc.strip_prefix(DESIGN_DOC_PREFIX).unwrap_or(design_doc);
        if ddoc.is_empty() {
            return Err(StorageError::permission(format!(
                "index '{name}' has no design document and cannot be deleted"
            )));
        }
        let subject = format!("{DESIGN_DOC_PREFIX}{ddoc}/{name}");

        // The delete path carries the index type, so resolve it first.
        let index_type = self
            .list_indexes()
            .await?
            .into_iter()
            .find(|info| {
                let owner = info.design_doc.as_deref().unwrap_or_default();
                info.name == name && owner.strip_prefix(DESIGN_DOC_PREFIX).unwrap_or(owner) == ddoc
            })
            .map(|info| info.index_type)
            .ok_or_else(|| StorageError::not_found(subject.clone()))?;

        let url = self
            .client
            .url(&["_index", "_design", ddoc, index_type.as_str(), name]);
        let req = self.client.request(Method::DELETE, url);
        let _: Value = self.client.execute("delete_index", &subject, req).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "couchdb"
    }
}
