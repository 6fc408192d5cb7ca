//! Paged row streams over `_all_docs` and `_find`.
//!
//! Each page is fetched lazily when the previous one is drained. A failed
//! page request ends the stream with a cursor error; malformed entries inside
//! a page surface as `StorageError::RowScan` items and paging continues.

use futures_util::{StreamExt, TryStreamExt, stream};
use procreg_storage::{Row, RowStream, Selector, StorageError};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::trace;

use crate::client::CouchClient;

#[derive(Debug, Deserialize)]
struct AllDocsResponse {
    #[serde(default)]
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    key: Option<Value>,
    #[serde(default)]
    doc: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl AllDocsRow {
    fn key_str(&self) -> Option<String> {
        self.id
            .clone()
            .or_else(|| self.key.as_ref().and_then(Value::as_str).map(str::to_string))
    }

    fn into_row(self, include_docs: bool) -> Result<Row, StorageError> {
        if let Some(ref error) = self.error {
            return Err(StorageError::row_scan(self.key_str(), error));
        }
        let Some(id) = self.id else {
            return Err(StorageError::row_scan(None, "row without id"));
        };
        if !include_docs {
            return Ok(Row::new(id, None));
        }
        match self.doc {
            Some(doc @ Value::Object(_)) => Ok(Row::new(id, Some(doc))),
            _ => Err(StorageError::row_scan(Some(id), "row without document body")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    docs: Vec<Value>,
    #[serde(default)]
    bookmark: Option<String>,
}

fn find_row(doc: Value) -> Result<Row, StorageError> {
    match doc.get("_id").and_then(Value::as_str) {
        Some(id) => Ok(Row::new(id.to_string(), Some(doc))),
        None => Err(StorageError::row_scan(None, "document without _id")),
    }
}

enum Page {
    First,
    After(String),
    Done,
}

type PageResult = Result<Option<(Vec<Result<Row, StorageError>>, Page)>, StorageError>;

/// Streams `_all_docs` in key order.
pub(crate) fn all_docs(client: CouchClient, include_docs: bool, page_size: usize) -> RowStream {
    stream::try_unfold(Page::First, move |page| {
        let client = client.clone();
        async move { all_docs_page(&client, include_docs, page_size, page).await }
    })
    .map_ok(stream::iter)
    .try_flatten()
    .boxed()
}

/// Fetches one `_all_docs` page.
///
/// Each request asks for one extra row whose key starts the next page.
async fn all_docs_page(
    client: &CouchClient,
    include_docs: bool,
    page_size: usize,
    page: Page,
) -> PageResult {
    let startkey = match page {
        Page::Done => return Ok(None),
        Page::First => None,
        Page::After(key) => Some(key),
    };

    let mut query = vec![("limit", (page_size + 1).to_string())];
    if include_docs {
        query.push(("include_docs", "true".to_string()));
    }
    if let Some(key) = &startkey {
        query.push(("startkey", serde_json::to_string(key)?));
    }

    let req = client
        .request(Method::GET, client.url(&["_all_docs"]))
        .query(&query);
    let body: AllDocsResponse = client.execute("all_docs", client.database(), req).await?;
    let mut rows = body.rows;
    trace!(rows = rows.len(), startkey = ?startkey, "fetched _all_docs page");

    let next = if rows.len() > page_size {
        let overflow = rows.split_off(page_size);
        match overflow.first().and_then(AllDocsRow::key_str) {
            Some(key) => Page::After(key),
            None => Page::Done,
        }
    } else {
        Page::Done
    };

    let items = rows.into_iter().map(|r| r.into_row(include_docs)).collect();
    Ok(Some((items, next)))
}

/// Streams `_find` results, following the bookmark until a short page.
pub(crate) fn find(client: CouchClient, selector: Selector, page_size: usize) -> RowStream {
    stream::try_unfold(Page::First, move |page| {
        let client = client.clone();
        let selector = selector.clone();
        async move { find_page(&client, &selector, page_size, page).await }
    })
    .map_ok(stream::iter)
    .try_flatten()
    .boxed()
}

async fn find_page(
    client: &CouchClient,
    selector: &Selector,
    page_size: usize,
    page: Page,
) -> PageResult {
    let bookmark = match page {
        Page::Done => return Ok(None),
        Page::First => None,
        Page::After(bookmark) => Some(bookmark),
    };

    let mut body = json!({ "selector": selector, "limit": page_size });
    if let Some(bookmark) = bookmark {
        body["bookmark"] = Value::String(bookmark);
    }

    let req = client
        .request(Method::POST, client.url(&["_find"]))
        .json(&body);
    let resp: FindResponse = client.execute("find", client.database(), req).await?;
    trace!(docs = resp.docs.len(), "fetched _find page");

    // A full page may be followed by more; "nil" is CouchDB's exhausted bookmark.
    let next = match resp.bookmark {
        Some(b) if resp.docs.len() >= page_size && !b.is_empty() && b != "nil" => Page::After(b),
        _ => Page::Done,
    };

    let items = resp.docs.into_iter().map(find_row).collect();
    Ok(Some((items, next)))
}
