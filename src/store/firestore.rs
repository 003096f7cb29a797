//! Cloud Firestore REST API client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::FirestoreConfig;

use super::accessor::Connector;
use super::record::{Collection, Document, DocumentId, Record};
use super::value::{decode_fields, encode_fields};
use super::{DocumentStore, OrderBy, StoreError};

/// Documents fetched per page when listing a collection
const LIST_PAGE_SIZE: u32 = 300;

/// Firestore client for one project database.
///
/// Authentication is whatever bearer token the environment hands us; the
/// emulator needs none.
#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    documents_url: Url,
    access_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(config: &FirestoreConfig) -> Result<Self, StoreError> {
        let project_id = config
            .project_id
            .as_deref()
            .ok_or_else(|| StoreError::Connect("no Firestore project id configured".to_string()))?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        let mut documents_url = Url::parse(&config.endpoint).map_err(|e| {
            StoreError::Connect(format!("invalid endpoint {}: {}", config.endpoint, e))
        })?;
        documents_url
            .path_segments_mut()
            .map_err(|_| StoreError::Connect(format!("invalid endpoint {}", config.endpoint)))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                project_id,
                "databases",
                config.database.as_str(),
                "documents",
            ]);

        Ok(Self {
            client,
            documents_url,
            access_token: config.access_token.clone(),
        })
    }

    /// URL of a collection, or of one document when `id` is given
    fn resource_url(&self, collection: Collection, id: Option<&DocumentId>) -> Url {
        let mut url = self.documents_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(collection.as_str());
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        url
    }

    /// URL of the `documents:runQuery` method
    fn run_query_url(&self) -> Url {
        let mut url = self.documents_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop().push("documents:runQuery");
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self
            .authorized(request)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(StoreError::Request)?;
        ensure_success(response).await
    }

    async fn list_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.resource_url(collection, None);
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: ListDocumentsResponse = self
                .send(self.client.get(url))
                .await?
                .json()
                .await
                .map_err(StoreError::Parse)?;

            for raw in page.documents {
                documents.push(raw.into_document()?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn run_query(
        &self,
        collection: Collection,
        order: OrderBy,
    ) -> Result<Vec<Document>, StoreError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection.as_str() }],
                "orderBy": [{
                    "field": { "fieldPath": quote_field_path(order.field) },
                    "direction": order.direction.as_str(),
                }],
            }
        });

        let results: Vec<RunQueryResult> = self
            .send(self.client.post(self.run_query_url()).json(&body))
            .await?
            .json()
            .await
            .map_err(StoreError::Parse)?;

        // Entries without a document only carry progress metadata
        results
            .into_iter()
            .filter_map(|r| r.document)
            .map(RawDocument::into_document)
            .collect()
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn set(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: &Record,
    ) -> Result<(), StoreError> {
        // A PATCH without an update mask replaces the whole document
        let url = self.resource_url(collection, Some(id));
        let body = json!({ "fields": encode_fields(fields)? });
        self.send(self.client.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        fields: &Record,
    ) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }

        let mut url = self.resource_url(collection, Some(id));
        {
            let mut query = url.query_pairs_mut();
            for name in fields.keys() {
                query.append_pair("updateMask.fieldPaths", &quote_field_path(name));
            }
            query.append_pair("currentDocument.exists", "true");
        }

        let body = json!({ "fields": encode_fields(fields)? });
        self.send(self.client.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<(), StoreError> {
        let url = self.resource_url(collection, Some(id));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let url = self.resource_url(collection, Some(id));

        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(StoreError::Request)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let raw: RawDocument = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(StoreError::Parse)?;
        raw.into_document().map(Some)
    }

    async fn stream(
        &self,
        collection: Collection,
        order: Option<OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        match order {
            Some(order) => self.run_query(collection, order).await,
            None => self.list_all(collection).await,
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Quote a field name for use as a field path when it is not a plain identifier
fn quote_field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        name.to_string()
    } else {
        let escaped = name.replace('\\', "\\\\").replace('`', "\\`");
        format!("`{}`", escaped)
    }
}

/// Document resource as returned by the REST API
#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RawDocument {
    fn into_document(self) -> Result<Document, StoreError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Decode(format!("bad document name `{}`", self.name)))?
            .to_string();
        Ok(Document::new(id, decode_fields(&self.fields)?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryResult {
    document: Option<RawDocument>,
}

/// Builds a fresh Firestore client for every call
#[derive(Clone, Debug)]
pub struct FirestoreConnector {
    config: FirestoreConfig,
}

impl FirestoreConnector {
    pub fn new(config: FirestoreConfig) -> Self {
        Self { config }
    }
}

impl Connector for FirestoreConnector {
    fn connect(&self) -> Result<Arc<dyn DocumentStore>, StoreError> {
        Ok(Arc::new(FirestoreClient::new(&self.config)?))
    }
}
