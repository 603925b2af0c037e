//! Molgenis REST v2 Directory client
//!
//! Country endpoints address the national node's tables
//! (`eu_bbmri_eric_{CC}_facts`), the global endpoint the shared tables
//! (`eu_bbmri_eric_facts`). Authentication uses a pre-issued token sent in the
//! `x-molgenis-token` header.

use super::models::REST;
use super::traits::{DirectoryApi, DirectoryResult, Endpoint};
use crate::config::{exposed_token, DirectoryConfig};
use crate::domain::{
    BiobankAttributes, BiobankId, CollectionAttributes, CollectionId, DirectoryError, Fact,
    Result, SyncError,
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Header carrying the Molgenis token
pub const TOKEN_HEADER: &str = "x-molgenis-token";

const TABLE_PREFIX: &str = "eu_bbmri_eric";
const DISEASE_TYPES_TABLE: &str = "eu_bbmri_eric_disease_types";

/// Kinds of Directory tables addressed by this client
#[derive(Debug, Clone, Copy)]
enum Table {
    Facts,
    Collections,
    Biobanks,
}

impl Table {
    fn suffix(self) -> &'static str {
        match self {
            Table::Facts => "facts",
            Table::Collections => "collections",
            Table::Biobanks => "biobanks",
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntityPage {
    #[serde(default)]
    items: Vec<Value>,
}

/// Directory client for the Molgenis REST v2 API
///
/// # Example
///
/// ```no_run
/// use directory_sync::adapters::directory::{DirectoryApi, DirectoryRestClient, Endpoint};
/// use directory_sync::config::load_config;
/// use directory_sync::domain::CollectionId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config("directory-sync.toml")?;
/// let client = DirectoryRestClient::new(&config.directory)?;
///
/// let id = CollectionId::new("bbmri-eric:ID:DE_1:collection:tumor")?;
/// let first_page = client.list_fact_ids(&Endpoint::Global, &id, 0).await?;
/// println!("{} facts on the first page", first_page.len());
/// # Ok(())
/// # }
/// ```
pub struct DirectoryRestClient {
    base_url: String,
    client: Client,
    token: Option<String>,
    page_size: usize,
}

impl DirectoryRestClient {
    /// Create a client from the `[directory]` section
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds));

        if !config.tls_verify {
            tracing::warn!("TLS certificate verification disabled for Directory requests");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            SyncError::Configuration(format!("Failed to build Directory HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            token: exposed_token(&config.token).map(str::to_string),
            page_size: config.page_size,
        })
    }

    fn table_name(endpoint: &Endpoint, table: Table) -> String {
        match endpoint {
            Endpoint::Country(code) => format!("{TABLE_PREFIX}_{code}_{}", table.suffix()),
            Endpoint::Global => format!("{TABLE_PREFIX}_{}", table.suffix()),
        }
    }

    /// `{base_url}/api/v2/{segments...}` with every segment percent-encoded
    fn api_url(&self, segments: &[&str]) -> DirectoryResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| DirectoryError::ConnectionFailed(format!("Invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| {
                DirectoryError::ConnectionFailed(format!(
                    "Base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["api", "v2"])
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> DirectoryResult<Response> {
        self.authorized(request)
            .send()
            .await
            .map_err(transport_error)
    }

    async fn get_entity(
        &self,
        endpoint: &Endpoint,
        table: Table,
        id: &str,
    ) -> DirectoryResult<Option<Value>> {
        let table_name = Self::table_name(endpoint, table);
        let url = self.api_url(&[table_name.as_str(), id])?;
        let response = self.send(self.client.get(url)).await?;

        if response.status().is_success() {
            let doc = response
                .json::<Value>()
                .await
                .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;
            return Ok(Some(doc));
        }

        refused(response, "get", &table_name).await.map(|_| None)
    }

    async fn put_entity(&self, endpoint: &Endpoint, table: Table, doc: Value) -> DirectoryResult<bool> {
        let table_name = Self::table_name(endpoint, table);
        let url = self.api_url(&[table_name.as_str()])?;
        let response = self
            .send(self.client.put(url).json(&json!({ "entities": [doc] })))
            .await?;
        if response.status().is_success() {
            return Ok(true);
        }
        refused(response, "put", &table_name).await
    }
}

fn transport_error(e: reqwest::Error) -> DirectoryError {
    if e.is_timeout() {
        DirectoryError::Timeout(e.to_string())
    } else {
        DirectoryError::ConnectionFailed(e.to_string())
    }
}

/// Classify a non-success response
///
/// Client errors are refusals (`Ok(false)`); server errors are failures.
async fn refused(response: Response, operation: &str, table: &str) -> DirectoryResult<bool> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.is_server_error() {
        return Err(DirectoryError::Rejected {
            status: status.as_u16(),
            message: body,
        });
    }

    if status != StatusCode::NOT_FOUND {
        tracing::debug!(
            operation = operation,
            table = table,
            status = status.as_u16(),
            body = %body,
            "Directory refused request"
        );
    }
    Ok(false)
}

#[async_trait]
impl DirectoryApi for DirectoryRestClient {
    async fn validate_diagnosis(&self, _endpoint: &Endpoint, code: &str) -> DirectoryResult<bool> {
        // the disease vocabulary is shared by all national nodes
        let url = self.api_url(&[DISEASE_TYPES_TABLE, code])?;
        let response = self.send(self.client.get(url)).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(DirectoryError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn list_fact_ids(
        &self,
        endpoint: &Endpoint,
        collection_id: &CollectionId,
        page: usize,
    ) -> DirectoryResult<Vec<String>> {
        let table_name = Self::table_name(endpoint, Table::Facts);
        let url = self.api_url(&[table_name.as_str()])?;
        let request = self.client.get(url).query(&[
            ("q", format!("collection==\"{collection_id}\"")),
            ("attrs", "id".to_string()),
            ("sort", "id".to_string()),
            ("num", self.page_size.to_string()),
            ("start", (page * self.page_size).to_string()),
        ]);
        let response = self.send(request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let page: EntityPage = response
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;

        Ok(page
            .items
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn delete_facts(&self, endpoint: &Endpoint, ids: &[String]) -> DirectoryResult<bool> {
        if ids.is_empty() {
            return Ok(true);
        }
        let table_name = Self::table_name(endpoint, Table::Facts);
        let url = self.api_url(&[table_name.as_str()])?;
        let response = self
            .send(self.client.delete(url).json(&json!({ "entityIds": ids })))
            .await?;
        if response.status().is_success() {
            return Ok(true);
        }
        refused(response, "delete_facts", &table_name).await
    }

    async fn insert_facts(&self, endpoint: &Endpoint, facts: &[Fact]) -> DirectoryResult<bool> {
        if facts.is_empty() {
            return Ok(true);
        }
        let table_name = Self::table_name(endpoint, Table::Facts);
        let url = self.api_url(&[table_name.as_str()])?;
        let entities: Vec<Value> = facts.iter().map(|fact| REST.fact_to(fact)).collect();
        let response = self
            .send(self.client.post(url).json(&json!({ "entities": entities })))
            .await?;
        if response.status().is_success() {
            return Ok(true);
        }
        refused(response, "insert_facts", &table_name).await
    }

    async fn get_collection(
        &self,
        endpoint: &Endpoint,
        id: &CollectionId,
    ) -> DirectoryResult<Option<CollectionAttributes>> {
        self.get_entity(endpoint, Table::Collections, id.as_str())
            .await?
            .map(|doc| REST.collection_from(&doc))
            .transpose()
    }

    async fn put_collection(
        &self,
        endpoint: &Endpoint,
        attributes: &CollectionAttributes,
    ) -> DirectoryResult<bool> {
        self.put_entity(endpoint, Table::Collections, REST.collection_to(attributes))
            .await
    }

    async fn get_biobank(
        &self,
        endpoint: &Endpoint,
        id: &BiobankId,
    ) -> DirectoryResult<Option<BiobankAttributes>> {
        self.get_entity(endpoint, Table::Biobanks, id.as_str())
            .await?
            .map(|doc| REST.biobank_from(&doc))
            .transpose()
    }

    async fn put_biobank(
        &self,
        endpoint: &Endpoint,
        attributes: &BiobankAttributes,
    ) -> DirectoryResult<bool> {
        self.put_entity(endpoint, Table::Biobanks, REST.biobank_to(attributes))
            .await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
