//! EMX2 GraphQL Directory client
//!
//! Each national node owns a schema named `{country_schema_prefix}{CC}`; the
//! global endpoint is the configured fallback schema. Requests are POSTed to
//! `{base_url}/{schema}/graphql`. EMX2 reports refused mutations with HTTP 200
//! and an `errors` array, which this client turns into a refusal.

use super::models::GRAPHQL;
use super::traits::{DirectoryApi, DirectoryResult, Endpoint};
use crate::config::{exposed_token, DirectoryConfig};
use crate::domain::{
    BiobankAttributes, BiobankId, CollectionAttributes, CollectionId, DirectoryError, Fact,
    Result, SyncError,
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Url};
use serde_json::{json, Value};
use std::time::Duration;

/// Header carrying the EMX2 token
pub const TOKEN_HEADER: &str = "x-molgenis-token";

/// Schema holding the shared ontologies (diagnoses, material types, ...)
pub const ONTOLOGY_SCHEMA: &str = "DirectoryOntologies";

const COLLECTION_FIELDS: &str = "id name description size orderOfMagnitude { name } \
    numberOfDonors orderOfMagnitudeDonors { name } ageLow ageHigh sex { name } \
    materials { name } storageTemperatures { name } diagnosisAvailable { name } \
    networks { id } dataCategories { name } acronym url biobank { id } type { name } \
    contact { id } country { name } nationalNode { id }";

const BIOBANK_FIELDS: &str =
    "id name acronym description url juridicalPerson country { name } contact { id } networks { id } \
     nationalNode { id }";

/// Request refused by the Directory
#[derive(Debug)]
struct Refusal {
    status: u16,
    message: String,
}

impl From<Refusal> for DirectoryError {
    fn from(refusal: Refusal) -> Self {
        DirectoryError::Rejected {
            status: refusal.status,
            message: refusal.message,
        }
    }
}

/// Directory client for the EMX2 GraphQL API
pub struct DirectoryGraphqlClient {
    base_url: String,
    client: Client,
    token: Option<String>,
    page_size: usize,
    fallback_schema: String,
    country_schema_prefix: String,
}

impl DirectoryGraphqlClient {
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
            fallback_schema: config.fallback_schema.clone(),
            country_schema_prefix: config.country_schema_prefix.clone(),
        })
    }

    fn schema(&self, endpoint: &Endpoint) -> String {
        match endpoint {
            Endpoint::Country(code) => format!("{}{code}", self.country_schema_prefix),
            Endpoint::Global => self.fallback_schema.clone(),
        }
    }

    fn graphql_url(&self, schema: &str) -> DirectoryResult<Url> {
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
            .extend([schema, "graphql"]);
        Ok(url)
    }

    /// POST a query; the outer error is a failure, the inner one a refusal
    async fn execute(
        &self,
        schema: &str,
        query: &str,
        variables: Value,
    ) -> DirectoryResult<std::result::Result<Value, Refusal>> {
        let url = self.graphql_url(schema)?;
        let mut request = self
            .client
            .post(url)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DirectoryError::Timeout(e.to_string())
            } else {
                DirectoryError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DirectoryError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(
                schema = schema,
                status = status.as_u16(),
                body = %message,
                "Directory refused GraphQL request"
            );
            return Ok(Err(Refusal {
                status: status.as_u16(),
                message,
            }));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; ");
                tracing::debug!(schema = schema, errors = %message, "GraphQL errors");
                return Ok(Err(Refusal {
                    status: status.as_u16(),
                    message,
                }));
            }
        }

        Ok(Ok(body.get("data").cloned().unwrap_or(Value::Null)))
    }

    /// Rows of `table` in a query result; EMX2 omits empty tables
    fn rows(data: &Value, table: &str) -> Vec<Value> {
        data.get(table)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    async fn mutate(
        &self,
        endpoint: &Endpoint,
        operation: &str,
        table: &str,
        rows: Vec<Value>,
    ) -> DirectoryResult<bool> {
        let query = format!(
            "mutation($rows: [{table}Input]) {{ {operation}({table}: $rows) {{ message }} }}"
        );
        let schema = self.schema(endpoint);
        Ok(self
            .execute(&schema, &query, json!({ "rows": rows }))
            .await?
            .is_ok())
    }

    async fn get_by_id(
        &self,
        endpoint: &Endpoint,
        table: &str,
        fields: &str,
        id: &str,
    ) -> DirectoryResult<Option<Value>> {
        let query = format!(
            "query($id: String) {{ {table}(filter: {{ id: {{ equals: [$id] }} }}) {{ {fields} }} }}"
        );
        let schema = self.schema(endpoint);
        match self.execute(&schema, &query, json!({ "id": id })).await? {
            Ok(data) => Ok(Self::rows(&data, table).into_iter().next()),
            Err(_) => Ok(None),
        }
    }
}

#[async_trait]
impl DirectoryApi for DirectoryGraphqlClient {
    async fn validate_diagnosis(&self, _endpoint: &Endpoint, code: &str) -> DirectoryResult<bool> {
        let query = "query($code: String) { DiseaseTypes(filter: { name: { equals: [$code] } }) { name } }";
        match self
            .execute(ONTOLOGY_SCHEMA, query, json!({ "code": code }))
            .await?
        {
            Ok(data) => Ok(!Self::rows(&data, "DiseaseTypes").is_empty()),
            Err(refusal) => Err(refusal.into()),
        }
    }

    async fn list_fact_ids(
        &self,
        endpoint: &Endpoint,
        collection_id: &CollectionId,
        page: usize,
    ) -> DirectoryResult<Vec<String>> {
        let query = "query($id: String, $limit: Int, $offset: Int) { \
            CollectionFacts(filter: { collection: { id: { equals: [$id] } } }, \
            limit: $limit, offset: $offset, orderby: { id: ASC }) { id } }";
        let variables = json!({
            "id": collection_id.as_str(),
            "limit": self.page_size,
            "offset": page * self.page_size,
        });

        let data = self.execute(&self.schema(endpoint), query, variables).await??;
        Ok(Self::rows(&data, "CollectionFacts")
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn delete_facts(&self, endpoint: &Endpoint, ids: &[String]) -> DirectoryResult<bool> {
        if ids.is_empty() {
            return Ok(true);
        }
        let rows = ids.iter().map(|id| json!({ "id": id })).collect();
        self.mutate(endpoint, "delete", "CollectionFacts", rows).await
    }

    async fn insert_facts(&self, endpoint: &Endpoint, facts: &[Fact]) -> DirectoryResult<bool> {
        if facts.is_empty() {
            return Ok(true);
        }
        let rows = facts.iter().map(|fact| GRAPHQL.fact_to(fact)).collect();
        self.mutate(endpoint, "insert", "CollectionFacts", rows).await
    }

    async fn get_collection(
        &self,
        endpoint: &Endpoint,
        id: &CollectionId,
    ) -> DirectoryResult<Option<CollectionAttributes>> {
        self.get_by_id(endpoint, "Collections", COLLECTION_FIELDS, id.as_str())
            .await?
            .map(|doc| GRAPHQL.collection_from(&doc))
            .transpose()
    }

    async fn put_collection(
        &self,
        endpoint: &Endpoint,
        attributes: &CollectionAttributes,
    ) -> DirectoryResult<bool> {
        let row = GRAPHQL.collection_to(attributes);
        self.mutate(endpoint, "update", "Collections", vec![row]).await
    }

    async fn get_biobank(
        &self,
        endpoint: &Endpoint,
        id: &BiobankId,
    ) -> DirectoryResult<Option<BiobankAttributes>> {
        self.get_by_id(endpoint, "Biobanks", BIOBANK_FIELDS, id.as_str())
            .await?
            .map(|doc| GRAPHQL.biobank_from(&doc))
            .transpose()
    }

    async fn put_biobank(
        &self,
        endpoint: &Endpoint,
        attributes: &BiobankAttributes,
    ) -> DirectoryResult<bool> {
        let row = GRAPHQL.biobank_to(attributes);
        self.mutate(endpoint, "update", "Biobanks", vec![row]).await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
