//! PostgREST-style HTTP gateway.
//!
//! Talks to a hosted Postgres that exposes its tables under `/rest/v1/`,
//! the layout used by common backend-as-a-service offerings.
//!
//! ## Conventions
//!
//! - **Tables**: `GET|POST|PATCH|DELETE {endpoint}/rest/v1/{table}`
//! - **Auth**: the API key is sent both as `apikey` and as a bearer token
//! - **Row filters**: `?id=eq.{id}`
//! - **Writes** ask for `Prefer: return=representation` so the stored row
//!   comes back in the response
//! - **Probe**: `GET /rest/v1/entries?select=id&limit=1`
//!
//! ## Example
//!
//! ```rust,no_run
//! use hearthlog_gateway::rest::RestGateway;
//! use hearthlog_gateway::Gateway;
//! use hearthlog_types::EntityKind;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = RestGateway::builder()
//!         .endpoint("https://family.example.co")
//!         .api_key("anon-key")
//!         .build()?;
//!
//!     for entry in gateway.list(EntityKind::Entry).await? {
//!         println!("{}: {:?}", entry.id, entry.text("title"));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use hearthlog_types::{Entity, EntityId, EntityKind, FieldValue, Fields, NewEntity};

use crate::{Gateway, GatewayError, ProbeOutcome};

const REST_PREFIX: &str = "rest/v1";
const ID_COLUMN: &str = "id";

/// Gateway for a PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RestGateway {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> RestGatewayBuilder {
        RestGatewayBuilder::default()
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/{}/{}", self.endpoint, REST_PREFIX, kind.table())
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn rows(&self, kind: EntityKind, response: Response) -> Result<Vec<Entity>, GatewayError> {
        let response = check_status(response).await?;
        let raw: Vec<BTreeMap<String, Value>> = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;
        raw.into_iter().map(|row| row_from_json(kind, row)).collect()
    }

    async fn single_row(
        &self,
        kind: EntityKind,
        id: Option<&EntityId>,
        response: Response,
    ) -> Result<Entity, GatewayError> {
        let mut rows = self.rows(kind, response).await?;
        match (rows.pop(), id) {
            (Some(row), _) => Ok(row),
            (None, Some(id)) => Err(GatewayError::NotFound {
                kind,
                id: id.clone(),
            }),
            (None, None) => Err(GatewayError::Parse(format!(
                "{} insert returned no row",
                kind
            ))),
        }
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, GatewayError> {
        let response = self
            .request(self.client.get(self.table_url(kind)))
            .query(&[("select", "*"), ("order", "id")])
            .send()
            .await?;
        self.rows(kind, response).await
    }

    async fn create(&self, new: NewEntity) -> Result<Entity, GatewayError> {
        let kind = new.kind;
        let response = self
            .request(self.client.post(self.table_url(kind)))
            .header("Prefer", "return=representation")
            .json(&new.fields)
            .send()
            .await?;
        self.single_row(kind, None, response).await
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &EntityId,
        patch: Fields,
    ) -> Result<Entity, GatewayError> {
        let response = self
            .request(self.client.patch(self.table_url(kind)))
            .query(&[(ID_COLUMN, id_filter(id))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        self.single_row(kind, Some(id), response).await
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<(), GatewayError> {
        let response = self
            .request(self.client.delete(self.table_url(kind)))
            .query(&[(ID_COLUMN, id_filter(id))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        self.single_row(kind, Some(id), response).await.map(|_| ())
    }

    async fn probe_connectivity(&self) -> ProbeOutcome {
        let started = Instant::now();
        let result = self
            .request(self.client.get(self.table_url(EntityKind::Entry)))
            .query(&[("select", ID_COLUMN), ("limit", "1")])
            .send()
            .await;

        let outcome = match result {
            Ok(response) => match check_status(response).await {
                Ok(_) => ProbeOutcome::ok(),
                Err(err) => ProbeOutcome::failed(err.to_string()),
            },
            Err(err) => ProbeOutcome::failed(GatewayError::from(err).to_string()),
        };
        debug!(
            success = outcome.success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rest probe finished"
        );
        outcome
    }
}

/// Builder for RestGateway.
#[derive(Debug, Default)]
pub struct RestGatewayBuilder {
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl RestGatewayBuilder {
    /// Set the project URL (e.g., "https://family.example.co").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the API key sent with every request.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<RestGateway, GatewayError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unsupported(format!("HTTP client: {}", e)))?;

        Ok(RestGateway {
            client,
            endpoint: self
                .endpoint
                .unwrap_or_else(|| "http://localhost:54321".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: self.api_key.unwrap_or_default(),
        })
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = error_message(&body).unwrap_or_else(|| status.to_string());
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(detail),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Rejected(detail)
        }
        _ => GatewayError::Http(format!("API returned status {}: {}", status, detail)),
    })
}

/// PostgREST errors carry a JSON body with a `message`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}

fn id_filter(id: &EntityId) -> String {
    format!("eq.{}", id)
}

fn row_from_json(kind: EntityKind, mut row: BTreeMap<String, Value>) -> Result<Entity, GatewayError> {
    let id = match row.remove(ID_COLUMN) {
        Some(Value::String(s)) => EntityId::new(s),
        Some(Value::Number(n)) => EntityId::new(n.to_string()),
        other => {
            return Err(GatewayError::Parse(format!(
                "{} row has no usable id: {:?}",
                kind, other
            )))
        }
    };

    let fields = row
        .into_iter()
        .map(|(name, value)| (name, field_from_json(value)))
        .collect();

    Ok(Entity { id, kind, fields })
}

fn field_from_json(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => n.as_f64().map_or(FieldValue::Null, FieldValue::Float),
        },
        Value::String(s) => FieldValue::Text(s),
        // Nested json/jsonb columns are kept as their text form.
        other => FieldValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let gw = RestGateway::builder().build().unwrap();
        assert_eq!(gw.endpoint, "http://localhost:54321");
        assert_eq!(gw.api_key, "");
    }

    #[test]
    fn test_builder_custom() {
        let gw = RestGateway::builder()
            .endpoint("https://family.example.co/")
            .api_key("anon")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(gw.endpoint, "https://family.example.co");
        assert_eq!(
            gw.table_url(EntityKind::Like),
            "https://family.example.co/rest/v1/likes"
        );
    }

    #[test]
    fn numeric_and_text_ids() {
        let a = row_from_json(EntityKind::Entry, object(json!({"id": 7, "title": "t"}))).unwrap();
        let b = row_from_json(EntityKind::Entry, object(json!({"id": "uuid-1"}))).unwrap();
        assert_eq!(a.id.as_str(), "7");
        assert_eq!(a.text("title"), Some("t"));
        assert!(a.get("id").is_none());
        assert_eq!(b.id.as_str(), "uuid-1");
    }

    #[test]
    fn row_without_id_is_a_parse_error() {
        let err = row_from_json(EntityKind::Photo, object(json!({"url": "x"}))).unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));
    }

    #[test]
    fn json_columns_map_to_field_values() {
        assert_eq!(field_from_json(json!(null)), FieldValue::Null);
        assert_eq!(field_from_json(json!(3)), FieldValue::Int(3));
        assert_eq!(field_from_json(json!(2.5)), FieldValue::Float(2.5));
        assert_eq!(field_from_json(json!(true)), FieldValue::Bool(true));
        assert_eq!(
            field_from_json(json!({"a": 1})),
            FieldValue::Text("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn postgrest_error_body() {
        let body = r#"{"code":"23503","message":"violates foreign key constraint"}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("violates foreign key constraint")
        );
        assert_eq!(error_message("<html>"), None);
        assert_eq!(id_filter(&EntityId::new("12")), "eq.12");
    }
}
