// 🔌 OrientDB REST backend - GraphStore over the HTTP command endpoint
// Vertex creates, edge commands and key lookups are all plain SQL POSTed
// to /command/{db}/sql with basic auth; record ids come back as @rid

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

use crate::errors::StoreError;
use crate::store::{Attributes, GraphStore, VertexId};

/// Connection settings for the remote store.
#[derive(Debug, Clone)]
pub struct OrientConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Applied to every store call so a wedged server cannot hang the load
    pub timeout: Duration,
}

/// Blocking REST client for one OrientDB database.
pub struct OrientRest {
    base: String,
    database: String,
    user: String,
    password: String,
    client: Client,
}

impl OrientRest {
    /// Connect and smoke-test the database with a cheap count query.
    pub fn open(config: &OrientConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let store = OrientRest {
            base: format!("http://{}:{}", config.host, config.port),
            database: config.database.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            client,
        };

        store.command("SELECT count(*) FROM Document")?;
        Ok(store)
    }

    /// POST one SQL statement, returning the `result` rows.
    fn command(&self, statement: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        debug!(statement, "store command");

        let url = format!("{}/command/{}/sql", self.base, self.database);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.user, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(statement.to_string())
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Rejected(format!(
                "{} for '{}': {}",
                status, statement, body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;

        Ok(body
            .get("result")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default())
    }
}

impl GraphStore for OrientRest {
    fn create_vertex(
        &mut self,
        type_tag: &str,
        attributes: Attributes,
    ) -> Result<VertexId, StoreError> {
        let content = serde_json::Value::Object(attributes);
        let statement = format!("INSERT INTO {} CONTENT {} RETURN @rid", type_tag, content);

        let rows = self.command(&statement)?;
        let row = rows.first().ok_or_else(|| {
            StoreError::MalformedResponse(format!("empty result for '{}'", statement))
        })?;

        rid_from_row(row).ok_or_else(|| {
            StoreError::MalformedResponse(format!("no record id in {}", row))
        })
    }

    fn create_edge(
        &mut self,
        edge_tag: &str,
        from: &VertexId,
        to: &VertexId,
    ) -> Result<(), StoreError> {
        self.command(&format!("CREATE EDGE {} FROM {} TO {}", edge_tag, from, to))?;
        Ok(())
    }

    fn lookup_by_key(&mut self, type_tag: &str, key: &str)
        -> Result<Vec<VertexId>, StoreError> {
        let statement = format!(
            "SELECT @rid FROM {} WHERE key = '{}'",
            type_tag,
            escape_sql_string(key)
        );

        let rows = self.command(&statement)?;
        rows.iter()
            .map(|row| {
                rid_from_row(row).ok_or_else(|| {
                    StoreError::MalformedResponse(format!("no record id in {}", row))
                })
            })
            .collect()
    }

    fn close(&mut self) -> Result<(), StoreError> {
        // Best effort: the server drops the session either way
        let url = format!("{}/disconnect", self.base);
        let _ = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send();
        Ok(())
    }
}

/// Pull a record id out of one result row. OrientDB answers `@rid` for
/// record-shaped rows and `value` for scalar projections.
fn rid_from_row(row: &serde_json::Value) -> Option<VertexId> {
    row.get("@rid")
        .or_else(|| row.get("value"))
        .or_else(|| row.get("rid"))
        .and_then(|v| v.as_str())
        .map(|rid| VertexId(rid.to_string()))
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
