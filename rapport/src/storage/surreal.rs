//! Keyed store backed by embedded SurrealDB
//!
//! Each record type maps to one table. Rows are `{ key, body }` envelopes
//! whose record id is derived from the key, so single-key statements are
//! atomic in the database. Filters compile to a `WHERE` clause over `body`
//! with every value bound as a parameter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use surrealdb::engine::local::{Db, Mem, RocksDb};
use surrealdb::{Connection, Surreal};

use super::config::{SurrealDBConfig, SurrealDBEngine};
use super::errors::StorageError;
use super::filters::RecordFilter;
use super::traits::{KeyedStore, Record, validate_key};

#[derive(Debug, Deserialize)]
struct Envelope<R> {
    body: R,
}

#[derive(Debug, Serialize)]
struct Row {
    key: String,
    body: Value,
}

/// Open an embedded SurrealDB client as described by `config`
pub async fn connect(
    config: &SurrealDBConfig,
    data_dir: &std::path::Path,
) -> Result<Surreal<Db>, StorageError> {
    config.validate()?;

    let client = match config.engine {
        SurrealDBEngine::Memory => {
            tracing::info!("Opening SurrealDB with in-memory engine");
            Surreal::new::<Mem>(()).await.map_err(|e| {
                StorageError::Connection(format!("Failed to create memory client: {}", e))
            })?
        }
        SurrealDBEngine::RocksDB => {
            let path = config.resolve_path(data_dir);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!("Opening SurrealDB with RocksDB engine at {}", path.display());
            Surreal::new::<RocksDb>(path.to_string_lossy().to_string())
                .await
                .map_err(|e| {
                    StorageError::Connection(format!("Failed to create RocksDB client: {}", e))
                })?
        }
    };

    client
        .use_ns(&config.namespace)
        .use_db(&config.database)
        .await
        .map_err(|e| {
            StorageError::Connection(format!("Failed to set namespace/database: {}", e))
        })?;

    Ok(client)
}

/// Keyed store over one SurrealDB table
#[derive(Debug)]
pub struct SurrealStore<R, C = Db>
where
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    client: Surreal<C>,
    _record: PhantomData<fn() -> R>,
}

impl<R, C> SurrealStore<R, C>
where
    R: Record,
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    /// Wrap a client that already selected its namespace and database
    pub fn new(client: Surreal<C>) -> Self {
        Self {
            client,
            _record: PhantomData,
        }
    }

    fn row(key: &str, record: &R) -> Result<Row, StorageError> {
        Ok(Row {
            key: key.to_string(),
            body: serde_json::to_value(record)?,
        })
    }

    async fn run(
        &self,
        sql: String,
        key: Option<&str>,
        row: Option<Row>,
        params: Vec<(String, Value)>,
        context: &str,
    ) -> Result<surrealdb::Response, StorageError> {
        let mut query = self.client.query(sql).bind(("tb", R::COLLECTION));
        if let Some(key) = key {
            query = query.bind(("key", key.to_string()));
        }
        if let Some(row) = row {
            query = query.bind(("row", row));
        }
        for (name, value) in params {
            query = query.bind((name, value));
        }

        let response = query
            .await
            .map_err(|e| StorageError::Query(format!("Failed to {}: {}", context, e)))?;

        response.check().map_err(|e| {
            let message = e.to_string();
            if message.contains("already exists") {
                StorageError::AlreadyExists(format!("{}: {}", R::COLLECTION, message))
            } else {
                StorageError::Query(format!("Failed to {}: {}", context, message))
            }
        })
    }

    fn take(
        response: &mut surrealdb::Response,
        index: usize,
        context: &str,
    ) -> Result<Vec<R>, StorageError> {
        let rows: Vec<Option<Envelope<R>>> = response.take(index).map_err(|e| {
            StorageError::Serialization(format!("Failed to extract {}: {}", context, e))
        })?;
        Ok(rows.into_iter().flatten().map(|row| row.body).collect())
    }
}

/// Compile a filter into a `WHERE` clause, collecting bound parameters
fn compile(filter: &RecordFilter, params: &mut Vec<(String, Value)>) -> String {
    match filter {
        RecordFilter::All => "true".to_string(),
        RecordFilter::Eq { field, value } => {
            let name = format!("p{}", params.len());
            params.push((name.clone(), value.clone()));
            format!("{} = ${}", field_path(field), name)
        }
        RecordFilter::Before { field, time } => {
            let name = format!("p{}", params.len());
            params.push((name.clone(), Value::String(time.to_rfc3339())));
            format!("<datetime> {} < <datetime> ${}", field_path(field), name)
        }
        RecordFilter::And(filters) if filters.is_empty() => "true".to_string(),
        RecordFilter::Or(filters) if filters.is_empty() => "false".to_string(),
        RecordFilter::And(filters) => join(filters, " AND ", params),
        RecordFilter::Or(filters) => join(filters, " OR ", params),
    }
}

/// `body` path of a validated field, each segment escaped
fn field_path(field: &str) -> String {
    field
        .split('.')
        .fold("body".to_string(), |path, segment| format!("{}.`{}`", path, segment))
}

fn join(filters: &[RecordFilter], op: &str, params: &mut Vec<(String, Value)>) -> String {
    let parts: Vec<String> = filters
        .iter()
        .map(|f| format!("({})", compile(f, params)))
        .collect();
    parts.join(op)
}

#[async_trait]
impl<R, C> KeyedStore<R> for SurrealStore<R, C>
where
    R: Record,
    C: Connection + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn insert(&self, key: &str, record: R) -> Result<R, StorageError> {
        validate_key(key)?;
        let row = Self::row(key, &record)?;
        self.run(
            "CREATE type::thing($tb, $key) CONTENT $row RETURN NONE".to_string(),
            Some(key),
            Some(row),
            Vec::new(),
            "insert record",
        )
        .await?;
        Ok(record)
    }

    async fn get(&self, key: &str) -> Result<Option<R>, StorageError> {
        let mut response = self
            .run(
                "SELECT key, body FROM type::thing($tb, $key)".to_string(),
                Some(key),
                None,
                Vec::new(),
                "get record",
            )
            .await?;
        Ok(Self::take(&mut response, 0, "record")?.into_iter().next())
    }

    async fn upsert(&self, key: &str, record: R) -> Result<Option<R>, StorageError> {
        validate_key(key)?;
        let row = Self::row(key, &record)?;
        let mut response = self
            .run(
                "UPSERT type::thing($tb, $key) CONTENT $row RETURN BEFORE".to_string(),
                Some(key),
                Some(row),
                Vec::new(),
                "upsert record",
            )
            .await?;
        Ok(Self::take(&mut response, 0, "previous record")?
            .into_iter()
            .next())
    }

    async fn remove(&self, key: &str) -> Result<Option<R>, StorageError> {
        let mut response = self
            .run(
                "DELETE type::thing($tb, $key) RETURN BEFORE".to_string(),
                Some(key),
                None,
                Vec::new(),
                "remove record",
            )
            .await?;
        Ok(Self::take(&mut response, 0, "removed record")?
            .into_iter()
            .next())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<R>, StorageError> {
        filter.validate()?;
        let mut params = Vec::new();
        let clause = compile(filter, &mut params);
        let sql = format!(
            "SELECT key, body FROM type::table($tb) WHERE {} ORDER BY key",
            clause
        );
        let mut response = self.run(sql, None, None, params, "list records").await?;
        Self::take(&mut response, 0, "records")
    }

    async fn remove_where(&self, filter: &RecordFilter) -> Result<usize, StorageError> {
        filter.validate()?;
        let mut params = Vec::new();
        let clause = compile(filter, &mut params);
        let sql = format!("DELETE type::table($tb) WHERE {} RETURN BEFORE", clause);
        let mut response = self.run(sql, None, None, params, "remove records").await?;
        Ok(Self::take(&mut response, 0, "removed records")?.len())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.run(
            "DELETE type::table($tb)".to_string(),
            None,
            None,
            Vec::new(),
            "clear table",
        )
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(self.client.health().await.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_compile_binds_every_value() {
        let filter = RecordFilter::equals("from", "a")
            .and(RecordFilter::equals("to", "b").or(RecordFilter::before("deadline", Utc::now())));
        let mut params = Vec::new();
        let clause = compile(&filter, &mut params);

        assert_eq!(params.len(), 3);
        assert_eq!(
            clause,
            "(body.`from` = $p0) AND ((body.`to` = $p1) OR (<datetime> body.`deadline` < <datetime> $p2))"
        );
        assert!(!clause.contains("'a'"));
    }

    #[test]
    fn test_nested_fields_are_escaped() {
        assert_eq!(field_path("meta.owner"), "body.`meta`.`owner`");
    }

    #[test]
    fn test_compile_empty_groups() {
        let mut params = Vec::new();
        assert_eq!(compile(&RecordFilter::And(vec![]), &mut params), "true");
        assert_eq!(compile(&RecordFilter::Or(vec![]), &mut params), "false");
        assert!(params.is_empty());
    }
}
