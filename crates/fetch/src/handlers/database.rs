//! Database retrieval
//!
//! SQLite is driven directly through rusqlite. Other DSN engines are served
//! by handlers registered under the engine name.

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use tracing::debug;

use super::SourceHandler;
use crate::buffer::BoundedBuffer;
use crate::error::{FetchError, Result};
use crate::request::{FetchRequest, Transfer};
use crate::scheme::Scheme;

const SQLITE: &str = "sqlite";
const SQLITE_PREFIX: &str = "sqlite://";

#[derive(Debug, Default)]
pub struct DatabaseHandler;

impl DatabaseHandler {
    pub fn new() -> Self {
        Self
    }

    /// Whether an engine is served without registration
    pub fn supports(engine: &str) -> bool {
        engine.eq_ignore_ascii_case(SQLITE)
    }
}

fn sqlite_path(source: &str) -> Result<String> {
    let trimmed = source.trim();
    let path = trimmed
        .get(..SQLITE_PREFIX.len())
        .filter(|p| p.eq_ignore_ascii_case(SQLITE_PREFIX))
        .map(|_| &trimmed[SQLITE_PREFIX.len()..])
        .ok_or_else(|| FetchError::invalid_source(source, "not a sqlite DSN"))?;
    if path.is_empty() {
        return Err(FetchError::invalid_source(source, "missing database path"));
    }
    Ok(path.to_string())
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

fn query_error(err: rusqlite::Error) -> FetchError {
    FetchError::QueryExecution(err.to_string())
}

/// Run `query` read-only against the SQLite file at `path`
///
/// Rows come back as a JSON array of objects keyed by column name.
fn run_query(path: &str, query: &str, limit: usize) -> Result<Vec<u8>> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_NO_MUTEX
        | OpenFlags::SQLITE_OPEN_URI;
    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| FetchError::Connection(format!("{}: {}", path, e)))?;

    let mut stmt = conn.prepare(query).map_err(query_error)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([]).map_err(query_error)?;
    let mut out = Vec::new();
    let mut size = 2usize;
    while let Some(row) = rows.next().map_err(query_error)? {
        let mut object = Map::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            let value = row.get_ref(idx).map_err(query_error)?;
            object.insert(name.clone(), to_json(value));
        }
        let object = Value::Object(object);
        size += object.to_string().len() + 1;
        if size > limit {
            return Err(FetchError::SizeExceeded { limit });
        }
        out.push(object);
    }

    serde_json::to_vec(&Value::Array(out)).map_err(|e| FetchError::Protocol(e.to_string()))
}

#[async_trait]
impl SourceHandler for DatabaseHandler {
    async fn fetch(&self, request: &FetchRequest, sink: &mut BoundedBuffer) -> Result<Transfer> {
        match &request.scheme {
            Scheme::Database { engine } if Self::supports(engine) => {}
            Scheme::Database { engine } => {
                return Err(FetchError::UnsupportedScheme(format!(
                    "no driver registered for '{}'",
                    engine
                )))
            }
            other => {
                return Err(FetchError::UnsupportedScheme(format!(
                    "'{}' is not a database source",
                    other
                )))
            }
        }

        let query = request
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(FetchError::MissingQuery)?
            .to_string();
        let path = sqlite_path(&request.source)?;
        debug!("◆ QUERY {} ON {}", query, path);

        let limit = sink.remaining();
        let data = tokio::task::spawn_blocking(move || run_query(&path, &query, limit))
            .await
            .map_err(|e| FetchError::Protocol(format!("query worker failed: {}", e)))??;

        sink.push(&data)?;
        Ok(Transfer::typed("application/json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_path() {
        assert_eq!(sqlite_path("sqlite:///tmp/app.db").unwrap(), "/tmp/app.db");
        assert_eq!(sqlite_path("SQLite://rel.db").unwrap(), "rel.db");
        assert!(sqlite_path("sqlite://").is_err());
        assert!(sqlite_path("mysql://host/db").is_err());
    }

    #[test]
    fn test_to_json_values() {
        assert_eq!(to_json(ValueRef::Null), Value::Null);
        assert_eq!(to_json(ValueRef::Integer(7)), Value::from(7));
        assert_eq!(to_json(ValueRef::Text(b"boom")), Value::from("boom"));
        assert_eq!(to_json(ValueRef::Blob(&[1, 2, 3])), Value::from("<3 bytes>"));
    }

    #[test]
    fn test_supports() {
        assert!(DatabaseHandler::supports("sqlite"));
        assert!(!DatabaseHandler::supports("postgres"));
    }
}
