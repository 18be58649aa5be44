//! Database collaborator contract and an in-memory adapter
//!
//! The interpreter never talks SQL itself. `connect` statements hand their
//! spec to a [`DbAdapter`]; cursors and inline selects go through the
//! returned [`DbConnection`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::interp::{MapData, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DbError {
    #[error("No database adapter configured for database operations")]
    NoAdapter,

    #[error("Unsupported SQL: {0}")]
    UnsupportedSql(String),

    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Missing parameter {0}")]
    MissingParameter(String),

    #[error("{0}")]
    Closed(String),
}

pub trait DbAdapter: Send {
    fn connect(&self, spec: &Value) -> Result<Box<dyn DbConnection>, DbError>;
}

pub trait DbConnection: Send {
    fn open_cursor(
        &mut self,
        sql: &str,
        named: &[(String, Value)],
        positional: &[Value],
    ) -> Result<Box<dyn DbCursor>, DbError>;

    /// Run a query and collect every row
    fn execute_select(
        &mut self,
        sql: &str,
        named: &[(String, Value)],
        positional: &[Value],
    ) -> Result<Vec<MapData>, DbError> {
        let mut cursor = self.open_cursor(sql, named, positional)?;
        let mut rows = Vec::new();
        while cursor.has_next()? {
            rows.push(cursor.next()?);
        }
        cursor.close()?;
        Ok(rows)
    }

    fn close(&mut self) -> Result<(), DbError>;
}

pub trait DbCursor: Send {
    fn has_next(&mut self) -> Result<bool, DbError>;
    fn next(&mut self) -> Result<MapData, DbError>;
    fn close(&mut self) -> Result<(), DbError>;
}

/// Adapter used when the host configured none
pub struct NoDbAdapter;

impl DbAdapter for NoDbAdapter {
    fn connect(&self, _spec: &Value) -> Result<Box<dyn DbConnection>, DbError> {
        Err(DbError::NoAdapter)
    }
}

type Tables = Arc<RwLock<HashMap<String, Vec<MapData>>>>;

/// Tables held in memory; understands `select * from t [where col = ?|:name]`
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Tables,
}

impl MemoryDb {
    pub fn new() -> Self {
        MemoryDb::default()
    }

    pub fn insert_table(&self, name: &str, rows: Vec<MapData>) {
        self.tables.write().insert(name.to_ascii_lowercase(), rows);
    }

    /// Load tables from a JSON object of `{"table": [{...}, ...]}`
    pub fn from_json(json: &serde_json::Value) -> Result<Self, DbError> {
        let db = MemoryDb::new();
        let Some(obj) = json.as_object() else {
            return Err(DbError::UnsupportedSql(
                "table file must be a JSON object".to_string(),
            ));
        };
        for (name, rows) in obj {
            let rows = rows
                .as_array()
                .map(|rows| {
                    rows.iter()
                        .filter_map(|row| match Value::from_json(row) {
                            Value::Map(m) => {
                                let row = m.read().clone();
                                Some(row)
                            }
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default();
            db.insert_table(name, rows);
        }
        Ok(db)
    }
}

impl DbAdapter for MemoryDb {
    fn connect(&self, _spec: &Value) -> Result<Box<dyn DbConnection>, DbError> {
        Ok(Box::new(MemoryConnection {
            tables: Arc::clone(&self.tables),
            open: true,
        }))
    }
}

struct MemoryConnection {
    tables: Tables,
    open: bool,
}

/// Parsed form of the supported select
struct Query {
    table: String,
    filter: Option<(String, Param)>,
}

enum Param {
    Positional,
    Named(String),
}

fn parse_select(sql: &str) -> Result<Query, DbError> {
    let words: Vec<&str> = sql.split_whitespace().collect();
    let lower: Vec<String> = words.iter().map(|w| w.to_ascii_lowercase()).collect();
    let unsupported = || DbError::UnsupportedSql(sql.to_string());
    if lower.len() < 4 || lower[0] != "select" || lower[1] != "*" || lower[2] != "from" {
        return Err(unsupported());
    }
    let table = lower[3].trim_end_matches(';').to_string();
    let filter = match lower.get(4).map(String::as_str) {
        None => None,
        Some("where") => {
            let (col, eq, param) = match (words.get(5), words.get(6), words.get(7)) {
                (Some(c), Some(e), Some(p)) => (*c, *e, p.trim_end_matches(';')),
                _ => return Err(unsupported()),
            };
            if eq != "=" {
                return Err(unsupported());
            }
            let param = if param == "?" {
                Param::Positional
            } else if let Some(name) = param.strip_prefix(':') {
                Param::Named(name.to_ascii_lowercase())
            } else {
                return Err(unsupported());
            };
            Some((col.to_string(), param))
        }
        Some(_) => return Err(unsupported()),
    };
    Ok(Query { table, filter })
}

impl DbConnection for MemoryConnection {
    fn open_cursor(
        &mut self,
        sql: &str,
        named: &[(String, Value)],
        positional: &[Value],
    ) -> Result<Box<dyn DbCursor>, DbError> {
        if !self.open {
            return Err(DbError::Closed("Connection is closed".to_string()));
        }
        let query = parse_select(sql)?;
        let tables = self.tables.read();
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| DbError::UnknownTable(query.table.clone()))?;
        let rows = match &query.filter {
            None => rows.clone(),
            Some((col, param)) => {
                let wanted = match param {
                    Param::Positional => positional
                        .first()
                        .cloned()
                        .ok_or_else(|| DbError::MissingParameter("?".to_string()))?,
                    Param::Named(name) => named
                        .iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case(name))
                        .map(|(_, v)| v.clone())
                        .ok_or_else(|| DbError::MissingParameter(format!(":{name}")))?,
                };
                rows.iter()
                    .filter(|row| row.get_ci(col) == Some(&wanted))
                    .cloned()
                    .collect()
            }
        };
        Ok(Box::new(MemoryCursor {
            rows: rows.into_iter(),
            peeked: None,
            open: true,
        }))
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.open = false;
        Ok(())
    }
}

struct MemoryCursor {
    rows: std::vec::IntoIter<MapData>,
    peeked: Option<MapData>,
    open: bool,
}

impl DbCursor for MemoryCursor {
    fn has_next(&mut self) -> Result<bool, DbError> {
        if !self.open {
            return Err(DbError::Closed("Cursor is closed".to_string()));
        }
        if self.peeked.is_none() {
            self.peeked = self.rows.next();
        }
        Ok(self.peeked.is_some())
    }

    fn next(&mut self) -> Result<MapData, DbError> {
        if !self.has_next()? {
            return Err(DbError::Closed("No more rows".to_string()));
        }
        self.peeked
            .take()
            .ok_or_else(|| DbError::Closed("No more rows".to_string()))
    }

    fn close(&mut self) -> Result<(), DbError> {
        self.open = false;
        Ok(())
    }
}
