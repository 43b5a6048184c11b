//! SQLite row store backed by rusqlite.
//!
//! SQLite has no row-level locks: a locking [`LockLevel`] is accepted but the
//! caller is expected to hold a `BEGIN IMMEDIATE` transaction when a
//! read-then-write sequence must be atomic.

use std::rc::Rc;

use rusqlite::{Connection, params_from_iter};
use trellis_core::cast::{CastManager, CastPipeline};
use trellis_core::mapper::{Fetch, Mapper, Query};
use trellis_core::resolve::sql::quote;
use trellis_core::{Attributes, CommandUnit, Result, SqlFragment, Value, trellis_trace_execute};
use trellis_types::Backend;

use crate::config::{ConfigError, EntityConfig};

/// One table of a SQLite database.
#[derive(Debug)]
pub struct SqliteMapper {
    conn: Rc<Connection>,
    table: String,
    primary_key: String,
    casts: CastManager,
}

impl SqliteMapper {
    pub fn new(conn: Rc<Connection>, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
            primary_key: "id".to_owned(),
            casts: CastManager::default(),
        }
    }

    /// Builds a mapper from a sql-backend entity declaration.
    pub fn from_config(
        conn: Rc<Connection>,
        config: &EntityConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.expect_backend(Backend::Sql)?;
        Ok(Self::new(conn, config.storage.as_str())
            .with_primary_key(config.primary_key.as_str())
            .with_casts(config.cast_manager()?))
    }

    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    #[must_use]
    pub fn with_casts(mut self, casts: CastManager) -> Self {
        self.casts = casts;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn where_clause(filter: Option<&CommandUnit>) -> Result<Option<&SqlFragment>> {
        filter.map(CommandUnit::sql).transpose()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        trellis_trace_execute!("rusqlite", "execute", sql);
        let affected = self.conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }
}

impl Mapper for SqliteMapper {
    fn backend(&self) -> Backend {
        Backend::Sql
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn casts(&self) -> &dyn CastPipeline {
        &self.casts
    }

    fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    fn fetch(&self, fetch: Fetch<'_>) -> Result<Vec<Attributes>> {
        let filter = Self::where_clause(fetch.filter)?;

        let columns = if fetch.projection.is_empty() {
            "*".to_owned()
        } else {
            fetch
                .projection
                .iter()
                .map(|column| quote(column))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {}", quote(&self.table));
        let mut params = Vec::new();
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.sql);
            params.extend(filter.params.iter().cloned());
        }
        if let Some(limit) = fetch.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        trellis_trace_execute!("rusqlite", "select", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            names
                .iter()
                .enumerate()
                .map(|(index, name)| -> rusqlite::Result<(String, Value)> {
                    Ok((name.clone(), row.get(index)?))
                })
                .collect::<rusqlite::Result<Attributes>>()
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn insert(&self, mut attributes: Attributes) -> Result<Attributes> {
        let sql = if attributes.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(&self.table))
        } else {
            let columns: Vec<String> = attributes.keys().map(|column| quote(column)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(&self.table),
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            )
        };
        let params: Vec<Value> = attributes.values().cloned().collect();
        self.execute(&sql, &params)?;

        if attributes.get(&self.primary_key).is_none_or(Value::is_null) {
            attributes.insert(
                self.primary_key.clone(),
                Value::Integer(self.conn.last_insert_rowid()),
            );
        }
        Ok(attributes)
    }

    fn update(&self, filter: Option<&CommandUnit>, attributes: Attributes) -> Result<u64> {
        let filter = Self::where_clause(filter)?;
        if attributes.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = attributes
            .keys()
            .map(|column| format!("{} = ?", quote(column)))
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            quote(&self.table),
            assignments.join(", ")
        );
        let mut params: Vec<Value> = attributes.into_values().collect();
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.sql);
            params.extend(filter.params.iter().cloned());
        }
        self.execute(&sql, &params)
    }

    fn delete(&self, filter: Option<&CommandUnit>) -> Result<u64> {
        let filter = Self::where_clause(filter)?;
        let mut sql = format!("DELETE FROM {}", quote(&self.table));
        let mut params = Vec::new();
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.sql);
            params.extend(filter.params.iter().cloned());
        }
        self.execute(&sql, &params)
    }
}
