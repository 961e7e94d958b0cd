pub mod supabase;

#[cfg(test)]
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{BackendError, Result};

pub use supabase::SupabaseClient;

pub type SharedBackend = Arc<dyn Backend>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    In(String, Vec<String>),
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Filter::Eq(column.to_string(), value.to_string())
    }

    pub fn is_in<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Filter::In(
            column.to_string(),
            values.into_iter().map(|v| v.to_string()).collect(),
        )
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }
}

/// A related table pulled in through a foreign key on the queried table.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub table: String,
    pub foreign_key: String,
    pub columns: Vec<String>,
    /// Drop parent rows that have no related row.
    pub inner: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Vec<String>,
    pub embeds: Vec<Embed>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Query {
            table: table.to_string(),
            columns: Vec::new(),
            embeds: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn embed_inner(mut self, table: &str, foreign_key: &str, columns: &[&str]) -> Self {
        self.embeds.push(Embed {
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            inner: true,
        });
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn is_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.filters.push(Filter::is_in(column, values));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;

    async fn restore_session(&self) -> Result<Option<AuthUser>>;

    async fn sign_out(&self) -> Result<()>;

    fn auth_events(&self) -> watch::Receiver<Option<AuthUser>>;

    async fn select(&self, query: &Query) -> Result<Vec<Value>>;

    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>>;

    async fn update(&self, table: &str, patch: Value, filters: &[Filter]) -> Result<Vec<Value>>;

    /// Insert-or-update on the unique key formed by `on_conflict`.
    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> Result<Vec<Value>>;

    async fn rpc(&self, function: &str, args: Value) -> Result<Value>;
}

pub async fn fetch<T: DeserializeOwned>(backend: &dyn Backend, query: &Query) -> Result<Vec<T>> {
    let rows = backend.select(query).await?;
    serde_json::from_value(Value::Array(rows))
        .map_err(|e| BackendError::decode(format!("rows of {}", query.table), e))
}

pub async fn fetch_single<T: DeserializeOwned>(backend: &dyn Backend, query: &Query) -> Result<T> {
    let mut rows = backend.select(query).await?;
    if rows.len() != 1 {
        return Err(BackendError::NotSingle {
            table: query.table.clone(),
            count: rows.len(),
        });
    }
    let row = rows.remove(0);
    serde_json::from_value(row).map_err(|e| BackendError::decode(format!("row of {}", query.table), e))
}

/// Calls a procedure returning a set of rows. `null` reads as no rows.
pub async fn call<T: DeserializeOwned>(backend: &dyn Backend, function: &str) -> Result<Vec<T>> {
    match backend.rpc(function, Value::Object(Default::default())).await? {
        Value::Null => Ok(Vec::new()),
        value => serde_json::from_value(value)
            .map_err(|e| BackendError::decode(format!("result of {}", function), e)),
    }
}

/// Calls a procedure expected to yield exactly one row, either bare or as a
/// one-element array.
pub async fn call_single<T: DeserializeOwned>(backend: &dyn Backend, function: &str) -> Result<T> {
    let value = match backend.rpc(function, Value::Object(Default::default())).await? {
        Value::Array(mut rows) => {
            if rows.len() != 1 {
                return Err(BackendError::NotSingle {
                    table: function.to_string(),
                    count: rows.len(),
                });
            }
            rows.remove(0)
        }
        value => value,
    };
    serde_json::from_value(value).map_err(|e| BackendError::decode(format!("result of {}", function), e))
}

pub fn first_row<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Result<T> {
    let count = rows.len();
    let row = rows.into_iter().next().ok_or(BackendError::NotSingle {
        table: table.to_string(),
        count,
    })?;
    serde_json::from_value(row).map_err(|e| BackendError::decode(format!("written row of {}", table), e))
}
