//! In-process backend used by the tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::{AuthUser, Backend, Filter, Query};
use crate::error::{BackendError, Result};

pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    procedures: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    accounts: Vec<(String, String, AuthUser)>,
    user: Mutex<Option<AuthUser>>,
    events: watch::Sender<Option<AuthUser>>,
    next_id: Mutex<u64>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = watch::channel(None);
        Self {
            tables: Mutex::new(HashMap::new()),
            procedures: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            accounts: Vec::new(),
            user: Mutex::new(None),
            events,
            next_id: Mutex::new(1000),
        }
    }

    pub fn with_table(self, table: &str, rows: Value) -> Self {
        let rows = match rows {
            Value::Array(rows) => rows,
            row => vec![row],
        };
        self.tables.lock().unwrap().insert(table.to_string(), rows);
        self
    }

    pub fn with_rpc(self, function: &str, result: Value) -> Self {
        self.procedures
            .lock()
            .unwrap()
            .insert(function.to_string(), result);
        self
    }

    pub fn with_account(mut self, email: &str, password: &str, user_id: &str) -> Self {
        self.accounts.push((
            email.to_string(),
            password.to_string(),
            AuthUser {
                id: user_id.to_string(),
                email: Some(email.to_string()),
            },
        ));
        self
    }

    /// Makes `operation` fail, e.g. `"upsert:frequencias"` or `"rpc:get_admin_stats"`.
    pub fn fail(&self, operation: &str) {
        self.failing.lock().unwrap().insert(operation.to_string());
    }

    pub fn recover(&self, operation: &str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn enter(&self, operation: String) -> Result<()> {
        self.calls.lock().unwrap().push(operation.clone());
        if self.failing.lock().unwrap().contains(&operation) {
            return Err(BackendError::Status {
                status: 500,
                message: format!("{} failed", operation),
            });
        }
        Ok(())
    }

    fn allocate_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        next.to_string()
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let field = row.get(filter.column()).map(text);
    match filter {
        Filter::Eq(_, expected) => field.as_deref() == Some(expected.as_str()),
        Filter::In(_, values) => field.is_some_and(|f| values.contains(&f)),
    }
}

fn project(row: &Value, columns: &[String]) -> Value {
    if columns.is_empty() || columns.iter().any(|c| c == "*") {
        return row.clone();
    }
    let mut out = Map::new();
    for column in columns {
        if let Some(value) = row.get(column) {
            out.insert(column.clone(), value.clone());
        }
    }
    Value::Object(out)
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.enter("auth:sign_in".to_string())?;
        let user = self
            .accounts
            .iter()
            .find(|(e, p, _)| e == email && p == password)
            .map(|(_, _, user)| user.clone())
            .ok_or_else(|| BackendError::Auth("Invalid login credentials".to_string()))?;
        *self.user.lock().unwrap() = Some(user.clone());
        self.events.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn restore_session(&self) -> Result<Option<AuthUser>> {
        self.enter("auth:restore".to_string())?;
        Ok(self.user.lock().unwrap().clone())
    }

    async fn sign_out(&self) -> Result<()> {
        let remote = self.enter("auth:sign_out".to_string());
        *self.user.lock().unwrap() = None;
        self.events.send_replace(None);
        remote
    }

    fn auth_events(&self) -> watch::Receiver<Option<AuthUser>> {
        self.events.subscribe()
    }

    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.enter(format!("select:{}", query.table))?;
        let tables = self.tables.lock().unwrap();
        let rows = tables.get(&query.table).cloned().unwrap_or_default();

        let mut out = Vec::new();
        'rows: for row in rows {
            if !query.filters.iter().all(|f| matches(&row, f)) {
                continue;
            }
            let mut projected = project(&row, &query.columns);
            for embed in &query.embeds {
                let key = row.get(&embed.foreign_key).map(text);
                let related = tables.get(&embed.table).and_then(|rel| {
                    rel.iter()
                        .find(|r| r.get("id").map(text) == key)
                        .map(|r| project(r, &embed.columns))
                });
                let related = match related {
                    Some(related) => related,
                    None if embed.inner => continue 'rows,
                    None => Value::Null,
                };
                if let Value::Object(fields) = &mut projected {
                    fields.insert(embed.table.clone(), related);
                }
            }
            out.push(projected);
        }

        for order in query.order.iter().rev() {
            out.sort_by(|a, b| {
                let a = a.get(&order.column).map(text).unwrap_or_default();
                let b = b.get(&order.column).map(text).unwrap_or_default();
                if order.ascending { a.cmp(&b) } else { b.cmp(&a) }
            });
        }
        Ok(out)
    }

    async fn insert(&self, table: &str, mut row: Value) -> Result<Vec<Value>> {
        self.enter(format!("insert:{}", table))?;
        if let Value::Object(fields) = &mut row {
            if !fields.contains_key("id") {
                fields.insert("id".to_string(), Value::String(self.allocate_id()));
            }
        }
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(vec![row])
    }

    async fn update(&self, table: &str, patch: Value, filters: &[Filter]) -> Result<Vec<Value>> {
        self.enter(format!("update:{}", table))?;
        let mut tables = self.tables.lock().unwrap();
        let mut updated = Vec::new();
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if filters.iter().all(|f| matches(row, f)) {
                merge(row, &patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> Result<Vec<Value>> {
        self.enter(format!("upsert:{}", table))?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let same_key = |existing: &Value| {
            on_conflict
                .iter()
                .all(|column| existing.get(*column).map(text) == row.get(*column).map(text))
        };
        match rows.iter_mut().find(|existing| same_key(existing)) {
            Some(existing) => {
                merge(existing, &row);
                Ok(vec![existing.clone()])
            }
            None => {
                rows.push(row.clone());
                Ok(vec![row])
            }
        }
    }

    async fn rpc(&self, function: &str, _args: Value) -> Result<Value> {
        self.enter(format!("rpc:{}", function))?;
        Ok(self
            .procedures
            .lock()
            .unwrap()
            .get(function)
            .cloned()
            .unwrap_or(Value::Null))
    }
}
