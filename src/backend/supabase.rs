use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{AuthUser, Backend, Filter, Query};
use crate::config::BackendSettings;
use crate::error::{BackendError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
    user: AuthUser,
}

pub struct SupabaseClient {
    client: Client,
    base_url: Url,
    anon_key: String,
    session: RwLock<Option<StoredSession>>,
    session_file: Option<PathBuf>,
    events: watch::Sender<Option<AuthUser>>,
}

impl SupabaseClient {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("Portal-Escolar/1.0")
            .build()
            .map_err(|e| BackendError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;
        let (events, _) = watch::channel(None);

        Ok(Self {
            client,
            base_url: settings.url.clone(),
            anon_key: settings.anon_key.clone(),
            session: RwLock::new(None),
            session_file: settings.session_file.clone(),
            events,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| BackendError::Network {
            message: format!("Invalid endpoint {}: {}", path, e),
            source: None,
        })
    }

    fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = self.authorize(request).send().await.map_err(|e| BackendError::Network {
            message: format!("{} failed: {}", what, e),
            source: Some(e),
        })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = remote_message(&body).unwrap_or_else(|| status.to_string());
            warn!("{} returned {}: {}", what, status, message);
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!("{} -> {}", what, status);
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| BackendError::decode(what.to_string(), e))
    }

    async fn rows(&self, request: RequestBuilder, what: &str) -> Result<Vec<Value>> {
        match self.send(request, what).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row => Ok(vec![row]),
        }
    }

    async fn token(&self, grant_type: &str, body: Value) -> Result<StoredSession> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let err = token_error(status.as_u16(), &text);
            warn!("{} grant returned {}: {}", grant_type, status, err);
            return Err(err);
        }
        serde_json::from_str(&text).map_err(|e| BackendError::decode("token response", e))
    }

    fn set_session(&self, session: Option<StoredSession>) {
        let user = session.as_ref().map(|s| s.user.clone());
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
        self.events.send_replace(user);
    }

    async fn persist(&self, session: Option<&StoredSession>) {
        let Some(path) = &self.session_file else {
            return;
        };
        let result = match session {
            Some(session) => match serde_json::to_vec_pretty(session) {
                Ok(bytes) => tokio::fs::write(path, bytes).await,
                Err(e) => {
                    warn!("Could not serialize session: {}", e);
                    return;
                }
            },
            None => match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            warn!("Could not update session file {:?}: {}", path, e);
        }
    }

    async fn stored_session(&self) -> Option<StoredSession> {
        let path = self.session_file.as_ref()?;
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read session file {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Discarding unreadable session file {:?}: {}", path, e);
                self.persist(None).await;
                None
            }
        }
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let session = self
            .token("password", json!({ "email": email, "password": password }))
            .await?;
        info!("Signed in as {}", session.user.id);
        let user = session.user.clone();
        self.persist(Some(&session)).await;
        self.set_session(Some(session));
        Ok(user)
    }

    async fn restore_session(&self) -> Result<Option<AuthUser>> {
        let Some(stored) = self.stored_session().await else {
            return Ok(None);
        };

        match self
            .token("refresh_token", json!({ "refresh_token": stored.refresh_token }))
            .await
        {
            Ok(session) => {
                info!("Restored session for {}", session.user.id);
                let user = session.user.clone();
                self.persist(Some(&session)).await;
                self.set_session(Some(session));
                Ok(Some(user))
            }
            Err(BackendError::Auth(message)) => {
                warn!("Stored session rejected: {}", message);
                self.persist(None).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        let remote = match self.access_token() {
            Some(_) => match self.endpoint("auth/v1/logout") {
                Ok(url) => self.send(self.client.post(url), "sign out").await.map(drop),
                Err(e) => Err(e),
            },
            None => Ok(()),
        };
        self.persist(None).await;
        self.set_session(None);
        match &remote {
            Ok(()) => info!("Signed out"),
            Err(e) => warn!("Remote sign out failed, local session cleared: {}", e),
        }
        remote
    }

    fn auth_events(&self) -> watch::Receiver<Option<AuthUser>> {
        self.events.subscribe()
    }

    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let url = self.endpoint(&format!("rest/v1/{}", query.table))?;
        let request = self.client.get(url).query(&query_params(query));
        self.rows(request, &format!("select {}", query.table)).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>> {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        let request = self
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(&row);
        self.rows(request, &format!("insert {}", table)).await
    }

    async fn update(&self, table: &str, patch: Value, filters: &[Filter]) -> Result<Vec<Value>> {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        let params: Vec<(String, String)> = filters.iter().map(filter_param).collect();
        let request = self
            .client
            .patch(url)
            .query(&params)
            .header("Prefer", "return=representation")
            .json(&patch);
        self.rows(request, &format!("update {}", table)).await
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> Result<Vec<Value>> {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        let request = self
            .client
            .post(url)
            .query(&[("on_conflict", on_conflict.join(","))])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row);
        self.rows(request, &format!("upsert {}", table)).await
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value> {
        let url = self.endpoint(&format!("rest/v1/rpc/{}", function))?;
        let request = self.client.post(url).json(&args);
        self.send(request, &format!("rpc {}", function)).await
    }
}

pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut select: Vec<String> = if query.columns.is_empty() {
        vec!["*".to_string()]
    } else {
        query.columns.clone()
    };
    for embed in &query.embeds {
        let inner = if embed.inner { "!inner" } else { "" };
        select.push(format!(
            "{}!{}{}({})",
            embed.table,
            embed.foreign_key,
            inner,
            embed.columns.join(",")
        ));
    }

    let mut params = vec![("select".to_string(), select.join(","))];
    params.extend(query.filters.iter().map(filter_param));
    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    params
}

fn filter_param(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq(column, value) => (column.clone(), format!("eq.{}", value)),
        Filter::In(column, values) => {
            let list = values.iter().map(|v| quote_list_value(v)).collect::<Vec<_>>();
            (column.clone(), format!("in.({})", list.join(",")))
        }
    }
}

/// Values inside `in.(...)` must be quoted when they contain reserved characters.
fn quote_list_value(value: &str) -> String {
    if value.chars().any(|c| matches!(c, ',' | '(' | ')' | '"' | ':' | '.' | ' ')) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Rejected credentials or refresh tokens come back as 400 or 401; anything
/// else is a server or transport problem and must not end the session.
fn token_error(status: u16, body: &str) -> BackendError {
    let message = remote_message(body).unwrap_or_else(|| status.to_string());
    match status {
        400 | 401 => BackendError::Auth(message),
        _ => BackendError::Status { status, message },
    }
}

pub fn remote_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
