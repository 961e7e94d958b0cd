use std::sync::LazyLock;

use futures::Stream;
use futures::stream;
use regex::Regex;
use tracing::{info, warn};

use crate::backend::{AuthUser, Backend, Query, SharedBackend, fetch_single};
use crate::error::{BackendError, Result};
use crate::model::Profile;

pub const INVALID_CREDENTIALS: &str = "Email ou senha inválidos. Por favor, tente novamente.";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
        .expect("email regex must compile")
});

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: AuthUser,
    pub profile: Profile,
}

impl Session {
    pub fn greeting_name(&self) -> &str {
        match self.profile.display_name() {
            "" => self.user.email.as_deref().unwrap_or(""),
            name => name,
        }
    }
}

pub fn validate_credentials(email: &str, password: &str) -> std::result::Result<(), &'static str> {
    if email.trim().is_empty() || password.is_empty() {
        return Err("Por favor, preencha o email e a senha.");
    }
    if !EMAIL_RE.is_match(email.trim()) {
        return Err("Informe um endereço de email válido.");
    }
    Ok(())
}

pub async fn load_profile(backend: &dyn Backend, user_id: &str) -> Result<Profile> {
    let query = Query::table("profiles")
        .select(&["id", "full_name", "role"])
        .eq("id", user_id);
    fetch_single(backend, &query).await
}

pub async fn sign_in(backend: SharedBackend, email: String, password: String) -> Result<Session> {
    let user = backend.sign_in(email.trim(), &password).await?;
    info!("Signed in as {}", user.id);
    let profile = load_profile(backend.as_ref(), &user.id).await?;
    Ok(Session { user, profile })
}

pub async fn restore(backend: SharedBackend) -> Result<Option<Session>> {
    let Some(user) = backend.restore_session().await? else {
        return Ok(None);
    };
    let profile = load_profile(backend.as_ref(), &user.id).await?;
    info!("Restored session for {}", user.id);
    Ok(Some(Session { user, profile }))
}

pub async fn from_user(backend: SharedBackend, user: AuthUser) -> Result<Session> {
    let profile = load_profile(backend.as_ref(), &user.id).await?;
    Ok(Session { user, profile })
}

pub async fn sign_out(backend: SharedBackend) -> Result<()> {
    backend.sign_out().await.inspect_err(|e| warn!("Sign-out failed: {}", e))
}

pub fn auth_events(backend: &dyn Backend) -> impl Stream<Item = Option<AuthUser>> + use<> {
    stream::unfold(backend.auth_events(), |mut rx| async move {
        rx.changed().await.ok()?;
        let user = rx.borrow_and_update().clone();
        Some((user, rx))
    })
}

/// Message shown for a failed sign-in. Credential errors get one static
/// text; anything else is surfaced as-is.
pub fn sign_in_error(err: &BackendError) -> String {
    match err {
        BackendError::Auth(_) | BackendError::Status { status: 400, .. } => {
            INVALID_CREDENTIALS.to_string()
        }
        other => other.to_string(),
    }
}
