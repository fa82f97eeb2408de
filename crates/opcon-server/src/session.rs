//! Cookie-session login gate.
//!
//! Credentials are a single operator username plus an argon2 PHC hash from
//! the server config. A successful login mints an opaque uuid token kept in
//! an in-process map and handed to the browser as an HttpOnly cookie; the
//! [`require_session`] middleware resolves that token back to an
//! [`Identity`] for the API handlers. Sessions do not survive a restart,
//! which is fine for a single-operator admin tool.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  extract::{Request, State},
  http::{HeaderMap, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use opcon_api::Identity;
use opcon_core::store::{ModelIndex, ScenarioStore};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;

pub const SESSION_COOKIE: &str = "opcon_session";

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Constant-shape credential check; any failure is the same failure.
pub fn verify_credentials(
  username: &str,
  password: &str,
  config: &AuthConfig,
) -> bool {
  if username != config.username {
    return false;
  }
  let Ok(parsed_hash) = PasswordHash::new(&config.password_hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .is_ok()
}

// ─── Session map ─────────────────────────────────────────────────────────────

/// In-process token → username map.
#[derive(Clone, Default)]
pub struct SessionMap(Arc<Mutex<HashMap<String, String>>>);

impl SessionMap {
  /// Mint a fresh opaque token for `username`.
  pub fn create(&self, username: &str) -> String {
    let token = Uuid::new_v4().hyphenated().to_string();
    self
      .0
      .lock()
      .expect("session map lock")
      .insert(token.clone(), username.to_string());
    token
  }

  pub fn lookup(&self, token: &str) -> Option<String> {
    self.0.lock().expect("session map lock").get(token).cloned()
  }

  pub fn remove(&self, token: &str) {
    self.0.lock().expect("session map lock").remove(token);
  }
}

/// Pull this server's session token out of a `Cookie` header.
fn session_token(headers: &HeaderMap) -> Option<String> {
  let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
  cookies.split(';').find_map(|pair| {
    let (name, value) = pair.trim().split_once('=')?;
    (name == SESSION_COOKIE).then(|| value.to_string())
  })
}

fn unauthorized() -> Response {
  (
    StatusCode::UNAUTHORIZED,
    Json(json!({ "success": false, "message": "authentication required" })),
  )
    .into_response()
}

// ─── Handlers ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Response
where
  S: ScenarioStore + ModelIndex + Clone + Send + Sync + 'static,
{
  if !verify_credentials(&body.username, &body.password, &state.auth) {
    return (
      StatusCode::UNAUTHORIZED,
      Json(json!({ "success": false, "message": "invalid username or password" })),
    )
      .into_response();
  }

  let token = state.sessions.create(&body.username);
  let cookie = format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax");
  (
    [(header::SET_COOKIE, cookie)],
    Json(json!({ "success": true, "message": "logged in" })),
  )
    .into_response()
}

/// `POST /logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Response
where
  S: ScenarioStore + ModelIndex + Clone + Send + Sync + 'static,
{
  if let Some(token) = session_token(&headers) {
    state.sessions.remove(&token);
  }
  let cookie = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; Max-Age=0");
  (
    [(header::SET_COOKIE, cookie)],
    Json(json!({ "success": true, "message": "logged out" })),
  )
    .into_response()
}

/// Middleware gating the API: resolves the session cookie to an
/// [`Identity`] extension or answers 401.
pub async fn require_session<S>(
  State(state): State<AppState<S>>,
  mut request: Request,
  next: Next,
) -> Response
where
  S: ScenarioStore + ModelIndex + Clone + Send + Sync + 'static,
{
  let Some(token) = session_token(request.headers()) else {
    return unauthorized();
  };
  let Some(username) = state.sessions.lookup(&token) else {
    return unauthorized();
  };

  request.extensions_mut().insert(Identity(username));
  next.run(request).await
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::http::HeaderValue;
  use rand_core::OsRng;

  use super::*;

  fn auth(password: &str) -> AuthConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "admin".into(), password_hash: hash }
  }

  #[test]
  fn credentials_verify_round_trip() {
    let config = auth("80308057");
    assert!(verify_credentials("admin", "80308057", &config));
    assert!(!verify_credentials("admin", "wrong", &config));
    assert!(!verify_credentials("root", "80308057", &config));
  }

  #[test]
  fn malformed_hash_never_verifies() {
    let config = AuthConfig {
      username:      "admin".into(),
      password_hash: "not-a-phc-string".into(),
    };
    assert!(!verify_credentials("admin", "anything", &config));
  }

  #[test]
  fn session_map_lifecycle() {
    let sessions = SessionMap::default();
    let token = sessions.create("admin");
    assert_eq!(sessions.lookup(&token).as_deref(), Some("admin"));
    sessions.remove(&token);
    assert_eq!(sessions.lookup(&token), None);
  }

  #[test]
  fn cookie_parsing_finds_our_token() {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::COOKIE,
      HeaderValue::from_static("theme=dark; opcon_session=abc-123; other=1"),
    );
    assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));

    headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
    assert_eq!(session_token(&headers), None);
  }
}
