//! HTTP server assembly for the opcon admin console.
//!
//! Owns configuration, the session gate and router wiring; the JSON
//! endpoints themselves live in `opcon-api`.

pub mod session;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::post};
use opcon_api::ApiState;
use opcon_core::store::{ModelIndex, ScenarioStore};
use opcon_sync::ModelRoot;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use session::{AuthConfig, SessionMap};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` (with
/// `OPCON_*` environment overrides).
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  /// SQLite database file.
  pub store_path:         PathBuf,
  /// Root of the training-output tree the synchronizer walks.
  pub models_root:        PathBuf,
  pub auth_username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub auth_password_hash: String,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:       Arc<S>,
  pub models_root: Arc<ModelRoot>,
  pub auth:        Arc<AuthConfig>,
  pub sessions:    SessionMap,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: login/logout plus the JSON API nested
/// behind the session gate.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ScenarioStore + ModelIndex + Clone + Send + Sync + 'static,
{
  let api = opcon_api::api_router(ApiState {
    store:       state.store.clone(),
    models_root: state.models_root.clone(),
  })
  .layer(middleware::from_fn_with_state(
    state.clone(),
    session::require_session::<S>,
  ));

  let auth = Router::new()
    .route("/login", post(session::login::<S>))
    .route("/logout", post(session::logout::<S>))
    .with_state(state);

  Router::new()
    .merge(auth)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}
