//! JSON API for the opcon admin console.
//!
//! Exposes an axum [`Router`] backed by any
//! [`ScenarioStore`](opcon_core::store::ScenarioStore) +
//! [`ModelIndex`](opcon_core::store::ModelIndex). Auth and transport
//! concerns are the caller's responsibility; the server crate nests this
//! router behind its session gate and injects the authenticated
//! [`Identity`] as a request extension.

pub mod error;
pub mod models;
pub mod scenarios;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use opcon_core::store::{ModelIndex, ScenarioStore};
use opcon_sync::ModelRoot;

pub use error::ApiError;

/// The authenticated operator, inserted as a request extension by the
/// session middleware.
#[derive(Debug, Clone)]
pub struct Identity(pub String);

/// Shared state threaded through all API handlers.
#[derive(Clone)]
pub struct ApiState<S> {
  pub store:       Arc<S>,
  /// Training-output root the synchronizer walks on demand.
  pub models_root: Arc<ModelRoot>,
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: ScenarioStore + ModelIndex + Clone + Send + Sync + 'static,
{
  Router::new()
    // Scenarios
    .route(
      "/scenarios",
      get(scenarios::list::<S>).post(scenarios::create::<S>),
    )
    .route(
      "/scenarios/{id}",
      get(scenarios::get_one::<S>)
        .put(scenarios::update::<S>)
        .delete(scenarios::delete::<S>),
    )
    // Models
    .route("/models", get(models::list::<S>))
    .route("/models/sync", post(models::sync::<S>))
    .route("/models/{id}/rename", post(models::rename::<S>))
    // Training submission is intent-recording only.
    .route("/train", post(models::train::<S>))
    .with_state(state)
}
