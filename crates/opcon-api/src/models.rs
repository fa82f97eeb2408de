//! Handlers for `/models` endpoints and the training-submission stub.

use axum::{
  Extension, Json,
  extract::{Path, State},
};
use opcon_core::store::{ModelIndex, ScenarioStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{ApiState, Identity, error::ApiError};

/// `GET /models`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  let models = state.store.list_models().await?;
  Ok(Json(json!({ "success": true, "models": models })))
}

/// `POST /models/sync` — repair stored paths, then walk the training root
/// and upsert every discovered run.
pub async fn sync<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  let report = opcon_sync::synchronize(&state.models_root, state.store.as_ref()).await?;
  Ok(Json(json!({
    "success": true,
    "discovered": report.discovered,
    "removed_duplicates": report.removed_duplicates,
  })))
}

// ─── Rename ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RenameBody {
  pub name: String,
}

/// `POST /models/:id/rename`
pub async fn rename<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<RenameBody>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  let name = body.name.trim().to_string();
  if name.is_empty() {
    return Err(
      opcon_core::Error::MalformedInput("model name is required".into()).into(),
    );
  }

  let name = state.store.rename_model(id, name).await?;
  Ok(Json(json!({
    "success": true,
    "message": "model renamed",
    "name": name,
  })))
}

// ─── Training stub ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TrainBody {
  #[serde(default)]
  pub scenario_id: Option<i64>,
  #[serde(default)]
  pub category:    Option<String>,
}

/// `POST /train` — training runs are launched out of band; this only
/// records that the operator asked.
pub async fn train<S>(
  Extension(identity): Extension<Identity>,
  Json(body): Json<TrainBody>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  info!(
    operator = %identity.0,
    scenario_id = ?body.scenario_id,
    category = ?body.category,
    "training request recorded"
  );
  Ok(Json(json!({
    "success": true,
    "message": "training request recorded",
  })))
}
