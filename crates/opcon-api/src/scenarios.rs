//! Handlers for `/scenarios` endpoints.
//!
//! | Method   | Path              | Notes                               |
//! |----------|-------------------|-------------------------------------|
//! | `GET`    | `/scenarios`      | Active scenarios, newest first      |
//! | `POST`   | `/scenarios`      | Body: see [`ScenarioBody`]          |
//! | `GET`    | `/scenarios/:id`  | Full detail; 404 if deleted/missing |
//! | `PUT`    | `/scenarios/:id`  | Overwrites all derived fields       |
//! | `DELETE` | `/scenarios/:id`  | Soft delete                         |

use axum::{
  Extension, Json,
  extract::{Path, State},
};
use opcon_core::{
  drone::Drone,
  enemy::decode_enemy_input,
  store::{ModelIndex, NewScenario, ScenarioStore},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ApiState, Identity, error::ApiError};

// ─── Request body ────────────────────────────────────────────────────────────

/// Raw create/update body. Drone and enemy entries arrive as loose JSON and
/// go through the explicit normalization step below — the one place client
/// shapes are trusted into domain types.
#[derive(Debug, Deserialize)]
pub struct ScenarioBody {
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub drones:      Vec<Value>,
  #[serde(default)]
  pub enemy_units: Vec<Value>,
}

fn decode_body(body: ScenarioBody, created_by: String) -> Result<NewScenario, ApiError> {
  let name = body.name.trim().to_string();
  if name.is_empty() {
    return Err(
      opcon_core::Error::MalformedInput("scenario name is required".into()).into(),
    );
  }

  let drones: Vec<Drone> = body
    .drones
    .iter()
    .enumerate()
    .map(|(index, raw)| Drone::normalize(raw, index as u32 + 1))
    .collect();

  Ok(NewScenario {
    name,
    description: body.description,
    created_by,
    drones,
    enemies: decode_enemy_input(&body.enemy_units),
  })
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /scenarios`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  let scenarios = state.store.list_active().await?;
  Ok(Json(json!({ "success": true, "scenarios": scenarios })))
}

/// `POST /scenarios`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<ScenarioBody>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  let input = decode_body(body, identity.0)?;
  let scenario = state.store.create_scenario(input).await?;
  Ok(Json(json!({ "success": true, "scenario": scenario })))
}

/// `GET /scenarios/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  let scenario = state.store.get_detail(id).await?;
  Ok(Json(json!({ "success": true, "scenario": scenario })))
}

/// `PUT /scenarios/:id`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Extension(identity): Extension<Identity>,
  Json(body): Json<ScenarioBody>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  let input = decode_body(body, identity.0)?;
  let scenario = state.store.update_scenario(id, input).await?;
  Ok(Json(json!({ "success": true, "scenario": scenario })))
}

/// `DELETE /scenarios/:id`
pub async fn delete<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: ScenarioStore + ModelIndex,
{
  state.store.soft_delete_scenario(id).await?;
  Ok(Json(json!({ "success": true, "message": "scenario deleted" })))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn body(name: &str) -> ScenarioBody {
    ScenarioBody {
      name:        name.into(),
      description: String::new(),
      drones:      vec![json!({"code": "UAV-1", "lat": 30.1, "lng": 118.2})],
      enemy_units: vec![
        json!({"type": "tank", "code": "T-1", "lat": 31.0, "lng": 117.0}),
        json!({"type": "frigate", "code": "F-1", "lat": 31.0, "lng": 117.0}),
      ],
    }
  }

  #[test]
  fn decode_body_normalizes_and_drops_unknown_enemies() {
    let input = decode_body(body("alpha"), "admin".into()).unwrap();
    assert_eq!(input.created_by, "admin");
    assert_eq!(input.drones.len(), 1);
    assert_eq!(input.drones[0].id, 1);
    assert_eq!(input.drones[0].altitude, 100);
    // The frigate has no category and is silently dropped.
    assert_eq!(input.enemies.len(), 1);
  }

  #[test]
  fn decode_body_rejects_blank_name() {
    let result = decode_body(body("   "), "admin".into());
    assert!(matches!(
      result,
      Err(ApiError(opcon_core::Error::MalformedInput(_)))
    ));
  }
}
