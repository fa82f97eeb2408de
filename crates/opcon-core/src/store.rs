//! The `ScenarioStore` and `ModelIndex` traits and their value types.
//!
//! Implemented by storage backends (e.g. `opcon-store-sqlite`); higher
//! layers (`opcon-api`, `opcon-sync`) depend on these abstractions, not on
//! any concrete backend.
//!
//! Unlike a generic store, every method resolves to [`crate::Result`]: a
//! backend must translate its internal failures into the fixed error
//! taxonomy before they cross this boundary, so the web surface can map
//! each kind to a response without knowing the backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  Result,
  drone::Drone,
  enemy::EnemyUnit,
  model::{ModelRecord, ModelUpsert},
};

// ─── Scenario value types ────────────────────────────────────────────────────

/// Validated input for creating or updating a scenario. Built by an explicit
/// decoding step (see `opcon-api`), never from raw client JSON.
#[derive(Debug, Clone)]
pub struct NewScenario {
  pub name:        String,
  pub description: String,
  pub created_by:  String,
  /// Must be non-empty; the store rejects it with
  /// [`Error::EmptyDroneList`](crate::Error::EmptyDroneList) otherwise.
  pub drones:      Vec<Drone>,
  pub enemies:     Vec<EnemyUnit>,
}

/// One row of the scenario list.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
  pub id:          i64,
  pub name:        String,
  pub description: String,
  pub created_by:  String,
  pub created_at:  DateTime<Utc>,
  pub drone_count: u32,
  pub enemy_count: u32,
}

/// A fully reconstituted active scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioDetail {
  pub id:          i64,
  pub name:        String,
  pub description: String,
  pub created_by:  String,
  pub created_at:  DateTime<Utc>,
  pub drones:      Vec<Drone>,
  /// All five categories flattened, in category order.
  pub enemies:     Vec<EnemyUnit>,
}

// ─── Scenario store ──────────────────────────────────────────────────────────

/// CRUD over scenario rows. Deletion is always soft: rows are tagged
/// `deleted` and excluded from every read, never removed.
pub trait ScenarioStore: Send + Sync {
  /// Persist a new active scenario.
  ///
  /// Fails with `DuplicateName` if an active scenario already has this name
  /// and with `EmptyDroneList` if `input.drones` is empty.
  fn create_scenario(
    &self,
    input: NewScenario,
  ) -> impl Future<Output = Result<ScenarioSummary>> + Send + '_;

  /// Overwrite all derived fields of scenario `id`.
  ///
  /// Fails with `NotFound` if the row does not exist, with `DuplicateName`
  /// if another active row has the target name, and with `EmptyDroneList`
  /// as for create. Caller-supplied drone ids are preserved.
  fn update_scenario(
    &self,
    id: i64,
    input: NewScenario,
  ) -> impl Future<Output = Result<ScenarioSummary>> + Send + '_;

  /// Tag scenario `id` as deleted. Fails with `NotFound`.
  fn soft_delete_scenario(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Active scenarios, newest first.
  fn list_active(
    &self,
  ) -> impl Future<Output = Result<Vec<ScenarioSummary>>> + Send + '_;

  /// Full detail for an active scenario; `NotFound` for missing or deleted
  /// rows. Reading an old-format payload persists its cleaned form back as
  /// a side effect.
  fn get_detail(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<ScenarioDetail>> + Send + '_;
}

// ─── Model index ─────────────────────────────────────────────────────────────

/// The persisted index over trained-model output directories.
pub trait ModelIndex: Send + Sync {
  /// Insert or overwrite the row keyed by `model.config_path`. This is the
  /// only write path for descriptive fields; rows are never deleted here.
  fn upsert_model(
    &self,
    model: ModelUpsert,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Every indexed model, newest id first.
  fn list_models(
    &self,
  ) -> impl Future<Output = Result<Vec<ModelRecord>>> + Send + '_;

  /// Rename model `id`; returns the new name or `NotFound`.
  fn rename_model(
    &self,
    id: i64,
    name: String,
  ) -> impl Future<Output = Result<String>> + Send + '_;

  /// One-time repair pass: rewrite every stored path through `normalize`
  /// and merge rows that collide on the result, keeping the lowest id.
  /// Returns the number of rows removed.
  fn dedupe_model_paths<F>(
    &self,
    normalize: F,
  ) -> impl Future<Output = Result<u32>> + Send + '_
  where
    F: Fn(&str) -> String + Send + Sync + 'static;
}
