//! [`SqliteStore`] — the SQLite implementation of [`ScenarioStore`] and
//! [`ModelIndex`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use opcon_core::{
  Error, Result,
  drone::{drone_positions, sanitize_stored_payload, serialize_drones},
  enemy::{EnemyCategory, EnemyUnit, aggregate_enemy_units, decode_enemy_positions},
  model::{MODEL_STATUS_AVAILABLE, ModelRecord, ModelUpsert},
  store::{ModelIndex, NewScenario, ScenarioDetail, ScenarioStore, ScenarioSummary},
};
use rusqlite::OptionalExtension as _;

use crate::{
  encode::{RawModel, RawScenario, decode_dt, encode_dt},
  schema::SCHEMA,
};

/// Fold a connection-level failure into the core taxonomy.
fn storage(e: tokio_rusqlite::Error) -> Error { Error::Storage(e.to_string()) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// An opcon store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and all
/// calls are serialised onto its worker thread, so each operation below is
/// atomic with respect to the others.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(storage)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(storage)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(storage)
  }
}

// ─── Scenario row helpers ────────────────────────────────────────────────────

const SCENARIO_COLUMNS: &str = "id, name, description, created_by, created_at, \
   drone_count, drone_payloads, \
   recon_count, recon_positions, helicopter_count, helicopter_positions, \
   tank_count, tank_positions, vehicle_count, vehicle_positions, \
   base_count, base_positions";

fn read_scenario_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawScenario> {
  Ok(RawScenario {
    id:             row.get(0)?,
    name:           row.get(1)?,
    description:    row.get(2)?,
    created_by:     row.get(3)?,
    created_at:     row.get(4)?,
    drone_count:    row.get(5)?,
    drone_payloads: row.get(6)?,
    enemy_groups:   [
      (row.get(7)?, row.get(8)?),
      (row.get(9)?, row.get(10)?),
      (row.get(11)?, row.get(12)?),
      (row.get(13)?, row.get(14)?),
      (row.get(15)?, row.get(16)?),
    ],
  })
}

/// Derived column values shared by create and update.
struct DerivedColumns {
  drone_count:  i64,
  positions:    String,
  payload:      String,
  enemy_groups: [(i64, String); 5],
}

fn derive_columns(input: &NewScenario) -> DerivedColumns {
  let deployment = aggregate_enemy_units(&input.enemies);
  let mut enemy_groups: [(i64, String); 5] = Default::default();
  for (slot, category) in EnemyCategory::ALL.iter().enumerate() {
    let group = deployment.group(*category);
    enemy_groups[slot] = (i64::from(group.count), group.positions.clone());
  }
  DerivedColumns {
    drone_count: input.drones.len() as i64,
    positions:   drone_positions(&input.drones),
    payload:     serialize_drones(&input.drones),
    enemy_groups,
  }
}

// ─── ScenarioStore ───────────────────────────────────────────────────────────

impl ScenarioStore for SqliteStore {
  async fn create_scenario(&self, input: NewScenario) -> Result<ScenarioSummary> {
    if input.drones.is_empty() {
      return Err(Error::EmptyDroneList);
    }

    let derived = derive_columns(&input);
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let drone_count = input.drones.len() as u32;
    let enemy_count = input.enemies.len() as u32;
    let NewScenario { name, description, created_by, .. } = input;
    let (name_c, description_c, created_by_c) =
      (name.clone(), description.clone(), created_by.clone());

    let id = self
      .conn
      .call(move |conn| {
        let duplicate: bool = conn
          .query_row(
            "SELECT 1 FROM scenarios WHERE name = ?1 AND status = 'active'",
            rusqlite::params![name_c],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if duplicate {
          return Ok(Err(Error::DuplicateName(name_c)));
        }

        let g = &derived.enemy_groups;
        conn.execute(
          "INSERT INTO scenarios (
             name, description, created_by, created_at,
             drone_count, drone_positions, drone_payloads,
             recon_count, recon_positions,
             helicopter_count, helicopter_positions,
             tank_count, tank_positions,
             vehicle_count, vehicle_positions,
             base_count, base_positions
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17)",
          rusqlite::params![
            name_c,
            description_c,
            created_by_c,
            at_str,
            derived.drone_count,
            derived.positions,
            derived.payload,
            g[0].0, g[0].1,
            g[1].0, g[1].1,
            g[2].0, g[2].1,
            g[3].0, g[3].1,
            g[4].0, g[4].1,
          ],
        )?;
        Ok(Ok(conn.last_insert_rowid()))
      })
      .await
      .map_err(storage)??;

    Ok(ScenarioSummary {
      id,
      name,
      description,
      created_by,
      created_at,
      drone_count,
      enemy_count,
    })
  }

  async fn update_scenario(&self, id: i64, input: NewScenario) -> Result<ScenarioSummary> {
    if input.drones.is_empty() {
      return Err(Error::EmptyDroneList);
    }

    let derived = derive_columns(&input);
    let drone_count = input.drones.len() as u32;
    let enemy_count = input.enemies.len() as u32;
    let NewScenario { name, description, .. } = input;
    let (name_c, description_c) = (name.clone(), description.clone());

    let (created_by, created_at_str) = self
      .conn
      .call(move |conn| {
        let row: Option<(String, String)> = conn
          .query_row(
            "SELECT created_by, created_at FROM scenarios WHERE id = ?1",
            rusqlite::params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;
        let Some((created_by, created_at)) = row else {
          return Ok(Err(Error::NotFound(id)));
        };

        let duplicate: bool = conn
          .query_row(
            "SELECT 1 FROM scenarios
             WHERE name = ?1 AND status = 'active' AND id != ?2",
            rusqlite::params![name_c, id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if duplicate {
          return Ok(Err(Error::DuplicateName(name_c)));
        }

        let g = &derived.enemy_groups;
        conn.execute(
          "UPDATE scenarios SET
             name = ?1, description = ?2,
             drone_count = ?3, drone_positions = ?4, drone_payloads = ?5,
             recon_count = ?6, recon_positions = ?7,
             helicopter_count = ?8, helicopter_positions = ?9,
             tank_count = ?10, tank_positions = ?11,
             vehicle_count = ?12, vehicle_positions = ?13,
             base_count = ?14, base_positions = ?15
           WHERE id = ?16",
          rusqlite::params![
            name_c,
            description_c,
            derived.drone_count,
            derived.positions,
            derived.payload,
            g[0].0, g[0].1,
            g[1].0, g[1].1,
            g[2].0, g[2].1,
            g[3].0, g[3].1,
            g[4].0, g[4].1,
            id,
          ],
        )?;
        Ok(Ok((created_by, created_at)))
      })
      .await
      .map_err(storage)??;

    Ok(ScenarioSummary {
      id,
      name,
      description,
      created_by,
      created_at: decode_dt(&created_at_str)?,
      drone_count,
      enemy_count,
    })
  }

  async fn soft_delete_scenario(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE scenarios SET status = 'deleted' WHERE id = ?1",
          rusqlite::params![id],
        )?;
        if changed == 0 {
          return Ok(Err(Error::NotFound(id)));
        }
        Ok(Ok(()))
      })
      .await
      .map_err(storage)?
  }

  async fn list_active(&self) -> Result<Vec<ScenarioSummary>> {
    let raw: Vec<RawScenario> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SCENARIO_COLUMNS} FROM scenarios
           WHERE status = 'active'
           ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map([], read_scenario_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raw.into_iter().map(RawScenario::into_summary).collect()
  }

  async fn get_detail(&self, id: i64) -> Result<ScenarioDetail> {
    let (raw, drones, enemies) = self
      .conn
      .call(move |conn| {
        let raw: Option<RawScenario> = conn
          .query_row(
            &format!(
              "SELECT {SCENARIO_COLUMNS} FROM scenarios
               WHERE id = ?1 AND status = 'active'"
            ),
            rusqlite::params![id],
            read_scenario_row,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(Err(Error::NotFound(id)));
        };

        // Compatibility seam: old payload formats self-heal on first read.
        let sanitized = sanitize_stored_payload(&raw.drone_payloads);
        if sanitized.changed {
          conn.execute(
            "UPDATE scenarios
             SET drone_payloads = ?1, drone_positions = ?2, drone_count = ?3
             WHERE id = ?4",
            rusqlite::params![
              sanitized.cleaned,
              drone_positions(&sanitized.drones),
              sanitized.drones.len() as i64,
              id,
            ],
          )?;
        }

        let mut enemies: Vec<EnemyUnit> = Vec::new();
        for (slot, category) in EnemyCategory::ALL.iter().enumerate() {
          let (count, positions) = &raw.enemy_groups[slot];
          enemies.extend(decode_enemy_positions(
            *category,
            (*count).max(0) as u32,
            positions,
          ));
        }

        Ok(Ok((raw, sanitized.drones, enemies)))
      })
      .await
      .map_err(storage)??;

    Ok(ScenarioDetail {
      id:          raw.id,
      created_at:  decode_dt(&raw.created_at)?,
      name:        raw.name,
      description: raw.description,
      created_by:  raw.created_by,
      drones,
      enemies,
    })
  }
}

// ─── ModelIndex ──────────────────────────────────────────────────────────────

const MODEL_COLUMNS: &str = "id, config_path, name, category, seed, version, \
   algorithm, environment, scenario, last_step, best_score, status";

fn read_model_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawModel> {
  Ok(RawModel {
    id:          row.get(0)?,
    config_path: row.get(1)?,
    name:        row.get(2)?,
    category:    row.get(3)?,
    seed:        row.get(4)?,
    version:     row.get(5)?,
    algorithm:   row.get(6)?,
    environment: row.get(7)?,
    scenario:    row.get(8)?,
    last_step:   row.get(9)?,
    best_score:  row.get(10)?,
    status:      row.get(11)?,
  })
}

impl ModelIndex for SqliteStore {
  async fn upsert_model(&self, model: ModelUpsert) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO models (
             config_path, name, category, seed, version,
             algorithm, environment, scenario, last_step, best_score, status
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT(config_path) DO UPDATE SET
             name = excluded.name,
             category = excluded.category,
             seed = excluded.seed,
             version = excluded.version,
             algorithm = excluded.algorithm,
             environment = excluded.environment,
             scenario = excluded.scenario,
             last_step = excluded.last_step,
             best_score = excluded.best_score,
             status = excluded.status",
          rusqlite::params![
            model.config_path,
            model.name,
            model.category.as_str(),
            model.seed,
            model.version,
            model.algorithm,
            model.environment,
            model.scenario,
            model.last_step,
            model.best_score,
            MODEL_STATUS_AVAILABLE,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(storage)
  }

  async fn list_models(&self) -> Result<Vec<ModelRecord>> {
    let raw: Vec<RawModel> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MODEL_COLUMNS} FROM models ORDER BY id DESC"
        ))?;
        let rows = stmt
          .query_map([], read_model_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raw.into_iter().map(RawModel::into_record).collect()
  }

  async fn rename_model(&self, id: i64, name: String) -> Result<String> {
    let name_c = name.clone();
    self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE models SET name = ?1 WHERE id = ?2",
          rusqlite::params![name_c, id],
        )?;
        if changed == 0 {
          return Ok(Err(Error::NotFound(id)));
        }
        Ok(Ok(()))
      })
      .await
      .map_err(storage)??;
    Ok(name)
  }

  async fn dedupe_model_paths<F>(&self, normalize: F) -> Result<u32>
  where
    F: Fn(&str) -> String + Send + Sync + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let rows: Vec<(i64, String)> = conn
          .prepare("SELECT id, config_path FROM models ORDER BY id ASC")?
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut keepers: HashMap<String, i64> = HashMap::new();
        let mut doomed: Vec<i64> = Vec::new();
        let mut rewrites: Vec<(i64, String)> = Vec::new();

        for (id, path) in rows {
          let normalized = normalize(&path);
          if keepers.contains_key(&normalized) {
            doomed.push(id);
          } else {
            if normalized != path {
              rewrites.push((id, normalized.clone()));
            }
            keepers.insert(normalized, id);
          }
        }

        // Losers go first so the path rewrites can never trip the unique
        // index on config_path.
        for id in &doomed {
          conn.execute("DELETE FROM models WHERE id = ?1", rusqlite::params![id])?;
        }
        for (id, path) in &rewrites {
          conn.execute(
            "UPDATE models SET config_path = ?1 WHERE id = ?2",
            rusqlite::params![path, id],
          )?;
        }

        Ok(doomed.len() as u32)
      })
      .await
      .map_err(storage)
  }
}
