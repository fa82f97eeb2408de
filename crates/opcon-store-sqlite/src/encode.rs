//! Decoding helpers between raw SQLite rows and the `opcon-core` domain
//! types. Timestamps are stored as RFC 3339 strings; enum-like columns are
//! stored as their canonical string form.

use chrono::{DateTime, Utc};
use opcon_core::{
  Error, Result,
  model::{ModelCategory, ModelRecord},
  store::ScenarioSummary,
};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Storage(format!("bad timestamp {s:?}: {e}")))
}

pub fn decode_model_category(s: &str) -> Result<ModelCategory> {
  ModelCategory::parse(s)
    .ok_or_else(|| Error::Storage(format!("unknown model category: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `scenarios` row.
pub struct RawScenario {
  pub id:             i64,
  pub name:           String,
  pub description:    String,
  pub created_by:     String,
  pub created_at:     String,
  pub drone_count:    i64,
  pub drone_payloads: String,
  /// `(count, positions)` per category, in
  /// [`EnemyCategory::ALL`](opcon_core::enemy::EnemyCategory::ALL) order.
  pub enemy_groups:   [(i64, String); 5],
}

impl RawScenario {
  pub fn enemy_count(&self) -> u32 {
    self
      .enemy_groups
      .iter()
      .map(|(count, _)| (*count).max(0) as u32)
      .sum()
  }

  pub fn into_summary(self) -> Result<ScenarioSummary> {
    let enemy_count = self.enemy_count();
    Ok(ScenarioSummary {
      id:          self.id,
      created_at:  decode_dt(&self.created_at)?,
      name:        self.name,
      description: self.description,
      created_by:  self.created_by,
      drone_count: self.drone_count.max(0) as u32,
      enemy_count,
    })
  }
}

/// Raw strings read directly from a `models` row.
pub struct RawModel {
  pub id:          i64,
  pub config_path: String,
  pub name:        String,
  pub category:    String,
  pub seed:        Option<i64>,
  pub version:     String,
  pub algorithm:   Option<String>,
  pub environment: Option<String>,
  pub scenario:    Option<String>,
  pub last_step:   Option<i64>,
  pub best_score:  Option<f64>,
  pub status:      String,
}

impl RawModel {
  pub fn into_record(self) -> Result<ModelRecord> {
    Ok(ModelRecord {
      id:          self.id,
      category:    decode_model_category(&self.category)?,
      config_path: self.config_path,
      name:        self.name,
      seed:        self.seed,
      version:     self.version,
      algorithm:   self.algorithm,
      environment: self.environment,
      scenario:    self.scenario,
      last_step:   self.last_step,
      best_score:  self.best_score,
      status:      self.status,
    })
  }
}
