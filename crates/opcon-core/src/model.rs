//! Model-index types.
//!
//! A [`ModelRecord`] is a database mirror of one trained-model output
//! directory under the configured model root. The filesystem is the source
//! of record; rows are rebuilt by the synchronizer at any time and are never
//! pruned when their directory disappears.

use serde::{Deserialize, Serialize};

/// The only status the index ever assigns today.
pub const MODEL_STATUS_AVAILABLE: &str = "available";

// ─── Category ────────────────────────────────────────────────────────────────

/// The two fixed training tasks; also the directory names under the model
/// root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCategory {
  Tracking,
  Confrontation,
}

impl ModelCategory {
  pub const ALL: [ModelCategory; 2] =
    [ModelCategory::Tracking, ModelCategory::Confrontation];

  pub fn as_str(self) -> &'static str {
    match self {
      ModelCategory::Tracking => "tracking",
      ModelCategory::Confrontation => "confrontation",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "tracking" => Some(ModelCategory::Tracking),
      "confrontation" => Some(ModelCategory::Confrontation),
      _ => None,
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A persisted index row, keyed by the normalized config path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
  pub id:          i64,
  /// Root-relative, forward-slash path of the run's `config.json`; unique.
  pub config_path: String,
  pub name:        String,
  pub category:    ModelCategory,
  pub seed:        Option<i64>,
  /// Timestamp portion of the run directory name, or the raw directory name
  /// when the naming convention does not hold.
  pub version:     String,
  pub algorithm:   Option<String>,
  pub environment: Option<String>,
  pub scenario:    Option<String>,
  pub last_step:   Option<i64>,
  pub best_score:  Option<f64>,
  pub status:      String,
}

/// Everything the synchronizer learns about one run directory; the write
/// side of [`ModelRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelUpsert {
  pub config_path: String,
  pub name:        String,
  pub category:    ModelCategory,
  pub seed:        Option<i64>,
  pub version:     String,
  pub algorithm:   Option<String>,
  pub environment: Option<String>,
  pub scenario:    Option<String>,
  pub last_step:   Option<i64>,
  pub best_score:  Option<f64>,
}
