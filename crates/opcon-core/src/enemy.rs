//! Enemy-unit categories and the per-category position-string codec.
//!
//! Enemy forces are not first-class rows: each scenario persists, per
//! category, a count and a newline-joined position string. The current write
//! format is tagged — always four fields, `lat,lng,altitude,code`, altitude
//! 0 for ground categories. Older rows used two untagged forms (ground
//! `lat,lng[,code]`, airborne `lat,lng[,altitude|code]`), so decoding keeps
//! the historical heuristics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::drone::{coerce_f64, coerce_int, coerce_string};

// ─── Categories ──────────────────────────────────────────────────────────────

/// The five fixed adversary categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyCategory {
  ReconnaissanceDrone,
  AttackHelicopter,
  Tank,
  ArmoredVehicle,
  MilitaryBase,
}

impl EnemyCategory {
  pub const ALL: [EnemyCategory; 5] = [
    EnemyCategory::ReconnaissanceDrone,
    EnemyCategory::AttackHelicopter,
    EnemyCategory::Tank,
    EnemyCategory::ArmoredVehicle,
    EnemyCategory::MilitaryBase,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      EnemyCategory::ReconnaissanceDrone => "reconnaissance_drone",
      EnemyCategory::AttackHelicopter => "attack_helicopter",
      EnemyCategory::Tank => "tank",
      EnemyCategory::ArmoredVehicle => "armored_vehicle",
      EnemyCategory::MilitaryBase => "military_base",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "reconnaissance_drone" => Some(EnemyCategory::ReconnaissanceDrone),
      "attack_helicopter" => Some(EnemyCategory::AttackHelicopter),
      "tank" => Some(EnemyCategory::Tank),
      "armored_vehicle" => Some(EnemyCategory::ArmoredVehicle),
      "military_base" => Some(EnemyCategory::MilitaryBase),
      _ => None,
    }
  }

  /// Short label used for generated fallback codes (`Recon-3`).
  pub fn label(self) -> &'static str {
    match self {
      EnemyCategory::ReconnaissanceDrone => "Recon",
      EnemyCategory::AttackHelicopter => "Helicopter",
      EnemyCategory::Tank => "Tank",
      EnemyCategory::ArmoredVehicle => "Vehicle",
      EnemyCategory::MilitaryBase => "Base",
    }
  }

  /// Ground categories never carry an altitude in the legacy encodings.
  pub fn is_airborne(self) -> bool {
    matches!(
      self,
      EnemyCategory::ReconnaissanceDrone | EnemyCategory::AttackHelicopter
    )
  }
}

// ─── Units ───────────────────────────────────────────────────────────────────

/// One adversary unit. Altitude is always 0 for ground categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyUnit {
  pub category: EnemyCategory,
  pub code:     String,
  pub lat:      f64,
  pub lng:      f64,
  pub altitude: i64,
}

/// Decode loosely-typed client records into units.
///
/// Entries whose `type` is missing or not one of the five categories are
/// silently dropped. Ground units have altitude forced to 0.
pub fn decode_enemy_input(raw: &[Value]) -> Vec<EnemyUnit> {
  raw
    .iter()
    .filter_map(|entry| {
      let obj = entry.as_object()?;
      let category = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(EnemyCategory::parse)?;
      let altitude = obj.get("altitude").and_then(coerce_int).unwrap_or(0);
      Some(EnemyUnit {
        category,
        code: obj.get("code").map(coerce_string).unwrap_or_default(),
        lat: obj.get("lat").and_then(coerce_f64).unwrap_or(0.0),
        lng: obj.get("lng").and_then(coerce_f64).unwrap_or(0.0),
        altitude: if category.is_airborne() { altitude } else { 0 },
      })
    })
    .collect()
}

// ─── Aggregation (write path) ────────────────────────────────────────────────

/// One persisted enemy column pair: a count and its position string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnemyGroup {
  pub count:     u32,
  pub positions: String,
}

/// Per-category groups for one scenario, in [`EnemyCategory::ALL`] order.
#[derive(Debug, Clone, Default)]
pub struct EnemyDeployment {
  groups: [EnemyGroup; 5],
}

impl EnemyDeployment {
  pub fn group(&self, category: EnemyCategory) -> &EnemyGroup {
    &self.groups[Self::slot(category)]
  }

  fn slot(category: EnemyCategory) -> usize {
    EnemyCategory::ALL
      .iter()
      .position(|c| *c == category)
      .unwrap_or(0)
  }
}

/// Partition units into their categories and encode each group's position
/// string in the tagged four-field form.
pub fn aggregate_enemy_units(units: &[EnemyUnit]) -> EnemyDeployment {
  let mut deployment = EnemyDeployment::default();
  for unit in units {
    let group = &mut deployment.groups[EnemyDeployment::slot(unit.category)];
    let altitude = if unit.category.is_airborne() { unit.altitude } else { 0 };
    let line = format!("{},{},{},{}", unit.lat, unit.lng, altitude, unit.code);
    if group.count > 0 {
      group.positions.push('\n');
    }
    group.positions.push_str(&line);
    group.count += 1;
  }
  deployment
}

// ─── Decoding (read path) ────────────────────────────────────────────────────

/// Decode one stored position string back into units.
///
/// At most `count` non-blank lines are consumed (a stored count may overstate
/// the real line count). Lines that fail to yield coordinates produce no
/// unit; this never errors. Three-field airborne lines are disambiguated by
/// integer-testing the third field, the wart inherited from the untagged
/// legacy format. A missing or empty code falls back to
/// `"<Label>-<1-based index>"`.
pub fn decode_enemy_positions(
  category: EnemyCategory,
  count: u32,
  joined: &str,
) -> Vec<EnemyUnit> {
  let mut units = Vec::new();

  for line in joined
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .take(count as usize)
  {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 2 {
      continue;
    }
    let (Ok(lat), Ok(lng)) = (fields[0].parse::<f64>(), fields[1].parse::<f64>())
    else {
      continue;
    };

    let (altitude, code) = match fields.len() {
      2 => (0, None),
      3 if category.is_airborne() => match fields[2].parse::<i64>() {
        Ok(alt) => (alt, None),
        Err(_) => (0, Some(fields[2])),
      },
      // Ground legacy lines never carried altitude; a third field is a code.
      3 => (0, Some(fields[2])),
      // Four or more fields: altitude third, code is the last field.
      _ => (fields[2].parse().unwrap_or(0), Some(fields[fields.len() - 1])),
    };

    let altitude = if category.is_airborne() { altitude } else { 0 };
    let code = code
      .filter(|c| !c.is_empty())
      .map(str::to_owned)
      .unwrap_or_else(|| format!("{}-{}", category.label(), units.len() + 1));

    units.push(EnemyUnit { category, code, lat, lng, altitude });
  }

  units
}

// ─── Tests ───────────────────────────────────────────────────────────────────
