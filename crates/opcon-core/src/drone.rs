//! Friendly drone records and the payload/position string codec.
//!
//! Scenario rows persist the drone list twice: as a JSON payload blob (the
//! `drones` array plus aggregate weapon totals) and as a redundant
//! newline-joined `lat,lng,altitude` string kept for older readers. Both
//! encodings have been through incompatible revisions; everything here reads
//! leniently and writes exactly one current form.
//!
//! Legacy rules, fixed once and for all: a per-drone `hq9b` field is adopted
//! into `ar1` when `ar1` is absent; a per-drone `radar` field and the
//! top-level `total_radar` aggregate are pure removals and are dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Altitude assigned when the input carries none (or an unparsable one).
pub const DEFAULT_ALTITUDE: i64 = 100;

// ─── Drone ───────────────────────────────────────────────────────────────────

/// A fully-normalized friendly unit. Field order is the serialized order of
/// the payload blob, so two equal drone lists always serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
  /// 1-based sequence position; stable across edits when the client echoes
  /// it back.
  pub id:       u32,
  pub code:     String,
  pub lat:      f64,
  pub lng:      f64,
  pub altitude: i64,
  pub ar1:      u32,
  pub pl10:     u32,
  pub cannon:   u32,
}

impl Drone {
  /// Build a drone from a loosely-typed JSON record.
  ///
  /// Never fails: numbers may arrive as strings, counts default to 0,
  /// altitude to [`DEFAULT_ALTITUDE`], `id` to `default_id`. Legacy fields
  /// are resolved per the module rules and never appear in the output.
  pub fn normalize(raw: &Value, default_id: u32) -> Self {
    let obj = raw.as_object();
    let get = |key: &str| obj.and_then(|o| o.get(key));

    let ar1 = match get("ar1") {
      Some(v) => coerce_count(v),
      None => get("hq9b").map(coerce_count).unwrap_or(0),
    };

    Drone {
      id:       get("id").and_then(coerce_int).map_or(default_id, |n| n as u32),
      code:     get("code").map(coerce_string).unwrap_or_default(),
      lat:      get("lat").and_then(coerce_f64).unwrap_or(0.0),
      lng:      get("lng").and_then(coerce_f64).unwrap_or(0.0),
      altitude: get("altitude").and_then(coerce_int).unwrap_or(DEFAULT_ALTITUDE),
      ar1,
      pl10:     get("pl10").map(coerce_count).unwrap_or(0),
      cannon:   get("cannon").map(coerce_count).unwrap_or(0),
    }
  }
}

/// True when a raw drone entry carries a field of a retired revision.
fn has_legacy_field(raw: &Value) -> bool {
  raw
    .as_object()
    .is_some_and(|o| o.contains_key("radar") || o.contains_key("hq9b"))
}

// ─── Lenient coercions ───────────────────────────────────────────────────────

pub(crate) fn coerce_f64(v: &Value) -> Option<f64> {
  match v {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

pub(crate) fn coerce_int(v: &Value) -> Option<i64> {
  match v {
    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// Integer coercion for weapon counts: anything unparsable is 0, never an
/// error, and negatives clamp to 0.
pub(crate) fn coerce_count(v: &Value) -> u32 {
  coerce_int(v).map_or(0, |n| n.max(0) as u32)
}

pub(crate) fn coerce_string(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    Value::Number(n) => n.to_string(),
    _ => String::new(),
  }
}

// ─── Payload blob ────────────────────────────────────────────────────────────

/// The persisted payload column: the drone array plus aggregate totals.
#[derive(Debug, Serialize, Deserialize)]
struct PayloadBlob {
  drones:       Vec<Drone>,
  total_ar1:    u64,
  total_pl10:   u64,
  total_cannon: u64,
}

/// Serialize a drone list into the current payload form. Deterministic given
/// input order.
pub fn serialize_drones(drones: &[Drone]) -> String {
  let blob = PayloadBlob {
    total_ar1:    drones.iter().map(|d| u64::from(d.ar1)).sum(),
    total_pl10:   drones.iter().map(|d| u64::from(d.pl10)).sum(),
    total_cannon: drones.iter().map(|d| u64::from(d.cannon)).sum(),
    drones:       drones.to_vec(),
  };
  serde_json::to_string(&blob).expect("payload blob always serializes")
}

/// Newline-joined `lat,lng,altitude` lines, order-preserving.
pub fn drone_positions(drones: &[Drone]) -> String {
  drones
    .iter()
    .map(|d| format!("{},{},{}", d.lat, d.lng, d.altitude))
    .collect::<Vec<_>>()
    .join("\n")
}

// ─── Stored-payload sanitizer ────────────────────────────────────────────────

/// Result of reading a stored payload of unknown vintage.
#[derive(Debug)]
pub struct SanitizedPayload {
  pub drones:  Vec<Drone>,
  /// Re-serialized current-form payload. Callers persist this back when
  /// `changed` is true, so old rows self-heal on first read.
  pub cleaned: String,
  pub changed: bool,
}

/// Read a previously stored payload string, tolerating every historical
/// format revision. Never fails.
///
/// `changed` is set when the input carried any legacy field, when the
/// top-level object carried the removed `total_radar` aggregate, or when the
/// cleaned re-serialization differs byte-for-byte from the input. Empty
/// input yields an empty list and stays `changed = false`; malformed JSON
/// and non-object payloads yield an empty list with `changed = true`.
pub fn sanitize_stored_payload(raw: &str) -> SanitizedPayload {
  if raw.trim().is_empty() {
    return SanitizedPayload {
      drones:  Vec::new(),
      cleaned: serialize_drones(&[]),
      changed: false,
    };
  }

  let Ok(value) = serde_json::from_str::<Value>(raw) else {
    return garbled();
  };
  let Some(obj) = value.as_object() else {
    return garbled();
  };

  let mut changed = obj.contains_key("total_radar");

  let entries = obj
    .get("drones")
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default();

  let mut drones = Vec::with_capacity(entries.len());
  for (index, entry) in entries.iter().enumerate() {
    if has_legacy_field(entry) {
      changed = true;
    }
    drones.push(Drone::normalize(entry, index as u32 + 1));
  }

  let cleaned = serialize_drones(&drones);
  if cleaned != raw {
    changed = true;
  }

  SanitizedPayload { drones, cleaned, changed }
}

fn garbled() -> SanitizedPayload {
  SanitizedPayload {
    drones:  Vec::new(),
    cleaned: serialize_drones(&[]),
    changed: true,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
