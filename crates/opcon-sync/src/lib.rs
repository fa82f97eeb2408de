//! Model Index Synchronizer.
//!
//! Walks a two-level training-output tree
//! (`<root>/<category>/<run-dir>/{config.json, progress.txt}`) and
//! reconciles what it finds into a [`ModelIndex`]. The filesystem is the
//! source of record: the index is a rebuildable cache, upserted on every
//! run and never pruned.
//!
//! Run directories follow the convention
//! `seed-<N>-<Y>-<M>-<D>-<h>-<m>-<s>`; names that do not follow it fall
//! back to no seed and the raw directory name as the version string. A
//! malformed run degrades or is skipped, never aborts a scan.

use std::{
  fs,
  path::{Component, Path, PathBuf},
};

use opcon_core::{
  Result,
  model::{ModelCategory, ModelUpsert},
  progress::parse_progress,
  store::ModelIndex,
};
use serde_json::Value;
use tracing::{debug, info, warn};

// ─── Model root ──────────────────────────────────────────────────────────────

/// The configured training-output root. Passed explicitly into the scan and
/// the dedup pass; there is no ambient path state.
#[derive(Debug, Clone)]
pub struct ModelRoot {
  root: PathBuf,
}

impl ModelRoot {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Canonical index key for a config path: root-relative with forward
  /// slashes, so the same file reached via different separators or via the
  /// root's absolute form maps to one key. Absolute paths outside the root
  /// fall back to their absolute form unchanged.
  ///
  /// The function is a fixpoint over its own output: stored keys read back
  /// from the index pass through unchanged, so repeated dedup passes are
  /// no-ops.
  pub fn normalize(&self, raw: &str) -> String {
    let cleaned = raw.replace('\\', "/");
    let path = Path::new(&cleaned);
    let abs = absolute_or_self(path);
    let root = absolute_or_self(&self.root);

    if let Ok(rel) = abs.strip_prefix(&root) {
      return key_string(rel);
    }

    // A relative path that does not resolve under the root is already a
    // stored key; it must come back byte-identical, never resolved against
    // the working directory.
    if path.is_relative() {
      return key_string(path);
    }

    abs.to_string_lossy().replace('\\', "/")
  }

  /// Discover every readable run under the two category directories.
  pub fn scan(&self) -> Vec<ModelUpsert> {
    let mut discovered = Vec::new();

    for category in ModelCategory::ALL {
      let dir = self.root.join(category.as_str());
      let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(_) => {
          debug!(dir = %dir.display(), "category directory absent, skipping");
          continue;
        }
      };

      for entry in entries.flatten() {
        let run_dir = entry.path();
        if !run_dir.is_dir() {
          continue;
        }
        let Some(model) = self.read_run(category, &run_dir) else {
          continue;
        };
        discovered.push(model);
      }
    }

    discovered
  }

  /// Parse one run directory; `None` means "no config.json, not a run".
  fn read_run(&self, category: ModelCategory, run_dir: &Path) -> Option<ModelUpsert> {
    let config_path = run_dir.join("config.json");
    if !config_path.is_file() {
      debug!(dir = %run_dir.display(), "no config.json, skipping");
      return None;
    }

    let dir_name = run_dir
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let (seed, version) = parse_run_dir_name(&dir_name);

    let config = read_config(&config_path);
    let progress = fs::read_to_string(run_dir.join("progress.txt"))
      .map(|text| parse_progress(&text))
      .unwrap_or_default();

    Some(ModelUpsert {
      config_path: self.normalize(&config_path.to_string_lossy()),
      name:        nested_str(&config, &["name"])
        .unwrap_or_else(|| dir_name.clone()),
      category,
      seed,
      version,
      algorithm:   nested_str(&config, &["training", "algorithm"])
        .or_else(|| nested_str(&config, &["algorithm"])),
      environment: nested_str(&config, &["env", "name"])
        .or_else(|| nested_str(&config, &["env_name"])),
      scenario:    nested_str(&config, &["env", "scenario"])
        .or_else(|| nested_str(&config, &["scenario"])),
      last_step:   progress.last_step,
      best_score:  progress.best_score,
    })
  }
}

fn absolute_or_self(path: &Path) -> PathBuf {
  std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Join path components with forward slashes, folding away `.` segments.
fn key_string(path: &Path) -> String {
  path
    .components()
    .filter(|c| !matches!(c, Component::CurDir))
    .map(|c| c.as_os_str().to_string_lossy().into_owned())
    .collect::<Vec<_>>()
    .join("/")
}

// ─── Run-directory name ──────────────────────────────────────────────────────

/// Split `seed-<N>-<Y>-<M>-<D>-<h>-<m>-<s>` into a seed and a timestamp
/// string. Anything shorter (or not starting with `seed`) keeps the raw
/// name as the version and no seed.
fn parse_run_dir_name(name: &str) -> (Option<i64>, String) {
  let tokens: Vec<&str> = name.split('-').collect();
  if tokens.len() >= 8 && tokens[0] == "seed" {
    let seed = tokens[1].parse().ok();
    let version = tokens[2..8].join("-");
    (seed, version)
  } else {
    (None, name.to_string())
  }
}

// ─── Config extraction ───────────────────────────────────────────────────────

/// Parse `config.json`; an unreadable or unparsable file degrades to an
/// empty config so every derived field simply comes up absent.
fn read_config(path: &Path) -> Value {
  let text = match fs::read_to_string(path) {
    Ok(text) => text,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "unreadable config.json");
      return Value::Object(Default::default());
    }
  };
  match serde_json::from_str(&text) {
    Ok(value) => value,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "unparsable config.json");
      Value::Object(Default::default())
    }
  }
}

fn nested_str(config: &Value, path: &[&str]) -> Option<String> {
  let mut value = config;
  for key in path {
    value = value.get(key)?;
  }
  value.as_str().map(str::to_owned)
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// Outcome of one synchronization run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncReport {
  /// Rows merged away by the path-normalization repair pass.
  pub removed_duplicates: u32,
  /// Run directories discovered (and upserted) this pass.
  pub discovered:         usize,
}

/// Repair stored paths, then reconcile every discovered run into the index.
///
/// Nothing is ever deleted here: a model whose directory has disappeared
/// stays in the index until removed by hand.
pub async fn synchronize<S: ModelIndex>(
  root: &ModelRoot,
  index: &S,
) -> Result<SyncReport> {
  let normalizer = root.clone();
  let removed_duplicates = index
    .dedupe_model_paths(move |path| normalizer.normalize(path))
    .await?;

  let discovered = root.scan();
  let count = discovered.len();
  for model in discovered {
    index.upsert_model(model).await?;
  }

  info!(discovered = count, removed_duplicates, "model index synchronized");
  Ok(SyncReport { removed_duplicates, discovered: count })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::fs;

  use opcon_core::{model::ModelUpsert, store::ModelIndex};
  use opcon_store_sqlite::SqliteStore;

  use super::*;

  fn write_run(
    root: &Path,
    category: &str,
    dir_name: &str,
    config: Option<&str>,
    progress: Option<&str>,
  ) {
    let run = root.join(category).join(dir_name);
    fs::create_dir_all(&run).unwrap();
    if let Some(config) = config {
      fs::write(run.join("config.json"), config).unwrap();
    }
    if let Some(progress) = progress {
      fs::write(run.join("progress.txt"), progress).unwrap();
    }
  }

  #[test]
  fn run_dir_name_convention() {
    assert_eq!(
      parse_run_dir_name("seed-3-2024-5-1-10-30-0"),
      (Some(3), "2024-5-1-10-30-0".to_string())
    );
    assert_eq!(parse_run_dir_name("run-a"), (None, "run-a".to_string()));
    assert_eq!(
      parse_run_dir_name("seed-x-2024-5-1-10-30-0"),
      (None, "2024-5-1-10-30-0".to_string())
    );
  }

  #[test]
  fn normalize_is_separator_and_prefix_insensitive() {
    let root = ModelRoot::new("/srv/models");
    let key = "tracking/run-a/config.json";
    assert_eq!(root.normalize("/srv/models/tracking/run-a/config.json"), key);
    assert_eq!(root.normalize("/srv/models/tracking\\run-a\\config.json"), key);
    // Outside the root: absolute path, unchanged.
    assert_eq!(root.normalize("/other/config.json"), "/other/config.json");
  }

  #[test]
  fn normalize_is_a_fixpoint() {
    let root = ModelRoot::new("/srv/models");
    for raw in [
      "tracking/run-a/config.json",
      "/srv/models/tracking\\run-a\\config.json",
      "./confrontation/run-b/config.json",
      "/other/config.json",
    ] {
      let once = root.normalize(raw);
      assert_eq!(root.normalize(&once), once, "not a fixpoint for {raw:?}");
    }
    // A stored key in particular must come back untouched, never resolved
    // against the working directory.
    assert_eq!(
      root.normalize("tracking/run-a/config.json"),
      "tracking/run-a/config.json"
    );
  }

  #[test]
  fn scan_skips_broken_runs() {
    let tmp = tempfile::tempdir().unwrap();
    let root = ModelRoot::new(tmp.path());

    write_run(
      tmp.path(),
      "tracking",
      "seed-3-2024-5-1-10-30-0",
      Some(r#"{"name":"canyon-ppo","training":{"algorithm":"ppo"},"env":{"name":"canyon","scenario":"alpha"}}"#),
      Some("1,0.5\n2,bad\n3,0.9\n5,0.3"),
    );
    // No config.json: not a run.
    write_run(tmp.path(), "tracking", "seed-4-2024-5-1-11-0-0", None, None);

    let discovered = root.scan();
    assert_eq!(discovered.len(), 1);

    let model = &discovered[0];
    assert_eq!(model.name, "canyon-ppo");
    assert_eq!(model.seed, Some(3));
    assert_eq!(model.version, "2024-5-1-10-30-0");
    assert_eq!(model.algorithm.as_deref(), Some("ppo"));
    assert_eq!(model.environment.as_deref(), Some("canyon"));
    assert_eq!(model.scenario.as_deref(), Some("alpha"));
    assert_eq!(model.last_step, Some(5));
    assert_eq!(model.best_score, Some(0.9));
    assert_eq!(
      model.config_path,
      "tracking/seed-3-2024-5-1-10-30-0/config.json"
    );
  }

  #[test]
  fn scan_degrades_on_garbage_config() {
    let tmp = tempfile::tempdir().unwrap();
    let root = ModelRoot::new(tmp.path());
    write_run(tmp.path(), "confrontation", "run-a", Some("{not json"), None);

    let discovered = root.scan();
    assert_eq!(discovered.len(), 1);
    let model = &discovered[0];
    // Every derived field absent, display name falls back to the dir name.
    assert_eq!(model.name, "run-a");
    assert_eq!(model.version, "run-a");
    assert_eq!(model.seed, None);
    assert_eq!(model.algorithm, None);
    assert_eq!(model.last_step, None);
  }

  #[test]
  fn scan_of_missing_root_is_empty() {
    let root = ModelRoot::new("/nonexistent/opcon-models");
    assert!(root.scan().is_empty());
  }

  #[tokio::test]
  async fn synchronize_upserts_and_repairs() {
    let tmp = tempfile::tempdir().unwrap();
    let root = ModelRoot::new(tmp.path());
    write_run(
      tmp.path(),
      "tracking",
      "seed-3-2024-5-1-10-30-0",
      Some(r#"{"name":"canyon-ppo"}"#),
      Some("1,0.5"),
    );

    let store = SqliteStore::open_in_memory().await.unwrap();

    // Seed two pre-normalization duplicates of the same logical config.
    let stale = |path: &str| ModelUpsert {
      config_path: path.to_string(),
      name:        "stale".into(),
      category:    ModelCategory::Tracking,
      seed:        None,
      version:     "v".into(),
      algorithm:   None,
      environment: None,
      scenario:    None,
      last_step:   None,
      best_score:  None,
    };
    let abs = tmp
      .path()
      .join("tracking/seed-3-2024-5-1-10-30-0/config.json");
    store.upsert_model(stale(&abs.to_string_lossy())).await.unwrap();
    store
      .upsert_model(stale(&abs.to_string_lossy().replace('/', "\\")))
      .await
      .unwrap();

    let report = synchronize(&root, &store).await.unwrap();
    assert_eq!(report.removed_duplicates, 1);
    assert_eq!(report.discovered, 1);

    let models = store.list_models().await.unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "canyon-ppo");
    assert_eq!(
      models[0].config_path,
      "tracking/seed-3-2024-5-1-10-30-0/config.json"
    );

    // A second run over the unchanged tree changes nothing: the stored key
    // passes through the dedup normalizer untouched and the scan upserts
    // onto the same row.
    let report = synchronize(&root, &store).await.unwrap();
    assert_eq!(report.removed_duplicates, 0);
    let models = store.list_models().await.unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(
      models[0].config_path,
      "tracking/seed-3-2024-5-1-10-30-0/config.json"
    );
  }
}
