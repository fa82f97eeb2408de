//! Integration tests for `SqliteStore` against an in-memory database.

use opcon_core::{
  Error,
  drone::Drone,
  enemy::{EnemyCategory, EnemyUnit},
  model::{ModelCategory, ModelUpsert},
  store::{ModelIndex, NewScenario, ScenarioStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn drone(id: u32, code: &str) -> Drone {
  Drone {
    id,
    code: code.into(),
    lat: 30.0 + f64::from(id) / 10.0,
    lng: 118.0,
    altitude: 100,
    ar1: 1,
    pl10: 0,
    cannon: 2,
  }
}

fn tank(code: &str) -> EnemyUnit {
  EnemyUnit {
    category: EnemyCategory::Tank,
    code:     code.into(),
    lat:      31.0,
    lng:      117.0,
    altitude: 0,
  }
}

fn scenario(name: &str) -> NewScenario {
  NewScenario {
    name:        name.into(),
    description: "exercise".into(),
    created_by:  "admin".into(),
    drones:      vec![drone(1, "UAV-1"), drone(2, "UAV-2")],
    enemies:     vec![tank("T-1"), tank("T-2")],
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_list() {
  let s = store().await;

  let created = s.create_scenario(scenario("alpha")).await.unwrap();
  assert_eq!(created.name, "alpha");
  assert_eq!(created.drone_count, 2);
  assert_eq!(created.enemy_count, 2);

  let listed = s.list_active().await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, created.id);
}

#[tokio::test]
async fn create_rejects_duplicate_active_name() {
  let s = store().await;
  s.create_scenario(scenario("alpha")).await.unwrap();

  let err = s.create_scenario(scenario("alpha")).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateName(name) if name == "alpha"));

  // The failed create must leave the store unchanged.
  assert_eq!(s.list_active().await.unwrap().len(), 1);
}

#[tokio::test]
async fn create_rejects_empty_drone_list() {
  let s = store().await;
  let mut input = scenario("alpha");
  input.drones.clear();

  let err = s.create_scenario(input).await.unwrap_err();
  assert!(matches!(err, Error::EmptyDroneList));
  assert!(s.list_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleted_name_can_be_reused() {
  let s = store().await;
  let first = s.create_scenario(scenario("alpha")).await.unwrap();
  s.soft_delete_scenario(first.id).await.unwrap();

  // Uniqueness applies to active rows only.
  s.create_scenario(scenario("alpha")).await.unwrap();
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_overwrites_derived_fields() {
  let s = store().await;
  let created = s.create_scenario(scenario("alpha")).await.unwrap();

  let mut input = scenario("alpha-2");
  input.drones = vec![drone(7, "UAV-7")];
  input.enemies = vec![];
  let updated = s.update_scenario(created.id, input).await.unwrap();
  assert_eq!(updated.name, "alpha-2");
  assert_eq!(updated.drone_count, 1);
  assert_eq!(updated.enemy_count, 0);

  let detail = s.get_detail(created.id).await.unwrap();
  // Caller-supplied drone ids survive the round trip.
  assert_eq!(detail.drones[0].id, 7);
  assert!(detail.enemies.is_empty());
}

#[tokio::test]
async fn update_missing_row_is_not_found() {
  let s = store().await;
  let err = s.update_scenario(999, scenario("ghost")).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(999)));
}

#[tokio::test]
async fn update_rejects_name_of_other_active_row() {
  let s = store().await;
  s.create_scenario(scenario("alpha")).await.unwrap();
  let beta = s.create_scenario(scenario("beta")).await.unwrap();

  let err = s
    .update_scenario(beta.id, scenario("alpha"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateName(_)));

  // Keeping its own name is not a conflict.
  s.update_scenario(beta.id, scenario("beta")).await.unwrap();
}

// ─── Soft delete ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn soft_delete_hides_but_keeps_row() {
  let s = store().await;
  let created = s.create_scenario(scenario("alpha")).await.unwrap();

  s.soft_delete_scenario(created.id).await.unwrap();

  assert!(s.list_active().await.unwrap().is_empty());
  let err = s.get_detail(created.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));

  // The row still exists physically.
  let count: i64 = s
    .conn
    .call(|conn| {
      Ok(conn.query_row("SELECT COUNT(*) FROM scenarios", [], |r| r.get(0))?)
    })
    .await
    .unwrap();
  assert_eq!(count, 1);
}

#[tokio::test]
async fn soft_delete_missing_row_is_not_found() {
  let s = store().await;
  let err = s.soft_delete_scenario(42).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(42)));
}

// ─── Detail & self-healing ───────────────────────────────────────────────────

#[tokio::test]
async fn get_detail_decodes_enemies() {
  let s = store().await;
  let mut input = scenario("alpha");
  input.enemies.push(EnemyUnit {
    category: EnemyCategory::ReconnaissanceDrone,
    code:     "R-1".into(),
    lat:      32.0,
    lng:      118.5,
    altitude: 300,
  });
  let created = s.create_scenario(input).await.unwrap();

  let detail = s.get_detail(created.id).await.unwrap();
  assert_eq!(detail.drones.len(), 2);
  assert_eq!(detail.enemies.len(), 3);
  // Flattened in category order: recon first, then the tanks.
  assert_eq!(detail.enemies[0].category, EnemyCategory::ReconnaissanceDrone);
  assert_eq!(detail.enemies[0].altitude, 300);
  assert_eq!(detail.enemies[1].code, "T-1");
}

#[tokio::test]
async fn get_detail_heals_legacy_payload() {
  let s = store().await;
  let created = s.create_scenario(scenario("alpha")).await.unwrap();

  // Overwrite the stored payload with a pre-revision blob.
  let legacy = r#"{"drones":[{"code":"UAV-1","lat":30.1,"lng":118.2,"hq9b":5}],"total_radar":5}"#;
  let id = created.id;
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE scenarios SET drone_payloads = ?1, drone_count = 1 WHERE id = ?2",
        rusqlite::params![legacy, id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let detail = s.get_detail(id).await.unwrap();
  assert_eq!(detail.drones.len(), 1);
  assert_eq!(detail.drones[0].ar1, 5);

  // The cleaned form was persisted: a second read round-trips unchanged.
  let stored: String = s
    .conn
    .call(move |conn| {
      Ok(conn.query_row(
        "SELECT drone_payloads FROM scenarios WHERE id = ?1",
        rusqlite::params![id],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap();
  assert!(!stored.contains("hq9b"));
  assert!(!stored.contains("total_radar"));
  let again = s.get_detail(id).await.unwrap();
  assert_eq!(again.drones, detail.drones);
}

// ─── Model index ─────────────────────────────────────────────────────────────

fn model(path: &str, name: &str) -> ModelUpsert {
  ModelUpsert {
    config_path: path.into(),
    name:        name.into(),
    category:    ModelCategory::Tracking,
    seed:        Some(3),
    version:     "2024-5-1-10-30-0".into(),
    algorithm:   Some("ppo".into()),
    environment: Some("canyon".into()),
    scenario:    Some("alpha".into()),
    last_step:   Some(5),
    best_score:  Some(0.9),
  }
}

#[tokio::test]
async fn upsert_inserts_then_overwrites() {
  let s = store().await;
  s.upsert_model(model("tracking/run-a/config.json", "run-a"))
    .await
    .unwrap();

  let mut updated = model("tracking/run-a/config.json", "run-a+");
  updated.best_score = Some(1.4);
  s.upsert_model(updated).await.unwrap();

  let models = s.list_models().await.unwrap();
  assert_eq!(models.len(), 1);
  assert_eq!(models[0].name, "run-a+");
  assert_eq!(models[0].best_score, Some(1.4));
  assert_eq!(models[0].status, "available");
}

#[tokio::test]
async fn rename_model_round_trips() {
  let s = store().await;
  s.upsert_model(model("tracking/run-a/config.json", "run-a"))
    .await
    .unwrap();
  let id = s.list_models().await.unwrap()[0].id;

  let name = s.rename_model(id, "prod-candidate".into()).await.unwrap();
  assert_eq!(name, "prod-candidate");
  assert_eq!(s.list_models().await.unwrap()[0].name, "prod-candidate");

  let err = s.rename_model(id + 99, "x".into()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn dedupe_converges_to_lowest_id() {
  let s = store().await;
  // Three differently-spelled paths for the same logical file, one outsider.
  for path in [
    "tracking/run-a/config.json",
    "./tracking/run-a/config.json",
    "tracking\\run-a\\config.json",
    "tracking/run-b/config.json",
  ] {
    s.upsert_model(model(path, path)).await.unwrap();
  }

  let removed = s
    .dedupe_model_paths(|p| {
      p.replace('\\', "/").trim_start_matches("./").to_string()
    })
    .await
    .unwrap();
  assert_eq!(removed, 2);

  let mut models = s.list_models().await.unwrap();
  models.sort_by_key(|m| m.id);
  assert_eq!(models.len(), 2);
  // The first-inserted row survives under the normalized key.
  assert_eq!(models[0].name, "tracking/run-a/config.json");
  assert_eq!(models[0].config_path, "tracking/run-a/config.json");
  assert_eq!(models[1].config_path, "tracking/run-b/config.json");

  // A second pass is a no-op.
  let removed = s
    .dedupe_model_paths(|p| {
      p.replace('\\', "/").trim_start_matches("./").to_string()
    })
    .await
    .unwrap();
  assert_eq!(removed, 0);
}
