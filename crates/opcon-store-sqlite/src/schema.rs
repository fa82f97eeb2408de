//! SQL schema for the opcon SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `scenarios.name` deliberately carries no UNIQUE constraint: the name is
/// unique only among `status = 'active'` rows, which the store enforces in
/// its create/update operations.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS scenarios (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    name                 TEXT NOT NULL,
    description          TEXT NOT NULL DEFAULT '',
    created_by           TEXT NOT NULL,
    created_at           TEXT NOT NULL,            -- ISO 8601 UTC
    status               TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'deleted'
    -- friendly forces: the drone list twice over (JSON blob + legacy
    -- newline positional string), plus its length
    drone_count          INTEGER NOT NULL DEFAULT 0,
    drone_positions      TEXT NOT NULL DEFAULT '',
    drone_payloads       TEXT NOT NULL DEFAULT '',
    -- enemy forces: per-category count + newline position string
    recon_count          INTEGER NOT NULL DEFAULT 0,
    recon_positions      TEXT NOT NULL DEFAULT '',
    helicopter_count     INTEGER NOT NULL DEFAULT 0,
    helicopter_positions TEXT NOT NULL DEFAULT '',
    tank_count           INTEGER NOT NULL DEFAULT 0,
    tank_positions       TEXT NOT NULL DEFAULT '',
    vehicle_count        INTEGER NOT NULL DEFAULT 0,
    vehicle_positions    TEXT NOT NULL DEFAULT '',
    base_count           INTEGER NOT NULL DEFAULT 0,
    base_positions       TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS scenarios_status_idx ON scenarios(status);

-- A rebuildable index over trained-model output directories. The
-- filesystem is the source of record; the synchronizer upserts here and
-- never deletes.
CREATE TABLE IF NOT EXISTS models (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    config_path TEXT NOT NULL UNIQUE,   -- normalized, root-relative
    name        TEXT NOT NULL,
    category    TEXT NOT NULL,          -- 'tracking' | 'confrontation'
    seed        INTEGER,
    version     TEXT NOT NULL,
    algorithm   TEXT,
    environment TEXT,
    scenario    TEXT,
    last_step   INTEGER,
    best_score  REAL,
    status      TEXT NOT NULL DEFAULT 'available'
);

PRAGMA user_version = 1;
";
