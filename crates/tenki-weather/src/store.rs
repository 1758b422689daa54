//! SQLite history of fetched forecasts.
//!
//! Writes are append-only: every call to [`ForecastStore::persist`] inserts a
//! fresh `regions` row per area group, even when a row with the same name
//! already exists, so repeating a fetch duplicates its rows.
//!
//! Foreign keys are enforced only when `weather.area_id` references
//! `regions`. Older files declare it against `areas` while storing region
//! ids; those are opened with enforcement off so appends keep working.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use tenki_core::error::RusqliteErrorExt;
use tenki_core::{DatabaseError, ForecastError};

use crate::types::AreaForecast;

/// Store handle shared between the resolver and blocking tasks.
pub type SharedStore = Arc<Mutex<ForecastStore>>;

/// Rows written by one [`ForecastStore::persist`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistSummary {
    pub regions: usize,
    pub observations: usize,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableCounts {
    pub regions: u64,
    pub prefectures: u64,
    pub areas: u64,
    pub weather: u64,
}

/// A stored `weather` row joined with its parent name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObservation {
    pub id: i64,
    pub area_name: String,
    pub date_time: String,
    pub weather: String,
    pub wind: String,
    pub wave: String,
}

pub struct ForecastStore {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> ForecastError {
    ForecastError::Persistence(e.into_database_error())
}

impl ForecastStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    ///
    /// # Errors
    /// `Persistence` if the file cannot be opened or the schema cannot be
    /// created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            ForecastError::Persistence(DatabaseError::ConnectionFailed(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        let store = Self::from_connection(conn)?;
        tracing::info!(path = %path.display(), "Opened forecast store");
        Ok(store)
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    /// `Persistence` if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self, ForecastError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            ForecastError::Persistence(DatabaseError::ConnectionFailed(e.to_string()))
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, ForecastError> {
        let store = Self { conn };
        store.create_tables()?;

        let parent = store.weather_parent_table()?;
        let enforce = parent.as_deref() == Some("regions");
        if !enforce {
            tracing::warn!(
                parent = parent.as_deref().unwrap_or("none"),
                "weather.area_id does not reference regions; foreign keys not enforced"
            );
        }
        store
            .conn
            .pragma_update(None, "foreign_keys", enforce)
            .map_err(db_err)?;
        Ok(store)
    }

    /// Table that `weather.area_id` is declared to reference, if any.
    fn weather_parent_table(&self) -> Result<Option<String>, ForecastError> {
        self.conn
            .query_row(
                r#"SELECT "table" FROM pragma_foreign_key_list('weather') WHERE "from" = 'area_id'"#,
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    /// Whether SQLite is currently enforcing foreign keys on this connection.
    ///
    /// # Errors
    /// `Persistence` if the pragma cannot be read.
    pub fn foreign_keys_enforced(&self) -> Result<bool, ForecastError> {
        self.conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .map_err(db_err)
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Create the schema. Safe to call repeatedly; existing rows are kept.
    ///
    /// # Errors
    /// `Persistence(SchemaFailed)` if any statement fails.
    pub fn create_tables(&self) -> Result<(), ForecastError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS regions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS prefectures (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    region_id INTEGER,
                    FOREIGN KEY (region_id) REFERENCES regions (id)
                );

                CREATE TABLE IF NOT EXISTS areas (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    area_name TEXT NOT NULL,
                    prefecture_name TEXT NOT NULL,
                    prefecture_id INTEGER,
                    FOREIGN KEY (prefecture_id) REFERENCES prefectures (id)
                );

                CREATE TABLE IF NOT EXISTS weather (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    area_id INTEGER NOT NULL,
                    date_time TEXT,
                    weather TEXT,
                    wind TEXT,
                    wave TEXT,
                    FOREIGN KEY (area_id) REFERENCES regions (id)
                );

                CREATE INDEX IF NOT EXISTS idx_weather_area ON weather(area_id);
                "#,
            )
            .map_err(|e| ForecastError::Persistence(DatabaseError::SchemaFailed(e.to_string())))
    }

    /// Append one parent row per area and one `weather` row per record.
    ///
    /// Runs in a single transaction: a failure leaves no rows from this call.
    ///
    /// # Errors
    /// `Persistence` if any insert or the commit fails.
    pub fn persist(&mut self, areas: &[AreaForecast]) -> Result<PersistSummary, ForecastError> {
        let tx = self.conn.transaction().map_err(db_err)?;
        let mut summary = PersistSummary::default();

        {
            let mut insert_region = tx
                .prepare("INSERT INTO regions (name) VALUES (?1)")
                .map_err(db_err)?;
            let mut insert_weather = tx
                .prepare(
                    "INSERT INTO weather (area_id, date_time, weather, wind, wave)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(db_err)?;

            for area in areas {
                let area_id = insert_region
                    .insert(params![area.area_name])
                    .map_err(db_err)?;
                summary.regions += 1;

                for record in &area.records {
                    insert_weather
                        .execute(params![
                            area_id,
                            record.timestamp,
                            record.weather_text(),
                            record.wind_text(),
                            record.wave_text(),
                        ])
                        .map_err(db_err)?;
                    summary.observations += 1;
                }
            }
        }

        tx.commit().map_err(db_err)?;
        tracing::info!(
            regions = summary.regions,
            observations = summary.observations,
            "Persisted forecast"
        );
        Ok(summary)
    }

    /// # Errors
    /// `Persistence` if a table cannot be read.
    pub fn counts(&self) -> Result<TableCounts, ForecastError> {
        let count = |table: &str| -> Result<u64, ForecastError> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| n as u64)
                .map_err(db_err)
        };

        Ok(TableCounts {
            regions: count("regions")?,
            prefectures: count("prefectures")?,
            areas: count("areas")?,
            weather: count("weather")?,
        })
    }

    /// All stored observations for an area name, oldest insert first.
    ///
    /// # Errors
    /// `Persistence` if the query fails.
    pub fn observations_for(&self, area_name: &str) -> Result<Vec<StoredObservation>, ForecastError> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT w.id, r.name, w.date_time, w.weather, w.wind, w.wave
                FROM weather w
                JOIN regions r ON r.id = w.area_id
                WHERE r.name = ?1
                ORDER BY w.id ASC
                "#,
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![area_name], |row| {
                Ok(StoredObservation {
                    id: row.get(0)?,
                    area_name: row.get(1)?,
                    date_time: row.get(2)?,
                    weather: row.get(3)?,
                    wind: row.get(4)?,
                    wave: row.get(5)?,
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::types::{ForecastRecord, ForecastValue};

    fn tokyo() -> Vec<AreaForecast> {
        let record = |t: &str, weather: ForecastValue| ForecastRecord {
            area_name: "Tokyo".to_string(),
            timestamp: t.to_string(),
            weather,
            wind: ForecastValue::from("Calm"),
            wave: ForecastValue::Missing,
        };
        vec![AreaForecast {
            area_name: "Tokyo".to_string(),
            records: vec![
                record("t0", ForecastValue::from("Sunny")),
                record("t1", ForecastValue::Missing),
            ],
        }]
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let mut store = ForecastStore::in_memory().unwrap();
        store.persist(&tokyo()).unwrap();
        let before = store.counts().unwrap();

        store.create_tables().unwrap();
        store.create_tables().unwrap();

        assert_eq!(store.counts().unwrap(), before);
    }

    #[test]
    fn test_persist_writes_rendered_sentinels() {
        let mut store = ForecastStore::in_memory().unwrap();
        let summary = store.persist(&tokyo()).unwrap();
        assert_eq!(summary, PersistSummary { regions: 1, observations: 2 });

        let rows = store.observations_for("Tokyo").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].weather, "Sunny");
        assert_eq!(rows[1].weather, "N/A");
        assert_eq!(rows[1].wave, "なし");
        assert_eq!(rows[1].date_time, "t1");
    }

    #[test]
    fn test_persist_twice_duplicates_rows() {
        let mut store = ForecastStore::in_memory().unwrap();
        store.persist(&tokyo()).unwrap();
        let once = store.counts().unwrap();
        store.persist(&tokyo()).unwrap();
        let twice = store.counts().unwrap();

        assert_eq!(twice.weather, once.weather * 2);
        assert_eq!(twice.regions, once.regions * 2);
        assert_eq!(store.observations_for("Tokyo").unwrap().len(), 4);
    }

    #[test]
    fn test_empty_persist_writes_nothing() {
        let mut store = ForecastStore::in_memory().unwrap();
        assert_eq!(store.persist(&[]).unwrap(), PersistSummary::default());
        assert_eq!(store.counts().unwrap(), TableCounts::default());
    }

    #[test]
    fn test_new_database_enforces_foreign_keys() {
        let store = ForecastStore::in_memory().unwrap();
        assert!(store.foreign_keys_enforced().unwrap());
    }

    #[test]
    fn test_persist_into_legacy_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                r#"
                CREATE TABLE regions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL
                );
                CREATE TABLE prefectures (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    region_id INTEGER,
                    FOREIGN KEY (region_id) REFERENCES regions (id)
                );
                CREATE TABLE areas (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    area_name TEXT NOT NULL,
                    prefecture_name TEXT NOT NULL,
                    prefecture_id INTEGER,
                    FOREIGN KEY (prefecture_id) REFERENCES prefectures (id)
                );
                CREATE TABLE weather (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    area_id INTEGER,
                    date_time TEXT,
                    weather TEXT,
                    wind TEXT,
                    wave TEXT,
                    FOREIGN KEY (area_id) REFERENCES areas (id)
                );
                "#,
            )
            .unwrap();

        let mut store = ForecastStore::open(&path).unwrap();
        assert!(!store.foreign_keys_enforced().unwrap());

        let summary = store.persist(&tokyo()).unwrap();
        assert_eq!(summary, PersistSummary { regions: 1, observations: 2 });
        assert_eq!(store.observations_for("Tokyo").unwrap().len(), 2);
        assert_eq!(store.counts().unwrap().areas, 0);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather.db");

        {
            let mut store = ForecastStore::open(&path).unwrap();
            store.persist(&tokyo()).unwrap();
        }

        let store = ForecastStore::open(&path).unwrap();
        assert_eq!(store.counts().unwrap().weather, 2);
    }
}
