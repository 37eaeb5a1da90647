//! DuckDB-based storage backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Error, Result};
use crate::samples::{BatterySample, LocationSample, MotionSample};
use crate::storage::StorageBackend;

/// Embedded durable store for the three sample relations.
#[derive(Clone)]
pub struct DuckDbBackend {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    device_id: String,
}

impl DuckDbBackend {
    /// Open (or create) the store at `path` and ensure the schema
    /// exists. Idempotent: opening an already-initialized store
    /// neither fails nor duplicates tables. On failure no partial
    /// state is retained.
    pub fn open(path: impl Into<PathBuf>, device_id: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let conn = Connection::open(&path)
            .map_err(|e| Error::Initialization(format!("failed to open store: {e}")))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                device_uid VARCHAR NOT NULL,
                epoch_seconds DOUBLE NOT NULL,
                latitude DOUBLE NOT NULL,
                longitude DOUBLE NOT NULL,
                heading DOUBLE NOT NULL,
                speed DOUBLE NOT NULL,
                altitude DOUBLE NOT NULL
            );
            CREATE TABLE IF NOT EXISTS motion (
                device_uid VARCHAR NOT NULL,
                epoch_seconds DOUBLE NOT NULL,
                accel_x DOUBLE NOT NULL,
                accel_y DOUBLE NOT NULL,
                accel_z DOUBLE NOT NULL
            );
            CREATE TABLE IF NOT EXISTS battery (
                device_uid VARCHAR NOT NULL,
                epoch_seconds DOUBLE NOT NULL,
                charge DOUBLE NOT NULL,
                unplugged BOOLEAN NOT NULL
            );
            "#,
        )
        .map_err(|e| Error::Initialization(format!("failed to create tables: {e}")))?;

        info!(path = %path.display(), "opened telemetry store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            device_id: device_id.into(),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory(device_id: impl Into<String>) -> Result<Self> {
        Self::open(":memory:", device_id)
    }
}

#[async_trait]
impl StorageBackend for DuckDbBackend {
    fn path(&self) -> &Path {
        &self.path
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn append_location(&self, sample: &LocationSample) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO locations (device_uid, epoch_seconds, latitude, longitude, heading, speed, altitude) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                self.device_id,
                sample.epoch_seconds,
                sample.latitude,
                sample.longitude,
                sample.heading,
                sample.speed,
                sample.altitude,
            ],
        )
        .map_err(|e| Error::Append(format!("location insert failed: {e}")))?;
        Ok(())
    }

    async fn append_motion(&self, sample: &MotionSample) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO motion (device_uid, epoch_seconds, accel_x, accel_y, accel_z) \
             VALUES (?, ?, ?, ?, ?)",
            params![
                self.device_id,
                sample.epoch_seconds,
                sample.accel_x,
                sample.accel_y,
                sample.accel_z,
            ],
        )
        .map_err(|e| Error::Append(format!("motion insert failed: {e}")))?;
        Ok(())
    }

    async fn append_battery(&self, sample: &BatterySample) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO battery (device_uid, epoch_seconds, charge, unplugged) \
             VALUES (?, ?, ?, ?)",
            params![
                self.device_id,
                sample.epoch_seconds,
                sample.charge,
                sample.unplugged,
            ],
        )
        .map_err(|e| Error::Append(format!("battery insert failed: {e}")))?;
        Ok(())
    }

    async fn locations_since(&self, epoch_seconds: f64) -> Result<Vec<LocationSample>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT epoch_seconds, latitude, longitude, heading, speed, altitude \
                 FROM locations WHERE device_uid = ? AND epoch_seconds >= ?",
            )
            .map_err(|e| Error::Query(format!("location query failed: {e}")))?;
        let rows = stmt
            .query_map(params![self.device_id, epoch_seconds], |row| {
                Ok(LocationSample {
                    epoch_seconds: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    heading: row.get(3)?,
                    speed: row.get(4)?,
                    altitude: row.get(5)?,
                })
            })
            .map_err(|e| Error::Query(format!("location query failed: {e}")))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Query(format!("location row decode failed: {e}")))
    }

    async fn motion_since(&self, epoch_seconds: f64) -> Result<Vec<MotionSample>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT epoch_seconds, accel_x, accel_y, accel_z \
                 FROM motion WHERE device_uid = ? AND epoch_seconds >= ?",
            )
            .map_err(|e| Error::Query(format!("motion query failed: {e}")))?;
        let rows = stmt
            .query_map(params![self.device_id, epoch_seconds], |row| {
                Ok(MotionSample {
                    epoch_seconds: row.get(0)?,
                    accel_x: row.get(1)?,
                    accel_y: row.get(2)?,
                    accel_z: row.get(3)?,
                })
            })
            .map_err(|e| Error::Query(format!("motion query failed: {e}")))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Query(format!("motion row decode failed: {e}")))
    }

    async fn battery_since(&self, epoch_seconds: f64) -> Result<Vec<BatterySample>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT epoch_seconds, charge, unplugged \
                 FROM battery WHERE device_uid = ? AND epoch_seconds >= ?",
            )
            .map_err(|e| Error::Query(format!("battery query failed: {e}")))?;
        let rows = stmt
            .query_map(params![self.device_id, epoch_seconds], |row| {
                Ok(BatterySample {
                    epoch_seconds: row.get(0)?,
                    charge: row.get(1)?,
                    unplugged: row.get(2)?,
                })
            })
            .map_err(|e| Error::Query(format!("battery query failed: {e}")))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Query(format!("battery row decode failed: {e}")))
    }

    async fn location_count(&self) -> Result<u64> {
        self.count("locations").await
    }

    async fn motion_count(&self) -> Result<u64> {
        self.count("motion").await
    }

    async fn battery_count(&self) -> Result<u64> {
        self.count("battery").await
    }
}

impl DuckDbBackend {
    async fn count(&self, table: &str) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE device_uid = ?"),
                params![self.device_id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Query(format!("count query failed: {e}")))?;
        Ok(count as u64)
    }
}
