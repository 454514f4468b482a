//! `SQLite` implementation of [`DeviceStore`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use fleetsync_app::ports::DeviceStore;
use fleetsync_domain::device::{Device, DeviceType, Sensor};
use fleetsync_domain::error::{ConflictError, FleetError};
use fleetsync_domain::id::DeviceId;
use fleetsync_domain::time::Timestamp;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Device> {
        value.map(|w| w.0)
    }
}

fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.to_utc())
        .map_err(decode_err)
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let device_type: String = row.try_get("type")?;
        let name: String = row.try_get("name")?;
        let sensors_json: String = row.try_get("sensors")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        let id = DeviceId::from_str(&id).map_err(decode_err)?;
        let device_type = DeviceType::from_str(&device_type).map_err(decode_err)?;
        let sensors: Vec<Sensor> = serde_json::from_str(&sensors_json).map_err(decode_err)?;

        Ok(Self(Device {
            id,
            device_type,
            name,
            sensors,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }
}

/// Map a failed write, turning a `UNIQUE(name)` violation into a conflict.
fn write_error(err: sqlx::Error, name: &str) -> FleetError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => ConflictError {
            name: name.to_string(),
        }
        .into(),
        _ => StorageError::from(err).into(),
    }
}

const INSERT: &str = r"
    INSERT INTO devices (id, type, name, sensors, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?)
";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE id = ?";
const SELECT_BY_NAME: &str = "SELECT * FROM devices WHERE name = ?";
const SELECT_ALL: &str = "SELECT * FROM devices ORDER BY created_at";
const UPDATE: &str = r"
    UPDATE devices
    SET type = ?, name = ?, sensors = ?, created_at = ?, updated_at = ?
    WHERE id = ?
";
const UPDATE_READINGS: &str =
    "UPDATE devices SET sensors = ?, updated_at = ? WHERE id = ? RETURNING *";
const DELETE_BY_ID: &str = "DELETE FROM devices WHERE id = ? RETURNING *";

/// `SQLite`-backed device store.
#[derive(Clone)]
pub struct SqliteDeviceStore {
    pool: SqlitePool,
}

impl SqliteDeviceStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeviceStore for SqliteDeviceStore {
    fn insert(&self, device: Device) -> impl Future<Output = Result<Device, FleetError>> + Send {
        let pool = self.pool.clone();
        async move {
            let sensors_json = serde_json::to_string(&device.sensors).map_err(StorageError::from)?;

            sqlx::query(INSERT)
                .bind(device.id.to_string())
                .bind(device.device_type.as_str())
                .bind(&device.name)
                .bind(&sensors_json)
                .bind(device.created_at.to_rfc3339())
                .bind(device.updated_at.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(|err| write_error(err, &device.name))?;

            Ok(device)
        }
    }

    fn find_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<Device>, FleetError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let pool = self.pool.clone();
        let name = name.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_NAME)
                .bind(name)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn update(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let pool = self.pool.clone();
        async move {
            let sensors_json = serde_json::to_string(&device.sensors).map_err(StorageError::from)?;

            let result = sqlx::query(UPDATE)
                .bind(device.device_type.as_str())
                .bind(&device.name)
                .bind(&sensors_json)
                .bind(device.created_at.to_rfc3339())
                .bind(device.updated_at.to_rfc3339())
                .bind(device.id.to_string())
                .execute(&pool)
                .await
                .map_err(|err| write_error(err, &device.name))?;

            Ok((result.rows_affected() > 0).then_some(device))
        }
    }

    fn delete(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(DELETE_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn write_readings(
        &self,
        id: DeviceId,
        sensors: Vec<Sensor>,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let pool = self.pool.clone();
        async move {
            let sensors_json = serde_json::to_string(&sensors).map_err(StorageError::from)?;

            let row: Option<Wrapper> = sqlx::query_as(UPDATE_READINGS)
                .bind(&sensors_json)
                .bind(at.to_rfc3339())
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }
}
