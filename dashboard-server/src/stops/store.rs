//! SQLite-backed stop table.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::error::StopsError;
use super::model::StopRecord;

const CREATE_STOPS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS stops (
        stop_id             TEXT PRIMARY KEY NOT NULL,
        stop_name           TEXT NOT NULL,
        stop_lat            REAL NOT NULL,
        stop_lon            REAL NOT NULL,
        stop_desc           TEXT,
        location_type       TEXT,
        parent_station      TEXT,
        wheelchair_boarding TEXT,
        vehicle_type        TEXT,
        platform_code       TEXT
    )";

const CREATE_NAME_INDEX: &str = "CREATE INDEX IF NOT EXISTS stops_by_name ON stops (stop_name)";

const SELECT_STOPS: &str = "
    SELECT stop_id, stop_name, stop_lat, stop_lon, stop_desc, location_type,
           parent_station, wheelchair_boarding, vehicle_type, platform_code
    FROM stops";

/// Persistent store of GTFS stops.
#[derive(Debug, Clone)]
pub struct StopStore {
    pool: SqlitePool,
}

impl StopStore {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self, StopsError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database.
    ///
    /// Held on a single connection that is never recycled, since every
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, StopsError> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StopsError> {
        sqlx::query(CREATE_STOPS_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_NAME_INDEX).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Number of stops in the table.
    pub async fn count(&self) -> Result<i64, StopsError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stops")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert all stops in one transaction.
    ///
    /// Either every row is written or none is. Duplicate ids keep the last row.
    pub async fn insert_all(&self, stops: &[StopRecord]) -> Result<u64, StopsError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for stop in stops {
            let result = sqlx::query(
                "INSERT OR REPLACE INTO stops (
                    stop_id, stop_name, stop_lat, stop_lon, stop_desc, location_type,
                    parent_station, wheelchair_boarding, vehicle_type, platform_code
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&stop.stop_id)
            .bind(&stop.stop_name)
            .bind(stop.stop_lat)
            .bind(stop.stop_lon)
            .bind(&stop.stop_desc)
            .bind(&stop.location_type)
            .bind(&stop.parent_station)
            .bind(&stop.wheelchair_boarding)
            .bind(&stop.vehicle_type)
            .bind(&stop.platform_code)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Look up a stop by its exact id.
    pub async fn find_by_id(&self, stop_id: &str) -> Result<Option<StopRecord>, StopsError> {
        let stop = sqlx::query_as(&format!("{SELECT_STOPS} WHERE stop_id = ?"))
            .bind(stop_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stop)
    }

    /// Stops whose name contains `fragment` (ASCII case-insensitive),
    /// ordered by name.
    pub async fn search_by_name(&self, fragment: &str) -> Result<Vec<StopRecord>, StopsError> {
        let pattern = format!("%{}%", escape_like(fragment));
        let stops = sqlx::query_as(&format!(
            "{SELECT_STOPS} WHERE stop_name LIKE ? ESCAPE '\\' ORDER BY stop_name, stop_id"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(stops)
    }

    /// Every stop, ordered by name.
    pub async fn all(&self) -> Result<Vec<StopRecord>, StopsError> {
        let stops = sqlx::query_as(&format!("{SELECT_STOPS} ORDER BY stop_name, stop_id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(stops)
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
