use crate::db_models::{DbGasStation, DbMotor, DbReport, ImportBundle};
use crate::models::{GasStation, Motor, Report};
use anyhow::{Context as AnyhowContext, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use turso::{Builder, Connection, Row};

/// Which reports [`DbClient::find_reports`] returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportQuery {
    pub include_archived: bool,
}

/// Client for the Turso (SQLite) store holding reports, gas stations and
/// motors.
pub struct DbClient {
    conn: Arc<Mutex<Connection>>,
    db_file: PathBuf,
}

impl DbClient {
    /// Opens (or creates) the database and initializes the schema.
    pub async fn new(db_file: &Path) -> Result<Self> {
        let turso_db_client = Builder::new_local(db_file.to_str().ok_or_else(|| {
            anyhow::anyhow!("Cannot convert path name to unicode: {:?}", db_file)
        })?)
        .build()
        .await
        .with_context(|| {
            format!("Failed to open db (and/or its wal file). File name: {db_file:?}")
        })?;

        let conn = Arc::new(Mutex::new(turso_db_client.connect()?));

        let client = DbClient {
            conn,
            db_file: PathBuf::from(db_file),
        };
        client
            .init_db()
            .await
            .with_context(|| format!("Failed to init db file {db_file:?} (and/or its wal file)"))?;
        Ok(client)
    }

    /// A private database that lives as long as the client.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        Self::new(Path::new(":memory:")).await
    }

    async fn init_db(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                archived BOOL NOT NULL,
                updated_at TEXT,
                imported_at TEXT NOT NULL,
                document TEXT NOT NULL -- JSON
            )",
            (),
        )
        .await?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS gas_stations (
                id TEXT PRIMARY KEY,
                brand TEXT,
                imported_at TEXT NOT NULL,
                document TEXT NOT NULL -- JSON
            )",
            (),
        )
        .await?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS motors (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                imported_at TEXT NOT NULL,
                document TEXT NOT NULL -- JSON
            )",
            (),
        )
        .await?;
        Ok(())
    }

    /// Stores the entity, replacing an earlier copy with the same id.
    pub async fn insert_report(&self, report: &Report) -> Result<()> {
        let row = DbReport::try_from(report)?;
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM reports WHERE id = ?", (row.id.clone(),))
            .await
            .with_context(|| {
                format!(
                    "Failed to replace report {}. File name: {:?}",
                    row.id, self.db_file
                )
            })?;
        conn.execute(
            "INSERT INTO reports (id, archived, updated_at, imported_at, document) VALUES (?, ?, ?, ?, ?)",
            (
                row.id.clone(),
                row.archived,
                row.updated_at,
                Utc::now().to_rfc3339(),
                row.document,
            ),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to insert report {}. File name: {:?}",
                row.id, self.db_file
            )
        })?;
        Ok(())
    }

    /// Stores the entity, replacing an earlier copy with the same id.
    pub async fn insert_gas_station(&self, station: &GasStation) -> Result<()> {
        let row = DbGasStation::try_from(station)?;
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM gas_stations WHERE id = ?", (row.id.clone(),))
            .await
            .with_context(|| {
                format!(
                    "Failed to replace gas station {}. File name: {:?}",
                    row.id, self.db_file
                )
            })?;
        conn.execute(
            "INSERT INTO gas_stations (id, brand, imported_at, document) VALUES (?, ?, ?, ?)",
            (
                row.id.clone(),
                row.brand,
                Utc::now().to_rfc3339(),
                row.document,
            ),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to insert gas station {}. File name: {:?}",
                row.id, self.db_file
            )
        })?;
        Ok(())
    }

    /// Stores the entity, replacing an earlier copy with the same id.
    pub async fn insert_motor(&self, motor: &Motor) -> Result<()> {
        let row = DbMotor::try_from(motor)?;
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM motors WHERE id = ?", (row.id.clone(),))
            .await
            .with_context(|| {
                format!(
                    "Failed to replace motor {}. File name: {:?}",
                    row.id, self.db_file
                )
            })?;
        conn.execute(
            "INSERT INTO motors (id, user_id, imported_at, document) VALUES (?, ?, ?, ?)",
            (
                row.id.clone(),
                row.user_id,
                Utc::now().to_rfc3339(),
                row.document,
            ),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to insert motor {}. File name: {:?}",
                row.id, self.db_file
            )
        })?;
        Ok(())
    }

    /// Stores every entity of an import bundle. Importing the same bundle
    /// again leaves the store unchanged apart from `imported_at`.
    pub async fn import(&self, bundle: &ImportBundle) -> Result<()> {
        for report in &bundle.reports {
            self.insert_report(report).await?;
        }
        for station in &bundle.gas_stations {
            self.insert_gas_station(station).await?;
        }
        for motor in &bundle.motors {
            self.insert_motor(motor).await?;
        }
        log::info!(
            "Imported {} reports, {} gas stations and {} motors",
            bundle.reports.len(),
            bundle.gas_stations.len(),
            bundle.motors.len()
        );
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
        let sql = if query.include_archived {
            "SELECT id, archived, updated_at, document FROM reports"
        } else {
            "SELECT id, archived, updated_at, document FROM reports WHERE archived = 0"
        };
        let conn = self.conn.lock().await;
        let mut results = conn
            .query(sql, ())
            .await
            .with_context(|| format!("Failed to load reports. File name: {:?}", self.db_file))?;
        let mut reports = Vec::new();
        while let Some(row) = results.next().await? {
            reports.push(Report::try_from(Self::map_row_to_dbreport(row)?)?);
        }
        Ok(reports)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_gas_stations(&self) -> Result<Vec<GasStation>> {
        let conn = self.conn.lock().await;
        let mut results = conn
            .query("SELECT id, brand, document FROM gas_stations", ())
            .await
            .with_context(|| {
                format!("Failed to load gas stations. File name: {:?}", self.db_file)
            })?;
        let mut stations = Vec::new();
        while let Some(row) = results.next().await? {
            let row = DbGasStation {
                id: row.get::<String>(0)?,
                brand: row.get::<Option<String>>(1)?,
                document: row.get::<String>(2)?,
            };
            stations.push(GasStation::try_from(row)?);
        }
        Ok(stations)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_motors(&self, user_id: &str) -> Result<Vec<Motor>> {
        let conn = self.conn.lock().await;
        let mut results = conn
            .query(
                "SELECT id, user_id, document FROM motors WHERE user_id = ?",
                (user_id.to_string(),),
            )
            .await
            .with_context(|| format!("Failed to load motors. File name: {:?}", self.db_file))?;
        let mut motors = Vec::new();
        while let Some(row) = results.next().await? {
            let row = DbMotor {
                id: row.get::<String>(0)?,
                user_id: row.get::<Option<String>>(1)?,
                document: row.get::<String>(2)?,
            };
            motors.push(Motor::try_from(row)?);
        }
        Ok(motors)
    }

    fn map_row_to_dbreport(row: Row) -> Result<DbReport> {
        Ok(DbReport {
            id: row.get::<String>(0)?,
            archived: row.get::<bool>(1)?,
            updated_at: row.get::<Option<String>>(2)?,
            document: row.get::<String>(3)?,
        })
    }
}
