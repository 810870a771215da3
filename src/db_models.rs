use crate::models::{GasStation, Motor, Report};
use crate::utils;
use anyhow::{Context, Result};
use serde::Deserialize;

/// A report as stored in the `reports` table: the indexed columns plus the
/// whole document as JSON.
#[derive(Debug, Clone)]
pub struct DbReport {
    pub id: String,
    pub archived: bool,
    pub updated_at: Option<String>,
    pub document: String,
}

impl TryFrom<&Report> for DbReport {
    type Error = anyhow::Error;

    /// Reports without an id are stored under a generated one.
    fn try_from(report: &Report) -> Result<Self> {
        let mut report = report.clone();
        let id = report.id.get_or_insert_with(utils::generate_id).clone();
        Ok(Self {
            id,
            archived: report.is_archived(),
            updated_at: report.updated_at.clone(),
            document: serde_json::to_string(&report)?,
        })
    }
}

impl TryFrom<DbReport> for Report {
    type Error = anyhow::Error;

    fn try_from(row: DbReport) -> Result<Self> {
        serde_json::from_str(&row.document)
            .with_context(|| format!("Corrupt report document {}", row.id))
    }
}

#[derive(Debug, Clone)]
pub struct DbGasStation {
    pub id: String,
    pub brand: Option<String>,
    pub document: String,
}

impl TryFrom<&GasStation> for DbGasStation {
    type Error = anyhow::Error;

    fn try_from(station: &GasStation) -> Result<Self> {
        let mut station = station.clone();
        let id = station.id.get_or_insert_with(utils::generate_id).clone();
        Ok(Self {
            id,
            brand: station.brand.clone(),
            document: serde_json::to_string(&station)?,
        })
    }
}

impl TryFrom<DbGasStation> for GasStation {
    type Error = anyhow::Error;

    fn try_from(row: DbGasStation) -> Result<Self> {
        serde_json::from_str(&row.document)
            .with_context(|| format!("Corrupt gas station document {}", row.id))
    }
}

#[derive(Debug, Clone)]
pub struct DbMotor {
    pub id: String,
    pub user_id: Option<String>,
    pub document: String,
}

impl TryFrom<&Motor> for DbMotor {
    type Error = anyhow::Error;

    fn try_from(motor: &Motor) -> Result<Self> {
        let mut motor = motor.clone();
        let id = motor.id.get_or_insert_with(utils::generate_id).clone();
        Ok(Self {
            id,
            user_id: motor.user_id.clone(),
            document: serde_json::to_string(&motor)?,
        })
    }
}

impl TryFrom<DbMotor> for Motor {
    type Error = anyhow::Error;

    fn try_from(row: DbMotor) -> Result<Self> {
        serde_json::from_str(&row.document)
            .with_context(|| format!("Corrupt motor document {}", row.id))
    }
}

/// Contents of an `--import-file`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBundle {
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub gas_stations: Vec<GasStation>,
    #[serde(default)]
    pub motors: Vec<Motor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_row_round_trip_keeps_document() {
        let report: Report = serde_json::from_value(json!({
            "_id": "r1",
            "archived": true,
            "updatedAt": "2024-05-01T00:00:00Z",
            "location": {"latitude": 1.0, "longitude": 2.0},
            "upvotes": 4
        }))
        .unwrap();
        let row = DbReport::try_from(&report).unwrap();
        assert_eq!(row.id, "r1");
        assert!(row.archived);
        assert_eq!(row.updated_at.as_deref(), Some("2024-05-01T00:00:00Z"));
        assert_eq!(Report::try_from(row).unwrap(), report);
    }

    #[test]
    fn test_missing_id_is_generated_and_stored_in_document() {
        let row = DbGasStation::try_from(&GasStation::default()).unwrap();
        assert_eq!(row.id.len(), 16);
        let station = GasStation::try_from(row.clone()).unwrap();
        assert_eq!(station.id, Some(row.id));
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let row = DbMotor {
            id: "m1".to_string(),
            user_id: None,
            document: "{".to_string(),
        };
        assert!(Motor::try_from(row).is_err());
    }
}
