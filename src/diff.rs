//! Change detection between two report snapshots, used by polling clients to
//! apply small deltas instead of re-rendering every report.

use crate::models::{GeoPoint, Report};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Location moves smaller than this many degrees (on both axes) are noise.
pub const LOCATION_DEADBAND_DEG: f64 = 0.0001;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub from: Value,
    pub to: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedReport {
    pub id: String,
    pub changes: BTreeMap<&'static str, FieldChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<ModifiedReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStatistics {
    pub current_count: usize,
    pub fresh_count: usize,
    pub added_count: usize,
    pub removed_count: usize,
    pub modified_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub has_changes: bool,
    pub changes: ReportChanges,
    pub statistics: DiffStatistics,
}

/// The fields of a report that matter for change detection.
struct Snapshot<'a> {
    status: Option<&'a str>,
    archived: bool,
    updated_at: Option<&'a str>,
    location: Option<GeoPoint>,
}

impl<'a> Snapshot<'a> {
    fn of(report: &'a Report) -> Self {
        Snapshot {
            status: report.status.as_deref(),
            archived: report.is_archived(),
            updated_at: report.updated_at.as_deref(),
            location: report.location.as_ref().and_then(|l| l.point()),
        }
    }
}

/// Indexes reports by id, keeping first-seen order. Reports without an id
/// can't be tracked and are left out.
fn index(reports: &[Report]) -> (Vec<&str>, HashMap<&str, Snapshot<'_>>) {
    let mut order = Vec::new();
    let mut map = HashMap::new();
    for report in reports {
        let Some(id) = report.id.as_deref() else {
            continue;
        };
        if map.insert(id, Snapshot::of(report)).is_none() {
            order.push(id);
        }
    }
    (order, map)
}

fn location_moved(from: Option<GeoPoint>, to: Option<GeoPoint>) -> bool {
    match (from, to) {
        (Some(a), Some(b)) => {
            (a.latitude - b.latitude).abs() > LOCATION_DEADBAND_DEG
                || (a.longitude - b.longitude).abs() > LOCATION_DEADBAND_DEG
        }
        (None, None) => false,
        _ => true,
    }
}

fn location_value(point: Option<GeoPoint>) -> Value {
    point
        .and_then(|p| serde_json::to_value(p).ok())
        .unwrap_or(Value::Null)
}

fn compare(current: &Snapshot<'_>, fresh: &Snapshot<'_>) -> BTreeMap<&'static str, FieldChange> {
    let mut changes = BTreeMap::new();

    if current.status != fresh.status {
        changes.insert(
            "status",
            FieldChange {
                from: current.status.map_or(Value::Null, Value::from),
                to: fresh.status.map_or(Value::Null, Value::from),
            },
        );
    }
    if current.archived != fresh.archived {
        changes.insert(
            "archived",
            FieldChange {
                from: Value::Bool(current.archived),
                to: Value::Bool(fresh.archived),
            },
        );
    }
    if location_moved(current.location, fresh.location) {
        changes.insert(
            "location",
            FieldChange {
                from: location_value(current.location),
                to: location_value(fresh.location),
            },
        );
    }

    changes
}

/// Compares two report snapshots. `None` stands for an input that wasn't an
/// array: it is compared as empty and always reports a change.
pub fn diff_reports(current: Option<&[Report]>, fresh: Option<&[Report]>) -> DiffResult {
    let forced = current.is_none() || fresh.is_none();
    let current = current.unwrap_or_default();
    let fresh = fresh.unwrap_or_default();

    let (current_order, current_map) = index(current);
    let (fresh_order, fresh_map) = index(fresh);

    let removed: Vec<String> = current_order
        .iter()
        .filter(|id| !fresh_map.contains_key(*id))
        .map(|id| id.to_string())
        .collect();

    let mut added = Vec::new();
    let mut modified = Vec::new();
    for id in &fresh_order {
        let fresh_snapshot = &fresh_map[id];
        match current_map.get(id) {
            None => added.push(id.to_string()),
            Some(current_snapshot) => {
                let changes = compare(current_snapshot, fresh_snapshot);
                if !changes.is_empty() {
                    modified.push(ModifiedReport {
                        id: id.to_string(),
                        changes,
                        updated_at: fresh_snapshot.updated_at.map(str::to_string),
                    });
                }
            }
        }
    }

    let has_changes = forced
        || current.len() != fresh.len()
        || !added.is_empty()
        || !removed.is_empty()
        || !modified.is_empty();

    let statistics = DiffStatistics {
        current_count: current.len(),
        fresh_count: fresh.len(),
        added_count: added.len(),
        removed_count: removed.len(),
        modified_count: modified.len(),
    };

    if has_changes {
        log::debug!("Report diff: {statistics:?}");
    }

    DiffResult {
        has_changes,
        changes: ReportChanges {
            added,
            removed,
            modified,
        },
        statistics,
    }
}
