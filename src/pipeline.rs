//! Filter → marker → cluster composition shared by the map endpoints.

use crate::error::ApiError;
use crate::filters;
use crate::markers;
use crate::models::{GasStation, GeoPoint, MapFilters, Marker, Report};
use crate::utils;
use crate::viewport::Viewport;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Reads an entity list from a request body field. A missing or `null` field
/// is `None`; anything other than an array is a bad request. Elements that
/// aren't objects of the expected shape are dropped.
pub fn parse_entity_list<T: DeserializeOwned>(
    value: Option<Value>,
    field: &str,
) -> Result<Option<Vec<T>>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(utils::parse_elements(items, field))),
        Some(_) => Err(ApiError::bad_request(format!("{field} must be an array"))),
    }
}

/// Optional narrowing applied on top of the validity filters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Selection<'a> {
    pub filters: Option<&'a MapFilters>,
    pub viewport: Option<&'a Viewport>,
    /// Centre and radius in meters.
    pub near: Option<(GeoPoint, f64)>,
}

impl<'a> Selection<'a> {
    /// Builds the radius restriction from loose parameters; it only applies
    /// when the centre is valid and the radius is a non-negative number.
    pub fn near_from(
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius: Option<f64>,
    ) -> Option<(GeoPoint, f64)> {
        let center = GeoPoint::new(latitude?, longitude?);
        let radius = radius.filter(|r| r.is_finite() && *r >= 0.0)?;
        center.is_valid().then_some((center, radius))
    }
}

pub fn select_reports(reports: &[Report], selection: &Selection<'_>) -> Vec<Report> {
    let mut selected = filters::filter_reports(reports);
    if let Some(map_filters) = selection.filters {
        selected = filters::apply_filters(&selected, map_filters);
    }
    if let Some(viewport) = selection.viewport {
        selected = filters::within_viewport(selected, viewport, filters::report_point);
    }
    if let Some((center, radius)) = selection.near {
        selected = filters::within_radius(selected, &center, radius, filters::report_point);
    }
    selected
}

pub fn select_gas_stations(stations: &[GasStation], selection: &Selection<'_>) -> Vec<GasStation> {
    let mut selected = filters::filter_gas_stations(stations);
    if let Some(map_filters) = selection.filters {
        selected = filters::apply_gas_station_filters(&selected, map_filters);
    }
    if let Some(viewport) = selection.viewport {
        selected = filters::within_viewport(selected, viewport, filters::station_point);
    }
    if let Some((center, radius)) = selection.near {
        selected = filters::within_radius(selected, &center, radius, filters::station_point);
    }
    selected
}

/// Report markers followed by gas-station markers.
pub fn entity_markers(reports: &[Report], stations: &[GasStation]) -> Vec<Marker> {
    let mut all = markers::generate_report_markers(reports);
    all.extend(markers::generate_gas_station_markers(stations));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{self, ClusterOptions};
    use crate::models::{ClusterKind, MarkerKind};
    use serde_json::json;

    #[test]
    fn test_parse_entity_list() {
        let parsed: Option<Vec<Report>> =
            parse_entity_list(Some(json!([{"_id": "1"}, 5, {"_id": "2"}])), "reports").unwrap();
        assert_eq!(parsed.map(|r| r.len()), Some(2));

        let missing: Option<Vec<Report>> = parse_entity_list(None, "reports").unwrap();
        assert!(missing.is_none());

        let err = parse_entity_list::<Report>(Some(json!({"_id": "1"})), "reports").unwrap_err();
        assert_eq!(err.to_string(), "reports must be an array");
    }

    #[test]
    fn test_near_from_requires_all_parts() {
        assert!(Selection::near_from(Some(14.0), Some(121.0), Some(500.0)).is_some());
        assert!(Selection::near_from(Some(14.0), None, Some(500.0)).is_none());
        assert!(Selection::near_from(Some(14.0), Some(121.0), Some(-1.0)).is_none());
        assert!(Selection::near_from(Some(95.0), Some(121.0), Some(500.0)).is_none());
    }

    #[test]
    fn test_three_reports_cluster_and_distant_station_stays_single() {
        let reports: Vec<Report> = serde_json::from_value(json!([
            {"_id": "r1", "reportType": "Accident", "location": {"latitude": 14.6, "longitude": 121.0}},
            {"_id": "r2", "reportType": "Hazard", "location": {"latitude": 14.6, "longitude": 121.0}},
            {"_id": "r3", "reportType": "Traffic Jam", "location": {"latitude": 14.6, "longitude": 121.0}}
        ]))
        .unwrap();
        // ~5 km north
        let stations: Vec<GasStation> = serde_json::from_value(json!([
            {"_id": "g1", "brand": "Petron",
             "location": {"type": "Point", "coordinates": [121.0, 14.645]}}
        ]))
        .unwrap();

        let selection = Selection::default();
        let reports = select_reports(&reports, &selection);
        let stations = select_gas_stations(&stations, &selection);
        let all = entity_markers(&reports, &stations);
        assert_eq!(all.len(), 4);

        let clustering = cluster::cluster_with_fallback(&all, 8.0, &ClusterOptions::default());
        let clusters = &clustering.clusters;
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count, 3);
        assert_eq!(clusters[0].kind, ClusterKind::Report);

        let loose = &clustering.unclustered;
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].id, "g1");
        assert_eq!(loose[0].kind, MarkerKind::GasStation);
    }

    #[test]
    fn test_selection_applies_filters_viewport_and_radius() {
        let reports: Vec<Report> = serde_json::from_value(json!([
            {"_id": "near", "reportType": "Accident", "location": {"latitude": 14.6, "longitude": 121.0}},
            {"_id": "hazard", "reportType": "Hazard", "location": {"latitude": 14.6, "longitude": 121.0}},
            {"_id": "far", "reportType": "Accident", "location": {"latitude": 14.65, "longitude": 121.0}},
            {"_id": "outside", "reportType": "Accident", "location": {"latitude": 15.5, "longitude": 121.0}}
        ]))
        .unwrap();
        let map_filters = MapFilters {
            show_hazards: Some(false),
            ..Default::default()
        };
        let viewport = Viewport {
            north: 15.0,
            south: 14.0,
            east: 122.0,
            west: 120.0,
        };

        let selection = Selection {
            filters: Some(&map_filters),
            viewport: Some(&viewport),
            near: None,
        };
        let ids: Vec<String> = select_reports(&reports, &selection)
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["near".to_string(), "far".to_string()]);

        let selection = Selection {
            near: Selection::near_from(Some(14.6), Some(121.0), Some(1_000.0)),
            ..selection
        };
        let ids: Vec<String> = select_reports(&reports, &selection)
            .into_iter()
            .filter_map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["near".to_string()]);
    }
}
