//! Narrowing of report and gas-station sets before they reach the map.
//!
//! Every function here only removes elements; the survivors are handed back
//! unchanged and in input order.

use crate::models::{GasStation, GeoPoint, MapFilters, Report, ReportType};
use crate::viewport::Viewport;

/// Statuses that keep a report off the map even when `archived` isn't set.
const HIDDEN_STATUSES: [&str; 2] = ["archived", "deleted"];

/// Keeps reports that have a valid location and are neither archived nor
/// deleted.
pub fn filter_reports(reports: &[Report]) -> Vec<Report> {
    reports
        .iter()
        .filter(|report| is_displayable_report(report))
        .cloned()
        .collect()
}

pub fn is_displayable_report(report: &Report) -> bool {
    let Some(location) = report.location.as_ref() else {
        return false;
    };
    if report.is_archived() {
        return false;
    }
    if report
        .status
        .as_deref()
        .is_some_and(|status| HIDDEN_STATUSES.contains(&status))
    {
        return false;
    }
    location.valid_point().is_some()
}

/// Keeps stations whose GeoJSON coordinates form a valid point.
pub fn filter_gas_stations(stations: &[GasStation]) -> Vec<GasStation> {
    stations
        .iter()
        .filter(|station| station_point(station).is_some())
        .cloned()
        .collect()
}

/// The station's position, swapped from GeoJSON `[lng, lat]` order.
pub fn station_point(station: &GasStation) -> Option<GeoPoint> {
    station
        .location
        .as_ref()?
        .geojson_point()
        .filter(GeoPoint::is_valid)
}

pub fn report_point(report: &Report) -> Option<GeoPoint> {
    report.location.as_ref()?.valid_point()
}

/// The report types hidden by a show/hide toggle set to `false`.
fn hidden_types(filters: &MapFilters) -> Vec<ReportType> {
    let toggles = [
        (filters.show_traffic_reports, ReportType::TrafficJam),
        (filters.show_accidents, ReportType::Accident),
        (filters.show_roadwork, ReportType::Construction),
        (filters.show_hazards, ReportType::Hazard),
    ];
    toggles
        .into_iter()
        .filter(|(shown, _)| *shown == Some(false))
        .map(|(_, kind)| kind)
        .collect()
}

/// Applies the map's filter panel to a report set. All present keys must
/// accept a report for it to be kept.
pub fn apply_filters(reports: &[Report], filters: &MapFilters) -> Vec<Report> {
    let hidden = hidden_types(filters);

    reports
        .iter()
        .filter(|report| match &filters.types {
            Some(types) => report
                .report_type
                .as_ref()
                .is_some_and(|report_type| types.contains(report_type)),
            None => true,
        })
        .filter(|report| match &filters.status {
            Some(statuses) => statuses
                .iter()
                .any(|status| status == report.effective_status()),
            None => true,
        })
        .filter(|report| match report.kind() {
            Some(kind) => !hidden.contains(&kind),
            None => true,
        })
        .cloned()
        .collect()
}

/// Keeps stations whose brand is in `filters.brands` (case-insensitive).
pub fn apply_gas_station_filters(stations: &[GasStation], filters: &MapFilters) -> Vec<GasStation> {
    let Some(brands) = &filters.brands else {
        return stations.to_vec();
    };
    stations
        .iter()
        .filter(|station| {
            station.brand.as_ref().is_some_and(|brand| {
                brands
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(brand))
            })
        })
        .cloned()
        .collect()
}

/// Keeps the items whose position lies inside `viewport`. A viewport with
/// non-finite bounds places no restriction.
pub fn within_viewport<T, F>(items: Vec<T>, viewport: &Viewport, position: F) -> Vec<T>
where
    F: Fn(&T) -> Option<GeoPoint>,
{
    if !viewport.is_finite() {
        log::warn!("Ignoring viewport with non-finite bounds: {viewport:?}");
        return items;
    }
    items
        .into_iter()
        .filter(|item| position(item).is_some_and(|point| viewport.contains(&point)))
        .collect()
}

/// Keeps the items within `radius` meters of `center`.
pub fn within_radius<T, F>(items: Vec<T>, center: &GeoPoint, radius: f64, position: F) -> Vec<T>
where
    F: Fn(&T) -> Option<GeoPoint>,
{
    items
        .into_iter()
        .filter(|item| position(item).is_some_and(|point| center.distance_to(&point) <= radius))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawLocation;

    fn report(id: &str, report_type: &str, lat: f64, lng: f64) -> Report {
        Report {
            id: Some(id.to_string()),
            report_type: Some(report_type.to_string()),
            location: Some(RawLocation::from_point(GeoPoint::new(lat, lng))),
            ..Default::default()
        }
    }

    fn station(id: &str, brand: &str, coordinates: serde_json::Value) -> GasStation {
        GasStation {
            id: Some(id.to_string()),
            brand: Some(brand.to_string()),
            location: Some(RawLocation {
                kind: Some("Point".to_string()),
                coordinates: Some(coordinates),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn ids(reports: &[Report]) -> Vec<&str> {
        reports.iter().filter_map(|r| r.id.as_deref()).collect()
    }

    #[test]
    fn test_filter_reports_drops_invalid_and_archived() {
        let mut archived = report("archived", "Hazard", 14.0, 121.0);
        archived.archived = Some(true);
        let mut deleted = report("deleted", "Hazard", 14.0, 121.0);
        deleted.status = Some("deleted".to_string());
        let mut status_archived = report("status-archived", "Hazard", 14.0, 121.0);
        status_archived.status = Some("archived".to_string());
        let mut no_location = report("no-location", "Hazard", 14.0, 121.0);
        no_location.location = None;
        let out_of_range = report("out-of-range", "Hazard", 95.0, 121.0);
        let good = report("good", "Hazard", 14.0, 121.0);
        let mut explicit_active = report("active", "Accident", 14.1, 121.1);
        explicit_active.archived = Some(false);

        let input = vec![
            archived,
            good.clone(),
            deleted,
            status_archived,
            no_location,
            out_of_range,
            explicit_active.clone(),
        ];
        let output = filter_reports(&input);

        assert_eq!(output, vec![good, explicit_active]);
        assert!(output.iter().all(|r| report_point(r).is_some()));
    }

    #[test]
    fn test_filter_reports_preserves_order_and_duplicates() {
        let a = report("a", "Hazard", 1.0, 1.0);
        let b = report("b", "Hazard", 2.0, 2.0);
        let input = vec![b.clone(), a.clone(), b.clone()];
        assert_eq!(filter_reports(&input), vec![b.clone(), a, b]);
    }

    #[test]
    fn test_filter_gas_stations() {
        let good = station("good", "Shell", serde_json::json!([121.0, 14.6]));
        let short = station("short", "Shell", serde_json::json!([121.0]));
        let swapped_out_of_range = station("bad", "Shell", serde_json::json!([14.6, 121.0]));
        let mut no_location = station("none", "Shell", serde_json::json!([]));
        no_location.location = None;

        let output = filter_gas_stations(&[good.clone(), short, swapped_out_of_range, no_location]);
        assert_eq!(output, vec![good.clone()]);
        assert_eq!(station_point(&good), Some(GeoPoint::new(14.6, 121.0)));
    }

    #[test]
    fn test_apply_filters_without_keys_keeps_everything() {
        let input = vec![
            report("1", "Accident", 1.0, 1.0),
            report("2", "Hazard", 1.0, 1.0),
        ];
        assert_eq!(apply_filters(&input, &MapFilters::default()), input);
    }

    #[test]
    fn test_apply_filters_type_allow_list() {
        let input = vec![
            report("1", "Accident", 1.0, 1.0),
            report("2", "Hazard", 1.0, 1.0),
            report("3", "Traffic Jam", 1.0, 1.0),
        ];
        let filters = MapFilters {
            types: Some(vec!["Accident".to_string(), "Traffic Jam".to_string()]),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&input, &filters)), vec!["1", "3"]);
    }

    #[test]
    fn test_apply_filters_status_uses_effective_status() {
        let mut resolved = report("resolved", "Hazard", 1.0, 1.0);
        resolved.status = Some("resolved".to_string());
        let no_status = report("no-status", "Hazard", 1.0, 1.0);
        let filters = MapFilters {
            status: Some(vec!["active".to_string()]),
            ..Default::default()
        };
        assert_eq!(
            ids(&apply_filters(&[resolved, no_status], &filters)),
            vec!["no-status"]
        );
    }

    #[test]
    fn test_apply_filters_toggles() {
        let input = vec![
            report("traffic", "Traffic Jam", 1.0, 1.0),
            report("accident", "Accident", 1.0, 1.0),
            report("roadwork", "Construction", 1.0, 1.0),
            report("hazard", "Hazard", 1.0, 1.0),
            report("closure", "Road Closure", 1.0, 1.0),
        ];
        let filters = MapFilters {
            show_traffic_reports: Some(false),
            show_accidents: Some(true),
            show_roadwork: Some(false),
            ..Default::default()
        };
        assert_eq!(
            ids(&apply_filters(&input, &filters)),
            vec!["accident", "hazard", "closure"]
        );
    }

    #[test]
    fn test_apply_filters_compose_as_and() {
        let input = vec![
            report("1", "Accident", 1.0, 1.0),
            report("2", "Hazard", 1.0, 1.0),
        ];
        let filters = MapFilters {
            types: Some(vec!["Accident".to_string(), "Hazard".to_string()]),
            show_hazards: Some(false),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&input, &filters)), vec!["1"]);
    }

    #[test]
    fn test_gas_station_brand_filter() {
        let input = vec![
            station("1", "Shell", serde_json::json!([121.0, 14.6])),
            station("2", "Petron", serde_json::json!([121.0, 14.6])),
        ];
        let filters = MapFilters {
            brands: Some(vec!["petron".to_string()]),
            ..Default::default()
        };
        let output = apply_gas_station_filters(&input, &filters);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_within_viewport_and_radius() {
        let input = vec![
            report("inside", "Hazard", 14.55, 121.0),
            report("outside", "Hazard", 16.0, 121.0),
        ];
        let viewport = Viewport {
            north: 14.6,
            south: 14.5,
            east: 121.1,
            west: 120.9,
        };
        let kept = within_viewport(input.clone(), &viewport, report_point);
        assert_eq!(ids(&kept), vec!["inside"]);

        let center = GeoPoint::new(14.55, 121.0);
        let kept = within_radius(input, &center, 1_000.0, report_point);
        assert_eq!(ids(&kept), vec!["inside"]);
    }

    #[test]
    fn test_non_finite_viewport_keeps_everything() {
        let input = vec![report("1", "Hazard", 14.55, 121.0)];
        let viewport = Viewport {
            north: f64::NAN,
            south: 14.5,
            east: 121.1,
            west: 120.9,
        };
        assert_eq!(within_viewport(input.clone(), &viewport, report_point), input);
    }
}
