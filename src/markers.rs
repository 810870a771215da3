//! Conversion of domain entities into renderable markers and polylines.

use crate::coords;
use crate::filters;
use crate::models::{
    GasStation, GeoPoint, Marker, MarkerKind, Polyline, PolylineKind, RawLocation, Report,
    ReportType, Route,
};
use crate::utils;

pub const CURRENT_LOCATION_ID: &str = "current-location";
pub const DESTINATION_ID: &str = "destination";
pub const SELECTED_ROUTE_ID: &str = "selected-route";

const SELECTED_ROUTE_COLOR: &str = "#1565C0";
const SELECTED_ROUTE_WIDTH: u32 = 6;
const ALTERNATIVE_ROUTE_COLOR: &str = "#90CAF9";
const ALTERNATIVE_ROUTE_WIDTH: u32 = 4;

pub fn report_pin_color(report_type: Option<ReportType>) -> &'static str {
    match report_type {
        Some(ReportType::Accident) => "red",
        Some(ReportType::TrafficJam) => "orange",
        Some(ReportType::RoadClosure) => "purple",
        Some(ReportType::Hazard) => "darkorange",
        _ => "blue",
    }
}

pub fn brand_pin_color(brand: Option<&str>) -> &'static str {
    let brand = brand.unwrap_or_default().trim().to_ascii_lowercase();
    match brand.as_str() {
        "petron" => "blue",
        "shell" => "yellow",
        "caltex" => "red",
        "phoenix" => "orange",
        "seaoil" => "green",
        "cleanfuel" => "teal",
        "flying v" => "purple",
        "unioil" => "navy",
        "total" | "totalenergies" => "tomato",
        _ => "gray",
    }
}

/// One marker per report. Reports without a valid location are skipped; run
/// [`filters::filter_reports`] first to also drop archived ones.
pub fn generate_report_markers(reports: &[Report]) -> Vec<Marker> {
    reports
        .iter()
        .filter_map(|report| {
            let coordinate = filters::report_point(report)?;
            let kind = report.kind();
            let title = report
                .title
                .clone()
                .or_else(|| report.report_type.clone())
                .unwrap_or_else(|| "Report".to_string());
            Some(Marker {
                id: report.id.clone().unwrap_or_else(utils::generate_id),
                coordinate,
                title,
                description: report.description.clone().unwrap_or_default(),
                pin_color: report_pin_color(kind),
                kind: MarkerKind::Report,
                report: Some(report.clone()),
                gas_station: None,
            })
        })
        .collect()
}

/// One marker per station, positioned from its GeoJSON coordinates.
pub fn generate_gas_station_markers(stations: &[GasStation]) -> Vec<Marker> {
    stations
        .iter()
        .filter_map(|station| {
            let coordinate = filters::station_point(station)?;
            let title = station
                .name
                .clone()
                .or_else(|| station.brand.clone())
                .unwrap_or_else(|| "Gas Station".to_string());
            Some(Marker {
                id: station.id.clone().unwrap_or_else(utils::generate_id),
                coordinate,
                title,
                description: station.address_text().unwrap_or_default(),
                pin_color: brand_pin_color(station.brand.as_deref()),
                kind: MarkerKind::GasStation,
                report: None,
                gas_station: Some(station.clone()),
            })
        })
        .collect()
}

fn point_marker(
    location: Option<&RawLocation>,
    id: &str,
    title: &str,
    pin_color: &'static str,
    kind: MarkerKind,
) -> Option<Marker> {
    let point = location.and_then(RawLocation::point);
    if !coords::is_valid(point.as_ref()) {
        return None;
    }
    Some(Marker {
        id: id.to_string(),
        coordinate: point?,
        title: title.to_string(),
        description: String::new(),
        pin_color,
        kind,
        report: None,
        gas_station: None,
    })
}

pub fn generate_current_location_marker(location: Option<&RawLocation>) -> Option<Marker> {
    point_marker(
        location,
        CURRENT_LOCATION_ID,
        "Your Location",
        "green",
        MarkerKind::Current,
    )
}

pub fn generate_destination_marker(location: Option<&RawLocation>) -> Option<Marker> {
    point_marker(
        location,
        DESTINATION_ID,
        "Destination",
        "red",
        MarkerKind::Destination,
    )
}

fn route_points(route: &Route) -> Vec<GeoPoint> {
    route
        .coordinates
        .iter()
        .flatten()
        .filter_map(RawLocation::valid_point)
        .collect()
}

/// The selected route (if it has points) followed by every alternative that
/// has points. Alternative ids carry their index in `alternative_routes`.
pub fn generate_polylines(
    selected_route: Option<&Route>,
    alternative_routes: &[Route],
) -> Vec<Polyline> {
    let mut polylines = Vec::new();

    if let Some(route) = selected_route {
        let coordinates = route_points(route);
        if !coordinates.is_empty() {
            polylines.push(Polyline {
                id: SELECTED_ROUTE_ID.to_string(),
                coordinates,
                stroke_color: SELECTED_ROUTE_COLOR,
                stroke_width: SELECTED_ROUTE_WIDTH,
                kind: PolylineKind::Route,
            });
        }
    }

    for (index, route) in alternative_routes.iter().enumerate() {
        let coordinates = route_points(route);
        if coordinates.is_empty() {
            continue;
        }
        polylines.push(Polyline {
            id: format!("alternative-route-{index}"),
            coordinates,
            stroke_color: ALTERNATIVE_ROUTE_COLOR,
            stroke_width: ALTERNATIVE_ROUTE_WIDTH,
            kind: PolylineKind::Alternative,
        });
    }

    polylines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(value: serde_json::Value) -> Route {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_report_marker_colors() {
        let reports: Vec<Report> = serde_json::from_value(json!([
            {"_id": "1", "reportType": "Accident", "location": {"latitude": 1.0, "longitude": 1.0}},
            {"_id": "2", "reportType": "Traffic Jam", "location": {"latitude": 1.0, "longitude": 1.0}},
            {"_id": "3", "reportType": "Road Closure", "location": {"latitude": 1.0, "longitude": 1.0}},
            {"_id": "4", "reportType": "Hazard", "location": {"latitude": 1.0, "longitude": 1.0}},
            {"_id": "5", "reportType": "Construction", "location": {"latitude": 1.0, "longitude": 1.0}},
            {"_id": "6", "location": {"latitude": 1.0, "longitude": 1.0}}
        ]))
        .unwrap();
        let colors: Vec<&str> = generate_report_markers(&reports)
            .iter()
            .map(|m| m.pin_color)
            .collect();
        assert_eq!(
            colors,
            vec!["red", "orange", "purple", "darkorange", "blue", "blue"]
        );
    }

    #[test]
    fn test_report_marker_fields() {
        let reports: Vec<Report> = serde_json::from_value(json!([{
            "_id": "abc",
            "reportType": "Hazard",
            "description": "Oil on the road",
            "location": {"latitude": 14.6, "longitude": 121.0}
        }]))
        .unwrap();
        let markers = generate_report_markers(&reports);
        assert_eq!(markers.len(), 1);
        let marker = &markers[0];
        assert_eq!(marker.id, "abc");
        assert_eq!(marker.title, "Hazard");
        assert_eq!(marker.description, "Oil on the road");
        assert_eq!(marker.kind, MarkerKind::Report);
        assert_eq!(marker.coordinate, GeoPoint::new(14.6, 121.0));
        assert_eq!(marker.report.as_ref(), Some(&reports[0]));
    }

    #[test]
    fn test_report_marker_without_id_gets_synthetic_id() {
        let reports: Vec<Report> = serde_json::from_value(json!([
            {"location": {"latitude": 14.6, "longitude": 121.0}}
        ]))
        .unwrap();
        let markers = generate_report_markers(&reports);
        assert_eq!(markers[0].id.len(), 16);
    }

    #[test]
    fn test_gas_station_markers_swap_coordinates() {
        let stations: Vec<GasStation> = serde_json::from_value(json!([
            {"_id": "s1", "name": "Shell EDSA", "brand": "Shell", "address": "EDSA",
             "location": {"type": "Point", "coordinates": [121.0, 14.6]}},
            {"_id": "s2", "brand": "Mystery Fuel",
             "location": {"type": "Point", "coordinates": [121.1, 14.7]}}
        ]))
        .unwrap();
        let markers = generate_gas_station_markers(&stations);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].coordinate, GeoPoint::new(14.6, 121.0));
        assert_eq!(markers[0].pin_color, "yellow");
        assert_eq!(markers[0].title, "Shell EDSA");
        assert_eq!(markers[0].description, "EDSA");
        assert_eq!(markers[1].pin_color, "gray");
        assert_eq!(markers[1].title, "Mystery Fuel");
        assert_eq!(markers[1].kind, MarkerKind::GasStation);
    }

    #[test]
    fn test_singleton_markers() {
        let here = RawLocation::from_point(GeoPoint::new(14.6, 121.0));
        let marker = generate_current_location_marker(Some(&here)).unwrap();
        assert_eq!(marker.id, CURRENT_LOCATION_ID);
        assert_eq!(marker.kind, MarkerKind::Current);

        let there = RawLocation::from_point(GeoPoint::new(14.7, 121.1));
        let marker = generate_destination_marker(Some(&there)).unwrap();
        assert_eq!(marker.id, DESTINATION_ID);
        assert_eq!(marker.kind, MarkerKind::Destination);

        let invalid = RawLocation::from_point(GeoPoint::new(140.0, 121.0));
        assert!(generate_current_location_marker(Some(&invalid)).is_none());
        assert!(generate_destination_marker(None).is_none());
    }

    #[test]
    fn test_polylines_empty_input() {
        assert!(generate_polylines(None, &[]).is_empty());
    }

    #[test]
    fn test_polylines_selected_route() {
        let selected = route(json!({"coordinates": [{"lat": 1.0, "lng": 1.0}]}));
        let polylines = generate_polylines(Some(&selected), &[]);
        assert_eq!(polylines.len(), 1);
        assert_eq!(polylines[0].id, SELECTED_ROUTE_ID);
        assert_eq!(polylines[0].kind, PolylineKind::Route);
        assert_eq!(polylines[0].coordinates, vec![GeoPoint::new(1.0, 1.0)]);
    }

    #[test]
    fn test_polylines_skip_empty_routes_and_keep_indices() {
        let selected = route(json!({"coordinates": []}));
        let alternatives = vec![
            route(json!({"coordinates": [{"latitude": 1.0, "longitude": 1.0}]})),
            route(json!({})),
            route(json!({"coordinates": [{"lat": 2.0, "lng": 2.0}, {"lat": 2.1, "lng": 2.1}]})),
        ];
        let polylines = generate_polylines(Some(&selected), &alternatives);
        let ids: Vec<&str> = polylines.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["alternative-route-0", "alternative-route-2"]);
        assert!(polylines.iter().all(|p| p.kind == PolylineKind::Alternative));
        assert!(polylines[0].stroke_width < SELECTED_ROUTE_WIDTH);
    }
}
