use crate::utils;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated-shape geographic point. Whether it is in range is answered by
/// [`GeoPoint::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }
}

/// A location as it arrives from clients or storage: either
/// `{latitude, longitude}` (or `{lat, lng}`) or GeoJSON
/// `{type: "Point", coordinates: [lng, lat]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    #[serde(
        default,
        alias = "lat",
        deserialize_with = "utils::lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub latitude: Option<f64>,
    #[serde(
        default,
        alias = "lng",
        alias = "lon",
        deserialize_with = "utils::lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub longitude: Option<f64>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawLocation {
    #[cfg(test)]
    pub fn from_point(point: GeoPoint) -> Self {
        RawLocation {
            latitude: Some(point.latitude),
            longitude: Some(point.longitude),
            ..Default::default()
        }
    }

    /// Reads the GeoJSON `coordinates` array as `(lng, lat)` and swaps it.
    /// Requires at least two numeric entries.
    pub fn geojson_point(&self) -> Option<GeoPoint> {
        let coordinates = self.coordinates.as_ref()?.as_array()?;
        if coordinates.len() < 2 {
            return None;
        }
        let longitude = coordinates[0].as_f64()?;
        let latitude = coordinates[1].as_f64()?;
        Some(GeoPoint::new(latitude, longitude))
    }

    /// Normalizes either supported shape to a point. The point is not
    /// range-checked here.
    pub fn point(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => self.geojson_point(),
        }
    }

    /// The normalized point, only if it passes coordinate validation.
    pub fn valid_point(&self) -> Option<GeoPoint> {
        self.point().filter(GeoPoint::is_valid)
    }
}

/// Report categories known to the map. Anything else renders as a generic
/// report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Accident,
    TrafficJam,
    RoadClosure,
    Hazard,
    Construction,
    Other,
}

impl ReportType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Accident" => Some(ReportType::Accident),
            "Traffic Jam" => Some(ReportType::TrafficJam),
            "Road Closure" => Some(ReportType::RoadClosure),
            "Hazard" => Some(ReportType::Hazard),
            "Construction" => Some(ReportType::Construction),
            "Other" => Some(ReportType::Other),
            _ => None,
        }
    }
}

/// A traffic report as stored by the reports subsystem. Consumed read-only;
/// unknown fields are kept so they can be echoed back to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "utils::lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub report_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub archived: Option<bool>,
    #[serde(
        default,
        deserialize_with = "utils::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<RawLocation>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Report {
    pub fn kind(&self) -> Option<ReportType> {
        self.report_type.as_deref().and_then(ReportType::parse)
    }

    pub fn is_archived(&self) -> bool {
        self.archived == Some(true)
    }

    /// The status used by map filters: archived reports are `"archived"`
    /// regardless of their status field, reports without one are `"active"`.
    pub fn effective_status(&self) -> &str {
        if self.is_archived() {
            "archived"
        } else {
            self.status.as_deref().unwrap_or("active")
        }
    }
}

/// A fuel station imported from the station directory. Its location is
/// GeoJSON (`[lng, lat]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GasStation {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "utils::lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Value>,
    #[serde(
        default,
        deserialize_with = "utils::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<RawLocation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GasStation {
    /// A printable address: either the string itself or the `street`/`city`
    /// parts of a structured address.
    pub fn address_text(&self) -> Option<String> {
        match self.address.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(parts) => {
                let text = ["street", "barangay", "city", "province"]
                    .iter()
                    .filter_map(|key| parts.get(*key).and_then(Value::as_str))
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        }
    }
}

/// A user's motorcycle. Returned as-is next to the map data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Motor {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "utils::lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "utils::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub nickname: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A route candidate as drawn by the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Route {
    #[serde(default, deserialize_with = "utils::lenient_vec")]
    pub coordinates: Option<Vec<RawLocation>>,
}

// ========================
// Derived map entities
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
    Report,
    GasStation,
    Current,
    Destination,
}

/// A point prepared for rendering. Generated per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub coordinate: GeoPoint,
    pub title: String,
    pub description: String,
    pub pin_color: &'static str,
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_station: Option<GasStation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusterKind {
    Report,
    GasStation,
    Mixed,
}

/// Markers collapsed into one rendered point. Always has at least two members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: String,
    /// Position of the seed marker, not the centroid.
    pub coordinate: GeoPoint,
    pub markers: Vec<Marker>,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: ClusterKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIcon {
    pub cluster_id: String,
    pub count: usize,
    pub label: String,
    pub size: u32,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolylineKind {
    Route,
    Alternative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Polyline {
    pub id: String,
    pub coordinates: Vec<GeoPoint>,
    pub stroke_color: &'static str,
    pub stroke_width: u32,
    #[serde(rename = "type")]
    pub kind: PolylineKind,
}

/// User-selected toggles from the map's filter panel. A missing key places
/// no restriction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFilters {
    #[serde(default, deserialize_with = "utils::lenient_vec")]
    pub types: Option<Vec<String>>,
    #[serde(default, deserialize_with = "utils::lenient_vec")]
    pub status: Option<Vec<String>>,
    #[serde(default, deserialize_with = "utils::lenient_vec")]
    pub brands: Option<Vec<String>>,
    #[serde(default, deserialize_with = "utils::lenient_bool")]
    pub show_traffic_reports: Option<bool>,
    #[serde(default, deserialize_with = "utils::lenient_bool")]
    pub show_accidents: Option<bool>,
    #[serde(default, deserialize_with = "utils::lenient_bool")]
    pub show_roadwork: Option<bool>,
    #[serde(default, deserialize_with = "utils::lenient_bool")]
    pub show_hazards: Option<bool>,
}

// ========================
// API Request and Response Models
// ========================

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    /// Wall-clock milliseconds spent processing the request.
    pub processing_time: f64,
    pub input_count: usize,
    pub output_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOptionsRequest {
    #[serde(default, deserialize_with = "utils::lenient_number")]
    pub radius: Option<f64>,
    #[serde(default, deserialize_with = "utils::lenient_number")]
    pub min_zoom: Option<f64>,
}

/// Request body for `/api/map/cluster-markers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMarkersRequest {
    pub reports: Option<Value>,
    pub gas_stations: Option<Value>,
    #[serde(default, deserialize_with = "utils::lenient_number")]
    pub current_zoom: Option<f64>,
    #[serde(default, deserialize_with = "utils::lenient")]
    pub options: Option<ClusterOptionsRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMarkersResponse {
    pub clusters: Vec<Cluster>,
    /// Markers that stay individual at this zoom.
    pub unclustered_markers: Vec<Marker>,
    pub cluster_icons: Vec<ClusterIcon>,
    pub performance: Performance,
}

/// Request body for `/api/map/process-markers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMarkersRequest {
    pub reports: Option<Value>,
    pub gas_stations: Option<Value>,
    #[serde(default, deserialize_with = "utils::lenient_number")]
    pub current_zoom: Option<f64>,
    #[serde(default, deserialize_with = "utils::lenient")]
    pub map_filters: Option<MapFilters>,
    #[serde(default, deserialize_with = "utils::lenient")]
    pub viewport: Option<Viewport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMarkersResponse {
    pub markers: Vec<Marker>,
    pub clusters: Vec<Cluster>,
    pub performance: Performance,
}

/// Request body for `/api/map/apply-filters`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyFiltersRequest {
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "utils::lenient")]
    pub filters: Option<MapFilters>,
    #[serde(default, deserialize_with = "utils::lenient_string")]
    pub data_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FilteredData {
    Reports(Vec<Report>),
    GasStations(Vec<GasStation>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterStatistics {
    pub original_count: usize,
    pub valid_count: usize,
    pub filtered_count: usize,
    pub removed_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyFiltersResponse {
    pub filtered_data: FilteredData,
    pub statistics: FilterStatistics,
    pub performance: Performance,
}

/// Request body for `/api/map/snap-to-roads`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapToRoadsRequest {
    pub coordinates: Option<Value>,
    #[serde(default, deserialize_with = "utils::lenient_bool")]
    pub interpolate: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnappedPoint {
    pub location: GeoPoint,
    pub original_index: usize,
    pub place_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapToRoadsResponse {
    pub snapped_points: Vec<SnappedPoint>,
    pub interpolate: bool,
    pub performance: Performance,
}

/// Query string of `/api/map/processed-data`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDataQuery {
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "utils::query_bool")]
    pub show_reports: Option<bool>,
    #[serde(default, deserialize_with = "utils::query_bool")]
    pub show_gas_stations: Option<bool>,
    #[serde(default, deserialize_with = "utils::query_number")]
    pub current_zoom: Option<f64>,
    #[serde(default)]
    pub viewport: utils::JsonParam<Viewport>,
    #[serde(default)]
    pub map_filters: utils::JsonParam<MapFilters>,
    #[serde(default, deserialize_with = "utils::query_number")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "utils::query_number")]
    pub longitude: Option<f64>,
    /// Radius in meters around `latitude`/`longitude`.
    #[serde(default, deserialize_with = "utils::query_number")]
    pub radius: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDataStatistics {
    pub total_reports: usize,
    pub filtered_reports: usize,
    pub total_gas_stations: usize,
    pub filtered_gas_stations: usize,
    pub total_motors: usize,
    pub total_markers: usize,
    pub total_clusters: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDataResponse {
    pub reports: Vec<Report>,
    pub gas_stations: Vec<GasStation>,
    pub motors: Vec<Motor>,
    pub markers: Vec<Marker>,
    pub clusters: Vec<Cluster>,
    pub statistics: ProcessedDataStatistics,
    pub performance: Performance,
}

/// Request body for `/api/map/prepare-markers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareMarkersRequest {
    #[serde(default, deserialize_with = "utils::lenient")]
    pub current_location: Option<RawLocation>,
    #[serde(default, deserialize_with = "utils::lenient")]
    pub destination: Option<RawLocation>,
    #[serde(default, deserialize_with = "utils::lenient")]
    pub selected_route: Option<Route>,
    #[serde(default, deserialize_with = "utils::lenient_vec")]
    pub alternative_routes: Option<Vec<Route>>,
    pub reports: Option<Value>,
    pub gas_stations: Option<Value>,
    #[serde(default, deserialize_with = "utils::lenient_bool")]
    pub show_reports: Option<bool>,
    #[serde(default, deserialize_with = "utils::lenient_bool")]
    pub show_gas_stations: Option<bool>,
    #[serde(default, deserialize_with = "utils::lenient_number")]
    pub current_zoom: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareMarkersResponse {
    pub markers: Vec<Marker>,
    pub polylines: Vec<Polyline>,
    pub clusters: Vec<Cluster>,
    pub performance: Performance,
}

/// Request body for `/api/map/compare-reports`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareReportsRequest {
    pub current_reports: Option<Value>,
    pub fresh_reports: Option<Value>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}
