use crate::cluster;
use crate::db::ReportQuery;
use crate::diff::{self, DiffResult};
use crate::error::ApiError;
use crate::filters;
use crate::markers;
use crate::models::{
    self, ApplyFiltersRequest, ApplyFiltersResponse, ClusterMarkersRequest,
    ClusterMarkersResponse, CompareReportsRequest, FilterStatistics, FilteredData, GasStation,
    GeoPoint, HealthResponse, MapFilters, Performance, PrepareMarkersRequest,
    PrepareMarkersResponse, ProcessMarkersRequest, ProcessMarkersResponse, ProcessedDataQuery,
    ProcessedDataResponse, ProcessedDataStatistics, RawLocation, Report, SnapToRoadsRequest,
    SnapToRoadsResponse, SnappedPoint,
};
use crate::pipeline::{self, Selection};
use crate::state::State;
use crate::utils::{self, Stopwatch};
use actix_web::{get, post, web};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Report lists for a whole region easily exceed actix's 32 KiB default.
const JSON_BODY_LIMIT: usize = 8 * 1024 * 1024;

type ApiResult<T> = Result<web::Json<T>, ApiError>;

/// Body parsing with `{error}` responses instead of actix's plain-text ones.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _request| ApiError::bad_request(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _request| ApiError::bad_request(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(cluster_markers)
        .service(process_markers)
        .service(apply_filters)
        .service(snap_to_roads)
        .service(processed_data)
        .service(prepare_markers)
        .service(compare_reports);
}

fn performance(
    state: &State,
    endpoint: &str,
    stopwatch: &Stopwatch,
    input_count: usize,
    output_count: usize,
) -> Performance {
    state.check_slow(endpoint, stopwatch.elapsed());
    Performance {
        processing_time: stopwatch.elapsed_ms(),
        input_count,
        output_count,
    }
}

/// `GET /api/health`
#[get("/api/health")]
pub async fn health() -> web::Json<HealthResponse> {
    web::Json(HealthResponse {
        healthy: true,
        version: crate::VERSION.to_string(),
    })
}

/// Handler for `/api/map/cluster-markers`.
///
/// Validates the given reports and stations, turns them into markers and
/// clusters them for the requested zoom.
#[post("/api/map/cluster-markers")]
pub async fn cluster_markers(
    body: web::Json<ClusterMarkersRequest>,
    state: web::Data<State>,
) -> ApiResult<ClusterMarkersResponse> {
    let stopwatch = Stopwatch::start();
    let request = body.into_inner();

    let reports = pipeline::parse_entity_list::<Report>(request.reports, "reports")?;
    let stations = pipeline::parse_entity_list::<GasStation>(request.gas_stations, "gasStations")?;
    if reports.is_none() && stations.is_none() {
        return Err(ApiError::bad_request(
            "reports or gasStations array is required",
        ));
    }

    let reports = filters::filter_reports(&reports.unwrap_or_default());
    let stations = filters::filter_gas_stations(&stations.unwrap_or_default());
    let all_markers = pipeline::entity_markers(&reports, &stations);

    let options = request.options.unwrap_or_default();
    let options = state.cluster_options(options.radius, options.min_zoom);
    let zoom = state.zoom_or_default(request.current_zoom);
    let cluster::Clustering {
        clusters,
        unclustered: unclustered_markers,
    } = cluster::cluster_with_fallback(&all_markers, zoom, &options);
    let cluster_icons = clusters.iter().map(cluster::cluster_icon).collect();

    let performance = performance(
        &state,
        "cluster-markers",
        &stopwatch,
        all_markers.len(),
        clusters.len(),
    );
    Ok(web::Json(ClusterMarkersResponse {
        clusters,
        unclustered_markers,
        cluster_icons,
        performance,
    }))
}

/// Handler for `/api/map/process-markers`.
///
/// Like `cluster-markers`, but also applies the filter panel and viewport
/// and returns the markers themselves.
#[post("/api/map/process-markers")]
pub async fn process_markers(
    body: web::Json<ProcessMarkersRequest>,
    state: web::Data<State>,
) -> ApiResult<ProcessMarkersResponse> {
    let stopwatch = Stopwatch::start();
    let request = body.into_inner();

    let reports = pipeline::parse_entity_list::<Report>(request.reports, "reports")?;
    let stations = pipeline::parse_entity_list::<GasStation>(request.gas_stations, "gasStations")?;
    if reports.is_none() && stations.is_none() {
        return Err(ApiError::bad_request(
            "reports or gasStations array is required",
        ));
    }
    let reports = reports.unwrap_or_default();
    let stations = stations.unwrap_or_default();

    let selection = Selection {
        filters: request.map_filters.as_ref(),
        viewport: request.viewport.as_ref(),
        near: None,
    };
    let selected_reports = pipeline::select_reports(&reports, &selection);
    let selected_stations = pipeline::select_gas_stations(&stations, &selection);
    let markers = pipeline::entity_markers(&selected_reports, &selected_stations);

    let zoom = state.zoom_or_default(request.current_zoom);
    let clusters = cluster::cluster_markers(&markers, zoom, &state.cluster_options(None, None));

    let performance = performance(
        &state,
        "process-markers",
        &stopwatch,
        reports.len() + stations.len(),
        markers.len(),
    );
    Ok(web::Json(ProcessMarkersResponse {
        markers,
        clusters,
        performance,
    }))
}

/// Handler for `/api/map/apply-filters`.
#[post("/api/map/apply-filters")]
pub async fn apply_filters(
    body: web::Json<ApplyFiltersRequest>,
    state: web::Data<State>,
) -> ApiResult<ApplyFiltersResponse> {
    let stopwatch = Stopwatch::start();
    let request = body.into_inner();

    let original_count = request
        .data
        .as_ref()
        .and_then(|data| data.as_array())
        .map_or(0, Vec::len);
    let map_filters = request.filters.unwrap_or_default();
    let data_type = request.data_type.as_deref().unwrap_or("reports");

    let (filtered_data, valid_count) = match data_type {
        "reports" => {
            let reports = pipeline::parse_entity_list::<Report>(request.data, "data")?
                .ok_or_else(|| ApiError::bad_request("data array is required"))?;
            let valid = filters::filter_reports(&reports);
            let filtered = filters::apply_filters(&valid, &map_filters);
            (FilteredData::Reports(filtered), valid.len())
        }
        "gasStations" => {
            let stations = pipeline::parse_entity_list::<GasStation>(request.data, "data")?
                .ok_or_else(|| ApiError::bad_request("data array is required"))?;
            let valid = filters::filter_gas_stations(&stations);
            let filtered = filters::apply_gas_station_filters(&valid, &map_filters);
            (FilteredData::GasStations(filtered), valid.len())
        }
        other => {
            return Err(ApiError::bad_request(format!(
                "Unsupported dataType '{other}', expected 'reports' or 'gasStations'"
            )));
        }
    };

    let filtered_count = match &filtered_data {
        FilteredData::Reports(reports) => reports.len(),
        FilteredData::GasStations(stations) => stations.len(),
    };
    let statistics = FilterStatistics {
        original_count,
        valid_count,
        filtered_count,
        removed_count: original_count.saturating_sub(filtered_count),
    };

    let performance = performance(
        &state,
        "apply-filters",
        &stopwatch,
        original_count,
        filtered_count,
    );
    Ok(web::Json(ApplyFiltersResponse {
        filtered_data,
        statistics,
        performance,
    }))
}

/// A stable stand-in for a road-network place id.
fn synthetic_place_id(point: &GeoPoint) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{:.6},{:.6}", point.latitude, point.longitude));
    let digest = hex::encode(hasher.finalize());
    format!("place_{}", &digest[..16])
}

/// Handler for `/api/map/snap-to-roads`.
///
/// No road network is consulted: valid input points come back unchanged,
/// tagged with synthetic place ids.
#[post("/api/map/snap-to-roads")]
pub async fn snap_to_roads(
    body: web::Json<SnapToRoadsRequest>,
    state: web::Data<State>,
) -> ApiResult<SnapToRoadsResponse> {
    let stopwatch = Stopwatch::start();
    let request = body.into_inner();

    let coordinates = pipeline::parse_entity_list::<serde_json::Value>(
        request.coordinates,
        "coordinates",
    )?
    .ok_or_else(|| ApiError::bad_request("coordinates array is required"))?;
    if coordinates.is_empty() {
        return Err(ApiError::bad_request("coordinates must not be empty"));
    }

    let input_count = coordinates.len();
    let snapped_points: Vec<SnappedPoint> = coordinates
        .into_iter()
        .enumerate()
        .filter_map(|(original_index, value)| {
            let location: RawLocation = serde_json::from_value(value).ok()?;
            let point = location.valid_point()?;
            Some(SnappedPoint {
                location: point,
                original_index,
                place_id: synthetic_place_id(&point),
            })
        })
        .collect();

    let performance = performance(
        &state,
        "snap-to-roads",
        &stopwatch,
        input_count,
        snapped_points.len(),
    );
    Ok(web::Json(SnapToRoadsResponse {
        snapped_points,
        interpolate: request.interpolate.unwrap_or(false),
        performance,
    }))
}

/// Handler for `/api/map/processed-data`.
///
/// Loads reports, gas stations and the user's motors from the store and runs
/// them through the same pipeline as `process-markers`.
#[get("/api/map/processed-data")]
pub async fn processed_data(
    query: web::Query<ProcessedDataQuery>,
    state: web::Data<State>,
) -> ApiResult<ProcessedDataResponse> {
    let stopwatch = Stopwatch::start();
    let query = query.into_inner();

    let reports = if query.show_reports != Some(false) {
        state.db.find_reports(&ReportQuery::default()).await?
    } else {
        Vec::new()
    };
    let stations = if query.show_gas_stations != Some(false) {
        state.db.find_gas_stations().await?
    } else {
        Vec::new()
    };
    let motors = match query.user_id.as_deref() {
        Some(user_id) if !user_id.is_empty() => state.db.find_motors(user_id).await?,
        _ => Vec::new(),
    };

    let viewport = query.viewport.into_inner();
    let map_filters: Option<MapFilters> = query.map_filters.into_inner();
    let selection = Selection {
        filters: map_filters.as_ref(),
        viewport: viewport.as_ref(),
        near: Selection::near_from(query.latitude, query.longitude, query.radius),
    };
    let selected_reports = pipeline::select_reports(&reports, &selection);
    let selected_stations = pipeline::select_gas_stations(&stations, &selection);
    let markers = pipeline::entity_markers(&selected_reports, &selected_stations);

    let zoom = state.zoom_or_default(query.current_zoom);
    let clusters = cluster::cluster_markers(&markers, zoom, &state.cluster_options(None, None));

    let statistics = ProcessedDataStatistics {
        total_reports: reports.len(),
        filtered_reports: selected_reports.len(),
        total_gas_stations: stations.len(),
        filtered_gas_stations: selected_stations.len(),
        total_motors: motors.len(),
        total_markers: markers.len(),
        total_clusters: clusters.len(),
    };
    log::debug!("processed-data: {statistics:?}");

    let performance = performance(
        &state,
        "processed-data",
        &stopwatch,
        reports.len() + stations.len(),
        markers.len(),
    );
    Ok(web::Json(ProcessedDataResponse {
        reports: selected_reports,
        gas_stations: selected_stations,
        motors,
        markers,
        clusters,
        statistics,
        performance,
    }))
}

/// Handler for `/api/map/prepare-markers`.
///
/// Everything the trip screen draws: the rider's position, the destination,
/// route polylines and nearby reports and stations.
#[post("/api/map/prepare-markers")]
pub async fn prepare_markers(
    body: web::Json<PrepareMarkersRequest>,
    state: web::Data<State>,
) -> ApiResult<PrepareMarkersResponse> {
    let stopwatch = Stopwatch::start();
    let request = body.into_inner();

    let mut all_markers: Vec<models::Marker> = Vec::new();
    all_markers.extend(markers::generate_current_location_marker(
        request.current_location.as_ref(),
    ));
    all_markers.extend(markers::generate_destination_marker(
        request.destination.as_ref(),
    ));

    let mut input_count = all_markers.len();
    if request.show_reports != Some(false) {
        let reports = pipeline::parse_entity_list::<Report>(request.reports, "reports")?
            .unwrap_or_default();
        input_count += reports.len();
        all_markers.extend(markers::generate_report_markers(&filters::filter_reports(
            &reports,
        )));
    }
    if request.show_gas_stations != Some(false) {
        let stations =
            pipeline::parse_entity_list::<GasStation>(request.gas_stations, "gasStations")?
                .unwrap_or_default();
        input_count += stations.len();
        all_markers.extend(markers::generate_gas_station_markers(
            &filters::filter_gas_stations(&stations),
        ));
    }

    let polylines = markers::generate_polylines(
        request.selected_route.as_ref(),
        request.alternative_routes.as_deref().unwrap_or_default(),
    );

    let zoom = state.zoom_or_default(request.current_zoom);
    let clusters =
        cluster::cluster_markers(&all_markers, zoom, &state.cluster_options(None, None));

    let performance = performance(
        &state,
        "prepare-markers",
        &stopwatch,
        input_count,
        all_markers.len() + polylines.len(),
    );
    Ok(web::Json(PrepareMarkersResponse {
        markers: all_markers,
        polylines,
        clusters,
        performance,
    }))
}

#[derive(Debug, Serialize)]
pub struct CompareReportsResponse {
    #[serde(flatten)]
    pub result: DiffResult,
    pub performance: Performance,
}

/// Reads a report snapshot; anything but an array is `None`.
fn report_snapshot(value: Option<serde_json::Value>) -> Option<Vec<Report>> {
    match value {
        Some(serde_json::Value::Array(items)) => Some(utils::parse_elements(items, "report")),
        _ => None,
    }
}

/// Handler for `/api/map/compare-reports`.
///
/// Tells a polling client which reports were added, removed or changed
/// between its copy and a fresh fetch.
#[post("/api/map/compare-reports")]
pub async fn compare_reports(
    body: web::Json<CompareReportsRequest>,
    state: web::Data<State>,
) -> ApiResult<CompareReportsResponse> {
    let stopwatch = Stopwatch::start();
    let request = body.into_inner();

    let current = report_snapshot(request.current_reports);
    let fresh = report_snapshot(request.fresh_reports);
    let result = diff::diff_reports(current.as_deref(), fresh.as_deref());

    let output_count = result.statistics.added_count
        + result.statistics.removed_count
        + result.statistics.modified_count;
    let performance = performance(
        &state,
        "compare-reports",
        &stopwatch,
        result.statistics.current_count + result.statistics.fresh_count,
        output_count,
    );
    Ok(web::Json(CompareReportsResponse {
        result,
        performance,
    }))
}
