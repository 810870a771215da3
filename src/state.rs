use crate::cluster::ClusterOptions;
use crate::db::DbClient;
use std::time::Duration;

/// Settings shared by all map requests.
#[derive(Debug, Clone, Copy)]
pub struct MapSettings {
    pub cluster_options: ClusterOptions,
    /// Zoom assumed when a request doesn't send `currentZoom`.
    pub default_zoom: f64,
    /// Requests slower than this are logged as warnings.
    pub slow_threshold: Duration,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            cluster_options: ClusterOptions::default(),
            default_zoom: 10.0,
            slow_threshold: Duration::from_millis(250),
        }
    }
}

/// The application state. Map processing itself is stateless; this only
/// carries configuration and the store that `processed-data` reads from.
pub struct State {
    pub db: DbClient,
    pub settings: MapSettings,
}

impl State {
    pub fn new(db: DbClient, settings: MapSettings) -> Self {
        Self { db, settings }
    }

    /// Cluster options with per-request overrides applied.
    pub fn cluster_options(&self, radius: Option<f64>, min_zoom: Option<f64>) -> ClusterOptions {
        self.settings
            .cluster_options
            .with_overrides(radius, min_zoom)
    }

    pub fn zoom_or_default(&self, zoom: Option<f64>) -> f64 {
        zoom.filter(|z| z.is_finite())
            .unwrap_or(self.settings.default_zoom)
    }

    /// Logs a warning when `elapsed` exceeds the slow threshold.
    pub fn check_slow(&self, endpoint: &str, elapsed: Duration) {
        if elapsed > self.settings.slow_threshold {
            log::warn!(
                "{endpoint} took {} (threshold {})",
                humantime::format_duration(elapsed),
                humantime::format_duration(self.settings.slow_threshold)
            );
        }
    }
}
