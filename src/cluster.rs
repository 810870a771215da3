//! Greedy distance clustering of markers for coarse zoom levels.
//!
//! Markers are visited in input order. The first marker not yet assigned
//! seeds a new cluster at its own position and absorbs every later unassigned
//! marker within `radius` meters of that seed. Clusters with a single member
//! are not emitted, so the caller keeps rendering those markers as-is.

use crate::models::{Cluster, ClusterIcon, ClusterKind, Marker, MarkerKind};

pub const DEFAULT_RADIUS_M: f64 = 100.0;
pub const DEFAULT_MIN_ZOOM: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Maximum distance from the seed marker, in meters.
    pub radius: f64,
    /// Zoom level from which markers are shown individually.
    pub min_zoom: f64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        ClusterOptions {
            radius: DEFAULT_RADIUS_M,
            min_zoom: DEFAULT_MIN_ZOOM,
        }
    }
}

impl ClusterOptions {
    /// Replaces the defaults with whichever overrides are usable.
    pub fn with_overrides(self, radius: Option<f64>, min_zoom: Option<f64>) -> Self {
        ClusterOptions {
            radius: radius
                .filter(|r| r.is_finite() && *r >= 0.0)
                .unwrap_or(self.radius),
            min_zoom: min_zoom.filter(|z| z.is_finite()).unwrap_or(self.min_zoom),
        }
    }
}

fn cluster_kind(members: &[Marker]) -> ClusterKind {
    let first = members.first().map(|m| m.kind);
    let uniform = members.iter().all(|m| Some(m.kind) == first);
    match first {
        Some(MarkerKind::Report) if uniform => ClusterKind::Report,
        Some(MarkerKind::GasStation) if uniform => ClusterKind::GasStation,
        _ => ClusterKind::Mixed,
    }
}

/// Clusters plus the markers that stay individual.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
    /// Every input marker that joined no multi-member cluster, in input order.
    pub unclustered: Vec<Marker>,
}

/// Groups nearby markers. Returns nothing once `zoom` reaches
/// `options.min_zoom`.
pub fn cluster_markers(markers: &[Marker], zoom: f64, options: &ClusterOptions) -> Vec<Cluster> {
    cluster_with_fallback(markers, zoom, options).clusters
}

/// Like [`cluster_markers`], but also hands back the markers to render as-is.
/// Membership is tracked by position, so markers sharing an id are kept
/// apart.
pub fn cluster_with_fallback(
    markers: &[Marker],
    zoom: f64,
    options: &ClusterOptions,
) -> Clustering {
    if zoom >= options.min_zoom {
        return Clustering {
            clusters: Vec::new(),
            unclustered: markers.to_vec(),
        };
    }

    let mut assigned = vec![false; markers.len()];
    let mut clustered = vec![false; markers.len()];
    let mut clusters = Vec::new();

    for (seed_index, seed) in markers.iter().enumerate() {
        if assigned[seed_index] {
            continue;
        }
        assigned[seed_index] = true;

        let mut member_indices = vec![seed_index];
        for (index, candidate) in markers.iter().enumerate().skip(seed_index + 1) {
            if assigned[index] {
                continue;
            }
            if seed.coordinate.distance_to(&candidate.coordinate) <= options.radius {
                assigned[index] = true;
                member_indices.push(index);
            }
        }

        if member_indices.len() > 1 {
            for &index in &member_indices {
                clustered[index] = true;
            }
            let members: Vec<Marker> = member_indices
                .iter()
                .map(|&index| markers[index].clone())
                .collect();
            clusters.push(Cluster {
                id: format!("cluster-{}", clusters.len()),
                coordinate: seed.coordinate,
                count: members.len(),
                kind: cluster_kind(&members),
                markers: members,
            });
        }
    }

    log::debug!(
        "Clustered {} markers into {} clusters at zoom {zoom}",
        markers.len(),
        clusters.len()
    );

    let unclustered = markers
        .iter()
        .zip(&clustered)
        .filter(|(_, in_cluster)| !**in_cluster)
        .map(|(marker, _)| marker.clone())
        .collect();
    Clustering {
        clusters,
        unclustered,
    }
}

pub fn cluster_icon(cluster: &Cluster) -> ClusterIcon {
    let size = match cluster.count {
        0..10 => 40,
        10..50 => 50,
        _ => 60,
    };
    let label = if cluster.count > 99 {
        "99+".to_string()
    } else {
        cluster.count.to_string()
    };
    let color = match cluster.kind {
        ClusterKind::Report => "#FF5722",
        ClusterKind::GasStation => "#4CAF50",
        ClusterKind::Mixed => "#9C27B0",
    };
    ClusterIcon {
        cluster_id: cluster.id.clone(),
        count: cluster.count,
        label,
        size,
        color,
    }
}
