use crate::models::GeoPoint;
use serde::Deserialize;

/// The visible bounding box of the client's map.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Viewport {
    /// Returns a copy whose latitude bounds are ordered (`south <= north`).
    ///
    /// Longitudes are left as given: `west > east` means the box crosses the
    /// antimeridian.
    pub fn normalized(&self) -> Self {
        let (south, north) = if self.south <= self.north {
            (self.south, self.north)
        } else {
            (self.north, self.south)
        };
        Viewport {
            north,
            south,
            east: self.east,
            west: self.west,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        let bounds = self.normalized();
        if point.latitude < bounds.south || point.latitude > bounds.north {
            return false;
        }
        if bounds.west <= bounds.east {
            point.longitude >= bounds.west && point.longitude <= bounds.east
        } else {
            // Crosses the antimeridian
            point.longitude >= bounds.west || point.longitude <= bounds.east
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_regular_box() {
        let viewport = Viewport {
            north: 15.0,
            south: 14.0,
            east: 122.0,
            west: 120.0,
        };
        assert!(viewport.contains(&GeoPoint::new(14.5, 121.0)));
        assert!(viewport.contains(&GeoPoint::new(15.0, 122.0)));
        assert!(!viewport.contains(&GeoPoint::new(16.0, 121.0)));
        assert!(!viewport.contains(&GeoPoint::new(14.5, 119.0)));
    }

    #[test]
    fn test_reversed_latitudes_are_normalized() {
        let viewport = Viewport {
            north: 14.0,
            south: 15.0,
            east: 122.0,
            west: 120.0,
        };
        assert!(viewport.contains(&GeoPoint::new(14.5, 121.0)));
    }

    #[test]
    fn test_contains_across_antimeridian() {
        let viewport = Viewport {
            north: 10.0,
            south: -10.0,
            east: -170.0,
            west: 170.0,
        };
        assert!(viewport.contains(&GeoPoint::new(0.0, 175.0)));
        assert!(viewport.contains(&GeoPoint::new(0.0, -175.0)));
        assert!(!viewport.contains(&GeoPoint::new(0.0, 0.0)));
    }
}
