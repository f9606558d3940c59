use crate::geo::Coordinate;

/// Axis-aligned geographic bounds in degrees.
///
/// Bounds never wrap the antimeridian; scaling clamps to the WGS84 range
/// instead.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl GeoBounds {
    pub fn new(south_west: Coordinate, north_east: Coordinate) -> Self {
        GeoBounds {
            south_west,
            north_east,
        }
    }

    /// Bounds of the given angular size centered on `center`.
    pub fn around(center: Coordinate, lat_span: f64, lon_span: f64) -> Self {
        let half_lat = lat_span.abs() / 2.0;
        let half_lon = lon_span.abs() / 2.0;
        GeoBounds {
            south_west: Coordinate::new(center.latitude - half_lat, center.longitude - half_lon)
                .clamped(),
            north_east: Coordinate::new(center.latitude + half_lat, center.longitude + half_lon)
                .clamped(),
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.south_west.latitude + self.north_east.latitude) / 2.0,
            (self.south_west.longitude + self.north_east.longitude) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.north_east.latitude - self.south_west.latitude
    }

    pub fn lon_span(&self) -> f64 {
        self.north_east.longitude - self.south_west.longitude
    }

    /// Grow (or shrink) the bounds by `multiplier` around their center.
    ///
    /// A multiplier of `1.0` returns the bounds unchanged.
    pub fn scaled(&self, multiplier: f64) -> Self {
        GeoBounds::around(
            self.center(),
            self.lat_span() * multiplier,
            self.lon_span() * multiplier,
        )
    }

    /// Corners in query order: south-west, then north-east.
    pub fn corners(&self) -> Vec<Coordinate> {
        vec![self.south_west, self.north_east]
    }
}
