use std::fmt;

/// A WGS84 position in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Clamp into the valid WGS84 range.
    pub fn clamped(self) -> Self {
        Self {
            latitude: self.latitude.clamp(-90.0, 90.0),
            longitude: self.longitude.clamp(-180.0, 180.0),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Query-string form used by the vehicle API: `"<latitude>:<longitude>"`.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.latitude, self.longitude)
    }
}

/// Encode an ordered list of corners for a bounds query.
pub fn encode_corners(corners: &[Coordinate]) -> Vec<String> {
    corners.iter().map(Coordinate::encode).collect()
}

#[cfg(test)]
mod tests {
    use super::{Coordinate, encode_corners};

    #[test]
    fn encodes_latitude_then_longitude() {
        let c = Coordinate::new(60.1699, 24.9384);
        assert_eq!(c.encode(), "60.1699:24.9384");
    }

    #[test]
    fn encodes_negative_and_integral_values() {
        let c = Coordinate::new(-34.5, 0.0);
        assert_eq!(c.encode(), "-34.5:0");
    }

    #[test]
    fn encode_corners_keeps_order() {
        let corners = [Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 4.0)];
        assert_eq!(encode_corners(&corners), vec!["1:2", "3:4"]);
    }

    #[test]
    fn clamped_limits_range() {
        let c = Coordinate::new(95.0, -200.0).clamped();
        assert_eq!(c, Coordinate::new(90.0, -180.0));
    }
}
