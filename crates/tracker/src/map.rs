use feed::Vehicle;
use foundation::Coordinate;

/// The map widget, as seen by the poller.
pub trait VehicleMap {
    /// Current zoom level. Fractional values are allowed.
    fn zoom(&self) -> f64;

    /// Corners of the visible region scaled by `multiplier` around its center.
    fn bounds(&self, multiplier: f64) -> Vec<Coordinate>;

    /// Replace the vehicles drawn on the map.
    fn set_vehicles(&mut self, vehicles: &[Vehicle]);
}
