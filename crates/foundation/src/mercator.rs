//! Web Mercator helpers for sizing a pixel viewport in degrees.

/// Tile edge length in pixels used by slippy-map zoom levels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Highest latitude representable in Web Mercator.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Longitude degrees covered by one pixel at `zoom` (fractional zoom allowed).
pub fn lon_degrees_per_pixel(zoom: f64) -> f64 {
    360.0 / (TILE_SIZE_PX * zoom.exp2())
}

/// Latitude degrees covered by one pixel at `zoom` around `lat`.
///
/// Mercator stretches north-south distances by `1 / cos(lat)`, so the same
/// pixel spans fewer degrees of latitude away from the equator.
pub fn lat_degrees_per_pixel(zoom: f64, lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    lon_degrees_per_pixel(zoom) * lat.to_radians().cos()
}
