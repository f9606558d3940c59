//! Map and loader collaborators for running the poller without a UI.
//!
//! The viewport lives behind a shared lock so HTTP handlers can pan and zoom
//! while the scheduler task reads it on every tick.

use std::sync::Arc;

use feed::Vehicle;
use foundation::{
    lat_degrees_per_pixel, lon_degrees_per_pixel, Coordinate, GeoBounds, MAX_MERCATOR_LAT,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracker::{Loader, VehicleMap};

pub const MAX_ZOOM: f64 = 22.0;
pub const MAX_VIEWPORT_PX: u32 = 16_384;

/// What the headless "screen" is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub width_px: u32,
    pub height_px: u32,
}

impl Viewport {
    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.center_lat, self.center_lon)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.center().is_finite() || !self.zoom.is_finite() {
            return Err("viewport values must be finite".to_string());
        }
        if self.center_lat.abs() > MAX_MERCATOR_LAT {
            return Err(format!("centerLat must be within ±{MAX_MERCATOR_LAT}"));
        }
        if self.center_lon.abs() > 180.0 {
            return Err("centerLon must be within ±180".to_string());
        }
        if !(0.0..=MAX_ZOOM).contains(&self.zoom) {
            return Err(format!("zoom must be within 0..={MAX_ZOOM}"));
        }
        if self.width_px == 0 || self.height_px == 0 {
            return Err("viewport size must be non-zero".to_string());
        }
        if self.width_px > MAX_VIEWPORT_PX || self.height_px > MAX_VIEWPORT_PX {
            return Err(format!("viewport size is capped at {MAX_VIEWPORT_PX}px"));
        }
        Ok(())
    }

    /// The region visible at the current zoom, from Web Mercator pixel sizes.
    pub fn visible_bounds(&self) -> GeoBounds {
        let lon_span = self.width_px as f64 * lon_degrees_per_pixel(self.zoom);
        let lat_span =
            self.height_px as f64 * lat_degrees_per_pixel(self.zoom, self.center_lat);
        GeoBounds::around(self.center(), lat_span, lon_span)
    }
}

pub type SharedViewport = Arc<RwLock<Viewport>>;

pub struct HeadlessMap {
    viewport: SharedViewport,
    drawn: usize,
}

impl HeadlessMap {
    pub fn new(viewport: SharedViewport) -> Self {
        Self {
            viewport,
            drawn: 0,
        }
    }
}

impl VehicleMap for HeadlessMap {
    fn zoom(&self) -> f64 {
        self.viewport.read().zoom
    }

    fn bounds(&self, multiplier: f64) -> Vec<Coordinate> {
        self.viewport
            .read()
            .visible_bounds()
            .scaled(multiplier)
            .corners()
    }

    fn set_vehicles(&mut self, vehicles: &[Vehicle]) {
        if vehicles.len() != self.drawn {
            debug!(vehicles = vehicles.len(), "map updated");
        }
        self.drawn = vehicles.len();
    }
}

/// Logs loader visibility changes.
#[derive(Debug, Default)]
pub struct HeadlessLoader {
    visible: bool,
}

impl Loader for HeadlessLoader {
    fn show(&mut self) {
        if !self.visible {
            info!("fetch is slow, loader shown");
        }
        self.visible = true;
    }

    fn hide(&mut self) {
        if self.visible {
            info!("loader hidden");
        }
        self.visible = false;
    }
}
