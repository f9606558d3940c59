//! Wire types exchanged with the vehicle API.
//!
//! This module defines:
//! - the query sent for one poll (free-form parameters plus encoded bounds)
//! - the decoded response (vehicles plus optional per-field errors)
//!
//! Vehicles are opaque: the poller forwards them to the map untouched.

use std::collections::BTreeMap;

use foundation::{Coordinate, encode_corners};
use serde::{Deserialize, Serialize};

use crate::source::FetchError;

/// Field name to human readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Query parameter name to value.
pub type FetchOpts = BTreeMap<String, String>;

/// Query parameter carrying the encoded fetch region.
pub const BOUNDS_PARAM: &str = "bounds";

/// A single vehicle record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vehicle(pub serde_json::Value);

impl Vehicle {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// One poll's query: the caller's fetch options merged with the bounds.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VehicleQuery {
    pub params: FetchOpts,
    /// Region corners, each `"<latitude>:<longitude>"`.
    pub bounds: Vec<String>,
}

impl VehicleQuery {
    pub fn new(fetch_opts: &FetchOpts, corners: &[Coordinate]) -> Self {
        Self {
            params: fetch_opts.clone(),
            bounds: encode_corners(corners),
        }
    }

    /// Flatten into query-string pairs. `bounds` repeats once per corner and
    /// wins over any `bounds` entry in the fetch options.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(k, _)| k.as_str() != BOUNDS_PARAM)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.extend(
            self.bounds
                .iter()
                .map(|b| (BOUNDS_PARAM.to_string(), b.clone())),
        );
        pairs
    }
}

/// Successful API answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehiclesResponse {
    pub vehicles: Vec<Vehicle>,
    /// Errors the API reported alongside (possibly partial) data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl VehiclesResponse {
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        Self {
            vehicles,
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawVehiclesResponse {
    #[serde(default)]
    vehicles: Option<Vec<Vehicle>>,
    #[serde(default)]
    errors: Option<FieldErrors>,
}

/// Decode an API body. A body without `vehicles` is rejected.
pub fn decode_response(body: &[u8]) -> Result<VehiclesResponse, FetchError> {
    let raw: RawVehiclesResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Transport(e.to_string()))?;
    let Some(vehicles) = raw.vehicles else {
        return Err(FetchError::Malformed(
            "response is missing `vehicles`".to_string(),
        ));
    };
    Ok(VehiclesResponse {
        vehicles,
        errors: raw.errors,
    })
}
