//! Vehicle API abstraction.
//!
//! The poller only needs one operation: fetch the vehicles matching a query.
//! Implementations must be `Send + Sync` so a fetch can run on its own task.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::protocol::{VehicleQuery, VehiclesResponse};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Why a fetch produced no usable response.
///
/// The `Display` text is what ends up in the view's `main` error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network failure or an undecodable body.
    #[error("{0}")]
    Transport(String),

    /// The API answered with a non-success status.
    #[error("upstream HTTP {status}")]
    Status { status: u16, body: String },

    /// The body decoded but lacks the vehicle list.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The fetch did not settle within the configured limit.
    #[error("timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The fetch was abandoned before it settled (shutdown or a crashed task).
    #[error("fetch cancelled")]
    Cancelled,
}

/// Source of vehicle data.
pub trait VehicleApi: Send + Sync {
    /// Fetch the vehicles matching `query`.
    fn get_vehicles<'a>(
        &'a self,
        query: &'a VehicleQuery,
    ) -> BoxFuture<'a, Result<VehiclesResponse, FetchError>>;
}
