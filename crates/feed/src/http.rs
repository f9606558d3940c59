use tracing::debug;

use crate::protocol::{VehicleQuery, VehiclesResponse, decode_response};
use crate::source::{BoxFuture, FetchError, VehicleApi};

/// Largest body accepted from the vehicle API.
const MAX_BYTES: usize = 8 * 1024 * 1024;

/// HTTP vehicle API: `GET <url>?<params>&bounds=<corner>&bounds=<corner>`.
pub struct HttpVehicleApi {
    url: String,
    client: reqwest::Client,
}

impl HttpVehicleApi {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl VehicleApi for HttpVehicleApi {
    fn get_vehicles<'a>(
        &'a self,
        query: &'a VehicleQuery,
    ) -> BoxFuture<'a, Result<VehiclesResponse, FetchError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(&self.url)
                .query(&query.to_pairs())
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            if bytes.len() > MAX_BYTES {
                return Err(FetchError::Transport(format!(
                    "response too large ({} bytes, max {MAX_BYTES})",
                    bytes.len()
                )));
            }

            debug!("vehicle API returned {} bytes", bytes.len());
            decode_response(&bytes)
        })
    }
}
