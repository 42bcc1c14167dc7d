//! Best-effort device position.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::{error::Result, models::GeoLocation};

/// Position provider of the capturing device.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<GeoLocation>;
}

/// Device without positioning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl Geolocator for NoGeolocation {
    async fn locate(&self) -> Result<GeoLocation> {
        Err(crate::error::WorkflowError::Configuration {
            message: "geolocation unavailable".into(),
        })
    }
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GeoLocation);

#[async_trait]
impl Geolocator for FixedLocation {
    async fn locate(&self) -> Result<GeoLocation> {
        Ok(self.0)
    }
}

/// Waits at most `timeout` for a position. Failures and timeouts yield
/// `None` so capture never blocks on positioning.
pub async fn locate_best_effort(geolocator: &dyn Geolocator, timeout: Duration) -> Option<GeoLocation> {
    match tokio::time::timeout(timeout, geolocator.locate()).await {
        Ok(Ok(location)) => Some(location),
        Ok(Err(e)) => {
            debug!("Geolocation omitted: {e}");
            None
        }
        Err(_) => {
            debug!("Geolocation omitted: no fix within {timeout:?}");
            None
        }
    }
}
