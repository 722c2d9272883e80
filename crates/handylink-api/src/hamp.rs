// HAMP endpoints (alternating motion)
//
// The device must already be in HAMP mode; mode switching lives above
// this crate.

use serde_json::Value;
use tracing::debug;

use crate::client::HandyClient;
use crate::error::Error;
use crate::models::VelocityUpdate;
use crate::transport::CallClass;

impl HandyClient {
    /// `GET /hamp` (velocity and running state)
    pub async fn hamp(&self) -> Result<Value, Error> {
        self.get("hamp", CallClass::Query).await
    }

    /// `PUT /hamp` with a raw settings object.
    pub async fn set_hamp(&self, settings: &Value) -> Result<Value, Error> {
        self.put("hamp", settings, CallClass::Action).await
    }

    /// `PUT /hamp/velocity` with `{"velocity": 0..=100}`
    pub async fn set_hamp_velocity(&self, velocity: u8) -> Result<Value, Error> {
        debug!(velocity, "setting HAMP velocity");
        self.put("hamp/velocity", &VelocityUpdate { velocity }, CallClass::Action)
            .await
    }

    /// `PUT /hamp/start`
    pub async fn hamp_start(&self) -> Result<Value, Error> {
        debug!("starting HAMP motion");
        self.put_empty("hamp/start", CallClass::Action).await
    }

    /// `PUT /hamp/stop`
    pub async fn hamp_stop(&self) -> Result<Value, Error> {
        debug!("stopping HAMP motion");
        self.put_empty("hamp/stop", CallClass::Action).await
    }
}
