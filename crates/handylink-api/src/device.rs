// Device-level endpoints
//
// Connectivity, identity, mode, slide range, relay clock and OTA lookup.
// These are mode-independent and safe to call at any time.

use serde_json::Value;
use tracing::debug;

use crate::client::HandyClient;
use crate::error::Error;
use crate::models::{
    ConnectedResponse, DeviceInfo, Mode, ModeResponse, ModeUpdate, ServerTimeResponse,
    SlideSettings, SlideState,
};
use crate::transport::CallClass;

impl HandyClient {
    /// Whether the device currently holds a link to the relay.
    ///
    /// `GET /connected`
    pub async fn is_connected(&self) -> Result<bool, Error> {
        let resp: ConnectedResponse = self.get("connected", CallClass::Query).await?;
        Ok(resp.connected)
    }

    /// Firmware and hardware identity.
    ///
    /// `GET /info`
    pub async fn info(&self) -> Result<DeviceInfo, Error> {
        self.get("info", CallClass::Query).await
    }

    /// `GET /mode`
    pub async fn mode(&self) -> Result<Mode, Error> {
        let resp: ModeResponse = self.get("mode", CallClass::Query).await?;
        Ok(resp.mode)
    }

    /// `PUT /mode` with `{"mode": n}`
    pub async fn set_mode(&self, mode: Mode) -> Result<Value, Error> {
        debug!(?mode, "switching device mode");
        self.put("mode", &ModeUpdate { mode }, CallClass::Action)
            .await
    }

    /// `GET /slide`
    pub async fn slide(&self) -> Result<SlideState, Error> {
        self.get("slide", CallClass::Query).await
    }

    /// `PUT /slide` with `{"min": a, "max": b}`
    pub async fn set_slide(&self, settings: &SlideSettings) -> Result<Value, Error> {
        debug!(min = settings.min, max = settings.max, "setting slide range");
        self.put("slide", settings, CallClass::Action).await
    }

    /// One relay clock sample in epoch milliseconds.
    ///
    /// `GET /servertime` (short timeout, used for offset estimation)
    pub async fn server_time(&self) -> Result<f64, Error> {
        let resp: ServerTimeResponse = self.get("servertime", CallClass::ServerTime).await?;
        Ok(resp.server_time)
    }

    /// Latest published firmware for a model and branch.
    ///
    /// `GET /ota/latest?model=..&branch=..`
    pub async fn latest_firmware(&self, model: &str, branch: &str) -> Result<Value, Error> {
        self.get_with_params(
            "ota/latest",
            &[("model", model), ("branch", branch)],
            CallClass::Query,
        )
        .await
    }
}
