// HSTP endpoints (device-side time sync)

use serde_json::Value;
use tracing::debug;

use crate::client::HandyClient;
use crate::error::Error;
use crate::models::{OffsetSetting, TimeoutSetting};
use crate::transport::CallClass;

impl HandyClient {
    /// `GET /hstp`
    pub async fn hstp(&self) -> Result<Value, Error> {
        self.get("hstp", CallClass::Query).await
    }

    /// `PUT /hstp` with a raw settings object.
    pub async fn set_hstp(&self, settings: &Value) -> Result<Value, Error> {
        self.put("hstp", settings, CallClass::Action).await
    }

    /// Ask the device to resynchronize its clock with the relay.
    ///
    /// `PUT /hstp/time`
    pub async fn sync_hstp_time(&self) -> Result<Value, Error> {
        debug!("HSTP time sync");
        self.put_empty("hstp/time", CallClass::Action).await
    }

    /// `GET /hstp/offset`
    pub async fn hstp_offset(&self) -> Result<Value, Error> {
        self.get("hstp/offset", CallClass::Query).await
    }

    /// `PUT /hstp/offset` with `{"offset": ms}`
    pub async fn set_hstp_offset(&self, offset: i64) -> Result<Value, Error> {
        debug!(offset, "setting device clock offset");
        self.put("hstp/offset", &OffsetSetting { offset }, CallClass::Action)
            .await
    }

    /// Start a device-side clock sync, waiting up to `timeout_ms`.
    ///
    /// `PUT /hstp/sync` with `{"timeout": ms}`
    pub async fn hstp_sync(&self, timeout_ms: u64) -> Result<Value, Error> {
        debug!(timeout_ms, "HSTP sync");
        self.put(
            "hstp/sync",
            &TimeoutSetting {
                timeout: timeout_ms,
            },
            CallClass::Setup,
        )
        .await
    }
}
