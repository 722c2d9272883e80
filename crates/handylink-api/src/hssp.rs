// HSSP endpoints (synchronized script playback)
//
// Playback is scheduled against the relay clock: `serverTime` in play and
// seek bodies is the caller's estimate of the relay's current time.

use serde_json::Value;
use tracing::debug;

use crate::client::HandyClient;
use crate::error::Error;
use crate::models::{HsspPlay, HsspSeek, HsspStateResponse, LoopSetting, TimeoutSetting};
use crate::transport::CallClass;

impl HandyClient {
    /// `GET /hssp`
    pub async fn hssp(&self) -> Result<Value, Error> {
        self.get("hssp", CallClass::Query).await
    }

    /// `PUT /hssp` with a raw settings object.
    pub async fn set_hssp(&self, settings: &Value) -> Result<Value, Error> {
        self.put("hssp", settings, CallClass::Action).await
    }

    /// Ask the device to load a script, waiting up to `timeout_ms` on the
    /// device side.
    ///
    /// `PUT /hssp/setup` with `{"timeout": ms}`
    pub async fn hssp_setup(&self, timeout_ms: u64) -> Result<Value, Error> {
        debug!(timeout_ms, "HSSP setup");
        self.put(
            "hssp/setup",
            &TimeoutSetting {
                timeout: timeout_ms,
            },
            CallClass::Setup,
        )
        .await
    }

    /// `PUT /hssp/play`
    pub async fn hssp_play(
        &self,
        url: &str,
        server_time: i64,
        start_time: i64,
        looping: bool,
    ) -> Result<Value, Error> {
        debug!(url, server_time, start_time, looping, "HSSP play");
        self.put(
            "hssp/play",
            &HsspPlay {
                url,
                server_time,
                start_time,
                looping,
            },
            CallClass::Action,
        )
        .await
    }

    /// `PUT /hssp/stop`
    pub async fn hssp_stop(&self) -> Result<Value, Error> {
        debug!("HSSP stop");
        self.put_empty("hssp/stop", CallClass::Action).await
    }

    /// `PUT /hssp/seek` with `{"serverTime": t, "time": ms}`
    pub async fn hssp_seek(&self, server_time: i64, time: i64) -> Result<Value, Error> {
        debug!(server_time, time, "HSSP seek");
        self.put(
            "hssp/seek",
            &HsspSeek { server_time, time },
            CallClass::Action,
        )
        .await
    }

    /// `GET /hssp/state`
    pub async fn hssp_state(&self) -> Result<HsspStateResponse, Error> {
        self.get("hssp/state", CallClass::Query).await
    }

    /// `GET /hssp/loop`
    pub async fn hssp_loop(&self) -> Result<bool, Error> {
        let resp: LoopSetting = self.get("hssp/loop", CallClass::Query).await?;
        Ok(resp.looping)
    }

    /// `PUT /hssp/loop` with `{"loop": bool}`
    pub async fn set_hssp_loop(&self, looping: bool) -> Result<Value, Error> {
        debug!(looping, "HSSP loop");
        self.put("hssp/loop", &LoopSetting { looping }, CallClass::Action)
            .await
    }
}
