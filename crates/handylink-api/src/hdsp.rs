// HDSP endpoints (direct positioning)

use serde_json::Value;
use tracing::debug;

use crate::client::HandyClient;
use crate::error::Error;
use crate::models::PositionCommand;
use crate::transport::CallClass;

impl HandyClient {
    /// `GET /hdsp`
    pub async fn hdsp(&self) -> Result<Value, Error> {
        self.get("hdsp", CallClass::Query).await
    }

    /// `PUT /hdsp` with a raw settings object.
    pub async fn set_hdsp(&self, settings: &Value) -> Result<Value, Error> {
        self.put("hdsp", settings, CallClass::Action).await
    }

    /// Move to an absolute position (percent of the stroke).
    ///
    /// `PUT /hdsp/command` with `{"position": 0..=100}`
    pub async fn hdsp_position(&self, position: u8) -> Result<Value, Error> {
        debug!(position, "HDSP move");
        self.put("hdsp/command", &PositionCommand { position }, CallClass::Action)
            .await
    }
}
