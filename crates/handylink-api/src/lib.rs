// handylink-api: Async Rust client for the Handy REST API v2 (cloud relay)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

mod device;
mod hamp;
mod hdsp;
mod hssp;
mod hstp;

pub use client::{CONNECTION_KEY_HEADER, DEFAULT_BASE_URL, HandyClient};
pub use error::Error;
pub use models::{
    ConnectedResponse, DeviceInfo, FirmwareStatus, HsspStateResponse, Mode, ModeResponse,
    ServerTimeResponse, SlideSettings, SlideState,
};
pub use transport::{CallClass, TransportConfig};
