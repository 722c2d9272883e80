// Handy REST API v2 HTTP client
//
// Wraps `reqwest::Client` with connection-key header injection, per-call
// timeouts, and in-band error detection. Endpoint groups (device, hamp,
// hdsp, hssp, hstp) are implemented as inherent methods in separate files
// to keep this module focused on transport mechanics.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::{CallClass, TransportConfig};

/// Public base URL of the vendor cloud relay.
pub const DEFAULT_BASE_URL: &str = "https://www.handyfeeling.com/api/handy-rest/v2/";

/// Header carrying the per-device credential on every call.
pub const CONNECTION_KEY_HEADER: &str = "X-Connection-Key";

// ── Error response shape from the relay ──────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one device behind the Handy cloud relay.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted,
/// so background pollers can hold their own copy.
#[derive(Clone)]
pub struct HandyClient {
    http: reqwest::Client,
    base_url: Url,
    transport: TransportConfig,
}

impl std::fmt::Debug for HandyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandyClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HandyClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a connection key and transport config.
    ///
    /// Injects `X-Connection-Key` as a sensitive default header so it never
    /// shows up in debug output.
    pub fn from_connection_key(
        base_url: &str,
        connection_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(connection_key.expose_secret()).map_err(|e| {
            Error::InvalidConnectionKey {
                message: format!("not a valid header value: {e}"),
            }
        })?;
        key_value.set_sensitive(true);
        headers.insert(CONNECTION_KEY_HEADER, key_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self {
            http,
            base_url,
            transport: transport.clone(),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages headers).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        transport: TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            transport,
        })
    }

    /// Ensure the base path ends with `/` so relative joins keep it.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The relay base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The transport configuration (timeouts per call class).
    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        class: CallClass,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let req = self.http.get(url);
        self.send(req, path, class).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        class: CallClass,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let req = self.http.get(url).query(params);
        self.send(req, path, class).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        class: CallClass,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let req = self.http.put(url).json(body);
        self.send(req, path, class).await
    }

    /// PUT with an empty JSON object body (action triggers like `/hamp/start`).
    pub(crate) async fn put_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        class: CallClass,
    ) -> Result<T, Error> {
        self.put(path, &serde_json::json!({}), class).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        endpoint: &str,
        class: CallClass,
    ) -> Result<T, Error> {
        let timeout = self.transport.timeout_for(class);
        let resp = req
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport(e, endpoint, timeout))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| map_transport(e, endpoint, timeout))?;

        if !status.is_success() {
            return Err(rejection(status.as_u16(), &body));
        }

        let value: serde_json::Value = if body.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?
        };

        // The relay reports device-side failures in-band with HTTP 200.
        if value.get("error").is_some_and(serde_json::Value::is_object) {
            return Err(rejection(status.as_u16(), &body));
        }

        serde_json::from_value(value).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

fn map_transport(err: reqwest::Error, endpoint: &str, timeout: std::time::Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            endpoint: endpoint.to_owned(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        Error::Transport(err)
    }
}

fn rejection(status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let (code, name, message) = match parsed {
        Some(ErrorEnvelope {
            error: Some(err),
            message,
        }) => (err.code, err.name, err.message.or(message)),
        Some(ErrorEnvelope {
            error: None,
            message,
        }) => (None, None, message),
        None => (None, None, None),
    };

    Error::Vendor {
        status,
        code,
        message: message
            .or_else(|| name.clone())
            .unwrap_or_else(|| format!("HTTP {status}")),
        name,
    }
}
