// Router daemon HTTP client
//
// Wraps `reqwest::Client` with router-daemon URL construction and
// response decoding. The daemon exposes a small JSON config surface:
// four read endpoints and one write endpoint. Config payloads are
// deliberately kept as raw `serde_json::Value` — the daemon owns the
// schema, and gatewatch-core only interprets a handful of fields.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP client for the router daemon's config API.
///
/// The `base_url` is the daemon's versioned API root, e.g.
/// `http://127.0.0.1:8837/v1`.
pub struct RouterClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RouterClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The daemon base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /config/active` — the current full router configuration.
    pub async fn active_config(&self) -> Result<Value, Error> {
        self.get(self.api_url("config/active")).await
    }

    /// `GET /config/wans` — the WAN subset of the interface map.
    pub async fn wan_interfaces(&self) -> Result<HashMap<String, Value>, Error> {
        self.get(self.api_url("config/wans")).await
    }

    /// `GET /config/lans` — the LAN subset of the interface map.
    pub async fn lan_interfaces(&self) -> Result<HashMap<String, Value>, Error> {
        self.get(self.api_url("config/lans")).await
    }

    /// `GET /config/interfaces` — the full interface map (config + state).
    pub async fn interfaces(&self) -> Result<HashMap<String, Value>, Error> {
        self.get(self.api_url("config/interfaces")).await
    }

    /// `POST /config/set` — apply a new configuration.
    ///
    /// Returns the daemon's response body (applied config / status blob).
    pub async fn set_config(&self, config: &Value) -> Result<Value, Error> {
        let url = self.api_url("config/set");
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .json(config)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::decode(resp).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build a full URL under the daemon API root.
    fn api_url(&self, path: &str) -> Url {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{path}");
        // base_url is validated at construction; appending a fixed path
        // segment cannot make it unparseable.
        Url::parse(&full).unwrap_or_else(|_| self.base_url.clone())
    }

    /// Send a GET request and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        Self::decode(resp).await
    }

    /// Check the status and decode the body, keeping a body preview on
    /// decode failures for debugging.
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body: preview(&body).to_owned(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }
}

const PREVIEW_LEN: usize = 200;

/// At most `PREVIEW_LEN` bytes of the body, cut on a char boundary.
fn preview(body: &str) -> &str {
    if body.len() <= PREVIEW_LEN {
        return body;
    }
    let mut end = PREVIEW_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
