// Display Service HTTP client
//
// Wraps `reqwest::Client` with Display Service URL construction and
// response-shape normalization. Every method returns canonical types;
// envelopes and bare values never leak past this module.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, preview};
use crate::normalize;
use crate::transport::TransportConfig;

/// One display as reported by the Display Service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayDescriptor {
    /// Identity derived by field priority (see [`normalize::display_identity`]).
    pub id: String,
    pub name: Option<String>,
    /// The untouched descriptor payload.
    pub raw: Value,
}

/// One dashboard within a display, in service order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardDescriptor {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeScreen {
    change_id: usize,
}

/// Client for the Display Service's `displays` resource tree.
#[derive(Debug, Clone)]
pub struct DisplayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DisplayClient {
    /// Create a client rooted at `base_url` (e.g.
    /// `http://localhost:3000/plugins/kip/`), building a fresh HTTP client.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET displays`
    pub async fn list_displays(&self) -> Result<Vec<DisplayDescriptor>, Error> {
        let url = self.endpoint(&["displays"])?;
        let body = self.get_json(url).await?;
        let items = list_or_shape_error(body, "display list")?;

        Ok(items
            .into_iter()
            .enumerate()
            .map(|(position, raw)| DisplayDescriptor {
                id: normalize::display_identity(&raw, position),
                name: normalize::display_name(&raw),
                raw,
            })
            .collect())
    }

    /// `GET displays/{id}`: the display's ordered dashboard list.
    pub async fn list_dashboards(&self, display_id: &str) -> Result<Vec<DashboardDescriptor>, Error> {
        let url = self.endpoint(&["displays", display_id])?;
        let body = self.get_json(url).await?;
        let items = list_or_shape_error(body, "dashboard list")?;

        Ok(items
            .iter()
            .enumerate()
            .map(|(position, raw)| DashboardDescriptor {
                id: normalize::dashboard_identity(raw, position),
                name: normalize::display_name(raw),
            })
            .collect())
    }

    /// `GET displays/{id}/screenIndex`
    ///
    /// `Ok(None)` means the service answered but has no index for the
    /// display (`null`, negative, or an object without a recognized key).
    pub async fn screen_index(&self, display_id: &str) -> Result<Option<usize>, Error> {
        let url = self.endpoint(&["displays", display_id, "screenIndex"])?;
        let body = self.get_json(url).await?;
        Ok(normalize::extract_index(&body))
    }

    /// `POST displays/{id}/activeScreen` with `{changeId: index}`.
    pub async fn set_active_screen(&self, display_id: &str, index: usize) -> Result<(), Error> {
        let url = self.endpoint(&["displays", display_id, "activeScreen"])?;
        debug!("POST {url} changeId={index}");

        let resp = self
            .http
            .post(url)
            .json(&ChangeScreen { change_id: index })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: preview(&body),
            });
        }
        Ok(())
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value, Error> {
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

fn list_or_shape_error(body: Value, what: &'static str) -> Result<Vec<Value>, Error> {
    let shown = preview(&body.to_string());
    normalize::unwrap_list(body).ok_or(Error::UnexpectedShape { what, body: shown })
}
