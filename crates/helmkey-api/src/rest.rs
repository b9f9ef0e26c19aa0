// Generic REST transport for user-bound actions.
//
// A bound action is an arbitrary GET or POST; the caller decides what a
// non-success status means, this module only reports it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP method of a REST action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// A fully resolved outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub query: Vec<(String, String)>,
    /// JSON body; only sent with `POST`.
    pub body: Option<Value>,
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub status: u16,
    pub body: String,
}

impl RestResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Thin GET/POST client for action dispatch.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
}

impl RestClient {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Send the request and report its status. Transport failures are
    /// errors; HTTP error statuses are not.
    pub async fn send(&self, request: &RestRequest) -> Result<RestResponse, Error> {
        debug!("{} {}", request.method, request.url);

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(request.url.clone()),
            HttpMethod::Post => self.http.post(request.url.clone()),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let (HttpMethod::Post, Some(body)) = (request.method, &request.body) {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();

        Ok(RestResponse { status, body })
    }
}
