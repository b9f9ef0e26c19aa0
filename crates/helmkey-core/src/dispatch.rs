// ── Action dispatcher ──
//
// Executes the action bound to a dashboard. REST actions go out through
// `RestClient`; state writes are published to whoever hosts the engine.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use helmkey_api::{RestClient, RestRequest};

use crate::error::CoreError;
use crate::model::Action;

const STATE_WRITE_CHANNEL_SIZE: usize = 64;

/// A local state write requested by a `signalk` action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateWrite {
    pub path: String,
    pub value: Value,
}

/// What a dispatched action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionOutcome {
    Rest { status: u16 },
    StateWrite { path: String },
    Skipped,
}

impl std::fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rest { status } => write!(f, "HTTP {status}"),
            Self::StateWrite { path } => write!(f, "wrote {path}"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    rest: RestClient,
    local_base_url: Url,
    state_writes: broadcast::Sender<StateWrite>,
}

impl ActionDispatcher {
    pub fn new(rest: RestClient, local_base_url: Url) -> Self {
        let (state_writes, _) = broadcast::channel(STATE_WRITE_CHANNEL_SIZE);
        Self {
            rest,
            local_base_url,
            state_writes,
        }
    }

    /// Subscribe to state writes from `signalk` actions.
    pub fn subscribe(&self) -> broadcast::Receiver<StateWrite> {
        self.state_writes.subscribe()
    }

    pub async fn dispatch(&self, action: &Action) -> Result<ActionOutcome, CoreError> {
        match action {
            Action::None => Ok(ActionOutcome::Skipped),
            Action::Rest {
                url,
                method,
                query,
                body,
            } => {
                let request = RestRequest {
                    method: *method,
                    url: self.resolve(url)?,
                    query: query.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    body: body.clone().map(parse_embedded_json),
                };

                let response = self.rest.send(&request).await.map_err(|e| CoreError::ActionFailed {
                    message: format!("{} {}: {e}", request.method, request.url),
                })?;

                if !response.is_success() {
                    warn!(status = response.status, url = %request.url, "action rejected");
                    return Err(CoreError::ActionFailed {
                        message: format!(
                            "{} {} returned HTTP {}",
                            request.method, request.url, response.status
                        ),
                    });
                }
                debug!(status = response.status, url = %request.url, "action completed");
                Ok(ActionOutcome::Rest {
                    status: response.status,
                })
            }
            Action::Signalk { path, value } => {
                let write = StateWrite {
                    path: path.clone(),
                    value: value.clone(),
                };
                self.state_writes
                    .send(write)
                    .map_err(|_| CoreError::ActionFailed {
                        message: format!("no subscriber for state write to {path}"),
                    })?;
                debug!(path = %path, "state write published");
                Ok(ActionOutcome::StateWrite { path: path.clone() })
            }
        }
    }

    /// Absolute http(s) URLs are used as given; anything else is a path
    /// under the local server.
    fn resolve(&self, raw: &str) -> Result<Url, CoreError> {
        if let Ok(url) = Url::parse(raw) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url);
            }
        }
        self.local_base_url
            .join(raw)
            .map_err(|e| CoreError::ActionFailed {
                message: format!("invalid action URL {raw:?}: {e}"),
            })
    }
}

/// A body stored as a JSON string is sent as the document it contains.
fn parse_embedded_json(body: Value) -> Value {
    if let Value::String(text) = &body {
        if let Ok(parsed) = serde_json::from_str(text) {
            return parsed;
        }
    }
    body
}
