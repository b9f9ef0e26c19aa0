//! Async HTTP client for the chartplotter Display Service.
//!
//! The Display Service owns the physical displays and their dashboards;
//! this crate only consumes its `GET`/`POST` contract:
//!
//! - **[`DisplayClient`]**: `displays`, `displays/{id}`,
//!   `displays/{id}/screenIndex` and `displays/{id}/activeScreen`.
//! - **[`normalize`]**: converts the service's loosely-shaped responses
//!   (bare arrays, `{displays|items|dashboards: [...]}` envelopes, bare or
//!   wrapped indices) into one canonical form before anything else sees them.
//! - **[`RestClient`]**: generic GET/POST transport used to fire
//!   user-bound REST actions.

pub mod display;
pub mod error;
pub mod normalize;
pub mod rest;
pub mod transport;

pub use display::{DashboardDescriptor, DisplayClient, DisplayDescriptor};
pub use error::Error;
pub use rest::{HttpMethod, RestClient, RestRequest, RestResponse};
pub use transport::TransportConfig;
