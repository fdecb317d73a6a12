//! HTTP surface of a powledger node: routes over the engine and the HTTP
//! implementation of the peer client.

pub mod api;
pub mod constants;
pub mod http_client;

pub use api::{router, ApiError, AppState};
pub use http_client::HttpPeerClient;
