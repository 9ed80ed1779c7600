// lumos-api: Async Rust client for a home-automation hub (REST + WebSocket)

pub mod client;
pub mod error;
pub mod models;
pub mod socket;
pub mod transport;

pub use client::HubClient;
pub use error::Error;
pub use models::{Area, Attributes, Device, EntityRegistration, EntityState};
pub use transport::TransportConfig;

// Callers drive `fetch_json` directly for registry fallbacks.
pub use reqwest::{Method, StatusCode};
