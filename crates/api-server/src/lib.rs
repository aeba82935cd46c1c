//! HTTP surface for the dispatch service — REST handlers, bearer auth,
//! health probes, and the Prometheus exporter.

pub mod auth;
pub mod rest;
pub mod server;

pub use rest::AppState;
pub use server::ApiServer;
