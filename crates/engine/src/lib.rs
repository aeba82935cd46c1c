//! Campaign dispatch engine — recipient resolution, quota enforcement,
//! per-recipient rendering and delivery, metric recording.

pub mod engine;
pub mod render;
pub mod transport;

pub use engine::CampaignDispatchEngine;
pub use transport::{OutboundEmail, SimulatedTransport, Transport, TransportError};
