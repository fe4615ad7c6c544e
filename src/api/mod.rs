//! Transport contracts consumed by the engine
//!
//! The engine never talks HTTP or WebSocket itself. It drives two seams:
//! - [`CatalogApi`]: request/response calls that resolve to a payload or an
//!   [`ApiError`](crate::error::ApiError)
//! - [`ChannelTransport`]: one persistent push connection whose callbacks are
//!   delivered to the engine as [`ChannelEvent`]s

mod channel;
mod transport;

pub use channel::{channel_events, ChannelEvent, ChannelEventReceiver, ChannelEventSender, ChannelTransport};
pub use transport::{ApiResult, CatalogApi};
