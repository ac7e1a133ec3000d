//! Protocol layer: wire frames, per-transfer sessions, application events,
//! the transport contract and the engine tying them together.
pub mod engine;
pub mod events;
pub mod frame;
pub mod session;
pub mod shared;
pub mod transport;
