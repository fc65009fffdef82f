//! Network subsystem: server-side relay and player-side HTTP client

pub mod client;
pub mod relay;

pub use client::{AudioByteStream, StreamClient};
pub use relay::relay_stream;
