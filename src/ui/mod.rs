//! HTTP surface of the streaming server

pub mod handlers;
pub mod server;

pub use server::{router, AppState, WebServer};
