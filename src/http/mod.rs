//! HTTP surface: health, WebSocket upgrade and the static browser client

pub mod routes;

pub use routes::build_router;
