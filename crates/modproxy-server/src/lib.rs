//! HTTP front-end of the Go module download proxy.

pub mod middleware;

pub use middleware::{AppState, app};
