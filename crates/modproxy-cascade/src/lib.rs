//! Cascade back-end: forwards module protocol operations to another
//! proxy, optionally passing inbound basic-auth along.

pub mod module;
pub mod plugin;

pub use module::CascadeModule;
pub use plugin::{CascadePlugin, CredsFilter};
