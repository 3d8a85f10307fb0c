//! Legacy VCS back-end.
//!
//! Delegates module resolution to the installed `go` toolchain inside a
//! dedicated cache directory. Requests for the same module share one
//! repository handle; blocking toolchain runs happen on helper tasks so a
//! cancelled request never waits for them.

pub mod module;
pub mod plugin;
pub mod repo;

pub use module::VcsModule;
pub use plugin::VcsPlugin;
pub use repo::Repo;
