//! GitLab API back-end.
//!
//! Serves module protocol operations straight from the GitLab REST API:
//! tag listings become version lists, untagged revisions get synthesized
//! pseudo-versions, and repository archives are repacked into the module
//! zip layout.

pub mod client;
pub mod error;
pub mod module;
pub mod plugin;
pub mod types;

pub use client::Client;
pub use error::{GitlabError, Result};
pub use module::GitlabModule;
pub use plugin::GitlabPlugin;
