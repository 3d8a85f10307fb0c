//! Core contracts and protocol plumbing for the Go module download proxy.
//!
//! This crate holds everything the back-end crates share: the
//! [`Plugin`]/[`Module`] capability traits, the error envelope, the
//! Go-flavored version utilities, the module path case-codec, the URL
//! parser, the longest-prefix router, the archive repacker and the request
//! cancellation context.

pub mod choice;
pub mod context;
pub mod encoding;
pub mod error;
pub mod gomod;
pub mod module;
pub mod repack;
pub mod request;
pub mod router;
pub mod version;

pub use choice::ChoicePlugin;
pub use context::RequestContext;
pub use error::{ProxyError, Result, ResultExt};
pub use module::{BasicAuth, Module, ModuleRequest, Plugin, RevInfo, ZipReader};
pub use repack::Repacker;
pub use request::{ModInfo, Suffix, parse_url_path};
pub use router::Router;
