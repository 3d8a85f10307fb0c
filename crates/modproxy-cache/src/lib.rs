//! Aposteriori cache: a write-through, content-addressed layer between the
//! protocol front-end and any back-end. Entries are keyed
//! `<module>/<version>/{revinfo.json,go.mod,src.zip}`; a zip entry is
//! committed only once the upstream stream ends cleanly.

pub mod module;
pub mod plugin;
pub mod store;
mod tee;

pub use module::AposterioriModule;
pub use plugin::{AposterioriPlugin, Registry};
pub use store::{FileStore, FsStore};
