//! Apriori back-end: serves a fixed set of modules from a pre-built
//! manifest plus files on disk. Usually composed in front of a network
//! back-end through the choice plugin.

pub mod manifest;
pub mod module;
pub mod plugin;

pub use manifest::{Mapping, ModuleInfo};
pub use module::AprioriModule;
pub use plugin::AprioriPlugin;
