//! Data models for the feed store.
//!
//! Durable records are serialised with camelCase keys so the stored shape matches the
//! editor's project files.

mod feed;
mod project;
pub mod templates;

pub use feed::*;
pub use project::*;
