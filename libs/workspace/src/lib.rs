//! Concrete collaborators for the evaluation engine
//!
//! [`assetlsp_values`] evaluates dynamic values against borrowed collaborators
//! and never touches the disk. This crate provides small implementations of
//! those collaborators backed by files:
//!
//! - [`SchemaDatabase`]: asset types and enumerations read from a JSON schema
//! - [`AssetDocument`]: a parsed `Key Value` asset file
//! - [`DiscoveryIndex`]: asset files under a directory, by GUID and id
//! - [`FileWorkspace`]: loads documents on demand behind an LRU cache
//!
//! [`Project`] ties the four together and builds evaluation contexts.

pub mod discovery;
pub mod document;
pub mod error;
pub mod project;
pub mod schema;
pub mod workspace;

pub use discovery::DiscoveryIndex;
pub use document::AssetDocument;
pub use error::{Error, Result};
pub use project::Project;
pub use schema::{SchemaDatabase, SchemaDocument, SchemaType};
pub use workspace::{FileWorkspace, DEFAULT_CACHE_CAPACITY};
