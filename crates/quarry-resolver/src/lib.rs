//! Dependency resolution engine: version and range resolution against
//! repository metadata, artifact descriptors with relocation, recursive
//! dependency collection, and artifact/metadata resolution with bounded
//! parallel downloads.

pub mod artifact_resolver;
pub mod cache;
pub mod collector;
pub mod conflict;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod metadata_resolver;
pub mod policy;
pub mod range_resolver;
pub mod remote;
pub mod session;
pub mod system;
mod tasks;
pub mod version_resolver;
pub mod workspace;

pub use error::ResolverError;
pub use session::{ResolutionSession, SessionBuilder};
pub use system::RepositorySystem;
