//! Core data types for the quarry resolution engine.
//!
//! This crate defines the value types every other crate exchanges: artifact
//! coordinates, dependencies and exclusions, Maven versions and version
//! constraints, repository descriptions with their update and checksum
//! policies, metadata coordinates, mirror/proxy/authentication selectors and
//! the resolver configuration file.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod artifact;
pub mod config;
pub mod dependency;
pub mod metadata;
pub mod repository;
pub mod selector;
pub mod version;
