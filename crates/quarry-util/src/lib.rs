//! Shared utilities for the quarry resolution engine.
//!
//! This crate provides cross-cutting concerns used by all other quarry crates:
//! error types, filesystem helpers and checksum hashing.

pub mod errors;
pub mod fs;
pub mod hash;
