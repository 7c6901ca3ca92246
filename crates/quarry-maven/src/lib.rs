//! Maven repository formats and transport: POM and `maven-metadata.xml`
//! parsing, the Maven 2 layout, local repository managers, update checks,
//! and repository connectors for `file://` and HTTP(S) repositories.

pub mod checksum;
pub mod connector;
pub mod file;
pub mod http;
pub mod layout;
pub mod local;
pub mod metadata;
pub mod pom;
pub mod tracking;
pub mod transfer;
pub mod update;
