use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for infrastructure failures shared by all quarry crates.
#[derive(Debug, Error, Diagnostic)]
pub enum QuarryError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed resolver configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.quarry/config.toml for syntax errors"))]
    Config { message: String },

    /// A repository file (POM, maven-metadata.xml, tracking file) could not be parsed.
    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    /// Network request or download failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl QuarryError {
    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type QuarryResult<T> = miette::Result<T>;
