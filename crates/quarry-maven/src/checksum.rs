//! Artifact checksum verification (SHA-256, SHA-1, MD5) against the sidecar
//! files published next to repository files.

use quarry_core::repository::ChecksumPolicy;
use quarry_util::hash::ChecksumAlgorithm;

use crate::transfer::TransferError;

/// Result of checking downloaded data against one sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Matched(ChecksumAlgorithm),
    Mismatch {
        algorithm: ChecksumAlgorithm,
        expected: String,
        actual: String,
    },
    /// No sidecar was published for any algorithm.
    NoSidecar,
}

/// Compare `data` with the content of a checksum sidecar.
pub fn compare(data: &[u8], algorithm: ChecksumAlgorithm, sidecar: &str) -> Verification {
    let expected = extract_hash(sidecar);
    let actual = algorithm.hex_bytes(data);
    if actual.eq_ignore_ascii_case(&expected) {
        tracing::debug!("{} ok", algorithm.name());
        Verification::Matched(algorithm)
    } else {
        Verification::Mismatch {
            algorithm,
            expected,
            actual,
        }
    }
}

/// Apply a repository checksum policy to a verification outcome.
///
/// `fail` rejects mismatches, `warn` logs them, `ignore` skips verification
/// entirely (callers need not fetch sidecars in that case). A missing sidecar
/// is only ever a warning.
pub fn enforce(
    policy: ChecksumPolicy,
    verification: &Verification,
    item: &str,
    repository: &str,
    url: &str,
) -> Result<(), TransferError> {
    match verification {
        Verification::Matched(_) => Ok(()),
        Verification::NoSidecar => {
            if policy != ChecksumPolicy::Ignore {
                tracing::warn!("No checksum sidecar found for {url}");
            }
            Ok(())
        }
        Verification::Mismatch {
            algorithm,
            expected,
            actual,
        } => {
            let message = format!(
                "{} mismatch for {url}: expected {expected}, got {actual}",
                algorithm.name()
            );
            match policy {
                ChecksumPolicy::Fail => Err(TransferError::Checksum {
                    item: item.to_string(),
                    repository: repository.to_string(),
                    message,
                }),
                ChecksumPolicy::Warn => {
                    tracing::warn!("{message}");
                    Ok(())
                }
                ChecksumPolicy::Ignore => Ok(()),
            }
        }
    }
}

/// Extract the hex hash from a checksum file.
///
/// Maven checksum files may contain just the hash, or `hash  filename`.
pub fn extract_hash(content: &str) -> String {
    content.split_whitespace().next().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_hash_simple() {
        assert_eq!(extract_hash("abc123\n"), "abc123");
    }

    #[test]
    fn extract_hash_with_filename() {
        assert_eq!(extract_hash("abc123  my-lib-1.0.jar\n"), "abc123");
    }

    #[test]
    fn matching_sha256() {
        let v = compare(
            b"hello world",
            ChecksumAlgorithm::Sha256,
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9",
        );
        assert_eq!(v, Verification::Matched(ChecksumAlgorithm::Sha256));
    }

    #[test]
    fn mismatch_fails_only_under_fail_policy() {
        let v = compare(b"hello world", ChecksumAlgorithm::Md5, "deadbeef");
        assert!(matches!(v, Verification::Mismatch { .. }));
        assert!(enforce(ChecksumPolicy::Fail, &v, "g:a:1", "central", "u").is_err());
        assert!(enforce(ChecksumPolicy::Warn, &v, "g:a:1", "central", "u").is_ok());
        assert!(enforce(ChecksumPolicy::Ignore, &v, "g:a:1", "central", "u").is_ok());
    }

    #[test]
    fn missing_sidecar_is_tolerated() {
        assert!(enforce(ChecksumPolicy::Fail, &Verification::NoSidecar, "x", "r", "u").is_ok());
    }
}
