use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Checksum algorithms published next to repository files, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha256,
    Sha1,
    Md5,
}

impl ChecksumAlgorithm {
    /// All algorithms in the order they should be tried.
    pub const ALL: [ChecksumAlgorithm; 3] = [Self::Sha256, Self::Sha1, Self::Md5];

    /// File extension of the sidecar file, e.g. `sha1` for `lib-1.0.jar.sha1`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha1 => "SHA-1",
            Self::Md5 => "MD5",
        }
    }

    /// Hash a byte slice, returning a lowercase hex string.
    pub fn hex_bytes(self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => digest_hex::<Sha256>(data),
            Self::Sha1 => digest_hex::<Sha1>(data),
            Self::Md5 => digest_hex::<Md5>(data),
        }
    }
}

fn digest_hex<D: Digest>(data: &[u8]) -> String {
    let mut hasher = D::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
