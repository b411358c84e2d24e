//! Content fingerprints ("revisions") for precache entries.
//!
//! A revision changes iff the bytes of the referenced file change. MD5 is the
//! default because it is what the generated worker's precache manifest carries;
//! SHA-256 is available when a stronger digest is preferred.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;

/// Digest used to compute revisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RevisionAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl RevisionAlgorithm {
    /// Length of the hex-encoded digest.
    pub fn hex_len(self) -> usize {
        match self {
            RevisionAlgorithm::Md5 => 32,
            RevisionAlgorithm::Sha256 => 64,
        }
    }
}

impl std::str::FromStr for RevisionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(RevisionAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(RevisionAlgorithm::Sha256),
            other => Err(Error::InvalidInput(format!("unknown revision algorithm: {other}"))),
        }
    }
}

/// Compute the revision of a file's contents.
pub fn compute_revision(bytes: &[u8], algorithm: RevisionAlgorithm) -> String {
    match algorithm {
        RevisionAlgorithm::Md5 => format!("{:x}", md5::compute(bytes)),
        RevisionAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
    }
}

/// Whether `revision` has the shape `compute_revision` produces (non-empty
/// lowercase hex). Manifests accept any non-empty revision.
pub fn is_valid_revision(revision: &str) -> bool {
    !revision.is_empty() && revision.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
