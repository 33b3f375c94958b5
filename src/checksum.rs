//! Output fingerprints
//!
//! Two flattening runs over the same schema and configuration must produce the
//! same record sequence. The checksum hashes each record's JSON rendering on its
//! own line, so any change in content or order changes the digest.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::Result;
use crate::model::ShapeModel;

/// Hex-encoded SHA-256 of a shape model's records
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(data)))
    }

    pub fn from_model(model: &ShapeModel) -> Result<Self> {
        let mut hasher = Sha256::new();
        hasher.update(model.root_shape_id.as_bytes());
        hasher.update(b"\n");
        for record in &model.records {
            hasher.update(serde_json::to_vec(record)?);
            hasher.update(b"\n");
        }
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading 12 hex digits, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }

    pub fn matches(&self, model: &ShapeModel) -> Result<bool> {
        Ok(*self == Self::from_model(model)?)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
