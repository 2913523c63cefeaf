//! Dataset payload encoding: gzip for the writer output, base64 inside JSON.

use crate::pipeline::error::{PipelineError, PipelineResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Highest level `flate2` accepts.
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Gzip `bytes` at `level` (clamped to 0..=9).
pub fn compress(bytes: &[u8], level: u32) -> PipelineResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(
        Vec::new(),
        Compression::new(level.min(MAX_COMPRESSION_LEVEL)),
    );
    encoder
        .write_all(bytes)
        .map_err(|e| PipelineError::Compression(format!("gzip write failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| PipelineError::Compression(format!("gzip finish failed: {}", e)))
}

pub fn decompress(bytes: &[u8]) -> PipelineResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PipelineError::Compression(format!("gzip read failed: {}", e)))?;
    Ok(out)
}

/// `#[serde(with = ...)]` helper storing optional bytes as a base64 string.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
