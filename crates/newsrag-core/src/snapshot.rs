//! Durable snapshot envelope shared by the store and both indexes.
//!
//! Layout: one JSON header line (`kind`, `format_version`, payload length and
//! blake3 checksum) followed by the JSON payload. Writes go to a temp file
//! that is renamed into place, so readers never observe a half-written
//! snapshot.

use std::fs;
use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

const MAGIC: &str = "newsrag-snapshot";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: String,
    kind: String,
    format_version: u32,
    payload_bytes: usize,
    blake3: String,
}

fn snapshot_err(path: &Path, reason: impl Into<String>) -> Error {
    Error::Snapshot { path: path.to_path_buf(), reason: reason.into() }
}

/// Serialize `value` under `kind` and atomically replace `path`.
pub fn write<T: Serialize>(path: &Path, kind: &str, value: &T) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    let header = Header {
        magic: MAGIC.to_string(),
        kind: kind.to_string(),
        format_version: FORMAT_VERSION,
        payload_bytes: payload.len(),
        blake3: blake3::hash(&payload).to_hex().to_string(),
    };
    let mut out = serde_json::to_vec(&header)?;
    out.push(b'\n');
    out.extend_from_slice(&payload);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &out)?;
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), kind, bytes = payload.len(), checksum = %header.blake3, "wrote snapshot");
    Ok(())
}

/// Read a snapshot written by [`write`], verifying kind, version and checksum.
pub fn read<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T> {
    let raw = fs::read(path)?;
    let split = raw
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| snapshot_err(path, "missing header line"))?;
    let header: Header = serde_json::from_slice(&raw[..split])
        .map_err(|e| snapshot_err(path, format!("unreadable header: {e}")))?;
    let payload = &raw[split + 1..];

    if header.magic != MAGIC {
        return Err(snapshot_err(path, "not a newsrag snapshot"));
    }
    if header.kind != kind {
        return Err(snapshot_err(path, format!("expected a '{kind}' snapshot, found '{}'", header.kind)));
    }
    if header.format_version != FORMAT_VERSION {
        return Err(snapshot_err(
            path,
            format!("unsupported format version {} (expected {FORMAT_VERSION})", header.format_version),
        ));
    }
    if header.payload_bytes != payload.len() {
        return Err(snapshot_err(
            path,
            format!("truncated payload: header says {} bytes, found {}", header.payload_bytes, payload.len()),
        ));
    }
    let actual = blake3::hash(payload).to_hex().to_string();
    if actual != header.blake3 {
        return Err(snapshot_err(path, format!("checksum mismatch: expected {}, got {actual}", header.blake3)));
    }
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn round_trip_preserves_floats_exactly() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/vectors.json");
        let mut value = BTreeMap::new();
        value.insert("a".to_string(), vec![0.1f32, -0.333_333_34, 1.0e-7, 0.707_106_77]);
        write(&path, "test", &value).unwrap();
        let back: BTreeMap<String, Vec<f32>> = read(&path, "test").unwrap();
        assert_eq!(back, value);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.json");
        write(&path, "lexical-index", &vec![1u32, 2, 3]).unwrap();
        let err = read::<Vec<u32>>(&path, "vector-index").unwrap_err();
        assert!(matches!(err, Error::Snapshot { .. }), "{err}");
    }

    #[test]
    fn corruption_is_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.json");
        write(&path, "k", &vec![10u32, 20, 30]).unwrap();
        let mut raw = fs::read(&path).unwrap();
        let last = raw.len() - 2;
        raw[last] = b'9';
        fs::write(&path, &raw).unwrap();
        let err = read::<Vec<u32>>(&path, "k").unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"), "{err}");
    }
}
