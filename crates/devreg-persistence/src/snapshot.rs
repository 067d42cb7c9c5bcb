//! ---
//! devreg_section: "03-persistence-logging"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Persistence abstractions and storage bindings."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use devreg_core::Device;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{PersistenceError, Result};

/// Current snapshot envelope version.
pub const SNAPSHOT_VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    version: u16,
    created_at: DateTime<Utc>,
    hash: String,
    devices: Vec<Device>,
}

/// Persist the device list to `path`, returning the number of bytes written.
///
/// The serializer is selected based on file extension: `.cbor` writes CBOR,
/// all other extensions default to JSON. The snapshot is written next to the
/// target and renamed over it, so readers never observe a partial file.
pub fn save_snapshot(devices: &[Device], path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let envelope = SnapshotEnvelope {
        version: SNAPSHOT_VERSION,
        created_at: Utc::now(),
        hash: compute_hash(devices)?,
        devices: devices.to_vec(),
    };

    let bytes = match path.extension().and_then(|ext| ext.to_str()) {
        Some("cbor") => serde_cbor::to_vec(&envelope).map_err(PersistenceError::from)?,
        _ => serde_json::to_vec_pretty(&envelope)?,
    };

    let staging = staging_path(path);
    {
        let mut writer = BufWriter::new(File::create(&staging)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
    }
    fs::rename(&staging, path)?;
    Ok(bytes.len() as u64)
}

/// Load a snapshot from disk and return the contained devices in stored order.
pub fn load_snapshot(path: &Path) -> Result<Vec<Device>> {
    let envelope = load_envelope(path)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(envelope.version));
    }
    let expected = compute_hash(&envelope.devices)?;
    if envelope.hash != expected {
        return Err(PersistenceError::HashMismatch);
    }
    Ok(envelope.devices)
}

/// Verify the integrity of a snapshot without returning the payload.
pub fn verify_snapshot(path: &Path) -> bool {
    load_snapshot(path).is_ok()
}

fn load_envelope(path: &Path) -> Result<SnapshotEnvelope> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let envelope = match path.extension().and_then(|ext| ext.to_str()) {
        Some("cbor") => serde_cbor::from_slice(&bytes).map_err(PersistenceError::from)?,
        _ => serde_json::from_slice(&bytes)?,
    };
    Ok(envelope)
}

fn compute_hash(devices: &[Device]) -> Result<String> {
    let serialized = serde_json::to_vec(devices)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized);
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devreg_core::DeviceType;
    use tempfile::tempdir;

    fn sample() -> Vec<Device> {
        vec![
            Device::new("gw", DeviceType::Gateway),
            Device::new("sw", DeviceType::Switch).with_uplink("gw"),
            Device::new("ap", DeviceType::AccessPoint).with_uplink("sw"),
        ]
    }

    #[test]
    fn save_and_load_json_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devices.json");

        let written = save_snapshot(&sample(), &path).unwrap();
        assert!(written > 0);
        assert!(verify_snapshot(&path));
        assert_eq!(load_snapshot(&path).unwrap(), sample());
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn save_and_load_cbor_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("devices.cbor");

        save_snapshot(&sample(), &path).unwrap();
        assert!(verify_snapshot(&path));
        assert_eq!(load_snapshot(&path).unwrap(), sample());
    }

    #[test]
    fn verify_rejects_tampered_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devices.json");
        save_snapshot(&sample(), &path).unwrap();

        // Re-parent the access point without updating the hash.
        let mut envelope: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        envelope["devices"][2]["uplink"] = serde_json::json!("gw");
        fs::write(&path, serde_json::to_vec_pretty(&envelope).unwrap()).unwrap();

        assert!(!verify_snapshot(&path));
        assert!(matches!(
            load_snapshot(&path),
            Err(PersistenceError::HashMismatch)
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devices.json");
        save_snapshot(&sample(), &path).unwrap();

        let mut envelope: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        envelope["version"] = serde_json::json!(SNAPSHOT_VERSION + 1);
        fs::write(&path, serde_json::to_vec_pretty(&envelope).unwrap()).unwrap();

        assert!(matches!(
            load_snapshot(&path),
            Err(PersistenceError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn staging_path_appends_suffix() {
        assert_eq!(
            staging_path(Path::new("/data/devices.json")),
            PathBuf::from("/data/devices.json.tmp")
        );
    }
}
