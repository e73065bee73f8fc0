//! `backup --out <path>` / `restore --in <path>`.
//!
//! Archive is a `.tar.zst` with a `MANIFEST.json` entry carrying per-file
//! xxh3 checksums, written to a `.tmp` sibling and renamed into place so a
//! crash mid-write never leaves a half-written backup at the destination
//! path.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tar::{Builder, Header};
use vgdb_core::{Error, Result};
use vgdb_storage::StorageAdapter;
use xxhash_rust::xxh3::xxh3_64;

const MANIFEST_PATH: &str = "MANIFEST.json";
const FORMAT_VERSION: u32 = 1;
const COMPRESSION_LEVEL: i32 = 3;

fn xxh3_hex(data: &[u8]) -> String {
    format!("{:016x}", xxh3_64(data))
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    created_us: u64,
    /// blob key -> xxh3 checksum of its bytes.
    entries: BTreeMap<String, String>,
}

/// Outcome of a completed backup, printed by the CLI on success.
#[derive(Debug)]
pub struct BackupInfo {
    pub blob_count: usize,
    pub bundle_size_bytes: u64,
}

/// Reads every blob the adapter holds and writes them, plus a checksummed
/// manifest, into a single `.tar.zst` archive at `path`.
pub fn run_backup(storage: &dyn StorageAdapter, path: &Path, now_us: u64) -> Result<BackupInfo> {
    let temp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::StorageFailure(e.to_string()))?;
        }
    }

    match write_archive(storage, &temp_path, now_us) {
        Ok(info) => {
            fs::rename(&temp_path, path).map_err(|e| Error::StorageFailure(e.to_string()))?;
            Ok(info)
        }
        Err(err) => {
            let _ = fs::remove_file(&temp_path);
            Err(err)
        }
    }
}

fn write_archive(storage: &dyn StorageAdapter, path: &Path, now_us: u64) -> Result<BackupInfo> {
    let keys = storage.list_blobs("")?;
    let mut blobs = Vec::with_capacity(keys.len());
    let mut entries = BTreeMap::new();
    for key in &keys {
        let bytes = storage.get_blob(key)?.ok_or_else(|| Error::StorageFailure(format!("blob vanished mid-backup: {key}")))?;
        entries.insert(key.clone(), xxh3_hex(&bytes));
        blobs.push((key.clone(), bytes));
    }
    let manifest = Manifest { format_version: FORMAT_VERSION, created_us: now_us, entries };
    let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(|e| Error::StorageFailure(e.to_string()))?;

    let file = File::create(path).map_err(|e| Error::StorageFailure(e.to_string()))?;
    let zstd_writer = zstd::Encoder::new(BufWriter::new(file), COMPRESSION_LEVEL)
        .map_err(|e| Error::StorageFailure(format!("zstd encoder: {e}")))?
        .auto_finish();
    let mut tar_builder = Builder::new(zstd_writer);
    add_entry(&mut tar_builder, MANIFEST_PATH, &manifest_json)?;
    for (key, bytes) in &blobs {
        add_entry(&mut tar_builder, key, bytes)?;
    }
    tar_builder.into_inner().map_err(|e| Error::StorageFailure(format!("tar finish: {e}")))?;

    let bundle_size_bytes = fs::metadata(path).map_err(|e| Error::StorageFailure(e.to_string()))?.len();
    Ok(BackupInfo { blob_count: blobs.len(), bundle_size_bytes })
}

fn add_entry<W: Write>(builder: &mut Builder<W>, path: &str, data: &[u8]) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_path(path).map_err(|e| Error::StorageFailure(format!("set path '{path}': {e}")))?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder.append(&header, data).map_err(|e| Error::StorageFailure(format!("append '{path}': {e}")))
}

/// Outcome of a completed restore.
#[derive(Debug)]
pub struct RestoreInfo {
    pub blobs_restored: usize,
}

/// Reads a `.tar.zst` archive produced by [`run_backup`], verifies every
/// entry's checksum against the manifest, and writes each blob back
/// through `storage`. Fails before writing anything if the manifest is
/// missing or a checksum does not match (§7 `StorageFailure`: a corrupt
/// backup must not be silently partially restored).
pub fn run_restore(storage: &dyn StorageAdapter, path: &Path) -> Result<RestoreInfo> {
    let file = File::open(path).map_err(|e| Error::StorageFailure(e.to_string()))?;
    let zstd_reader = zstd::Decoder::new(file).map_err(|e| Error::StorageFailure(format!("zstd decoder: {e}")))?;
    let mut archive = tar::Archive::new(zstd_reader);

    let mut manifest: Option<Manifest> = None;
    let mut blobs: Vec<(String, Vec<u8>)> = Vec::new();
    for entry in archive.entries().map_err(|e| Error::StorageFailure(e.to_string()))? {
        let mut entry = entry.map_err(|e| Error::StorageFailure(e.to_string()))?;
        let entry_path = entry.path().map_err(|e| Error::StorageFailure(e.to_string()))?.to_string_lossy().into_owned();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(|e| Error::StorageFailure(e.to_string()))?;
        if entry_path == MANIFEST_PATH {
            manifest = Some(serde_json::from_slice(&data).map_err(|e| Error::StorageFailure(format!("corrupt manifest: {e}")))?);
        } else {
            blobs.push((entry_path, data));
        }
    }

    let manifest = manifest.ok_or_else(|| Error::StorageFailure("archive has no MANIFEST.json".into()))?;
    for (key, data) in &blobs {
        let expected = manifest.entries.get(key).ok_or_else(|| Error::StorageFailure(format!("archive entry missing from manifest: {key}")))?;
        let actual = xxh3_hex(data);
        if expected != &actual {
            return Err(Error::StorageFailure(format!("checksum mismatch for {key}: expected {expected}, got {actual}")));
        }
    }

    for (key, data) in &blobs {
        storage.put_blob(key, data)?;
    }
    Ok(RestoreInfo { blobs_restored: blobs.len() })
}
