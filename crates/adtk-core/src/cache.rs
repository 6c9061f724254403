//! Cache Layer (§4.I).
//!
//! Fingerprint-keyed disk cache under `<cwd>/.afterdarktk/cache/{ir,symbols,indexes}/`.
//! Writes are atomic (`tmp` then `rename`), and every stored value is
//! wrapped in a versioned, checksummed envelope so a torn or corrupted file
//! degrades to a cache miss rather than a crash.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use crate::config::NormalizationConfig;
use crate::errors::{CoreError, Diagnostic};
use crate::hash;

/// A versioned wrapper enforcing payload integrity on every cache read.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct CacheEnvelope<T> {
    pub v: u32,
    pub algo: String,
    pub checksum: String,
    pub payload: T,
}

/// Per-run cache statistics, returned to the caller only when caching is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

/// The three cache subdirectories under the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Ir,
    Symbols,
    Indexes,
}

impl CacheKind {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Ir => "ir",
            Self::Symbols => "symbols",
            Self::Indexes => "indexes",
        }
    }
}

/// The on-disk, fingerprint-keyed cache.
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// `root` is typically `<cwd>/.afterdarktk/cache`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the cache's subdirectory layout. Non-fatal on failure: callers
    /// should continue cache-less and record an `info`-level diagnostic.
    pub fn init_layout(&self) -> Result<(), CoreError> {
        for kind in [CacheKind::Ir, CacheKind::Symbols, CacheKind::Indexes] {
            std::fs::create_dir_all(self.dir(kind))
                .map_err(|e| CoreError::CacheIoError(format!("failed to create cache dir: {e}")))?;
        }
        Ok(())
    }

    fn dir(&self, kind: CacheKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn path_for(&self, kind: CacheKind, fingerprint: &str) -> PathBuf {
        self.dir(kind).join(format!("{fingerprint}.json"))
    }

    /// Attempt to read a cached value. Returns `Ok(None)` on a clean miss;
    /// returns `Err` only for a corrupted envelope the caller should turn
    /// into an `info`-level diagnostic and otherwise treat as a miss too.
    #[instrument(name = "cache.read", skip(self, cfg), fields(kind = ?kind, fingerprint = %fingerprint))]
    pub fn read<T: DeserializeOwned>(
        &self,
        kind: CacheKind,
        fingerprint: &str,
        cfg: &NormalizationConfig,
    ) -> Result<Option<T>, CoreError> {
        let path = self.path_for(kind, fingerprint);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::CacheIoError(format!("failed to read cache entry: {e}"))),
        };

        let envelope: CacheEnvelope<serde_json::Value> = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::CacheCorrupted(format!("malformed envelope: {e}")))?;

        if envelope.v != 1 {
            return Err(CoreError::CacheCorrupted(format!(
                "unsupported envelope version: {}",
                envelope.v
            )));
        }
        if envelope.algo != "sha256" {
            return Err(CoreError::CacheCorrupted(format!(
                "unsupported envelope algorithm: {}",
                envelope.algo
            )));
        }

        let recomputed = hash::hash_value(&envelope.payload, cfg)
            .map_err(|e| CoreError::CacheCorrupted(format!("failed to verify checksum: {e}")))?;
        if recomputed != envelope.checksum {
            return Err(CoreError::CacheCorrupted(
                "checksum mismatch: envelope is torn or tampered with".to_string(),
            ));
        }

        let payload: T = serde_json::from_value(envelope.payload)
            .map_err(|e| CoreError::CacheCorrupted(format!("payload does not match shape: {e}")))?;
        Ok(Some(payload))
    }

    /// Write `payload` under `fingerprint`, atomically (tmp file then
    /// rename). If two processes race on the same fingerprint the result is
    /// whichever rename wins; both payloads are byte-equivalent by
    /// determinism, so the outcome is safe either way.
    #[instrument(name = "cache.write", skip(self, payload, cfg), fields(kind = ?kind, fingerprint = %fingerprint))]
    pub fn write<T: Serialize>(
        &self,
        kind: CacheKind,
        fingerprint: &str,
        payload: &T,
        cfg: &NormalizationConfig,
    ) -> Result<(), CoreError> {
        let payload_value = serde_json::to_value(payload)
            .map_err(|e| CoreError::CacheIoError(format!("failed to serialize payload: {e}")))?;
        let checksum = hash::hash_value(&payload_value, cfg)?;
        let envelope = CacheEnvelope {
            v: 1,
            algo: "sha256".to_string(),
            checksum,
            payload: payload_value,
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| CoreError::CacheIoError(format!("failed to serialize envelope: {e}")))?;

        let dir = self.dir(kind);
        std::fs::create_dir_all(&dir)
            .map_err(|e| CoreError::CacheIoError(format!("failed to create cache dir: {e}")))?;

        let tmp_path = tmp_path(&dir, fingerprint);
        std::fs::write(&tmp_path, &bytes)
            .map_err(|e| CoreError::CacheIoError(format!("failed to write tmp file: {e}")))?;

        let final_path = self.path_for(kind, fingerprint);
        match std::fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                Err(CoreError::CacheIoError(format!("failed to finalize cache write: {e}")))
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn tmp_path(dir: &Path, fingerprint: &str) -> PathBuf {
    let pid = std::process::id();
    let counter = TMP_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    dir.join(format!("{fingerprint}.{pid}.{counter}.tmp"))
}

static TMP_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Compose the fingerprint over `{v:1, content, tsconfig, tsVersion}` as
/// domain-separated sub-hashes, so none of the three components can collide
/// with each other even if two happen to canonicalize to the same bytes.
pub fn compute_fingerprint(
    content_bytes: &[u8],
    tsconfig_bytes: Option<&[u8]>,
    ts_version: &str,
    cfg: &NormalizationConfig,
) -> Result<String, CoreError> {
    use crate::canonical::CanonicalInput;

    let content_hex = hash::hash_bytes_hex(content_bytes);
    let tsconfig_hex = match tsconfig_bytes {
        Some(b) => hash::hash_bytes_hex(b),
        None => hash::hash_bytes_hex(b"<missing>"),
    };

    let composite = CanonicalInput::Object(vec![
        ("v".to_string(), CanonicalInput::Json(serde_json::json!(1))),
        ("content".to_string(), CanonicalInput::Json(serde_json::json!(content_hex))),
        ("tsconfig".to_string(), CanonicalInput::Json(serde_json::json!(tsconfig_hex))),
        ("tsVersion".to_string(), CanonicalInput::Json(serde_json::json!(ts_version))),
    ]);
    hash::hash_with_domain(&composite, "adtk.fingerprint.v1", cfg)
}

/// Degrade a cache-layer error into a non-fatal diagnostic, per the policy
/// that cache failures never escape as pipeline errors.
pub fn as_non_fatal_diagnostic(err: &CoreError) -> Diagnostic {
    Diagnostic::info(err.code(), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cfg() -> NormalizationConfig {
        NormalizationConfig::default()
    }

    #[test]
    fn round_trip_write_then_read() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path());
        cache.init_layout().unwrap();

        let payload = serde_json::json!({"a": 1, "b": [1,2,3]});
        cache.write(CacheKind::Ir, "deadbeef", &payload, &cfg()).unwrap();

        let read: serde_json::Value = cache.read(CacheKind::Ir, "deadbeef", &cfg()).unwrap().unwrap();
        assert_eq!(read, payload);
    }

    #[test]
    fn missing_entry_is_a_clean_miss() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path());
        cache.init_layout().unwrap();
        let read: Option<serde_json::Value> = cache.read(CacheKind::Ir, "nope", &cfg()).unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn tampered_checksum_is_corrupted_not_a_panic() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path());
        cache.init_layout().unwrap();

        let payload = serde_json::json!({"a": 1});
        cache.write(CacheKind::Ir, "fp", &payload, &cfg()).unwrap();

        let path = cache.path_for(CacheKind::Ir, "fp");
        let mut envelope: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        envelope["checksum"] = serde_json::json!("0000000000000000000000000000000000000000000000000000000000000000");
        std::fs::write(&path, serde_json::to_vec(&envelope).unwrap()).unwrap();

        let err = cache.read::<serde_json::Value>(CacheKind::Ir, "fp", &cfg()).unwrap_err();
        assert!(matches!(err, CoreError::CacheCorrupted(_)));
    }

    #[test]
    fn fingerprint_sensitive_to_content() {
        let fp1 = compute_fingerprint(b"a", None, "5.4.0", &cfg()).unwrap();
        let fp2 = compute_fingerprint(b"b", None, "5.4.0", &cfg()).unwrap();
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn fingerprint_sensitive_to_tsconfig() {
        let fp1 = compute_fingerprint(b"a", Some(b"x"), "5.4.0", &cfg()).unwrap();
        let fp2 = compute_fingerprint(b"a", Some(b"y"), "5.4.0", &cfg()).unwrap();
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn fingerprint_sensitive_to_ts_version() {
        let fp1 = compute_fingerprint(b"a", None, "5.4.0", &cfg()).unwrap();
        let fp2 = compute_fingerprint(b"a", None, "5.5.0", &cfg()).unwrap();
        assert_ne!(fp1, fp2);
    }
}
