//! # Bundle Files
//!
//! Reading and writing bundle documents on disk.
//!
//! - Saves are atomic: the JSON goes to `<file>.<ext>.tmp`, is synced and
//!   then renamed over the target.
//! - A [`FileLock`] guards a bundle against concurrent writers. It holds an
//!   OS lock (fs2) on `<file>.<ext>.lock` and writes who holds it into that
//!   file so other users can see it.
//! - Bundles that carry `meta` are checked against [`SCHEMA_VERSION`].
//!   Bundles without `meta` (plain front-end exports) are accepted as is.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use thermal_core::file_io::{load_model, save_model, FileLock};
//! use thermal_core::settings::EngineSettings;
//!
//! let path = Path::new("fridge.json");
//! let _lock = FileLock::acquire(path, "cryo-lab")?;
//! let model = load_model(path, EngineSettings::default())?;
//! save_model(&model, path)?;
//! # Ok::<(), thermal_core::errors::ThermalError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bundle::Bundle;
use crate::errors::{ThermalError, ThermalResult};
use crate::model::{ThermalModel, SCHEMA_VERSION};
use crate::settings::EngineSettings;

/// Locks older than this are taken over
const LOCK_EXPIRY_HOURS: i64 = 24;

/// Contents of a `.lock` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Who holds the lock (user name, e-mail, tool name)
    pub holder: String,
    pub host: String,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn current(holder: impl Into<String>) -> Self {
        LockInfo {
            holder: holder.into(),
            host: host_name(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// A lock is abandoned when it has expired or when its process is gone
    /// from this host.
    fn is_abandoned(&self) -> bool {
        if Utc::now() - self.acquired_at > Duration::hours(LOCK_EXPIRY_HOURS) {
            return true;
        }
        self.host == host_name() && !process_alive(self.pid)
    }
}

fn host_name() -> String {
    ["HOSTNAME", "COMPUTERNAME", "HOST"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    // Only expiry applies off Linux
    true
}

/// Exclusive lock on a bundle file, released on drop.
#[derive(Debug)]
pub struct FileLock {
    target: PathBuf,
    lock_path: PathBuf,
    _handle: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Take the lock for `path`.
    ///
    /// # Errors
    ///
    /// * `FileLocked` - a live lock is held by someone else
    /// * `FileError` - the lock file could not be written
    pub fn acquire(path: &Path, holder: impl Into<String>) -> ThermalResult<Self> {
        let lock_path = sidecar_path(path, "lock");

        if let Some(existing) = FileLock::peek(path) {
            return Err(ThermalError::file_locked(
                path.display().to_string(),
                format!("{}@{}", existing.holder, existing.host),
                existing.acquired_at.to_rfc3339(),
            ));
        }

        let mut handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| io_error("create lock", &lock_path, e))?;

        handle.try_lock_exclusive().map_err(|_| {
            ThermalError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        let info = LockInfo::current(holder);
        let json = serde_json::to_string_pretty(&info)?;
        handle
            .write_all(json.as_bytes())
            .and_then(|_| handle.sync_all())
            .map_err(|e| io_error("write lock", &lock_path, e))?;

        debug!(path = %path.display(), holder = %info.holder, "lock acquired");
        Ok(FileLock {
            target: path.to_path_buf(),
            lock_path,
            _handle: handle,
            info,
        })
    }

    /// Live lock on `path`, if any. Abandoned locks read as `None`.
    pub fn peek(path: &Path) -> Option<LockInfo> {
        let text = fs::read_to_string(sidecar_path(path, "lock")).ok()?;
        let info: LockInfo = serde_json::from_str(&text).ok()?;
        if info.is_abandoned() {
            warn!(path = %path.display(), holder = %info.holder, "ignoring abandoned lock");
            return None;
        }
        Some(info)
    }

    /// The bundle file this lock guards
    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `fridge.json` → `fridge.json.<suffix>`
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let extension = match path.extension() {
        Some(ext) => format!("{}.{}", ext.to_string_lossy(), suffix),
        None => suffix.to_string(),
    };
    path.with_extension(extension)
}

fn io_error(operation: &str, path: &Path, error: std::io::Error) -> ThermalError {
    ThermalError::file_error(operation, path.display().to_string(), error.to_string())
}

/// Write a bundle atomically (temp file, fsync, rename).
pub fn save_bundle(bundle: &Bundle, path: &Path) -> ThermalResult<()> {
    let json = serde_json::to_string_pretty(bundle)?;
    let tmp_path = sidecar_path(path, "tmp");

    let mut tmp = File::create(&tmp_path).map_err(|e| io_error("create temp file", &tmp_path, e))?;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.sync_all())
        .map_err(|e| io_error("write temp file", &tmp_path, e))?;
    drop(tmp);

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error("rename to final", path, e));
    }

    info!(path = %path.display(), bytes = json.len(), "bundle saved");
    Ok(())
}

/// Read a bundle and check its schema version when `meta` is present.
///
/// # Errors
///
/// * `FileError` - the file cannot be read
/// * `SerializationError` - the content is not a bundle
/// * `VersionMismatch` - `meta.version` is incompatible
pub fn load_bundle(path: &Path) -> ThermalResult<Bundle> {
    let text = fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;
    let bundle: Bundle = serde_json::from_str(&text)
        .map_err(|e| ThermalError::serialization(format!("Invalid bundle in {}: {}", path.display(), e)))?;

    if let Some(meta) = &bundle.meta {
        validate_version(&meta.version)?;
    }
    debug!(path = %path.display(), stages = bundle.stage_details.len(), "bundle loaded");
    Ok(bundle)
}

/// Load a bundle together with the current lock holder, if any. Callers
/// open the model read-only when a lock is reported.
pub fn load_bundle_with_lock_check(path: &Path) -> ThermalResult<(Bundle, Option<LockInfo>)> {
    let bundle = load_bundle(path)?;
    Ok((bundle, FileLock::peek(path)))
}

/// Save a model as a bundle.
pub fn save_model(model: &ThermalModel, path: &Path) -> ThermalResult<()> {
    save_bundle(&Bundle::from_model(model), path)
}

/// Load a bundle and rebuild the model from it.
pub fn load_model(path: &Path, settings: EngineSettings) -> ThermalResult<ThermalModel> {
    load_bundle(path)?.into_model(settings)
}

/// Same major version; on 0.x the file's minor may not be newer than ours.
fn validate_version(file_version: &str) -> ThermalResult<()> {
    let mismatch = || ThermalError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };
    let parse = |v: &str| -> Option<(u32, u32)> {
        let mut parts = v.split('.').map(|p| p.parse::<u32>().ok());
        Some((parts.next()??, parts.next().flatten().unwrap_or(0)))
    };

    let (file_major, file_minor) = parse(file_version).ok_or_else(mismatch)?;
    let (major, minor) = parse(SCHEMA_VERSION).ok_or_else(mismatch)?;

    if file_major != major || (major == 0 && file_minor > minor) {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Component, ComponentKind, DirectPower};
    use crate::materials::MaterialLibrary;
    use std::env::temp_dir;

    fn temp_bundle_path(name: &str) -> PathBuf {
        temp_dir().join(format!("thermal_test_{}_{}.json", name, std::process::id()))
    }

    fn sample_model() -> ThermalModel {
        let mut model = ThermalModel::new("Test Lab");
        model
            .add_component(
                "1K",
                Component::new("Heater", 2, ComponentKind::Other(DirectPower { power_per_part_w: 1e-4 })).unwrap(),
            )
            .unwrap();
        model.recompute(&MaterialLibrary::new()).unwrap();
        model
    }

    #[test]
    fn test_sidecar_paths() {
        let path = Path::new("/data/fridge.json");
        assert_eq!(sidecar_path(path, "lock"), Path::new("/data/fridge.json.lock"));
        assert_eq!(sidecar_path(path, "tmp"), Path::new("/data/fridge.json.tmp"));
        assert_eq!(sidecar_path(Path::new("/data/fridge"), "lock"), Path::new("/data/fridge.lock"));
    }

    #[test]
    fn test_save_and_load_model() {
        let path = temp_bundle_path("roundtrip");
        let model = sample_model();
        save_model(&model, &path).unwrap();

        assert!(!sidecar_path(&path, "tmp").exists());

        let loaded = load_model(&path, EngineSettings::default()).unwrap();
        assert_eq!(loaded.meta.designer, "Test Lab");
        assert!((loaded.total_w() - 2e-4).abs() < 1e-15);
        assert_eq!(loaded.component("1K", "Heater").unwrap().count(), 2);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_plain_bundle_without_meta() {
        let path = temp_bundle_path("plain");
        fs::write(
            &path,
            r#"{"components": {"1K": {}}, "stage_details": {"1K": {"lowT": 2.0, "highT": 4.2}}}"#,
        )
        .unwrap();

        let bundle = load_bundle(&path).unwrap();
        assert!(bundle.meta.is_none());
        assert!(bundle.total_power.is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = temp_bundle_path("garbage");
        fs::write(&path, "not json").unwrap();
        assert_eq!(load_bundle(&path).unwrap_err().error_code(), "SERIALIZATION_ERROR");
        let _ = fs::remove_file(&path);

        let missing = temp_bundle_path("missing");
        assert_eq!(load_bundle(&missing).unwrap_err().error_code(), "FILE_ERROR");
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let path = temp_bundle_path("newer");
        let mut bundle = Bundle::from_model(&sample_model());
        if let Some(meta) = bundle.meta.as_mut() {
            meta.version = "0.9.0".to_string();
        }
        save_bundle(&bundle, &path).unwrap();

        assert!(matches!(load_bundle(&path), Err(ThermalError::VersionMismatch { .. })));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.0.3").is_ok());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("latest").is_err());
    }

    #[test]
    fn test_lock_blocks_second_holder() {
        let path = temp_bundle_path("lock");
        save_model(&sample_model(), &path).unwrap();

        let lock = FileLock::acquire(&path, "alice").unwrap();
        assert_eq!(lock.target(), path.as_path());
        assert!(sidecar_path(&path, "lock").exists());

        let err = FileLock::acquire(&path, "bob").unwrap_err();
        assert!(err.is_recoverable());

        let (_, holder) = load_bundle_with_lock_check(&path).unwrap();
        assert_eq!(holder.map(|h| h.holder), Some("alice".to_string()));

        drop(lock);
        assert!(!sidecar_path(&path, "lock").exists());
        assert!(FileLock::peek(&path).is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_expired_lock_is_abandoned() {
        let mut info = LockInfo::current("ghost");
        assert!(!info.is_abandoned());
        info.acquired_at = Utc::now() - Duration::hours(LOCK_EXPIRY_HOURS + 1);
        assert!(info.is_abandoned());
    }
}
