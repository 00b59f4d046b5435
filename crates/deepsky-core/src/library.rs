use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{LibraryConfig, NamingConfig};
use crate::error::{DeepskyError, Result};
use crate::exif::{camera_info, CameraInfo, TagReader};
use crate::frame::FrameKind;

/// Cross-session master calibration frame library.
///
/// Masters are keyed by camera model and ISO, plus the rounded exposure time
/// for darks. The library owns the EXIF service because every lookup and
/// persist needs the camera identity of the current captures.
pub struct MasterLibrary {
    config: LibraryConfig,
    naming: NamingConfig,
    exif: Box<dyn TagReader>,
}

impl MasterLibrary {
    pub fn new(config: LibraryConfig, naming: NamingConfig, exif: Box<dyn TagReader>) -> Self {
        Self {
            config,
            naming,
            exif,
        }
    }

    pub fn has_root(&self, kind: FrameKind) -> bool {
        self.config.root_for(kind).is_some()
    }

    /// Deterministic library path for a master of `kind` taken with `camera`:
    /// `{root}/{model}_{iso}[_{exp}s]_{stacked_name}.{ext}`.
    ///
    /// Pure: identical inputs always yield the identical path. Returns None
    /// when no library root is configured for the kind, and an error when a
    /// dark master is requested without exposure metadata.
    pub fn compute_path(&self, kind: FrameKind, camera: &CameraInfo) -> Result<Option<PathBuf>> {
        let Some(root) = self.config.root_for(kind) else {
            return Ok(None);
        };
        Ok(Some(root.join(self.file_name(kind, camera)?)))
    }

    fn file_name(&self, kind: FrameKind, camera: &CameraInfo) -> Result<String> {
        let stacked_name = format!(
            "{}{}",
            self.naming.stacked_prefix,
            self.naming.frame_name(kind)
        );
        let name = if kind.library_key_includes_exposure() {
            let exposure = camera.exposure_ceil_s().ok_or_else(|| {
                DeepskyError::MetadataUnavailable(
                    "dark master library entries require an exposure time".into(),
                )
            })?;
            format!(
                "{}_{}_{}s_{}.{}",
                camera.model, camera.iso, exposure, stacked_name, self.naming.extension
            )
        } else {
            format!(
                "{}_{}_{}.{}",
                camera.model, camera.iso, stacked_name, self.naming.extension
            )
        };
        Ok(name.replace(' ', "_"))
    }

    /// Look up an existing master for `kind`. Absence is not an error:
    /// callers fall back to stacking locally in the current session.
    pub fn lookup(&self, kind: FrameKind, camera: &CameraInfo) -> Result<Option<PathBuf>> {
        let Some(path) = self.compute_path(kind, camera)? else {
            return Ok(None);
        };
        debug!(path = %path.display(), "probing master library");
        if path.is_file() {
            info!(kind = %kind, path = %path.display(), "found library master");
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    /// Camera identity of the captures in `dir` (or its `night` subdirectory),
    /// read from the first file found.
    pub fn camera_for(&self, dir: &Path, night: &str) -> Result<CameraInfo> {
        let dir = if night.is_empty() {
            dir.to_path_buf()
        } else {
            dir.join(night)
        };
        camera_info(self.exif.as_ref(), &dir)
    }

    /// Ensure the library root for `kind` exists, returning it.
    pub fn ensure_root(&self, kind: FrameKind) -> Result<&Path> {
        let root = self.config.root_for(kind).ok_or_else(|| {
            DeepskyError::Config(format!("no master library root configured for {kind}"))
        })?;
        std::fs::create_dir_all(root)?;
        Ok(root)
    }
}
