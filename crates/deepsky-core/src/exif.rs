use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{DeepskyError, Result};

pub const TAG_ISO: &str = "ISO";
pub const TAG_MODEL: &str = "Model";
pub const TAG_EXPOSURE: &str = "ExposureTime";

/// Key/value metadata lookup on a capture file.
///
/// Abstracts the external EXIF tool so session and library logic can be
/// tested without shelling out.
pub trait TagReader {
    /// Read the requested tags from `file`. Tags absent from the file are
    /// absent from the returned map.
    fn get_tags(&self, file: &Path, tags: &[&str]) -> Result<BTreeMap<String, String>>;
}

/// Camera identity read from a raw frame, used to key master-library entries.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraInfo {
    /// Camera model with spaces replaced by underscores (filesystem-safe).
    pub model: String,
    pub iso: u32,
    /// Exposure time in seconds, when the tag is present.
    pub exposure_s: Option<f64>,
}

impl CameraInfo {
    /// Exposure rounded up to the nearest whole second (29.1s -> 30s,
    /// 30.0s -> 30s). Dark current only grows with exposure, so rounding up
    /// picks the conservative master.
    pub fn exposure_ceil_s(&self) -> Option<u32> {
        self.exposure_s.map(|e| e.ceil() as u32)
    }
}

/// Read camera identity from the first capture file in `dir`.
///
/// Directory entries are sorted for determinism; subdirectories (e.g. the
/// process dir) are ignored.
pub fn camera_info(reader: &dyn TagReader, dir: &Path) -> Result<CameraInfo> {
    let first = first_capture_file(dir)?;
    debug!(file = %first.display(), "reading camera metadata");

    let tags = reader.get_tags(&first, &[TAG_ISO, TAG_MODEL, TAG_EXPOSURE])?;

    let iso = tags
        .get(TAG_ISO)
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| DeepskyError::MetadataUnavailable(format!("no ISO tag in {}", first.display())))?;
    let model = tags
        .get(TAG_MODEL)
        .map(|m| m.replace(' ', "_"))
        .ok_or_else(|| {
            DeepskyError::MetadataUnavailable(format!("no camera model tag in {}", first.display()))
        })?;
    let exposure_s = tags.get(TAG_EXPOSURE).and_then(|v| v.parse::<f64>().ok());

    Ok(CameraInfo {
        model,
        iso,
        exposure_s,
    })
}

fn first_capture_file(dir: &Path) -> Result<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|_| {
            DeepskyError::MetadataUnavailable(format!("capture directory {} is unreadable", dir.display()))
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files.into_iter().next().ok_or_else(|| {
        DeepskyError::MetadataUnavailable(format!("capture directory {} is empty", dir.display()))
    })
}

/// `exiftool`-backed tag reader. Invokes `exiftool -j -n` and parses the
/// JSON output; `-n` forces numeric values so exposure times arrive as
/// plain seconds rather than rational strings.
pub struct ExifTool {
    executable: PathBuf,
}

impl ExifTool {
    pub fn new() -> Self {
        Self {
            executable: PathBuf::from("exiftool"),
        }
    }

    pub fn with_executable(executable: PathBuf) -> Self {
        Self { executable }
    }
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new()
    }
}

impl TagReader for ExifTool {
    fn get_tags(&self, file: &Path, tags: &[&str]) -> Result<BTreeMap<String, String>> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-j").arg("-n");
        for tag in tags {
            cmd.arg(format!("-{tag}"));
        }
        cmd.arg(file);

        let output = cmd
            .output()
            .map_err(|e| DeepskyError::Tool(format!("failed to run exiftool: {e}")))?;
        if !output.status.success() {
            return Err(DeepskyError::Tool(format!(
                "exiftool exited with {} for {}",
                output.status,
                file.display()
            )));
        }

        // exiftool -j emits a one-element array of objects.
        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| DeepskyError::Tool(format!("unparseable exiftool output: {e}")))?;
        let entry = parsed
            .as_array()
            .and_then(|a| a.first())
            .and_then(|v| v.as_object())
            .ok_or_else(|| DeepskyError::Tool("empty exiftool output".into()))?;

        let mut map = BTreeMap::new();
        for (key, value) in entry {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => continue,
            };
            map.insert(key.clone(), rendered);
        }
        Ok(map)
    }
}
