use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::NamingConfig;
use crate::error::{DeepskyError, Result};
use crate::frame::{Frame, FrameKind};
use crate::library::MasterLibrary;

/// One working directory's processing context.
///
/// Holds the frame descriptors and naming conventions; all directory and
/// file resolution is computed on demand, nothing is cached.
pub struct Session {
    working_dir: PathBuf,
    multi_night: bool,
    frames: BTreeMap<FrameKind, Frame>,
    naming: NamingConfig,
}

impl Session {
    pub fn new(
        working_dir: PathBuf,
        frames: impl IntoIterator<Item = Frame>,
        multi_night: bool,
        naming: NamingConfig,
    ) -> Self {
        Self {
            working_dir,
            multi_night,
            frames: frames.into_iter().map(|f| (f.kind, f)).collect(),
            naming,
        }
    }

    /// Session with the standard four frame descriptors.
    pub fn with_all_frames(working_dir: PathBuf, multi_night: bool, naming: &NamingConfig) -> Self {
        let frames = FrameKind::ORDER.map(|kind| Frame::new(kind, naming));
        Self::new(working_dir, frames, multi_night, naming.clone())
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn multi_night(&self) -> bool {
        self.multi_night
    }

    pub fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    pub fn frame(&self, kind: FrameKind) -> Option<&Frame> {
        self.frames.get(&kind)
    }

    /// Absolute path of the frame's raw capture directory.
    pub fn source_path(&self, frame: &Frame) -> PathBuf {
        self.working_dir.join(&frame.source_dir)
    }

    /// Absolute path of the frame's intermediate/process directory.
    pub fn process_path(&self, frame: &Frame) -> PathBuf {
        self.source_path(frame).join(&frame.process_dir)
    }

    /// Directories holding raw captures for `frame`: the source directory
    /// itself, or in multi-night mode its immediate subdirectories whose
    /// name contains the night marker (non-recursive; other entries are
    /// ignored). Multi-night layout is rejected for biases.
    pub fn directories_for(&self, frame: &Frame) -> Result<Vec<PathBuf>> {
        let source = self.source_path(frame);
        if !self.multi_night {
            return Ok(vec![source]);
        }
        if !frame.kind.supports_multi_night() {
            return Err(DeepskyError::UnsupportedFrame(frame.kind));
        }

        let mut nights = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&source) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let name = entry.file_name();
                if name.to_string_lossy().contains(&self.naming.night_marker) {
                    nights.push(path);
                }
            }
        }
        nights.sort();
        Ok(nights)
    }

    /// Night identifier for a directory returned by [`directories_for`]:
    /// the subdirectory name with the marker substring removed. Empty in
    /// single-night mode.
    pub fn night_id(&self, dir: &Path) -> String {
        if !self.multi_night {
            return String::new();
        }
        dir.file_name()
            .map(|n| n.to_string_lossy().replace(&self.naming.night_marker, ""))
            .unwrap_or_default()
    }

    /// The four candidate stacked-file paths for `frame`, most-processed
    /// first: registered+preprocessed, preprocessed, registered, raw.
    pub fn stacked_candidates(&self, frame: &Frame, night: &str) -> [PathBuf; 4] {
        let base = self.process_path(frame);
        let stacked = frame.stacked_name_for(night);
        let ext = &self.naming.extension;
        let r = &self.naming.registered_prefix;
        let pp = &self.naming.preprocess_prefix;
        [
            base.join(format!("{r}{pp}{stacked}.{ext}")),
            base.join(format!("{pp}{stacked}.{ext}")),
            base.join(format!("{r}{stacked}.{ext}")),
            base.join(format!("{stacked}.{ext}")),
        ]
    }

    /// Pure probing over an existence predicate; the first candidate that
    /// exists wins. Factored out so tests can mock the filesystem.
    pub fn resolve_with<F>(&self, frame: &Frame, night: &str, exists: F) -> Option<PathBuf>
    where
        F: Fn(&Path) -> bool,
    {
        self.stacked_candidates(frame, night)
            .into_iter()
            .find(|candidate| {
                debug!(candidate = %candidate.display(), "probing stacked file");
                exists(candidate)
            })
    }

    /// Most-preprocessed stacked file available on disk for `frame`.
    ///
    /// Bias masters are session-independent: their lookup is delegated to
    /// the master library, keyed by the camera identity of this session's
    /// lights. Failure signals that the prerequisite stack stage has not
    /// produced anything usable yet.
    pub fn resolve_stacked_file(
        &self,
        frame: &Frame,
        night: &str,
        library: &MasterLibrary,
    ) -> Result<PathBuf> {
        if frame.kind == FrameKind::Biases {
            return self.resolve_library_bias(frame, night, library);
        }
        self.resolve_with(frame, night, |p| p.is_file())
            .ok_or_else(|| DeepskyError::StackedFileNotFound {
                frame: frame.name.clone(),
                night: night.to_string(),
            })
    }

    fn resolve_library_bias(
        &self,
        frame: &Frame,
        night: &str,
        library: &MasterLibrary,
    ) -> Result<PathBuf> {
        let not_found = || DeepskyError::StackedFileNotFound {
            frame: frame.name.clone(),
            night: night.to_string(),
        };
        let lights = self.frame(FrameKind::Lights).ok_or_else(not_found)?;
        let camera = library.camera_for(&self.source_path(lights), night)?;
        library
            .lookup(FrameKind::Biases, &camera)?
            .ok_or_else(not_found)
    }

    /// True when the directory exists and holds at least one file.
    pub fn has_captures(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .map(|mut entries| {
                entries.any(|e| e.map(|e| e.path().is_file()).unwrap_or(false))
            })
            .unwrap_or(false)
    }
}
