use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::{MergeMode, RegistrationConfig};
use crate::engine::params::{ConvertParams, RegisterParams};
use crate::engine::ProcessingEngine;
use crate::error::{DeepskyError, Result};
use crate::frame::{Frame, FrameKind};
use crate::library::MasterLibrary;
use crate::session::Session;

use super::params::{calibration_parameters, stack_parameters, CalibrationMasters};
use super::types::{
    FrameOutcome, FrameRunResult, NightResult, NoOpReporter, PipelineReport, PipelineStage,
    ProgressReporter,
};

/// Per-run switches coming from the CLI.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Persist freshly stacked bias/dark masters to the library.
    pub save_to_library: bool,
    /// Convert to single FITS sequence files instead of per-frame files.
    pub fits_sequence: bool,
    /// Process only this frame kind.
    pub only: Option<FrameKind>,
    /// Explicit master overrides; these win over every resolution fallback.
    pub master_overrides: CalibrationMasters,
}

/// Sequences the pipeline per frame kind in dependency order
/// (biases → darks → flats → lights), per night directory.
///
/// A stage failure aborts the current frame kind only; sibling kinds still
/// run and the failure surfaces in the report. Empty source directories are
/// skipped, never errors.
pub struct Orchestrator<'a, E: ProcessingEngine> {
    engine: &'a mut E,
    session: &'a Session,
    library: &'a MasterLibrary,
    registration: &'a RegistrationConfig,
    options: RunOptions,
    /// Masters stacked by this run, keyed by kind and night. Preferred over
    /// session files and the library when resolving calibration inputs.
    masters: BTreeMap<(FrameKind, String), PathBuf>,
}

impl<'a, E: ProcessingEngine> Orchestrator<'a, E> {
    pub fn new(
        engine: &'a mut E,
        session: &'a Session,
        library: &'a MasterLibrary,
        registration: &'a RegistrationConfig,
        options: RunOptions,
    ) -> Self {
        Self {
            engine,
            session,
            library,
            registration,
            options,
            masters: BTreeMap::new(),
        }
    }

    pub fn run(&mut self) -> Result<PipelineReport> {
        self.run_reported(&NoOpReporter)
    }

    pub fn run_reported(&mut self, reporter: &dyn ProgressReporter) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        for kind in FrameKind::ORDER {
            if self.options.only.is_some_and(|only| only != kind) {
                continue;
            }
            let Some(frame) = self.session.frame(kind) else {
                continue;
            };
            reporter.begin_frame(kind);
            let result = match self.process_frame(frame, reporter) {
                Ok(result) => result,
                Err(err) => {
                    error!(frame = %kind, error = %err, "frame pipeline failed");
                    FrameRunResult::failed(kind, err.to_string())
                }
            };
            reporter.finish_frame(kind, &result.outcome);
            report.frames.push(result);
        }
        Ok(report)
    }

    fn process_frame(
        &mut self,
        frame: &Frame,
        reporter: &dyn ProgressReporter,
    ) -> Result<FrameRunResult> {
        let kind = frame.kind;
        if self.session.multi_night() && !kind.supports_multi_night() {
            info!(frame = %kind, "multi-night run, master resolved via library");
            return Ok(FrameRunResult::skipped(kind));
        }

        let dirs = self.session.directories_for(frame)?;
        let process = self.session.process_path(frame);
        let merge_lights = kind == FrameKind::Lights && self.session.multi_night();

        let mut nights = Vec::new();
        let mut registered = Vec::new();
        for dir in &dirs {
            let night = self.session.night_id(dir);
            if !Session::has_captures(dir) {
                info!(frame = %kind, dir = %dir.display(), "no captures found, skipping");
                nights.push(NightResult {
                    night,
                    outcome: FrameOutcome::Skipped,
                });
                continue;
            }
            std::fs::create_dir_all(&process)?;

            let seq = frame.sequence_name(&night);
            reporter.begin_stage(kind, PipelineStage::Convert);
            self.convert_stage(frame, dir, &seq)?;

            let seq = if kind.is_calibrated() {
                reporter.begin_stage(kind, PipelineStage::Calibrate);
                self.calibrate_stage(frame, &process, &seq, &night)?
            } else {
                seq
            };

            let seq = if kind == FrameKind::Lights || self.session.multi_night() {
                reporter.begin_stage(kind, PipelineStage::Register);
                self.register_stage(frame, &process, &seq)?
            } else {
                seq
            };

            if merge_lights {
                // Lights merge across nights into one stack, not per night.
                nights.push(NightResult {
                    night,
                    outcome: FrameOutcome::Done(process.join(format!("{seq}.seq"))),
                });
                registered.push(seq);
                continue;
            }

            reporter.begin_stage(kind, PipelineStage::Stack);
            let stacked = self.stack_stage(frame, &process, &seq, &night)?;

            if kind.saves_to_library() && self.options.save_to_library {
                reporter.begin_stage(kind, PipelineStage::SaveLibrary);
                self.save_master_to_library(frame, dir, &stacked)?;
            }
            self.masters
                .insert((kind, night.clone()), stacked.clone());

            if kind != FrameKind::Lights {
                self.sweep_process_dir(frame, &process)?;
            }
            nights.push(NightResult {
                night,
                outcome: FrameOutcome::Done(stacked),
            });
        }

        if merge_lights && !registered.is_empty() {
            reporter.begin_stage(kind, PipelineStage::Merge);
            let stacked = self.merge_stage(frame, &process, &registered)?;
            self.masters
                .insert((kind, String::new()), stacked.clone());
            return Ok(FrameRunResult {
                kind,
                outcome: FrameOutcome::Done(stacked),
                nights,
            });
        }

        let outcome = nights
            .iter()
            .rev()
            .find_map(|n| n.outcome.path().map(Path::to_path_buf))
            .map(FrameOutcome::Done)
            .unwrap_or(FrameOutcome::Skipped);
        Ok(FrameRunResult {
            kind,
            outcome,
            nights,
        })
    }

    fn convert_stage(&mut self, frame: &Frame, dir: &Path, seq: &str) -> Result<()> {
        // In multi-night mode the conversion runs inside the night
        // subdirectory while the process dir sits one level up.
        let output_dir = if self.session.multi_night() {
            format!("../{}", frame.process_dir)
        } else {
            frame.process_dir.clone()
        };
        info!(sequence = seq, "converting captures");
        let params = ConvertParams {
            output_dir: Some(output_dir),
            fits_sequence: self.options.fits_sequence,
            debayer: false,
        };
        if !self.engine.convert(dir, seq, &params)? {
            return Err(self.stage_error(frame, PipelineStage::Convert));
        }
        Ok(())
    }

    fn calibrate_stage(
        &mut self,
        frame: &Frame,
        process: &Path,
        seq: &str,
        night: &str,
    ) -> Result<String> {
        let masters = self.resolve_masters(frame.kind, night);
        match frame.kind {
            FrameKind::Lights => {
                if masters.dark.is_none() {
                    warn!("no dark master available, calibrating lights without dark subtraction");
                }
                if masters.flat.is_none() {
                    warn!("no flat master available, calibrating lights without flat division");
                }
            }
            FrameKind::Flats => {
                if masters.bias.is_none() {
                    warn!("no bias master available, calibrating flats without bias subtraction");
                }
            }
            _ => {}
        }
        let params = calibration_parameters(
            frame.kind,
            &masters,
            self.session.naming(),
            self.options.fits_sequence,
        );
        info!(sequence = seq, ?masters, "calibrating sequence");
        if !self.engine.calibrate(process, seq, &params)? {
            return Err(self.stage_error(frame, PipelineStage::Calibrate));
        }
        Ok(format!(
            "{}{}",
            self.session.naming().preprocess_prefix,
            seq
        ))
    }

    /// Two-pass registration: a first estimation pass without output to
    /// settle the transforms, then the output pass with distortion
    /// correction. Either pass failing is fatal for the frame kind.
    fn register_stage(&mut self, frame: &Frame, process: &Path, seq: &str) -> Result<String> {
        let base = RegisterParams {
            max_stars: self.registration.max_stars,
            layer: self.registration.layer,
            no_star_list: true,
            ..RegisterParams::default()
        };

        info!(sequence = seq, "registering sequence (estimation pass)");
        let estimation = RegisterParams {
            two_pass: true,
            ..base.clone()
        };
        if !self.engine.register(process, seq, &estimation)? {
            return Err(self.stage_error(frame, PipelineStage::Register));
        }

        info!(sequence = seq, "registering sequence (output pass)");
        let prefix = self.session.naming().registered_prefix.clone();
        let output = RegisterParams {
            prefix: Some(prefix.clone()),
            distortion: true,
            ..base
        };
        if !self.engine.register(process, seq, &output)? {
            return Err(self.stage_error(frame, PipelineStage::Register));
        }
        Ok(format!("{prefix}{seq}"))
    }

    fn stack_stage(
        &mut self,
        frame: &Frame,
        process: &Path,
        seq: &str,
        night: &str,
    ) -> Result<PathBuf> {
        let out = frame.stacked_name_for(night);
        let params = stack_parameters(frame.kind);
        info!(sequence = seq, out = %out, "stacking sequence");
        if !self.engine.stack(process, seq, &out, &params)? {
            return Err(self.stage_error(frame, PipelineStage::Stack));
        }
        Ok(process.join(format!("{out}.{}", self.session.naming().extension)))
    }

    /// Merge the per-night registered light sequences and stack once into
    /// the un-suffixed stacked name.
    fn merge_stage(
        &mut self,
        frame: &Frame,
        process: &Path,
        registered: &[String],
    ) -> Result<PathBuf> {
        let naming = self.session.naming();
        let merged = format!(
            "{}{}{}",
            naming.registered_prefix, naming.preprocess_prefix, frame.name
        );
        info!(sequences = registered.len(), out = %merged, "merging registered sequences");
        if !self.engine.merge(process, registered, &merged)? {
            return Err(self.stage_error(frame, PipelineStage::Merge));
        }
        let input = match self.registration.merge {
            MergeMode::MergeOnly => merged,
            MergeMode::RegisterMerged => self.register_stage(frame, process, &merged)?,
        };
        self.stack_stage(frame, process, &input, "")
    }

    /// Masters for the calibrate stage of `kind`, resolved in priority
    /// order: explicit override → stacked earlier in this run → session
    /// stacked file → master library. Absence is reported by the caller as
    /// a warning, never an error.
    fn resolve_masters(&self, kind: FrameKind, night: &str) -> CalibrationMasters {
        match kind {
            FrameKind::Lights => CalibrationMasters {
                bias: None,
                dark: self.resolve_master(FrameKind::Darks, night),
                flat: self.resolve_master(FrameKind::Flats, night),
            },
            FrameKind::Flats => CalibrationMasters {
                bias: self.resolve_master(FrameKind::Biases, night),
                dark: None,
                flat: None,
            },
            _ => CalibrationMasters::default(),
        }
    }

    fn resolve_master(&self, kind: FrameKind, night: &str) -> Option<PathBuf> {
        // Biases are never per-night.
        let night = if kind == FrameKind::Biases { "" } else { night };

        if let Some(path) = self.options.master_overrides.for_kind(kind) {
            return Some(path.clone());
        }
        if let Some(path) = self.masters.get(&(kind, night.to_string())) {
            return Some(path.clone());
        }
        let frame = self.session.frame(kind)?;
        match self.session.resolve_stacked_file(frame, night, self.library) {
            Ok(path) => Some(path),
            Err(err) => {
                debug!(frame = %kind, %err, "no session master");
                self.library_fallback(kind, night)
            }
        }
    }

    /// Library fallback for dark masters; the camera identity (including
    /// the exposure the dark key needs) comes from this session's lights.
    fn library_fallback(&self, kind: FrameKind, night: &str) -> Option<PathBuf> {
        if kind != FrameKind::Darks || !self.library.has_root(kind) {
            return None;
        }
        let lights = self.session.frame(FrameKind::Lights)?;
        let camera = self
            .library
            .camera_for(&self.session.source_path(lights), night)
            .ok()?;
        self.library.lookup(kind, &camera).ok().flatten()
    }

    /// Persist a freshly stacked bias/dark master to the cross-session
    /// library. Metadata failure is fatal here: the artifact cannot be
    /// named without the camera identity.
    fn save_master_to_library(
        &mut self,
        frame: &Frame,
        capture_dir: &Path,
        stacked: &Path,
    ) -> Result<()> {
        let camera = self.library.camera_for(capture_dir, "")?;
        let Some(dest) = self.library.compute_path(frame.kind, &camera)? else {
            warn!(frame = %frame.kind, "no library root configured, keeping master session-local");
            return Ok(());
        };
        self.library.ensure_root(frame.kind)?;

        let process = stacked
            .parent()
            .ok_or_else(|| DeepskyError::Engine("stacked file has no parent directory".into()))?;
        let name = stacked
            .file_name()
            .ok_or_else(|| DeepskyError::Engine("stacked file has no name".into()))?
            .to_string_lossy()
            .into_owned();
        if !self.engine.load(process, &name)? {
            return Err(self.stage_error(frame, PipelineStage::SaveLibrary));
        }
        // The engine appends the configured extension itself.
        let dest_name = dest.with_extension("");
        if !self.engine.save(&dest_name.to_string_lossy())? {
            return Err(self.stage_error(frame, PipelineStage::SaveLibrary));
        }
        info!(frame = %frame.kind, dest = %dest.display(), "master saved to library");
        Ok(())
    }

    /// Reclaim intermediate artifacts after a successful stack: everything
    /// in the process dir not named after the stacked output is deleted.
    /// Destructive, so it only ever runs after the stack reported success.
    fn sweep_process_dir(&self, frame: &Frame, process: &Path) -> Result<()> {
        let mut removed = 0usize;
        for entry in std::fs::read_dir(process)?.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let keep = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with(&frame.stacked_name))
                .unwrap_or(false);
            if !keep {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(frame = %frame.kind, removed, "swept process directory");
        Ok(())
    }

    fn stage_error(&self, frame: &Frame, stage: PipelineStage) -> DeepskyError {
        DeepskyError::Stage {
            frame: frame.name.clone(),
            stage,
        }
    }
}
