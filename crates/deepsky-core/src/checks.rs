use std::path::Path;

use tracing::info;

use crate::config::CheckConfig;
use crate::error::{DeepskyError, Result};
use crate::exif::{camera_info, CameraInfo, TagReader};
use crate::frame::FrameKind;
use crate::session::Session;

/// Result of the pre-flight capture checks.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub passed: Vec<String>,
    pub warnings: Vec<String>,
    pub failures: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    fn pass(&mut self, msg: impl Into<String>) {
        self.passed.push(msg.into());
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn fail(&mut self, msg: impl Into<String>) {
        self.failures.push(msg.into());
    }
}

/// Sanity-check the captured frames before spending hours stacking them:
/// are there enough calibration frames, and were they shot with settings
/// matching the lights? EXIF-only — anything needing pixel statistics
/// belongs to the processing engine.
pub fn run_checks(
    session: &Session,
    exif: &dyn TagReader,
    config: &CheckConfig,
) -> Result<CheckReport> {
    let mut report = CheckReport::default();

    let lights = session
        .frame(FrameKind::Lights)
        .ok_or_else(|| DeepskyError::Config("session has no lights frame".into()))?;
    let lights_dir = session.source_path(lights);
    if !Session::has_captures(&lights_dir) {
        report.fail(format!("light frames missing in {}", lights_dir.display()));
        return Ok(report);
    }
    let light_camera = camera_info(exif, &lights_dir)?;
    report.pass(format!(
        "light frames: {} at ISO {}",
        light_camera.model, light_camera.iso
    ));

    check_kind(
        session,
        exif,
        FrameKind::Darks,
        config.min_dark_frames,
        &light_camera,
        true,
        &mut report,
    );
    check_kind(
        session,
        exif,
        FrameKind::Flats,
        config.min_flat_frames,
        &light_camera,
        false,
        &mut report,
    );
    check_kind(
        session,
        exif,
        FrameKind::Biases,
        config.min_bias_frames,
        &light_camera,
        false,
        &mut report,
    );

    info!(
        passed = report.passed.len(),
        warnings = report.warnings.len(),
        failures = report.failures.len(),
        "capture checks complete"
    );
    Ok(report)
}

fn check_kind(
    session: &Session,
    exif: &dyn TagReader,
    kind: FrameKind,
    min_count: usize,
    light_camera: &CameraInfo,
    exposure_must_match: bool,
    report: &mut CheckReport,
) {
    let Some(frame) = session.frame(kind) else {
        return;
    };
    let dir = session.source_path(frame);
    let count = capture_count(&dir);

    if count == 0 {
        if kind == FrameKind::Biases {
            // A library master can stand in for missing biases.
            report.warn(format!("{kind} missing; a library master will be required"));
        } else {
            report.fail(format!("{kind} missing in {}", dir.display()));
        }
        return;
    }
    if count >= min_count {
        report.pass(format!("{kind} count: {count}"));
    } else {
        report.warn(format!("{kind} count low: {count} (suggested: {min_count})"));
    }

    let camera = match camera_info(exif, &dir) {
        Ok(camera) => camera,
        Err(err) => {
            report.warn(format!("{kind}: camera metadata unreadable ({err})"));
            return;
        }
    };

    if camera.iso == light_camera.iso {
        report.pass(format!("{kind} ISO matches lights ({})", camera.iso));
    } else {
        report.fail(format!(
            "{kind} ISO {} does not match lights ISO {}",
            camera.iso, light_camera.iso
        ));
    }

    if exposure_must_match {
        match (camera.exposure_ceil_s(), light_camera.exposure_ceil_s()) {
            (Some(a), Some(b)) if a == b => {
                report.pass(format!("{kind} exposure matches lights ({a}s)"));
            }
            (Some(a), Some(b)) => {
                report.fail(format!(
                    "{kind} exposure {a}s does not match lights exposure {b}s"
                ));
            }
            _ => report.warn(format!("{kind}: exposure metadata unavailable")),
        }
    }
}

fn capture_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}
