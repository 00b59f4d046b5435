mod common;

use std::path::PathBuf;

use deepsky_core::config::{LibraryConfig, NamingConfig};
use deepsky_core::error::DeepskyError;
use deepsky_core::exif::CameraInfo;
use deepsky_core::frame::FrameKind;
use deepsky_core::library::MasterLibrary;

use common::{fill_captures, FakeTagReader};

fn camera(model: &str, iso: u32, exposure_s: Option<f64>) -> CameraInfo {
    CameraInfo {
        model: model.replace(' ', "_"),
        iso,
        exposure_s,
    }
}

fn library(biases: Option<PathBuf>, darks: Option<PathBuf>) -> MasterLibrary {
    MasterLibrary::new(
        LibraryConfig { biases, darks },
        NamingConfig::default(),
        Box::new(FakeTagReader::camera("Canon EOS R6", 800, Some(120.0))),
    )
}

// ---------------------------------------------------------------------------
// Path computation
// ---------------------------------------------------------------------------

#[test]
fn test_compute_path_is_deterministic() {
    let lib = library(Some(PathBuf::from("/lib/biases")), None);
    let cam = camera("Canon EOS R6", 800, None);
    let a = lib.compute_path(FrameKind::Biases, &cam).unwrap().unwrap();
    let b = lib.compute_path(FrameKind::Biases, &cam).unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(
        a,
        PathBuf::from("/lib/biases/Canon_EOS_R6_800_stacked_biases.fit")
    );
}

#[test]
fn test_compute_path_replaces_spaces() {
    let lib = library(Some(PathBuf::from("/lib/biases")), None);
    let cam = CameraInfo {
        model: "Canon EOS Rebel T8i".into(),
        iso: 1600,
        exposure_s: None,
    };
    let path = lib.compute_path(FrameKind::Biases, &cam).unwrap().unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(!name.contains(' '), "got: {name}");
    assert_eq!(name, "Canon_EOS_Rebel_T8i_1600_stacked_biases.fit");
}

#[test]
fn test_dark_path_includes_ceiling_exposure() {
    let lib = library(None, Some(PathBuf::from("/lib/darks")));

    // 29.1s rounds up to 30s; exactly 30.0s stays 30s.
    for exposure in [29.1, 29.4, 29.6, 30.0] {
        let cam = camera("Canon EOS R6", 800, Some(exposure));
        let path = lib.compute_path(FrameKind::Darks, &cam).unwrap().unwrap();
        assert_eq!(
            path,
            PathBuf::from("/lib/darks/Canon_EOS_R6_800_30s_stacked_darks.fit"),
            "exposure {exposure}"
        );
    }

    // Crossing the integer boundary lands on a distinct master.
    let cam = camera("Canon EOS R6", 800, Some(30.5));
    let path = lib.compute_path(FrameKind::Darks, &cam).unwrap().unwrap();
    assert_eq!(
        path,
        PathBuf::from("/lib/darks/Canon_EOS_R6_800_31s_stacked_darks.fit")
    );
}

#[test]
fn test_dark_path_without_exposure_is_metadata_error() {
    let lib = library(None, Some(PathBuf::from("/lib/darks")));
    let cam = camera("Canon EOS R6", 800, None);
    let err = lib.compute_path(FrameKind::Darks, &cam).unwrap_err();
    assert!(matches!(err, DeepskyError::MetadataUnavailable(_)));
}

#[test]
fn test_bias_path_never_includes_exposure() {
    let lib = library(Some(PathBuf::from("/lib/biases")), None);
    let cam = camera("Canon EOS R6", 800, Some(120.0));
    let path = lib.compute_path(FrameKind::Biases, &cam).unwrap().unwrap();
    assert!(!path.to_string_lossy().contains("120"));
}

#[test]
fn test_compute_path_without_root_is_none() {
    let lib = library(None, None);
    let cam = camera("Canon EOS R6", 800, None);
    assert!(lib.compute_path(FrameKind::Biases, &cam).unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[test]
fn test_lookup_absent_is_none_not_error() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = library(Some(tmp.path().to_path_buf()), None);
    let cam = camera("Canon EOS R6", 800, None);
    assert!(lib.lookup(FrameKind::Biases, &cam).unwrap().is_none());
}

#[test]
fn test_lookup_present_returns_path() {
    let tmp = tempfile::tempdir().unwrap();
    let master = tmp.path().join("Canon_EOS_R6_800_stacked_biases.fit");
    std::fs::write(&master, b"").unwrap();

    let lib = library(Some(tmp.path().to_path_buf()), None);
    let cam = camera("Canon EOS R6", 800, None);
    assert_eq!(lib.lookup(FrameKind::Biases, &cam).unwrap(), Some(master));
}

// ---------------------------------------------------------------------------
// Camera metadata
// ---------------------------------------------------------------------------

#[test]
fn test_camera_for_reads_first_capture() {
    let tmp = tempfile::tempdir().unwrap();
    fill_captures(tmp.path(), 3);
    let lib = library(None, None);
    let cam = lib.camera_for(tmp.path(), "").unwrap();
    assert_eq!(cam.model, "Canon_EOS_R6");
    assert_eq!(cam.iso, 800);
    assert_eq!(cam.exposure_ceil_s(), Some(120));
}

#[test]
fn test_camera_for_empty_dir_is_metadata_error() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = library(None, None);
    let err = lib.camera_for(tmp.path(), "").unwrap_err();
    assert!(matches!(err, DeepskyError::MetadataUnavailable(_)));
}

#[test]
fn test_camera_for_missing_tags_is_metadata_error() {
    let tmp = tempfile::tempdir().unwrap();
    fill_captures(tmp.path(), 1);
    let lib = MasterLibrary::new(
        LibraryConfig::default(),
        NamingConfig::default(),
        Box::new(FakeTagReader::empty()),
    );
    let err = lib.camera_for(tmp.path(), "").unwrap_err();
    assert!(matches!(err, DeepskyError::MetadataUnavailable(_)));
}
