mod common;

use std::path::{Path, PathBuf};

use deepsky_core::config::{LibraryConfig, NamingConfig};
use deepsky_core::error::DeepskyError;
use deepsky_core::frame::FrameKind;
use deepsky_core::library::MasterLibrary;
use deepsky_core::session::Session;

use common::{fill_captures, FakeTagReader};

fn naming() -> NamingConfig {
    NamingConfig::default()
}

fn library() -> MasterLibrary {
    MasterLibrary::new(
        LibraryConfig::default(),
        naming(),
        Box::new(FakeTagReader::camera("Canon EOS R6", 800, Some(120.0))),
    )
}

fn session(workdir: &Path, multi_night: bool) -> Session {
    Session::with_all_frames(workdir.to_path_buf(), multi_night, &naming())
}

// ---------------------------------------------------------------------------
// Stacked-file probing order
// ---------------------------------------------------------------------------

#[test]
fn test_candidates_most_processed_first() {
    let session = session(Path::new("/work"), false);
    let lights = session.frame(FrameKind::Lights).unwrap();
    let candidates = session.stacked_candidates(lights, "");
    let names: Vec<String> = candidates
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "r_pp_stacked_lights.fit",
            "pp_stacked_lights.fit",
            "r_stacked_lights.fit",
            "stacked_lights.fit",
        ]
    );
    assert!(candidates[0].starts_with("/work/lights/process"));
}

#[test]
fn test_candidates_night_suffix() {
    let session = session(Path::new("/work"), false);
    let darks = session.frame(FrameKind::Darks).unwrap();
    let candidates = session.stacked_candidates(darks, "2");
    assert_eq!(
        candidates[3],
        PathBuf::from("/work/darks/process/stacked_darks_2.fit")
    );
}

#[test]
fn test_resolve_prefers_registered_preprocessed_when_all_exist() {
    let session = session(Path::new("/work"), false);
    let lights = session.frame(FrameKind::Lights).unwrap();
    let found = session.resolve_with(lights, "", |_| true).unwrap();
    assert_eq!(
        found,
        PathBuf::from("/work/lights/process/r_pp_stacked_lights.fit")
    );
}

#[test]
fn test_resolve_falls_back_to_raw_stacked() {
    let session = session(Path::new("/work"), false);
    let lights = session.frame(FrameKind::Lights).unwrap();
    let found = session
        .resolve_with(lights, "", |p| {
            p.file_name().unwrap().to_string_lossy() == "stacked_lights.fit"
        })
        .unwrap();
    assert_eq!(
        found,
        PathBuf::from("/work/lights/process/stacked_lights.fit")
    );
}

#[test]
fn test_resolve_none_exist_is_not_found() {
    let session = session(Path::new("/work"), false);
    let lights = session.frame(FrameKind::Lights).unwrap();
    assert!(session.resolve_with(lights, "", |_| false).is_none());
}

#[test]
fn test_resolve_stacked_file_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let session = session(tmp.path(), false);
    let darks = session.frame(FrameKind::Darks).unwrap();
    let library = library();

    let err = session
        .resolve_stacked_file(darks, "", &library)
        .unwrap_err();
    assert!(matches!(err, DeepskyError::StackedFileNotFound { .. }));

    let process = tmp.path().join("darks/process");
    std::fs::create_dir_all(&process).unwrap();
    std::fs::write(process.join("stacked_darks.fit"), b"").unwrap();
    let found = session.resolve_stacked_file(darks, "", &library).unwrap();
    assert_eq!(found, process.join("stacked_darks.fit"));

    // A more processed candidate wins once it appears.
    std::fs::write(process.join("pp_stacked_darks.fit"), b"").unwrap();
    let found = session.resolve_stacked_file(darks, "", &library).unwrap();
    assert_eq!(found, process.join("pp_stacked_darks.fit"));
}

// ---------------------------------------------------------------------------
// Bias delegation to the master library
// ---------------------------------------------------------------------------

#[test]
fn test_bias_resolution_goes_through_library() {
    let tmp = tempfile::tempdir().unwrap();
    fill_captures(&tmp.path().join("lights"), 1);

    let library_root = tmp.path().join("master-library");
    std::fs::create_dir_all(&library_root).unwrap();
    let master = library_root.join("Canon_EOS_R6_800_stacked_biases.fit");
    std::fs::write(&master, b"").unwrap();

    let session = session(tmp.path(), false);
    let biases = session.frame(FrameKind::Biases).unwrap();

    // Even with a local stacked bias on disk the lookup is global.
    let process = tmp.path().join("biases/process");
    std::fs::create_dir_all(&process).unwrap();
    std::fs::write(process.join("stacked_biases.fit"), b"").unwrap();

    let library = MasterLibrary::new(
        LibraryConfig {
            biases: Some(library_root),
            darks: None,
        },
        naming(),
        Box::new(FakeTagReader::camera("Canon EOS R6", 800, Some(120.0))),
    );
    let found = session.resolve_stacked_file(biases, "", &library).unwrap();
    assert_eq!(found, master);
}

#[test]
fn test_bias_resolution_without_library_master_fails() {
    let tmp = tempfile::tempdir().unwrap();
    fill_captures(&tmp.path().join("lights"), 1);

    let session = session(tmp.path(), false);
    let biases = session.frame(FrameKind::Biases).unwrap();
    let err = session
        .resolve_stacked_file(biases, "", &library())
        .unwrap_err();
    assert!(matches!(err, DeepskyError::StackedFileNotFound { .. }));
}

// ---------------------------------------------------------------------------
// Directory resolution
// ---------------------------------------------------------------------------

#[test]
fn test_single_night_directories() {
    let session = session(Path::new("/work"), false);
    let lights = session.frame(FrameKind::Lights).unwrap();
    let dirs = session.directories_for(lights).unwrap();
    assert_eq!(dirs, vec![PathBuf::from("/work/lights")]);
}

#[test]
fn test_multi_night_directories_match_marker() {
    let tmp = tempfile::tempdir().unwrap();
    let lights_dir = tmp.path().join("lights");
    std::fs::create_dir_all(lights_dir.join("night1")).unwrap();
    std::fs::create_dir_all(lights_dir.join("night2")).unwrap();
    std::fs::create_dir_all(lights_dir.join("process")).unwrap();
    std::fs::write(lights_dir.join("notes.txt"), b"").unwrap();
    // Nested night dirs are not enumerated (non-recursive scan).
    std::fs::create_dir_all(lights_dir.join("night1/night-nested")).unwrap();

    let session = session(tmp.path(), true);
    let lights = session.frame(FrameKind::Lights).unwrap();
    let dirs = session.directories_for(lights).unwrap();
    assert_eq!(
        dirs,
        vec![lights_dir.join("night1"), lights_dir.join("night2")]
    );
    assert_eq!(session.night_id(&dirs[0]), "1");
    assert_eq!(session.night_id(&dirs[1]), "2");
}

#[test]
fn test_multi_night_biases_unsupported() {
    let session = session(Path::new("/work"), true);
    let biases = session.frame(FrameKind::Biases).unwrap();
    let err = session.directories_for(biases).unwrap_err();
    assert!(matches!(
        err,
        DeepskyError::UnsupportedFrame(FrameKind::Biases)
    ));
}

#[test]
fn test_night_id_empty_in_single_night_mode() {
    let session = session(Path::new("/work"), false);
    assert_eq!(session.night_id(Path::new("/work/lights")), "");
}

#[test]
fn test_has_captures() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("flats");
    assert!(!Session::has_captures(&dir));
    std::fs::create_dir_all(&dir).unwrap();
    assert!(!Session::has_captures(&dir));
    // A subdirectory alone does not count as captures.
    std::fs::create_dir_all(dir.join("process")).unwrap();
    assert!(!Session::has_captures(&dir));
    std::fs::write(dir.join("IMG_0001.cr3"), b"raw").unwrap();
    assert!(Session::has_captures(&dir));
}
