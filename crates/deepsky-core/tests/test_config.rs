use deepsky_core::config::{MergeMode, NamingConfig, ProjectConfig};
use deepsky_core::frame::{Frame, FrameKind};

// ---------------------------------------------------------------------------
// Config defaults and TOML round-trip
// ---------------------------------------------------------------------------

#[test]
fn test_default_naming_conventions() {
    let naming = NamingConfig::default();
    assert_eq!(naming.process_dir, "process");
    assert_eq!(naming.stacked_prefix, "stacked_");
    assert_eq!(naming.registered_prefix, "r_");
    assert_eq!(naming.preprocess_prefix, "pp_");
    assert_eq!(naming.extension, "fit");
    assert_eq!(naming.night_marker, "night");
}

#[test]
fn test_config_toml_round_trip() {
    let config = ProjectConfig::default();
    let toml_str = toml::to_string_pretty(&config).unwrap();
    let parsed: ProjectConfig = toml::from_str(&toml_str).unwrap();
    assert_eq!(parsed.naming.stacked_prefix, config.naming.stacked_prefix);
    assert_eq!(parsed.registration.max_stars, config.registration.max_stars);
    assert_eq!(parsed.registration.merge, MergeMode::MergeOnly);
    assert_eq!(parsed.post.star_offset, config.post.star_offset);
}

#[test]
fn test_partial_toml_fills_defaults() {
    let parsed: ProjectConfig = toml::from_str(
        r#"
        [naming]
        extension = "fits"
        "#,
    )
    .unwrap();
    assert_eq!(parsed.naming.extension, "fits");
    assert_eq!(parsed.registration.max_stars, 500);
    assert!(parsed.post.enabled);
}

// ---------------------------------------------------------------------------
// Frame kinds and descriptors
// ---------------------------------------------------------------------------

#[test]
fn test_frame_kind_order_is_dependency_order() {
    assert_eq!(
        FrameKind::ORDER,
        [
            FrameKind::Biases,
            FrameKind::Darks,
            FrameKind::Flats,
            FrameKind::Lights
        ]
    );
}

#[test]
fn test_frame_kind_display() {
    assert_eq!(format!("{}", FrameKind::Biases), "biases");
    assert_eq!(format!("{}", FrameKind::Darks), "darks");
    assert_eq!(format!("{}", FrameKind::Flats), "flats");
    assert_eq!(format!("{}", FrameKind::Lights), "lights");
}

#[test]
fn test_frame_kind_predicates() {
    assert!(!FrameKind::Biases.supports_multi_night());
    assert!(FrameKind::Darks.supports_multi_night());
    assert!(FrameKind::Lights.supports_multi_night());

    assert!(FrameKind::Flats.is_calibrated());
    assert!(FrameKind::Lights.is_calibrated());
    assert!(!FrameKind::Biases.is_calibrated());
    assert!(!FrameKind::Darks.is_calibrated());

    assert!(FrameKind::Biases.saves_to_library());
    assert!(FrameKind::Darks.saves_to_library());
    assert!(!FrameKind::Flats.saves_to_library());
    assert!(!FrameKind::Lights.saves_to_library());

    assert!(FrameKind::Darks.library_key_includes_exposure());
    assert!(!FrameKind::Biases.library_key_includes_exposure());
}

#[test]
fn test_frame_derived_names() {
    let naming = NamingConfig::default();
    let frame = Frame::new(FrameKind::Lights, &naming);
    assert_eq!(frame.name, "lights");
    assert_eq!(frame.source_dir, "lights");
    assert_eq!(frame.process_dir, "process");
    assert_eq!(frame.stacked_name, "stacked_lights");

    assert_eq!(frame.sequence_name(""), "lights");
    assert_eq!(frame.sequence_name("2"), "lights_2");
    assert_eq!(frame.stacked_name_for(""), "stacked_lights");
    assert_eq!(frame.stacked_name_for("2"), "stacked_lights_2");
}

#[test]
fn test_stacked_name_unique_per_kind() {
    let naming = NamingConfig::default();
    let names: Vec<String> = FrameKind::ORDER
        .iter()
        .map(|&k| Frame::new(k, &naming).stacked_name)
        .collect();
    let mut deduped = names.clone();
    deduped.dedup();
    assert_eq!(names, deduped);
}
