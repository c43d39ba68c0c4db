use std::fs;

use instr_core::instrument::ParameterValue;
use instr_core::run::MpiSetting;
use instr_core::synthetic::{demo_instrument, SyntheticRunner};

use super::*;
use crate::interface::SimInterface;

fn interface() -> SimInterface {
    SimInterface::new(demo_instrument(), Box::new(SyntheticRunner))
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);
    let settings = load_settings(&path).expect("missing file is not an error");
    assert_eq!(settings, UiSettingsV1::default());
}

#[test]
fn malformed_json_is_reported_as_recoverable_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::write(&path, "{ definitely-not-json ").expect("fixture");
    assert!(matches!(
        load_settings(&path),
        Err(SettingsStoreError::InvalidFormat(_))
    ));
}

#[test]
fn unknown_version_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    let settings = UiSettingsV1 {
        version: SETTINGS_FILE_VERSION + 1,
        ..Default::default()
    };
    fs::write(&path, serde_json::to_string(&settings).expect("json")).expect("fixture");
    let error = load_settings(&path).expect_err("version mismatch");
    assert!(matches!(
        error,
        SettingsStoreError::UnsupportedVersion { found } if found == SETTINGS_FILE_VERSION + 1
    ));
    assert!(error.to_string().contains("not supported"));
}

#[test]
fn unreadable_path_names_the_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = load_settings(dir.path()).expect_err("a directory is not a settings file");
    assert!(matches!(error, SettingsStoreError::Io { action: "read", .. }));
    assert!(error.to_string().contains(&dir.path().display().to_string()));
}

#[test]
fn save_replaces_existing_file_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    let mut settings = UiSettingsV1::default();
    save_settings(&path, &settings).expect("first save");
    settings.ncount = "5e5".to_string();
    save_settings(&path, &settings).expect("second save");

    assert_eq!(load_settings(&path).expect("load"), settings);
    let entries: Vec<_> = fs::read_dir(dir.path())
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn capture_then_restore_carries_interface_state() {
    let mut source = interface();
    source.update_ncount("2e4");
    source.update_mpi("2");
    source.update_parameter("wavelength", "3.5");
    source.plot_interface().log_scale = true;

    let mut settings = UiSettingsV1::default();
    settings.capture(&mut source);
    assert_eq!(settings.ncount, "2e4");
    assert!(settings.log_scale);

    let mut target = interface();
    settings.restore(&mut target);
    assert_eq!(target.ncount(), 20_000);
    assert_eq!(target.mpi(), MpiSetting::Processes(2));
    assert_eq!(
        target.parameters().get("wavelength"),
        Some(&ParameterValue::from("3.5"))
    );
    assert!(target.plot_interface().log_scale);
}

#[test]
fn restore_skips_rejected_and_undeclared_values() {
    let mut settings = UiSettingsV1 {
        ncount: "lots".to_string(),
        ..Default::default()
    };
    settings.parameters.insert(
        demo_instrument().name,
        [("no_such_parameter".to_string(), "1".to_string())]
            .into_iter()
            .collect(),
    );

    let mut target = interface();
    settings.restore(&mut target);
    assert_eq!(target.ncount(), 1_000_000);
    assert!(target.ncount_feedback().is_some());
    assert!(!target.parameters().contains_key("no_such_parameter"));
}
