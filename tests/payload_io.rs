use kestrel_import::payload::{ExportPayload, TextureDescriptor};
use kestrel_import::settings::{ImportSettings, ProcessingBehavior, SavingBehavior};

#[test]
fn payload_roundtrips_through_json() {
    let payload = ExportPayload {
        textures: vec![TextureDescriptor {
            name: "Crate_D".to_string(),
            relative_path: "Assets/Textures/Crate_D.png".to_string(),
            source_file: "crate_d.png".to_string(),
        }],
        ..ExportPayload::default()
    };

    let dir = tempfile::tempdir().expect("temp dir for payload roundtrip");
    let path = dir.path().join("export.json");
    payload.save_to_path(&path).expect("payload save should succeed");

    let loaded = ExportPayload::load_from_path(&path).expect("payload load should succeed");
    assert_eq!(loaded.total_items(), payload.total_items());
    assert_eq!(loaded.textures[0].relative_path, payload.textures[0].relative_path);
}

#[test]
fn payload_fields_all_default_when_absent() {
    let payload: ExportPayload =
        serde_json::from_str("{}").expect("empty object should deserialize");
    assert_eq!(payload.total_items(), 0);
}

#[test]
fn settings_load_reads_partial_files() {
    let dir = tempfile::tempdir().expect("temp dir for settings");
    let path = dir.path().join("import_settings.json");
    std::fs::write(
        &path,
        r#"{
            "delete_invalid_assets": true,
            "saving_behavior": "prompt_at_end",
            "textures": { "behavior": "skip_existing", "rename": { "prefix": "T_" } }
        }"#,
    )
    .expect("settings file should be writable");

    let settings = ImportSettings::load(&path).expect("settings should parse");
    assert!(settings.delete_invalid_assets);
    assert_eq!(settings.saving_behavior, SavingBehavior::PromptAtEnd);
    assert_eq!(settings.textures.behavior, ProcessingBehavior::SkipExisting);
    assert_eq!(settings.textures.rename.prefix, "T_");
    // Everything unspecified keeps its default.
    assert_eq!(settings.saving_interval, 100);
    assert_eq!(settings.textures.rename.duplicate_suffix, "_2");
    assert!(!settings.meshes.import_separated);
}

#[test]
fn default_settings_match_an_empty_settings_file() {
    let parsed: ImportSettings =
        serde_json::from_str("{}").expect("empty object should deserialize");
    let defaults = ImportSettings::default();
    assert_eq!(defaults.saving_interval, 100);
    assert_eq!(defaults.saving_interval, parsed.saving_interval);
    assert_eq!(
        defaults.textures.rename.duplicate_suffix,
        parsed.textures.rename.duplicate_suffix
    );
    assert_eq!(defaults.saving_behavior, parsed.saving_behavior);
}

#[test]
fn settings_load_or_default_survives_a_missing_file() {
    let settings = ImportSettings::load_or_default("/nonexistent/import_settings.json");
    assert_eq!(settings.saving_behavior, SavingBehavior::SaveEveryInterval);
    assert!(!settings.delete_invalid_assets);
}

#[test]
fn describe_lists_the_load_bearing_knobs() {
    let settings = ImportSettings::default();
    let described = settings.describe();
    assert!(described.iter().any(|(key, _)| key == "delete_invalid_assets"));
    assert!(described.iter().any(|(key, value)| key == "saving_interval" && value == "100"));
    assert!(described.iter().any(|(key, _)| key == "textures.behavior"));
}
