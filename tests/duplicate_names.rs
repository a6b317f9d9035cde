use kestrel_import::database::TargetKind;
use kestrel_import::duplicates::scan_for_duplicates;
use kestrel_import::payload::{
    ExportPayload, MeshDescriptor, QuatData, TextureDescriptor, Vec3Data,
};
use kestrel_import::resolve::Resolver;
use kestrel_import::settings::ImportSettings;

fn mesh(path: &str) -> MeshDescriptor {
    MeshDescriptor {
        name: path.to_string(),
        relative_path: path.to_string(),
        relative_path_if_separated: String::new(),
        source_file: String::new(),
        is_skeletal: false,
        submeshes: Vec::new(),
        import_position_offset: Vec3Data::default(),
        import_rotation_offset: QuatData::default(),
        import_scale_offset: Vec3Data::one(),
        import_scale_factor: 1.0,
        use_file_scale: false,
    }
}

fn texture(path: &str) -> TextureDescriptor {
    TextureDescriptor {
        name: path.to_string(),
        relative_path: path.to_string(),
        source_file: String::new(),
    }
}

#[test]
fn later_occurrence_in_scan_order_gets_marked() {
    let payload = ExportPayload {
        meshes: vec![mesh("Assets/Props/Crate.fbx"), mesh("Assets/Props/Crate.obj")],
        ..ExportPayload::default()
    };
    let settings = ImportSettings::default();
    let duplicates = scan_for_duplicates(&payload, &settings);

    assert_eq!(duplicates.len(), 1);
    assert!(!duplicates.is_marked("Assets/Props/Crate.fbx"));
    assert!(duplicates.is_marked("Assets/Props/Crate.obj"));

    let resolver = Resolver::new(&settings);
    let first = resolver.resolve("Assets/Props/Crate.fbx", TargetKind::StaticMesh, &duplicates);
    let second = resolver.resolve("Assets/Props/Crate.obj", TargetKind::StaticMesh, &duplicates);
    assert_eq!(first.full_path, "/Game/Props/Crate");
    assert_eq!(second.full_path, "/Game/Props/Crate_2");
}

#[test]
fn different_directories_do_not_collide() {
    let payload = ExportPayload {
        meshes: vec![mesh("Assets/PropsA/Crate.fbx"), mesh("Assets/PropsB/Crate.fbx")],
        ..ExportPayload::default()
    };
    let duplicates = scan_for_duplicates(&payload, &ImportSettings::default());
    assert!(duplicates.is_empty());
}

#[test]
fn collisions_are_detected_across_kinds() {
    // A texture and a mesh canonicalizing to the same path still collide in
    // the target database, so the scan treats all kinds as one namespace.
    let payload = ExportPayload {
        meshes: vec![mesh("Assets/Props/Crate.fbx")],
        textures: vec![texture("Assets/Props/Crate.png")],
        ..ExportPayload::default()
    };
    let duplicates = scan_for_duplicates(&payload, &ImportSettings::default());
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates.is_marked("Assets/Props/Crate.png"));
}

#[test]
fn kinds_with_auto_rename_disabled_are_not_scanned() {
    let payload = ExportPayload {
        textures: vec![texture("Assets/Props/Crate.png"), texture("Assets/Props/Crate.tga")],
        ..ExportPayload::default()
    };
    let mut settings = ImportSettings::default();
    settings.textures.rename.auto_rename_duplicates = false;
    let duplicates = scan_for_duplicates(&payload, &settings);
    assert!(duplicates.is_empty());
}

#[test]
fn rescanning_reproduces_the_same_assignment() {
    let payload = ExportPayload {
        meshes: vec![mesh("Assets/Props/Crate.fbx"), mesh("Assets/Props/Crate.obj")],
        textures: vec![texture("Assets/Props/Crate.png")],
        ..ExportPayload::default()
    };
    let settings = ImportSettings::default();
    let first = scan_for_duplicates(&payload, &settings);
    let second = scan_for_duplicates(&payload, &settings);
    let first_paths: Vec<&str> = first.iter().collect();
    let second_paths: Vec<&str> = second.iter().collect();
    assert_eq!(first_paths, second_paths);
}
