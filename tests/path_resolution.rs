use kestrel_import::database::TargetKind;
use kestrel_import::duplicates::DuplicateSet;
use kestrel_import::resolve::Resolver;
use kestrel_import::settings::{FindReplaceRule, ImportSettings};

#[test]
fn assets_prefix_maps_into_content_root() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let name = resolver.resolve("Assets/Models/Crate.fbx", TargetKind::StaticMesh, &DuplicateSet::empty());
    assert_eq!(name.directory, "/Game/Models");
    assert_eq!(name.base_name, "Crate");
    assert_eq!(name.full_path, "/Game/Models/Crate");
}

#[test]
fn backslashes_and_unsafe_characters_become_underscores() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let name = resolver.resolve(
        "Assets\\Props\\Old Crate (broken).fbx",
        TargetKind::StaticMesh,
        &DuplicateSet::empty(),
    );
    assert_eq!(name.full_path, "/Game/Props/Old_Crate__broken_");
}

#[test]
fn outside_paths_land_in_library_subtree() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let name = resolver.resolve(
        "Library/Resources/Noise.png",
        TargetKind::Texture,
        &DuplicateSet::empty(),
    );
    assert_eq!(name.full_path, "/Game/Utu/Assets/Library/Noise");
}

#[test]
fn fbx_sourced_material_gets_fixed_suffix() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let name =
        resolver.resolve("Assets/Models/Crate.fbx", TargetKind::Material, &DuplicateSet::empty());
    assert_eq!(name.base_name, "Crate_FbxMat");
}

#[test]
fn extension_dots_are_stripped_and_inner_dots_replaced() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let name =
        resolver.resolve("Assets/Textures/noise.v2.png", TargetKind::Texture, &DuplicateSet::empty());
    assert_eq!(name.base_name, "noise_v2");
}

#[test]
fn rename_policy_applies_outside_reserved_roots_only() {
    let mut settings = ImportSettings::default();
    settings.static_meshes.rename.prefix = "SM_".to_string();
    settings.static_meshes.rename.find_and_replace =
        vec![FindReplaceRule { find: "Models".to_string(), replace: "Meshes".to_string() }];
    let resolver = Resolver::new(&settings);

    let renamed =
        resolver.resolve("Assets/Models/Crate.fbx", TargetKind::StaticMesh, &DuplicateSet::empty());
    assert_eq!(renamed.full_path, "/Game/Meshes/SM_Crate");

    // Library content keeps its name no matter what the policy says.
    let library =
        resolver.resolve("Library/Builtin/Cube.fbx", TargetKind::StaticMesh, &DuplicateSet::empty());
    assert_eq!(library.base_name, "Cube");
}

#[test]
fn resolution_is_idempotent_for_identical_inputs() {
    let mut settings = ImportSettings::default();
    settings.textures.rename.prefix = "T_".to_string();
    let resolver = Resolver::new(&settings);
    let mut duplicates = DuplicateSet::empty();
    duplicates.mark("Assets/Textures/Dirt.png");

    let first = resolver.resolve("Assets/Textures/Dirt.png", TargetKind::Texture, &duplicates);
    let second = resolver.resolve("Assets/Textures/Dirt.png", TargetKind::Texture, &duplicates);
    assert_eq!(first, second);
    assert_eq!(first.base_name, "T_Dirt_2");
}

#[test]
fn empty_input_resolves_to_empty_triple() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let name = resolver.resolve("", TargetKind::Texture, &DuplicateSet::empty());
    assert!(name.is_empty());
    assert_eq!(name.full_path, "");
}

#[test]
fn marked_source_gets_the_duplicate_suffix() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let mut duplicates = DuplicateSet::empty();
    duplicates.mark("Assets/Props/Crate.obj");

    let plain = resolver.resolve("Assets/Props/Crate.fbx", TargetKind::StaticMesh, &duplicates);
    let marked = resolver.resolve("Assets/Props/Crate.obj", TargetKind::StaticMesh, &duplicates);
    assert_eq!(plain.base_name, "Crate");
    assert_eq!(marked.base_name, "Crate_2");
}

#[test]
fn separated_name_inherits_parent_disambiguation() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let mut duplicates = DuplicateSet::empty();
    duplicates.mark("Assets/Models/Chair.fbx");

    let leg = resolver.resolve_separated(
        "Assets/Models/Chair.fbx",
        "Assets/Models/Chair_Leg.fbx",
        TargetKind::StaticMesh,
        &duplicates,
    );
    assert_eq!(leg.base_name, "Chair_2_Leg");
    assert_eq!(leg.full_path, "/Game/Models/Chair_2_Leg");
}

#[test]
fn separated_name_is_untouched_when_parent_is_unique() {
    let settings = ImportSettings::default();
    let resolver = Resolver::new(&settings);
    let leg = resolver.resolve_separated(
        "Assets/Models/Chair.fbx",
        "Assets/Models/Chair_Leg.fbx",
        TargetKind::StaticMesh,
        &DuplicateSet::empty(),
    );
    assert_eq!(leg.base_name, "Chair_Leg");
}
