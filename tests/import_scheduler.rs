use kestrel_import::database::{NodeKind, TargetKind};
use kestrel_import::harness::{MemoryDatabase, MemoryGraph};
use kestrel_import::log::ImportLog;
use kestrel_import::payload::{
    ActorClass, ActorDescriptor, AnimationDescriptor, ExportPayload, LightKind, LightProperties,
    MaterialDescriptor, MeshDescriptor, PrefabFirstPass, PrefabSecondPass, QuatData,
    SceneDescriptor, SubmeshDescriptor, TextureBinding, TextureDescriptor, Vec3Data, NO_PARENT,
};
use kestrel_import::scheduler::{AssetKind, ImportJob, StepOutcome};
use kestrel_import::settings::{ImportSettings, ProcessingBehavior, SavingBehavior};

fn texture(path: &str) -> TextureDescriptor {
    TextureDescriptor {
        name: path.to_string(),
        relative_path: path.to_string(),
        source_file: "crate_d.png".to_string(),
    }
}

fn material(path: &str, texture_path: &str) -> MaterialDescriptor {
    MaterialDescriptor {
        name: path.to_string(),
        relative_path: path.to_string(),
        shader_name: "Standard".to_string(),
        texture_bindings: vec![TextureBinding {
            slot: "BaseColor".to_string(),
            texture_relative_path: texture_path.to_string(),
        }],
        scalar_bindings: Vec::new(),
        color_bindings: Vec::new(),
        is_transparent: false,
    }
}

fn submesh(name: &str, separated_path: &str, material_path: &str) -> SubmeshDescriptor {
    SubmeshDescriptor {
        name: name.to_string(),
        relative_path_if_separated: separated_path.to_string(),
        material_relative_paths: vec![material_path.to_string()],
        world_location: Vec3Data::default(),
        world_rotation: QuatData::default(),
        world_scale: Vec3Data::one(),
    }
}

fn mesh(path: &str, submeshes: Vec<SubmeshDescriptor>) -> MeshDescriptor {
    MeshDescriptor {
        name: path.to_string(),
        relative_path: path.to_string(),
        relative_path_if_separated: String::new(),
        source_file: "crate.fbx".to_string(),
        is_skeletal: false,
        submeshes,
        import_position_offset: Vec3Data::default(),
        import_rotation_offset: QuatData::default(),
        import_scale_offset: Vec3Data::one(),
        import_scale_factor: 1.0,
        use_file_scale: false,
    }
}

fn crate_payload() -> ExportPayload {
    ExportPayload {
        textures: vec![texture("Assets/Textures/Crate_D.png")],
        materials: vec![material("Assets/Materials/Crate.mat", "Assets/Textures/Crate_D.png")],
        meshes: vec![mesh(
            "Assets/Meshes/Crate.fbx",
            vec![submesh("Crate", "Assets/Meshes/Crate.fbx", "Assets/Materials/Crate.mat")],
        )],
        ..ExportPayload::default()
    }
}

fn silent_job(payload: ExportPayload, settings: ImportSettings) -> ImportJob<MemoryDatabase, MemoryGraph> {
    ImportJob::with_log(payload, settings, MemoryDatabase::new(), MemoryGraph::new(), ImportLog::silent())
}

#[test]
fn stages_run_in_order_and_finish_at_full_progress() {
    let mut db = MemoryDatabase::new();
    db.seed_slots("/Game/Meshes/Crate", &["Crate"]);
    let mut job = ImportJob::with_log(
        crate_payload(),
        ImportSettings::default(),
        db,
        MemoryGraph::new(),
        ImportLog::silent(),
    );

    assert_eq!(job.step(), StepOutcome::StageFinished(AssetKind::Texture));
    assert_eq!(job.step(), StepOutcome::StageFinished(AssetKind::Material));
    assert_eq!(job.step(), StepOutcome::Finished);
    assert!(!job.is_active());

    let progress = job.progress();
    assert_eq!(progress.overall_processed, 3);
    assert_eq!(progress.overall_total, 3);
    assert_eq!(progress.overall_percent(), 100.0);

    let (db, _, log) = job.into_parts();
    assert_eq!(log.error_count(), 0);

    let texture = db.record("/Game/Textures/Crate_D").expect("texture asset should exist");
    assert_eq!(texture.kind, TargetKind::Texture);

    let material = db.record("/Game/Materials/Crate").expect("material asset should exist");
    assert_eq!(
        material.properties.get("texture_BaseColor").map(String::as_str),
        Some("/Game/Textures/Crate_D")
    );

    // The material stage ran first, so slot assignment on the mesh found it.
    let mesh = db.record("/Game/Meshes/Crate").expect("mesh asset should exist");
    assert_eq!(mesh.kind, TargetKind::StaticMesh);
    assert_eq!(mesh.slot_materials.len(), 1);
    assert!(mesh.slot_materials[0].is_some());
}

#[test]
fn cancelling_after_a_stage_leaves_later_kinds_untouched() {
    let mut job = silent_job(crate_payload(), ImportSettings::default());

    assert_eq!(job.step(), StepOutcome::StageFinished(AssetKind::Texture));
    job.cancel();
    assert_eq!(job.step(), StepOutcome::Cancelled);
    assert!(job.was_cancelled());
    assert!(!job.is_active());
    assert_eq!(job.step(), StepOutcome::Idle);

    assert_eq!(job.database().asset_count(), 1);
    assert!(job.database().record("/Game/Textures/Crate_D").is_some());
    assert!(job.database().record("/Game/Meshes/Crate").is_none());
}

#[test]
fn interval_saving_checkpoints_every_n_items() {
    let payload = ExportPayload {
        textures: vec![
            texture("Assets/Textures/A.png"),
            texture("Assets/Textures/B.png"),
            texture("Assets/Textures/C.png"),
            texture("Assets/Textures/D.png"),
        ],
        ..ExportPayload::default()
    };
    let mut settings = ImportSettings::default();
    settings.saving_behavior = SavingBehavior::SaveEveryInterval;
    settings.saving_interval = 2;

    let mut job = silent_job(payload, settings);
    job.run_to_completion();

    // Two mid-run checkpoints plus the final save, none prompting.
    assert_eq!(job.database().persist_calls(), &[false, false, false]);
}

#[test]
fn skipped_items_do_not_advance_the_save_counter() {
    let mut db = MemoryDatabase::new();
    db.seed_asset("/Game/Textures/A", TargetKind::Texture);
    let payload = ExportPayload {
        textures: vec![texture("Assets/Textures/A.png"), texture("Assets/Textures/B.png")],
        ..ExportPayload::default()
    };
    let mut settings = ImportSettings::default();
    settings.saving_behavior = SavingBehavior::SaveEveryInterval;
    settings.saving_interval = 1;
    settings.textures.behavior = ProcessingBehavior::SkipExisting;

    let mut job = ImportJob::with_log(payload, settings, db, MemoryGraph::new(), ImportLog::silent());
    job.run_to_completion();

    // A was skipped, so only B triggers a checkpoint before the final save.
    assert_eq!(job.database().persist_calls(), &[false, false]);
}

#[test]
fn prompt_at_end_saving_prompts_exactly_once() {
    let payload = ExportPayload {
        textures: vec![texture("Assets/Textures/A.png")],
        ..ExportPayload::default()
    };
    let mut settings = ImportSettings::default();
    settings.saving_behavior = SavingBehavior::PromptAtEnd;

    let mut job = silent_job(payload, settings);
    job.run_to_completion();

    assert_eq!(job.database().persist_calls(), &[true]);
}

#[test]
fn skip_existing_behavior_leaves_present_assets_untouched() {
    let mut db = MemoryDatabase::new();
    db.seed_asset("/Game/Textures/Crate_D", TargetKind::Texture);
    let mut settings = ImportSettings::default();
    settings.textures.behavior = ProcessingBehavior::SkipExisting;

    let mut job = ImportJob::with_log(
        ExportPayload {
            textures: vec![texture("Assets/Textures/Crate_D.png")],
            ..ExportPayload::default()
        },
        settings,
        db,
        MemoryGraph::new(),
        ImportLog::silent(),
    );
    job.run_to_completion();

    let record = job.database().record("/Game/Textures/Crate_D").expect("seeded asset");
    assert_eq!(record.import_count, 0);
}

#[test]
fn update_existing_behavior_creates_nothing_new() {
    let mut settings = ImportSettings::default();
    settings.textures.behavior = ProcessingBehavior::UpdateExisting;

    let mut job = silent_job(
        ExportPayload {
            textures: vec![texture("Assets/Textures/Crate_D.png")],
            ..ExportPayload::default()
        },
        settings,
    );
    job.run_to_completion();

    assert_eq!(job.database().asset_count(), 0);
}

#[test]
fn invalid_asset_at_target_path_is_skipped_without_delete_policy() {
    let mut db = MemoryDatabase::new();
    db.seed_asset("/Game/Textures/Crate_D", TargetKind::Material);

    let mut job = ImportJob::with_log(
        ExportPayload {
            textures: vec![texture("Assets/Textures/Crate_D.png")],
            ..ExportPayload::default()
        },
        ImportSettings::default(),
        db,
        MemoryGraph::new(),
        ImportLog::silent(),
    );
    job.run_to_completion();

    let record = job.database().record("/Game/Textures/Crate_D").expect("blocking asset");
    assert_eq!(record.kind, TargetKind::Material);
    assert!(job.log().warnings_matching("already exists as Material") >= 1);
}

#[test]
fn invalid_asset_is_replaced_under_delete_policy() {
    let mut db = MemoryDatabase::new();
    db.seed_asset("/Game/Textures/Crate_D", TargetKind::Material);
    let mut settings = ImportSettings::default();
    settings.delete_invalid_assets = true;

    let mut job = ImportJob::with_log(
        ExportPayload {
            textures: vec![texture("Assets/Textures/Crate_D.png")],
            ..ExportPayload::default()
        },
        settings,
        db,
        MemoryGraph::new(),
        ImportLog::silent(),
    );
    job.run_to_completion();

    let record = job.database().record("/Game/Textures/Crate_D").expect("replacement asset");
    assert_eq!(record.kind, TargetKind::Texture);
    assert_eq!(record.import_count, 1);
}

#[test]
fn separated_multi_submesh_mesh_yields_a_combined_prefab() {
    let payload = ExportPayload {
        meshes: vec![mesh(
            "Assets/Meshes/Crate.fbx",
            vec![
                submesh("Crate_Box", "Assets/Meshes/Crate_Box.fbx", "Assets/Materials/Crate.mat"),
                submesh("Crate_Lid", "Assets/Meshes/Crate_Lid.fbx", "Assets/Materials/Crate.mat"),
            ],
        )],
        ..ExportPayload::default()
    };
    let mut settings = ImportSettings::default();
    settings.meshes.import_separated = true;

    let mut job = silent_job(payload, settings);
    job.run_to_completion();

    let (db, graph, _) = job.into_parts();
    assert!(db.record("/Game/Meshes/Crate_Box").is_some());
    assert!(db.record("/Game/Meshes/Crate_Lid").is_some());

    let prefab = db.record("/Game/Meshes/Crate_Combined").expect("combined prefab asset");
    assert_eq!(prefab.kind, TargetKind::Prefab);
    let root = graph
        .find_by_name("/Game/Meshes/Crate_Combined", "Root")
        .expect("combined prefab root");
    let children = graph.children_of(root.id);
    assert_eq!(children.len(), 2);
    for child in children {
        assert_eq!(child.kind, NodeKind::StaticMesh);
        assert!(child.properties.contains_key("mesh"));
    }
}

fn barrel_prefab_payload() -> ExportPayload {
    let mut lamp = ActorDescriptor::new(1, NO_PARENT, "Lamp");
    lamp.classes = vec![ActorClass::PointLight];
    lamp.light = Some(LightProperties {
        kind: LightKind::Point,
        color: "FFFFFF".to_string(),
        intensity: 2.0,
        range: 10.0,
        spot_angle: 0.0,
        casts_shadows: true,
    });
    ExportPayload {
        prefabs_first_pass: vec![PrefabFirstPass {
            name: "Barrel".to_string(),
            relative_path: "Assets/Prefabs/Barrel.prefab".to_string(),
            has_any_static_child: false,
        }],
        prefabs_second_pass: vec![PrefabSecondPass {
            name: "Barrel".to_string(),
            relative_path: "Assets/Prefabs/Barrel.prefab".to_string(),
            components: vec![lamp],
        }],
        ..ExportPayload::default()
    }
}

#[test]
fn reimporting_the_same_payload_converges() {
    let mut job = silent_job(barrel_prefab_payload(), ImportSettings::default());
    job.run_to_completion();
    let (db, graph, _) = job.into_parts();

    let first_root = graph
        .find_by_name("/Game/Prefabs/Barrel", "Root")
        .expect("prefab root after first run")
        .id;
    let mut first_names: Vec<String> = graph
        .nodes_in("/Game/Prefabs/Barrel")
        .iter()
        .map(|node| node.name.clone())
        .collect();
    first_names.sort();

    let mut job = ImportJob::with_log(
        barrel_prefab_payload(),
        ImportSettings::default(),
        db,
        graph,
        ImportLog::silent(),
    );
    job.run_to_completion();
    let (db, graph, log) = job.into_parts();

    // The preserved root survives the re-import; everything else is rebuilt
    // in place rather than duplicated.
    let second_root = graph
        .find_by_name("/Game/Prefabs/Barrel", "Root")
        .expect("prefab root after second run");
    assert_eq!(second_root.id, first_root);
    let mut second_names: Vec<String> = graph
        .nodes_in("/Game/Prefabs/Barrel")
        .iter()
        .map(|node| node.name.clone())
        .collect();
    second_names.sort();
    assert_eq!(second_names, first_names);
    assert_eq!(log.error_count(), 0);

    let record = db.record("/Game/Prefabs/Barrel").expect("prefab asset");
    assert_eq!(record.import_count, 2);
}

#[test]
fn animations_are_imported_per_associated_skeleton() {
    let mut guy = mesh("Assets/Meshes/Guy.fbx", Vec::new());
    guy.is_skeletal = true;
    let payload = ExportPayload {
        meshes: vec![guy],
        animations: vec![AnimationDescriptor {
            name: "Run".to_string(),
            relative_path: "Assets/Anims/Run.anim".to_string(),
            source_file: "guy.fbx".to_string(),
            skeletal_mesh_relative_paths: vec!["Assets/Meshes/Guy.fbx".to_string()],
        }],
        ..ExportPayload::default()
    };

    let mut job = silent_job(payload, ImportSettings::default());
    job.run_to_completion();

    let record = job.database().record("/Game/Anims/Guy_Run").expect("animation asset");
    assert_eq!(record.kind, TargetKind::Animation);
    assert_eq!(record.properties.get("skeleton").map(String::as_str), Some("/Game/Meshes/Guy"));
}

#[test]
fn mesh_file_scale_flag_carries_into_the_import_options() {
    let mut scaled = mesh(
        "Assets/Meshes/Crate.fbx",
        vec![submesh("Crate", "", "Assets/Materials/Crate.mat")],
    );
    scaled.use_file_scale = true;
    scaled.import_scale_factor = 2.0;

    let mut job = silent_job(
        ExportPayload { meshes: vec![scaled], ..ExportPayload::default() },
        ImportSettings::default(),
    );
    job.run_to_completion();

    let record = job.database().record("/Game/Meshes/Crate").expect("mesh asset");
    assert!(record.options.use_source_file_scale);
    assert_eq!(record.options.import_uniform_scale, 2.0);
}

#[test]
fn scene_import_builds_its_graph_and_optional_sky_light() {
    let payload = ExportPayload {
        scenes: vec![SceneDescriptor {
            name: "Main".to_string(),
            relative_path: "Assets/Scenes/Main.scene".to_string(),
            actors: Vec::new(),
            has_any_static_actor: true,
        }],
        ..ExportPayload::default()
    };
    let mut settings = ImportSettings::default();
    settings.scene_options.spawn_sky_light = true;

    let mut job = silent_job(payload, settings);
    job.run_to_completion();

    let (db, graph, _) = job.into_parts();
    let scene = db.record("/Game/Scenes/Main").expect("scene asset");
    assert_eq!(scene.kind, TargetKind::Scene);
    assert_eq!(scene.properties.get("has_static_content").map(String::as_str), Some("true"));
    let sky = graph.find_by_name("/Game/Scenes/Main", "SkyLight").expect("sky light node");
    assert_eq!(sky.kind, NodeKind::SkyLight);
}

#[test]
fn empty_payload_finishes_immediately() {
    let mut job = silent_job(ExportPayload::default(), ImportSettings::default());
    assert_eq!(job.step(), StepOutcome::Finished);
    assert_eq!(job.progress().overall_percent(), 100.0);
}
