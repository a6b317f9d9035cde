//! One import routine per asset kind. Each routine resolves the target
//! name, applies the processing-behavior gate and the invalid-asset guard,
//! and hands off to the engine collaborators. Failures are logged and the
//! item skipped; nothing here aborts the run.

use glam::{Quat, Vec3};

use crate::database::{
    AssetDatabase, GraphBackend, ImportOptions, NodeKind, TargetKind,
};
use crate::duplicates::DuplicateSet;
use crate::graph::{
    self, is_secondary_lod, FlattenStrategy, GraphBuilder, TransformSpace, IMPORT_TAG,
};
use crate::guard::guard_existing;
use crate::log::ImportLog;
use crate::payload::{
    ActorClass, ActorDescriptor, AnimationDescriptor, MaterialDescriptor, MeshDescriptor,
    MeshReference, PrefabFirstPass, PrefabSecondPass, SceneDescriptor, SubmeshDescriptor,
    TextureDescriptor, NO_PARENT,
};
use crate::resolve::{CanonicalName, Resolver, LIBRARY_ROOT};
use crate::settings::{ImportSettings, ProcessingBehavior};
use crate::slots;

/// Tag marking the preserved root node of an imported prefab graph.
pub const PREFAB_ROOT_TAG: &str = "PrefabRoot";

/// Synthesized prefab descriptors a mesh item feeds back into the run, so a
/// separated multi-submesh import still yields one referenceable whole.
#[derive(Debug, Clone)]
pub struct MeshFollowUp {
    pub first_pass: PrefabFirstPass,
    pub second_pass: PrefabSecondPass,
}

fn behavior_allows<D: AssetDatabase>(
    settings: &ImportSettings,
    db: &D,
    log: &mut ImportLog,
    name: &CanonicalName,
    kind: TargetKind,
) -> bool {
    let behavior = settings.kind_settings(kind).behavior;
    let exists = db.try_get(&name.full_path).is_some();
    match behavior {
        ProcessingBehavior::AlwaysProcess => true,
        ProcessingBehavior::UpdateExisting => {
            if !exists {
                log.info(format!(
                    "'{}' skipped: no existing asset to update",
                    name.full_path
                ));
            }
            exists
        }
        ProcessingBehavior::SkipExisting => {
            if exists {
                log.info(format!("'{}' skipped: asset already exists", name.full_path));
            }
            !exists
        }
        ProcessingBehavior::DoNotProcess => {
            log.info(format!("'{}' skipped: {} processing disabled", name.full_path, kind.label()));
            false
        }
    }
}

pub fn process_texture<D: AssetDatabase>(
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
    db: &mut D,
    log: &mut ImportLog,
    item: &TextureDescriptor,
) -> bool {
    let resolver = Resolver::new(settings);
    let name = resolver.resolve(&item.relative_path, TargetKind::Texture, duplicates);
    if name.is_empty() {
        return false;
    }
    log.info(format!("Texture '{}' -> '{}'", item.relative_path, name.full_path));
    if !behavior_allows(settings, db, log, &name, TargetKind::Texture) {
        return false;
    }
    if !guard_existing(db, &name, TargetKind::Texture, settings, log) {
        return false;
    }
    if db
        .create_or_update(&item.source_file, &name, TargetKind::Texture, &ImportOptions::default())
        .is_none()
    {
        log.error(format!(
            "Failed to import texture '{}' from '{}'",
            name.full_path, item.source_file
        ));
        return false;
    }
    true
}

fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' { ch } else { '_' })
        .collect()
}

pub fn process_material<D: AssetDatabase>(
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
    db: &mut D,
    log: &mut ImportLog,
    item: &MaterialDescriptor,
) -> bool {
    let resolver = Resolver::new(settings);
    let as_instance = settings.material_options.create_material_instances;
    let kind = if as_instance { TargetKind::MaterialInstance } else { TargetKind::Material };
    let name = resolver.resolve(&item.relative_path, kind, duplicates);
    if name.is_empty() {
        return false;
    }
    log.info(format!("Material '{}' -> '{}'", item.relative_path, name.full_path));
    if !behavior_allows(settings, db, log, &name, kind) {
        return false;
    }
    if !guard_existing(db, &name, kind, settings, log) {
        return false;
    }

    // Instances derive from one shared parent material per shader, created
    // on demand in the library namespace.
    let parent_path = if as_instance {
        let shader = if item.shader_name.is_empty() { "Default" } else { item.shader_name.as_str() };
        let parent =
            CanonicalName::from_parts(LIBRARY_ROOT, format!("M_{}", sanitize_identifier(shader)));
        if db.try_get(&parent.full_path).is_none()
            && db
                .create_or_update("", &parent, TargetKind::Material, &ImportOptions::default())
                .is_none()
        {
            log.error(format!("Failed to create parent material '{}'", parent.full_path));
            return false;
        }
        Some(parent.full_path)
    } else {
        None
    };

    let Some(handle) = db.create_or_update("", &name, kind, &ImportOptions::default()) else {
        log.error(format!("Failed to create material '{}'", name.full_path));
        return false;
    };
    if let Some(parent) = parent_path {
        db.set_asset_property(handle, "parent", parent);
    }
    db.set_asset_property(handle, "shader", item.shader_name.clone());
    db.set_asset_property(handle, "is_transparent", item.is_transparent.to_string());
    for binding in &item.texture_bindings {
        let texture = resolver.resolve(&binding.texture_relative_path, TargetKind::Texture, duplicates);
        if texture.is_empty() {
            continue;
        }
        if db.try_get(&texture.full_path).is_some() {
            db.set_asset_property(handle, &format!("texture_{}", binding.slot), texture.full_path);
        } else {
            log.warning(format!(
                "Failed to bind texture because it does not exist: '{}'",
                texture.full_path
            ));
        }
    }
    for binding in &item.scalar_bindings {
        db.set_asset_property(handle, &format!("scalar_{}", binding.name), binding.value.to_string());
    }
    for binding in &item.color_bindings {
        db.set_asset_property(handle, &format!("color_{}", binding.name), binding.value.clone());
    }
    true
}

fn quantized_key(location: Vec3, rotation: Quat, scale: f32) -> String {
    let l = (location * 100.0).round();
    let r = (Vec3::new(rotation.x, rotation.y, rotation.z) * 100.0).round();
    format!(
        "{}_{}_{}_{}_{}_{}_{}_{}",
        l.x as i64,
        l.y as i64,
        l.z as i64,
        r.x as i64,
        r.y as i64,
        r.z as i64,
        (rotation.w * 100.0).round() as i64,
        (scale * 100.0).round() as i64
    )
}

/// Import transform for a mesh source file. For separated imports the most
/// popular transform among the (optionally filtered) submeshes wins, so one
/// oddly placed submesh does not skew the whole file.
fn import_transform(
    settings: &ImportSettings,
    mesh: &MeshDescriptor,
    specific_submesh: Option<&str>,
) -> (Vec3, Quat, f32) {
    let scale_offset = f32::max(0.0001, mesh.import_scale_offset.x);
    let location = Vec3::from(mesh.import_position_offset) / scale_offset;
    let rotation = Quat::from(mesh.import_rotation_offset);
    let scale = mesh.import_scale_factor / scale_offset;

    if !settings.meshes.import_separated || mesh.submeshes.is_empty() {
        return (location, rotation, scale);
    }

    let mut candidates: Vec<(String, usize, (Vec3, Quat, f32))> = Vec::new();
    for submesh in &mesh.submeshes {
        if let Some(filter) = specific_submesh {
            if submesh.name != filter {
                continue;
            }
        }
        let sub_scale = f32::max(0.0001, submesh.world_scale.x);
        let l = Vec3::from(submesh.world_location) / sub_scale;
        let r = Quat::from(submesh.world_rotation);
        let s = mesh.import_scale_factor / sub_scale;
        let key = quantized_key(l, r, s);
        match candidates.iter_mut().find(|(existing, _, _)| *existing == key) {
            Some((_, count, _)) => *count += 1,
            None => candidates.push((key, 1, (l, r, s))),
        }
    }

    let mut best = (location, rotation, scale);
    let mut best_count = 0;
    for (_, count, transform) in candidates {
        if count > best_count {
            best = transform;
            best_count = count;
        }
    }
    best
}

fn assign_asset_materials<D: AssetDatabase>(
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
    db: &mut D,
    log: &mut ImportLog,
    mesh_path: &str,
    materials: &[String],
) {
    let Some(handle) = db.try_get(mesh_path) else {
        return;
    };
    let materials: Vec<String> = materials.iter().filter(|m| !m.is_empty()).cloned().collect();
    if materials.is_empty() {
        return;
    }
    let slot_names = db.slot_names(handle);
    let assignment = slots::match_slots(&materials, &slot_names, settings, duplicates);
    for material in &assignment.unmatched {
        log.warning(format!("No slot found for material: {material}"));
    }
    let resolver = Resolver::new(settings);
    let (first, second) = if settings.material_options.create_material_instances {
        (TargetKind::MaterialInstance, TargetKind::Material)
    } else {
        (TargetKind::Material, TargetKind::MaterialInstance)
    };
    for (slot, material) in assignment.per_slot.iter().enumerate() {
        let Some(material) = material else { continue };
        let mut resolved = None;
        for kind in [first, second] {
            let name = resolver.resolve(material, kind, duplicates);
            if let Some(found) = db.try_get(&name.full_path) {
                resolved = Some(found);
                break;
            }
        }
        match resolved {
            Some(found) => db.assign_slot_material(handle, slot, Some(found)),
            None => log.warning(format!(
                "Failed to assign material because it does not exist: '{material}'"
            )),
        }
    }
}

/// Materials of every submesh in order, deduplicated, for combined imports.
fn combined_materials(mesh: &MeshDescriptor) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for submesh in &mesh.submeshes {
        for material in &submesh.material_relative_paths {
            if !material.is_empty() && !out.contains(material) {
                out.push(material.clone());
            }
        }
    }
    out
}

pub fn process_mesh<D: AssetDatabase>(
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
    db: &mut D,
    log: &mut ImportLog,
    item: &MeshDescriptor,
) -> (bool, Option<MeshFollowUp>) {
    let resolver = Resolver::new(settings);
    let kind = if item.is_skeletal { TargetKind::SkeletalMesh } else { TargetKind::StaticMesh };
    let name = resolver.resolve(&item.relative_path, kind, duplicates);
    if name.is_empty() {
        return (false, None);
    }
    log.info(format!("Mesh '{}' -> '{}'", item.relative_path, name.full_path));

    let separated = !item.is_skeletal && settings.meshes.import_separated && !item.submeshes.is_empty();
    if !separated {
        if !behavior_allows(settings, db, log, &name, kind) {
            return (false, None);
        }
        if !guard_existing(db, &name, kind, settings, log) {
            return (false, None);
        }
        let (location, rotation, scale) = import_transform(settings, item, None);
        let options = ImportOptions {
            combine_submeshes: true,
            specific_submesh: None,
            import_translation: location,
            import_rotation: rotation,
            import_uniform_scale: scale,
            use_source_file_scale: item.use_file_scale,
        };
        if db.create_or_update(&item.source_file, &name, kind, &options).is_none() {
            log.error(format!(
                "Failed to import mesh '{}' from '{}'",
                name.full_path, item.source_file
            ));
            return (false, None);
        }
        assign_asset_materials(settings, duplicates, db, log, &name.full_path, &combined_materials(item));
        return (true, None);
    }

    let mut any_imported = false;
    for submesh in &item.submeshes {
        if settings.meshes.generate_lods && is_secondary_lod(&submesh.name) {
            log.info(format!(
                "Submesh '{}' skipped: secondary LOD, already folded into the main mesh",
                submesh.name
            ));
            continue;
        }
        let sub_name = resolver.resolve_separated(
            &item.relative_path,
            &submesh.relative_path_if_separated,
            kind,
            duplicates,
        );
        if sub_name.is_empty() {
            continue;
        }
        if !behavior_allows(settings, db, log, &sub_name, kind) {
            continue;
        }
        if !guard_existing(db, &sub_name, kind, settings, log) {
            continue;
        }
        let (location, rotation, scale) = import_transform(settings, item, Some(&submesh.name));
        let options = ImportOptions {
            combine_submeshes: false,
            specific_submesh: Some(submesh.name.clone()),
            import_translation: location,
            import_rotation: rotation,
            import_uniform_scale: scale,
            use_source_file_scale: item.use_file_scale,
        };
        if db.create_or_update(&item.source_file, &sub_name, kind, &options).is_none() {
            log.error(format!(
                "Failed to import submesh '{}' from '{}'",
                sub_name.full_path, item.source_file
            ));
            continue;
        }
        assign_asset_materials(
            settings,
            duplicates,
            db,
            log,
            &sub_name.full_path,
            &submesh.material_relative_paths,
        );
        any_imported = true;
    }

    let follow_up =
        if item.submeshes.len() > 1 { Some(combined_mesh_follow_up(item)) } else { None };
    (any_imported, follow_up)
}

fn strip_extension(relative_path: &str) -> String {
    match relative_path.rsplit_once('/') {
        Some((dir, base)) => {
            let stem = base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base);
            format!("{dir}/{stem}")
        }
        None => relative_path.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(relative_path).to_string(),
    }
}

/// A separated multi-submesh mesh has no single importable asset, so a
/// synthesized prefab groups the pieces back together. Its descriptors run
/// through the normal prefab passes later in the same import.
fn combined_mesh_follow_up(mesh: &MeshDescriptor) -> MeshFollowUp {
    let relative_path = format!("{}_Combined", strip_extension(&mesh.relative_path));
    let name = format!("{}_Combined", mesh.name);
    let components = mesh
        .submeshes
        .iter()
        .enumerate()
        .map(|(index, submesh)| combined_component(mesh, submesh, index))
        .collect();
    MeshFollowUp {
        first_pass: PrefabFirstPass {
            name: name.clone(),
            relative_path: relative_path.clone(),
            has_any_static_child: true,
        },
        second_pass: PrefabSecondPass { name, relative_path, components },
    }
}

fn combined_component(
    mesh: &MeshDescriptor,
    submesh: &SubmeshDescriptor,
    index: usize,
) -> ActorDescriptor {
    let mut actor = ActorDescriptor::new(index as i64 + 1, NO_PARENT, submesh.name.clone());
    actor.classes = vec![ActorClass::StaticMesh];
    actor.relative_location = submesh.world_location;
    actor.relative_rotation = submesh.world_rotation;
    actor.relative_scale = submesh.world_scale;
    actor.is_movable = false;
    actor.mesh = Some(MeshReference {
        mesh_relative_path: mesh.relative_path.clone(),
        mesh_relative_path_if_separated: submesh.relative_path_if_separated.clone(),
        material_relative_paths: submesh.material_relative_paths.clone(),
        animation_relative_paths: Vec::new(),
    });
    actor
}

pub fn process_animation<D: AssetDatabase>(
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
    db: &mut D,
    log: &mut ImportLog,
    item: &AnimationDescriptor,
) -> bool {
    let resolver = Resolver::new(settings);
    let name = resolver.resolve(&item.relative_path, TargetKind::Animation, duplicates);
    if name.is_empty() {
        return false;
    }
    if item.skeletal_mesh_relative_paths.is_empty() {
        log.info(format!(
            "Animation '{}' skipped: no associated skeletal mesh",
            item.relative_path
        ));
        return false;
    }
    let mut any_imported = false;
    // One animation asset per associated skeleton, named after it, so two
    // skeletons sharing a clip do not fight over one asset.
    for skeletal_path in &item.skeletal_mesh_relative_paths {
        let skeleton = resolver.resolve(skeletal_path, TargetKind::SkeletalMesh, duplicates);
        if skeleton.is_empty() {
            continue;
        }
        if db.try_get(&skeleton.full_path).is_none() {
            log.warning(format!(
                "Cannot import animation '{}' because skeletal mesh does not exist: '{}'",
                name.full_path, skeleton.full_path
            ));
            continue;
        }
        let target = CanonicalName::from_parts(
            name.directory.clone(),
            format!("{}_{}", skeleton.base_name, name.base_name),
        );
        log.info(format!("Animation '{}' -> '{}'", item.relative_path, target.full_path));
        if !behavior_allows(settings, db, log, &target, TargetKind::Animation) {
            continue;
        }
        if !guard_existing(db, &target, TargetKind::Animation, settings, log) {
            continue;
        }
        match db.create_or_update(&item.source_file, &target, TargetKind::Animation, &ImportOptions::default())
        {
            Some(handle) => {
                db.set_asset_property(handle, "skeleton", skeleton.full_path.clone());
                any_imported = true;
            }
            None => log.error(format!(
                "Failed to import animation '{}' from '{}'",
                target.full_path, item.source_file
            )),
        }
    }
    any_imported
}

pub fn process_prefab_first_pass<D: AssetDatabase, G: GraphBackend>(
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
    db: &mut D,
    graph: &mut G,
    log: &mut ImportLog,
    item: &PrefabFirstPass,
) -> bool {
    let resolver = Resolver::new(settings);
    let name = resolver.resolve(&item.relative_path, TargetKind::Prefab, duplicates);
    if name.is_empty() {
        return false;
    }
    log.info(format!("Prefab '{}' -> '{}'", item.relative_path, name.full_path));
    if !behavior_allows(settings, db, log, &name, TargetKind::Prefab) {
        return false;
    }
    if !guard_existing(db, &name, TargetKind::Prefab, settings, log) {
        return false;
    }
    if db.create_or_update("", &name, TargetKind::Prefab, &ImportOptions::default()).is_none() {
        log.error(format!("Failed to create prefab '{}'", name.full_path));
        return false;
    }
    // Re-import: drop everything from the previous run except the preserved
    // root the second pass builds under.
    graph::clear_previous_import(graph, &name.full_path);
    if graph.nodes_tagged(&name.full_path, PREFAB_ROOT_TAG).is_empty() {
        if let Some(root) = graph.create_node(&name.full_path, NodeKind::Group, "Root") {
            graph.add_tag(root, PREFAB_ROOT_TAG);
            graph.set_movable(root, !item.has_any_static_child);
        }
    }
    true
}

pub fn process_prefab_second_pass<D: AssetDatabase, G: GraphBackend>(
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
    db: &mut D,
    graph: &mut G,
    log: &mut ImportLog,
    flatten: &dyn FlattenStrategy,
    item: &PrefabSecondPass,
) -> bool {
    let resolver = Resolver::new(settings);
    let name = resolver.resolve(&item.relative_path, TargetKind::Prefab, duplicates);
    if name.is_empty() {
        return false;
    }
    if settings.prefabs.behavior == ProcessingBehavior::DoNotProcess {
        log.info(format!("'{}' skipped: Prefab processing disabled", name.full_path));
        return false;
    }
    if db.try_get(&name.full_path).is_none() {
        log.warning(format!(
            "Cannot set up prefab '{}' because the asset does not exist; its first pass may have \
             failed. Asset skipped.",
            name.full_path
        ));
        return false;
    }
    log.info(format!("Wiring prefab '{}'", name.full_path));
    let root = graph.nodes_tagged(&name.full_path, PREFAB_ROOT_TAG).first().copied();
    let mut builder = GraphBuilder::new(settings, duplicates, db, graph, log, flatten);
    builder.build(&name.full_path, root, &item.components, TransformSpace::Relative);
    true
}

pub fn process_scene<D: AssetDatabase, G: GraphBackend>(
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
    db: &mut D,
    graph: &mut G,
    log: &mut ImportLog,
    flatten: &dyn FlattenStrategy,
    item: &SceneDescriptor,
) -> bool {
    let resolver = Resolver::new(settings);
    let name = resolver.resolve(&item.relative_path, TargetKind::Scene, duplicates);
    if name.is_empty() {
        return false;
    }
    log.info(format!("Scene '{}' -> '{}'", item.relative_path, name.full_path));
    if !behavior_allows(settings, db, log, &name, TargetKind::Scene) {
        return false;
    }
    if !guard_existing(db, &name, TargetKind::Scene, settings, log) {
        return false;
    }
    let Some(handle) = db.create_or_update("", &name, TargetKind::Scene, &ImportOptions::default())
    else {
        log.error(format!("Failed to create scene '{}'", name.full_path));
        return false;
    };
    db.set_asset_property(handle, "has_static_content", item.has_any_static_actor.to_string());
    graph::clear_previous_import(graph, &name.full_path);
    if settings.scene_options.spawn_sky_light {
        if let Some(node) = graph.create_node(&name.full_path, NodeKind::SkyLight, "SkyLight") {
            graph.add_tag(node, IMPORT_TAG);
            graph.set_node_property(
                node,
                "intensity",
                settings.lights.sky_light_intensity.to_string(),
            );
        }
    }
    let mut builder = GraphBuilder::new(settings, duplicates, db, graph, log, flatten);
    builder.build(&name.full_path, None, &item.actors, TransformSpace::World);
    true
}
