use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::database::{
    AssetDatabase, GraphBackend, GraphMeshSummary, NodeId, NodeKind, NodeTransform, TargetKind,
};
use crate::duplicates::DuplicateSet;
use crate::log::ImportLog;
use crate::payload::{ActorClass, ActorDescriptor, ComponentOverride, NO_PARENT};
use crate::resolve::{CanonicalName, Resolver};
use crate::settings::{ImportSettings, MeshSpawnBehavior};
use crate::slots;

/// Tag carried by every node this importer creates, so a re-import can find
/// and discard the previous run's nodes before rebuilding.
pub const IMPORT_TAG: &str = "ImportedNode";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilitySet: u16 {
        const EMPTY = 1 << 0;
        const STATIC_MESH = 1 << 1;
        const SKELETAL_MESH = 1 << 2;
        const POINT_LIGHT = 1 << 3;
        const DIRECTIONAL_LIGHT = 1 << 4;
        const SPOT_LIGHT = 1 << 5;
        const CAMERA = 1 << 6;
        const PREFAB = 1 << 7;
    }
}

impl CapabilitySet {
    pub fn from_classes(classes: &[ActorClass]) -> Self {
        let mut set = CapabilitySet::empty();
        for class in classes {
            set |= match class {
                ActorClass::Empty => CapabilitySet::EMPTY,
                ActorClass::StaticMesh => CapabilitySet::STATIC_MESH,
                ActorClass::SkeletalMesh => CapabilitySet::SKELETAL_MESH,
                ActorClass::PointLight => CapabilitySet::POINT_LIGHT,
                ActorClass::DirectionalLight => CapabilitySet::DIRECTIONAL_LIGHT,
                ActorClass::SpotLight => CapabilitySet::SPOT_LIGHT,
                ActorClass::Camera => CapabilitySet::CAMERA,
                ActorClass::Prefab => CapabilitySet::PREFAB,
            };
        }
        set
    }

    pub fn count(self) -> u32 {
        self.bits().count_ones()
    }

    /// More than one capability, or nothing but a transform, needs a
    /// synthetic grouping root; a single concrete capability collapses onto
    /// its own node.
    pub fn needs_grouping_root(self) -> bool {
        self.count() != 1 || self == CapabilitySet::EMPTY
    }
}

/// Counter-suffix disambiguation for node names within one graph.
pub fn make_unique_name(desired: &str, used: &mut BTreeSet<String>) -> String {
    if used.contains(desired) {
        for counter in 1..1000 {
            let candidate = format!("{desired}_{counter}");
            if !used.contains(&candidate) {
                used.insert(candidate.clone());
                return candidate;
            }
        }
    }
    used.insert(desired.to_string());
    desired.to_string()
}

/// Which of the exported transforms applies: scene actors carry world
/// transforms, prefab components carry parent-relative ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformSpace {
    World,
    Relative,
}

fn transform_of(actor: &ActorDescriptor, space: TransformSpace) -> NodeTransform {
    match space {
        TransformSpace::World => NodeTransform {
            location: actor.world_location.into(),
            rotation: actor.world_rotation.into(),
            scale: actor.world_scale.into(),
        },
        TransformSpace::Relative => NodeTransform {
            location: actor.relative_location.into(),
            rotation: actor.relative_rotation.into(),
            scale: actor.relative_scale.into(),
        },
    }
}

/// What to put in a scene for an actor that references a prefab.
#[derive(Debug, Clone)]
pub enum FlattenDecision {
    /// Spawn the prefab instance itself.
    Keep,
    /// Replace with one bare mesh node.
    Single(String),
    /// Replace with a grouping root holding one mesh node per entry.
    Grouped(Vec<(String, NodeTransform)>),
}

/// Policy seam: whether a prefab instance in a scene should be replaced by
/// its meshes. The boundary conditions are policy, not structure.
pub trait FlattenStrategy {
    fn decide(&self, behavior: MeshSpawnBehavior, summary: &GraphMeshSummary) -> FlattenDecision;
}

/// Flattens only prefabs made of nothing but meshes and plain groups; a
/// single mesh at identity collapses to a bare mesh node, anything else
/// keeps its grouping root.
#[derive(Debug, Default)]
pub struct DefaultFlatten;

impl FlattenStrategy for DefaultFlatten {
    fn decide(&self, behavior: MeshSpawnBehavior, summary: &GraphMeshSummary) -> FlattenDecision {
        if behavior == MeshSpawnBehavior::AllPrefab {
            return FlattenDecision::Keep;
        }
        if summary.mesh_nodes.is_empty() || summary.other_node_count > 0 {
            return FlattenDecision::Keep;
        }
        if behavior == MeshSpawnBehavior::StaticMeshIfAloneInPrefab && summary.mesh_nodes.len() != 1 {
            return FlattenDecision::Keep;
        }
        if summary.mesh_nodes.len() == 1 && summary.mesh_nodes[0].1.is_identity() {
            return FlattenDecision::Single(summary.mesh_nodes[0].0.clone());
        }
        FlattenDecision::Grouped(summary.mesh_nodes.clone())
    }
}

/// Two-pass assembly of one scene or prefab graph: create every node first,
/// then wire parents by numeric id. Used identically for both; only the
/// backing asset differs.
pub struct GraphBuilder<'a, D: AssetDatabase, G: GraphBackend> {
    settings: &'a ImportSettings,
    duplicates: &'a DuplicateSet,
    db: &'a mut D,
    graph: &'a mut G,
    log: &'a mut ImportLog,
    flatten: &'a dyn FlattenStrategy,
}

impl<'a, D: AssetDatabase, G: GraphBackend> GraphBuilder<'a, D, G> {
    pub fn new(
        settings: &'a ImportSettings,
        duplicates: &'a DuplicateSet,
        db: &'a mut D,
        graph: &'a mut G,
        log: &'a mut ImportLog,
        flatten: &'a dyn FlattenStrategy,
    ) -> Self {
        Self { settings, duplicates, db, graph, log, flatten }
    }

    pub fn build(
        &mut self,
        graph_path: &str,
        root: Option<NodeId>,
        actors: &[ActorDescriptor],
        space: TransformSpace,
    ) {
        let mut used_names: BTreeSet<String> = BTreeSet::new();
        let mut id_to_node: BTreeMap<i64, NodeId> = BTreeMap::new();
        let mut pending: Vec<(NodeId, String, i64)> = Vec::new();
        if let Some(root) = root {
            id_to_node.insert(NO_PARENT, root);
        }

        // Pass 1: one node per entity; a synthetic grouping root only where
        // an entity carries several capabilities.
        for actor in actors {
            let caps = CapabilitySet::from_classes(&actor.classes);
            let grouping_root = if caps.needs_grouping_root() {
                let name = make_unique_name(&actor.display_name, &mut used_names);
                let Some(node) = self.graph.create_node(graph_path, NodeKind::Group, &name) else {
                    self.log.error(format!(
                        "Failed to create grouping node for '{}' (id {}); actor skipped",
                        actor.display_name, actor.id
                    ));
                    continue;
                };
                self.apply_actor_state(node, actor, space);
                if id_to_node.insert(actor.id, node).is_some() {
                    self.log.warning(format!(
                        "Actor id {} appears more than once; keeping the last occurrence",
                        actor.id
                    ));
                }
                pending.push((node, name, actor.parent_id));
                Some(node)
            } else {
                None
            };

            let concrete: SmallVec<[ActorClass; 4]> = actor
                .classes
                .iter()
                .copied()
                .filter(|class| *class != ActorClass::Empty || grouping_root.is_none())
                .collect();
            for class in concrete {
                let name = make_unique_name(&actor.display_name, &mut used_names);
                let Some(node) = self.spawn_capability(graph_path, actor, class, &name) else {
                    continue;
                };
                match grouping_root {
                    Some(parent) => {
                        // Transform and visibility stay at defaults; the
                        // grouping root carries them.
                        self.graph.attach_child(parent, node);
                        self.graph.add_tag(node, IMPORT_TAG);
                    }
                    None => {
                        self.apply_actor_state(node, actor, space);
                        if id_to_node.insert(actor.id, node).is_some() {
                            self.log.warning(format!(
                                "Actor id {} appears more than once; keeping the last occurrence",
                                actor.id
                            ));
                        }
                        pending.push((node, name, actor.parent_id));
                    }
                }
            }
        }

        // Pass 2: wire parents. A dangling reference leaves the node at top
        // level with one warning; it never fails the import.
        for (node, name, parent_id) in pending {
            match id_to_node.get(&parent_id) {
                Some(&parent) if parent != node => self.graph.attach_child(parent, node),
                Some(_) => {}
                None if parent_id == NO_PARENT => {}
                None => self.log.warning(format!(
                    "No parent node found for '{name}' (parent id {parent_id}); leaving at top level"
                )),
            }
        }
    }

    fn apply_actor_state(&mut self, node: NodeId, actor: &ActorDescriptor, space: TransformSpace) {
        self.graph.set_transform(node, transform_of(actor, space));
        self.graph.set_visibility(node, actor.is_visible);
        self.graph.set_movable(node, actor.is_movable);
        self.graph.add_tag(node, IMPORT_TAG);
        if actor.tag != "Untagged" {
            self.graph.add_tag(node, &actor.tag);
        }
    }

    fn spawn_capability(
        &mut self,
        graph_path: &str,
        actor: &ActorDescriptor,
        class: ActorClass,
        name: &str,
    ) -> Option<NodeId> {
        match class {
            ActorClass::Empty => self.graph.create_node(graph_path, NodeKind::Group, name),
            ActorClass::StaticMesh => self.spawn_mesh(graph_path, actor, name, false),
            ActorClass::SkeletalMesh => self.spawn_mesh(graph_path, actor, name, true),
            ActorClass::PointLight | ActorClass::DirectionalLight | ActorClass::SpotLight => {
                self.spawn_light(graph_path, actor, class, name)
            }
            ActorClass::Camera => self.spawn_camera(graph_path, actor, name),
            ActorClass::Prefab => self.spawn_prefab(graph_path, actor, name),
        }
    }

    fn spawn_mesh(
        &mut self,
        graph_path: &str,
        actor: &ActorDescriptor,
        name: &str,
        skeletal: bool,
    ) -> Option<NodeId> {
        let resolver = Resolver::new(self.settings);
        let mesh_ref = actor.mesh.clone().unwrap_or_default();
        let kind = if skeletal { TargetKind::SkeletalMesh } else { TargetKind::StaticMesh };
        let combined = resolver.resolve(&mesh_ref.mesh_relative_path, kind, self.duplicates);

        if !skeletal && self.settings.meshes.generate_lods && is_secondary_lod(&combined.base_name) {
            self.log.info(format!(
                "'{}' skipped: secondary LOD, already folded into the main mesh",
                actor.display_name
            ));
            return None;
        }

        let resolved = if skeletal {
            combined
        } else {
            self.resolve_mesh_target(
                &resolver,
                &mesh_ref.mesh_relative_path,
                &mesh_ref.mesh_relative_path_if_separated,
                kind,
            )
        };

        let node_kind = if skeletal { NodeKind::SkeletalMesh } else { NodeKind::StaticMesh };
        let node = self.graph.create_node(graph_path, node_kind, name)?;

        let mesh_handle = self.db.try_get(&resolved.full_path);
        if mesh_handle.is_none() && !resolved.is_empty() {
            self.log.warning(format!(
                "Failed to assign mesh because it does not exist: '{}'",
                resolved.full_path
            ));
        }
        if !resolved.is_empty() {
            self.graph.set_node_property(node, "mesh", resolved.full_path.clone());
        }

        if let Some(handle) = mesh_handle {
            let assignment = slots::match_slots(
                &mesh_ref.material_relative_paths,
                &self.db.slot_names(handle),
                self.settings,
                self.duplicates,
            );
            for material in &assignment.unmatched {
                self.log.warning(format!("No slot found for material: {material}"));
            }
            for (slot_idx, material) in assignment.per_slot.iter().enumerate() {
                let Some(material) = material else { continue };
                if let Some(path) = self.lookup_material(&resolver, material) {
                    self.graph.set_node_property(node, &format!("material_slot_{slot_idx}"), path);
                } else {
                    self.log.warning(format!(
                        "Failed to assign material because it does not exist: '{material}'"
                    ));
                }
            }
        }

        if skeletal {
            if let Some(animation) = mesh_ref.animation_relative_paths.first() {
                let anim = resolver.resolve(animation, TargetKind::Animation, self.duplicates);
                if !anim.is_empty() && !resolved.is_empty() {
                    let custom = format!("{}/{}_{}", anim.directory, resolved.base_name, anim.base_name);
                    if self.db.try_get(&custom).is_some() {
                        self.graph.set_node_property(node, "animation", custom);
                    } else {
                        self.log.warning(format!(
                            "Failed to assign animation because it does not exist: '{custom}'"
                        ));
                    }
                }
            }
        }

        Some(node)
    }

    /// Which of the combined or split-submesh asset names to point a node
    /// at: the configured preference wins, but a name that actually exists
    /// in the database beats one that does not.
    fn resolve_mesh_target(
        &self,
        resolver: &Resolver<'_>,
        relative_path: &str,
        separated_path: &str,
        kind: TargetKind,
    ) -> CanonicalName {
        let combined = resolver.resolve(relative_path, kind, self.duplicates);
        let separated =
            resolver.resolve_separated(relative_path, separated_path, kind, self.duplicates);
        let (preferred, other) = if self.settings.meshes.import_separated {
            (separated, combined)
        } else {
            (combined, separated)
        };
        if self.db.try_get(&preferred.full_path).is_some() || other.is_empty() {
            preferred
        } else if self.db.try_get(&other.full_path).is_some() {
            other
        } else {
            preferred
        }
    }

    /// Resolved full path of the material asset, trying the configured kind
    /// first and the other one as fallback.
    fn lookup_material(&self, resolver: &Resolver<'_>, material: &str) -> Option<String> {
        let (first, second) = if self.settings.material_options.create_material_instances {
            (TargetKind::MaterialInstance, TargetKind::Material)
        } else {
            (TargetKind::Material, TargetKind::MaterialInstance)
        };
        for kind in [first, second] {
            let name = resolver.resolve(material, kind, self.duplicates);
            if self.db.try_get(&name.full_path).is_some() {
                return Some(name.full_path);
            }
        }
        None
    }

    fn spawn_light(
        &mut self,
        graph_path: &str,
        actor: &ActorDescriptor,
        class: ActorClass,
        name: &str,
    ) -> Option<NodeId> {
        let kind = match class {
            ActorClass::PointLight => NodeKind::PointLight,
            ActorClass::DirectionalLight => NodeKind::DirectionalLight,
            _ => NodeKind::SpotLight,
        };
        let node = self.graph.create_node(graph_path, kind, name)?;
        let Some(light) = actor.light.as_ref() else {
            return Some(node);
        };
        let lights = &self.settings.lights;
        self.graph.set_node_property(
            node,
            "intensity",
            (light.intensity * lights.intensity_multiplier).to_string(),
        );
        self.graph.set_node_property(node, "color", light.color.clone());
        self.graph.set_node_property(node, "casts_shadows", light.casts_shadows.to_string());
        if kind != NodeKind::DirectionalLight {
            self.graph.set_node_property(
                node,
                "attenuation_radius",
                (light.range * lights.range_multiplier).to_string(),
            );
            self.graph
                .set_node_property(node, "falloff_exponent", lights.falloff_exponent.to_string());
        }
        if kind == NodeKind::SpotLight {
            self.graph.set_node_property(
                node,
                "inner_cone_angle",
                lights.spot_inner_cone_angle.to_string(),
            );
            self.graph.set_node_property(
                node,
                "outer_cone_angle",
                (light.spot_angle * lights.spot_angle_multiplier).to_string(),
            );
        }
        Some(node)
    }

    fn spawn_camera(
        &mut self,
        graph_path: &str,
        actor: &ActorDescriptor,
        name: &str,
    ) -> Option<NodeId> {
        let node = self.graph.create_node(graph_path, NodeKind::Camera, name)?;
        let Some(camera) = actor.camera.as_ref() else {
            return Some(node);
        };
        self.graph.set_node_property(
            node,
            "projection",
            if camera.is_perspective { "perspective" } else { "orthographic" }.to_string(),
        );
        self.graph.set_node_property(node, "field_of_view", camera.field_of_view.to_string());
        self.graph.set_node_property(node, "ortho_width", camera.ortho_size.to_string());
        self.graph.set_node_property(node, "near_clip_plane", camera.near_clip_plane.to_string());
        self.graph.set_node_property(node, "far_clip_plane", camera.far_clip_plane.to_string());
        self.graph.set_node_property(node, "aspect_ratio", camera.aspect_ratio.to_string());
        if camera.is_physical {
            self.graph.set_node_property(node, "focal_length", camera.focal_length.to_string());
            self.graph
                .set_node_property(node, "sensor_width", camera.sensor_size.x.to_string());
            self.graph
                .set_node_property(node, "sensor_height", camera.sensor_size.y.to_string());
        }
        Some(node)
    }

    fn spawn_prefab(
        &mut self,
        graph_path: &str,
        actor: &ActorDescriptor,
        name: &str,
    ) -> Option<NodeId> {
        let resolver = Resolver::new(self.settings);
        let prefab_ref = actor.prefab.clone().unwrap_or_default();
        let prefab =
            resolver.resolve(&prefab_ref.prefab_relative_path, TargetKind::Prefab, self.duplicates);
        if prefab.is_empty() || self.db.try_get(&prefab.full_path).is_none() {
            self.log.warning(format!(
                "Cannot spawn '{}' because prefab asset does not exist: '{}'",
                actor.display_name, prefab.full_path
            ));
            return None;
        }

        let summary = self.graph.mesh_summary(&prefab.full_path);
        match self.flatten.decide(self.settings.scene_options.mesh_spawn_behavior, &summary) {
            FlattenDecision::Keep => {
                let node = self.graph.create_node(graph_path, NodeKind::PrefabInstance, name)?;
                self.graph.set_node_property(node, "prefab", prefab.full_path);
                self.apply_component_overrides(node, &prefab_ref.component_overrides, &resolver);
                Some(node)
            }
            FlattenDecision::Single(mesh) => {
                let node = self.graph.create_node(graph_path, NodeKind::StaticMesh, name)?;
                self.graph.set_node_property(node, "mesh", mesh);
                Some(node)
            }
            FlattenDecision::Grouped(meshes) => {
                // Overrides name components of the instance; a flattened
                // copy has none, so they do not apply here.
                let root = self.graph.create_node(graph_path, NodeKind::Group, name)?;
                for (index, (mesh, transform)) in meshes.into_iter().enumerate() {
                    let child_name = format!("{name}_Mesh_{index}");
                    let Some(child) =
                        self.graph.create_node(graph_path, NodeKind::StaticMesh, &child_name)
                    else {
                        continue;
                    };
                    self.graph.set_node_property(child, "mesh", mesh);
                    self.graph.set_transform(child, transform);
                    self.graph.add_tag(child, IMPORT_TAG);
                    self.graph.attach_child(root, child);
                }
                Some(root)
            }
        }
    }
}

impl<'a, D: AssetDatabase, G: GraphBackend> GraphBuilder<'a, D, G> {
    /// Per-component mesh/material/animation replacements a scene actor
    /// carries for one prefab instance, recorded as `<component>.<field>`
    /// properties on the instance node.
    fn apply_component_overrides(
        &mut self,
        node: NodeId,
        overrides: &[ComponentOverride],
        resolver: &Resolver<'_>,
    ) {
        for component in overrides {
            if component.component_name.is_empty() {
                continue;
            }
            let key = &component.component_name;

            let mut mesh = CanonicalName::empty();
            if !component.mesh_relative_path.is_empty() {
                mesh = self.resolve_mesh_target(
                    resolver,
                    &component.mesh_relative_path,
                    &component.mesh_relative_path_if_separated,
                    TargetKind::StaticMesh,
                );
                if self.db.try_get(&mesh.full_path).is_some() {
                    self.graph
                        .set_node_property(node, &format!("{key}.mesh"), mesh.full_path.clone());
                } else {
                    self.log.warning(format!(
                        "Cannot override component '{key}' because mesh does not exist: '{}'",
                        mesh.full_path
                    ));
                }
            }

            for (index, material) in component.material_relative_paths.iter().enumerate() {
                if material.is_empty() {
                    continue;
                }
                match self.lookup_material(resolver, material) {
                    Some(path) => self.graph.set_node_property(
                        node,
                        &format!("{key}.material_{index}"),
                        path,
                    ),
                    None => self.log.warning(format!(
                        "Failed to assign material because it does not exist: '{material}'"
                    )),
                }
            }

            if let Some(animation) = component.animation_relative_paths.first() {
                let anim = resolver.resolve(animation, TargetKind::Animation, self.duplicates);
                if !anim.is_empty() && !mesh.is_empty() {
                    let custom =
                        format!("{}/{}_{}", anim.directory, mesh.base_name, anim.base_name);
                    if self.db.try_get(&custom).is_some() {
                        self.graph.set_node_property(node, &format!("{key}.animation"), custom);
                    } else {
                        self.log.warning(format!(
                            "Failed to assign animation because it does not exist: '{custom}'"
                        ));
                    }
                }
            }
        }
    }
}

/// Discard nodes left behind by a previous import of `graph_path` so a
/// re-run converges instead of accumulating duplicates.
pub fn clear_previous_import<G: GraphBackend>(graph: &mut G, graph_path: &str) {
    for node in graph.nodes_tagged(graph_path, IMPORT_TAG) {
        graph.delete_node(node);
    }
}

/// A base name like "Crate_LOD1" is a pre-baked level of detail, not a real
/// mesh; only LOD0 spawns.
pub fn is_secondary_lod(base_name: &str) -> bool {
    let Some((_, tail)) = base_name.rsplit_once("_LOD") else {
        return false;
    };
    !tail.is_empty() && tail.chars().all(|ch| ch.is_ascii_digit()) && tail != "0"
}
