use glam::{Quat, Vec3};
use uuid::Uuid;

use crate::resolve::CanonicalName;

/// Concrete asset kind as the target engine's database sees it. Distinct
/// from the scheduler's processing stages: one stage may produce several of
/// these (meshes split into static and skeletal), and material instances
/// share a stage with materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetKind {
    Texture,
    Material,
    MaterialInstance,
    StaticMesh,
    SkeletalMesh,
    Animation,
    Prefab,
    Scene,
}

impl TargetKind {
    pub fn label(self) -> &'static str {
        match self {
            TargetKind::Texture => "Texture",
            TargetKind::Material => "Material",
            TargetKind::MaterialInstance => "Material Instance",
            TargetKind::StaticMesh => "Static Mesh",
            TargetKind::SkeletalMesh => "Skeletal Mesh",
            TargetKind::Animation => "Animation",
            TargetKind::Prefab => "Prefab",
            TargetKind::Scene => "Scene",
        }
    }
}

/// Opaque handle into the asset database. Assets are re-found by canonical
/// path on every access; the handle never outlives one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetHandle(Uuid);

impl AssetHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind-specific knobs passed through to the binary import backend.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub combine_submeshes: bool,
    /// Import only the named submesh out of the source file.
    pub specific_submesh: Option<String>,
    pub import_translation: Vec3,
    pub import_rotation: Quat,
    pub import_uniform_scale: f32,
    /// Honor the unit scale baked into the source file instead of the
    /// uniform scale above.
    pub use_source_file_scale: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            combine_submeshes: true,
            specific_submesh: None,
            import_translation: Vec3::ZERO,
            import_rotation: Quat::IDENTITY,
            import_uniform_scale: 1.0,
            use_source_file_scale: false,
        }
    }
}

/// Named material slot on an imported mesh asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotNames {
    pub imported_name: String,
    pub current_name: String,
}

impl SlotNames {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { imported_name: name.clone(), current_name: name }
    }
}

/// Narrow seam over the target engine's asset database. Lookup is by
/// canonical path string on purpose: re-deriving the path and asking the
/// database again is what makes re-imports converge instead of accumulating
/// duplicates.
pub trait AssetDatabase {
    fn try_get(&self, path: &str) -> Option<AssetHandle>;
    fn kind_of(&self, handle: AssetHandle) -> Option<TargetKind>;
    fn delete(&mut self, handle: AssetHandle) -> bool;
    /// Create the asset at `name`, or reimport over it when it already
    /// exists. Returns `None` when the backend refused the import.
    fn create_or_update(
        &mut self,
        source_file: &str,
        name: &CanonicalName,
        kind: TargetKind,
        options: &ImportOptions,
    ) -> Option<AssetHandle>;
    /// Attach an arbitrary key/value to an asset (material parameters,
    /// texture bindings, associated animation names).
    fn set_asset_property(&mut self, handle: AssetHandle, key: &str, value: String);
    fn slot_names(&self, handle: AssetHandle) -> Vec<SlotNames>;
    fn assign_slot_material(&mut self, handle: AssetHandle, slot: usize, material: Option<AssetHandle>);
    /// Bulk save of everything dirty. `prompt` surfaces the host's save
    /// dialog instead of saving silently.
    fn persist_dirty(&mut self, prompt: bool);
}

/// Node identity within a scene or prefab graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    StaticMesh,
    SkeletalMesh,
    PointLight,
    DirectionalLight,
    SpotLight,
    Camera,
    PrefabInstance,
    SkyLight,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Group => "Group",
            NodeKind::StaticMesh => "StaticMesh",
            NodeKind::SkeletalMesh => "SkeletalMesh",
            NodeKind::PointLight => "PointLight",
            NodeKind::DirectionalLight => "DirectionalLight",
            NodeKind::SpotLight => "SpotLight",
            NodeKind::Camera => "Camera",
            NodeKind::PrefabInstance => "PrefabInstance",
            NodeKind::SkyLight => "SkyLight",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NodeTransform {
    pub location: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self { location: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl NodeTransform {
    pub fn is_identity(&self) -> bool {
        const EPSILON: f32 = 1e-4;
        self.location.length() < EPSILON
            && self.rotation.angle_between(Quat::IDENTITY) < EPSILON
            && (self.scale - Vec3::ONE).length() < EPSILON
    }
}

/// Summary of the mesh content of an already-built graph, consulted by the
/// prefab flattening strategy.
#[derive(Debug, Clone, Default)]
pub struct GraphMeshSummary {
    pub mesh_nodes: Vec<(String, NodeTransform)>,
    pub other_node_count: usize,
    pub group_node_count: usize,
}

/// Scene/prefab graph primitives. Graphs are addressed by the canonical
/// path of the owning scene or prefab asset; nodes are created at top level
/// and re-parented through `attach_child`.
pub trait GraphBackend {
    fn create_node(&mut self, graph: &str, kind: NodeKind, name: &str) -> Option<NodeId>;
    fn attach_child(&mut self, parent: NodeId, child: NodeId);
    fn delete_node(&mut self, node: NodeId);
    fn set_transform(&mut self, node: NodeId, transform: NodeTransform);
    fn set_visibility(&mut self, node: NodeId, visible: bool);
    fn set_movable(&mut self, node: NodeId, movable: bool);
    fn add_tag(&mut self, node: NodeId, tag: &str);
    fn set_node_property(&mut self, node: NodeId, key: &str, value: String);
    /// Nodes in `graph` carrying `tag`, in creation order.
    fn nodes_tagged(&self, graph: &str, tag: &str) -> Vec<NodeId>;
    fn mesh_summary(&self, graph: &str) -> GraphMeshSummary;
}
