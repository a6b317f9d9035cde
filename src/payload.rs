use anyhow::{Context, Result};
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parent id sentinel: the actor sits at the top level of its graph.
pub const NO_PARENT: i64 = -1;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vec2Data {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuatData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for QuatData {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

impl Vec3Data {
    pub const fn one() -> Self {
        Self { x: 1.0, y: 1.0, z: 1.0 }
    }
}

impl From<Vec2Data> for Vec2 {
    fn from(value: Vec2Data) -> Self {
        Vec2::new(value.x, value.y)
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(value: Vec3Data) -> Self {
        Vec3::new(value.x, value.y, value.z)
    }
}

impl From<Vec3> for Vec3Data {
    fn from(value: Vec3) -> Self {
        Self { x: value.x, y: value.y, z: value.z }
    }
}

impl From<QuatData> for Quat {
    fn from(value: QuatData) -> Self {
        Quat::from_xyzw(value.x, value.y, value.z, value.w).normalize()
    }
}

impl From<Quat> for QuatData {
    fn from(value: Quat) -> Self {
        Self { x: value.x, y: value.y, z: value.z, w: value.w }
    }
}

/// Capability carried by one exported actor. An actor may carry several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorClass {
    Empty,
    StaticMesh,
    SkeletalMesh,
    PointLight,
    DirectionalLight,
    SpotLight,
    Camera,
    Prefab,
}

impl ActorClass {
    pub fn label(self) -> &'static str {
        match self {
            ActorClass::Empty => "Empty",
            ActorClass::StaticMesh => "StaticMesh",
            ActorClass::SkeletalMesh => "SkeletalMesh",
            ActorClass::PointLight => "PointLight",
            ActorClass::DirectionalLight => "DirectionalLight",
            ActorClass::SpotLight => "SpotLight",
            ActorClass::Camera => "Camera",
            ActorClass::Prefab => "Prefab",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshReference {
    #[serde(default)]
    pub mesh_relative_path: String,
    #[serde(default)]
    pub mesh_relative_path_if_separated: String,
    #[serde(default)]
    pub material_relative_paths: Vec<String>,
    #[serde(default)]
    pub animation_relative_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentOverride {
    pub component_name: String,
    #[serde(default)]
    pub mesh_relative_path: String,
    #[serde(default)]
    pub mesh_relative_path_if_separated: String,
    #[serde(default)]
    pub material_relative_paths: Vec<String>,
    #[serde(default)]
    pub animation_relative_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrefabReference {
    pub prefab_relative_path: String,
    #[serde(default)]
    pub component_overrides: Vec<ComponentOverride>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Point,
    Directional,
    Spot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightProperties {
    pub kind: LightKind,
    /// RRGGBB hex, no leading '#'.
    pub color: String,
    pub intensity: f32,
    #[serde(default)]
    pub range: f32,
    #[serde(default)]
    pub spot_angle: f32,
    #[serde(default)]
    pub casts_shadows: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraProperties {
    pub is_perspective: bool,
    #[serde(default)]
    pub is_physical: bool,
    pub field_of_view: f32,
    #[serde(default)]
    pub ortho_size: f32,
    pub near_clip_plane: f32,
    pub far_clip_plane: f32,
    pub aspect_ratio: f32,
    #[serde(default)]
    pub focal_length: f32,
    #[serde(default)]
    pub sensor_size: Vec2Data,
}

/// One entity of a scene or prefab graph. `parent_id` is a reference, not
/// ownership, and may dangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorDescriptor {
    pub id: i64,
    #[serde(default = "default_parent_id")]
    pub parent_id: i64,
    pub display_name: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default = "default_true")]
    pub is_movable: bool,
    #[serde(default)]
    pub world_location: Vec3Data,
    #[serde(default)]
    pub world_rotation: QuatData,
    #[serde(default = "Vec3Data::one")]
    pub world_scale: Vec3Data,
    #[serde(default)]
    pub relative_location: Vec3Data,
    #[serde(default)]
    pub relative_rotation: QuatData,
    #[serde(default = "Vec3Data::one")]
    pub relative_scale: Vec3Data,
    pub classes: Vec<ActorClass>,
    #[serde(default)]
    pub mesh: Option<MeshReference>,
    #[serde(default)]
    pub prefab: Option<PrefabReference>,
    #[serde(default)]
    pub light: Option<LightProperties>,
    #[serde(default)]
    pub camera: Option<CameraProperties>,
}

fn default_parent_id() -> i64 {
    NO_PARENT
}

fn default_tag() -> String {
    "Untagged".to_string()
}

fn default_true() -> bool {
    true
}

impl ActorDescriptor {
    pub fn new(id: i64, parent_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            display_name: display_name.into(),
            tag: default_tag(),
            is_visible: true,
            is_movable: true,
            world_location: Vec3Data::default(),
            world_rotation: QuatData::default(),
            world_scale: Vec3Data::one(),
            relative_location: Vec3Data::default(),
            relative_rotation: QuatData::default(),
            relative_scale: Vec3Data::one(),
            classes: Vec::new(),
            mesh: None,
            prefab: None,
            light: None,
            camera: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmeshDescriptor {
    pub name: String,
    #[serde(default)]
    pub relative_path_if_separated: String,
    #[serde(default)]
    pub material_relative_paths: Vec<String>,
    #[serde(default)]
    pub world_location: Vec3Data,
    #[serde(default)]
    pub world_rotation: QuatData,
    #[serde(default = "Vec3Data::one")]
    pub world_scale: Vec3Data,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshDescriptor {
    pub name: String,
    pub relative_path: String,
    #[serde(default)]
    pub relative_path_if_separated: String,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub is_skeletal: bool,
    #[serde(default)]
    pub submeshes: Vec<SubmeshDescriptor>,
    #[serde(default)]
    pub import_position_offset: Vec3Data,
    #[serde(default)]
    pub import_rotation_offset: QuatData,
    #[serde(default = "Vec3Data::one")]
    pub import_scale_offset: Vec3Data,
    #[serde(default = "default_scale_factor")]
    pub import_scale_factor: f32,
    #[serde(default)]
    pub use_file_scale: bool,
}

fn default_scale_factor() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureBinding {
    pub slot: String,
    pub texture_relative_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarBinding {
    pub name: String,
    pub value: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorBinding {
    pub name: String,
    /// RRGGBB hex, no leading '#'.
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    pub name: String,
    pub relative_path: String,
    #[serde(default)]
    pub shader_name: String,
    #[serde(default)]
    pub texture_bindings: Vec<TextureBinding>,
    #[serde(default)]
    pub scalar_bindings: Vec<ScalarBinding>,
    #[serde(default)]
    pub color_bindings: Vec<ColorBinding>,
    #[serde(default)]
    pub is_transparent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureDescriptor {
    pub name: String,
    pub relative_path: String,
    #[serde(default)]
    pub source_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationDescriptor {
    pub name: String,
    pub relative_path: String,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub skeletal_mesh_relative_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDescriptor {
    pub name: String,
    pub relative_path: String,
    #[serde(default)]
    pub actors: Vec<ActorDescriptor>,
    #[serde(default)]
    pub has_any_static_actor: bool,
}

/// Shell creation pass: the prefab asset must exist before anything can
/// reference it, including other prefabs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefabFirstPass {
    pub name: String,
    pub relative_path: String,
    #[serde(default)]
    pub has_any_static_child: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefabSecondPass {
    pub name: String,
    pub relative_path: String,
    #[serde(default)]
    pub components: Vec<ActorDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportInfo {
    #[serde(default)]
    pub export_name: String,
    #[serde(default)]
    pub exported_at: String,
    #[serde(default)]
    pub source_version: String,
}

/// One full export produced by the source authoring tool. Loaded once per
/// import run and consumed destructively by the scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportPayload {
    #[serde(default)]
    pub info: ExportInfo,
    #[serde(default)]
    pub scenes: Vec<SceneDescriptor>,
    #[serde(default)]
    pub meshes: Vec<MeshDescriptor>,
    #[serde(default)]
    pub materials: Vec<MaterialDescriptor>,
    #[serde(default)]
    pub textures: Vec<TextureDescriptor>,
    #[serde(default)]
    pub animations: Vec<AnimationDescriptor>,
    #[serde(default)]
    pub prefabs_first_pass: Vec<PrefabFirstPass>,
    #[serde(default)]
    pub prefabs_second_pass: Vec<PrefabSecondPass>,
}

impl ExportPayload {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read export payload {}", path.display()))?;
        let payload = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse export payload {}", path.display()))?;
        Ok(payload)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self)
            .context("Failed to serialize export payload")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write export payload {}", path.display()))?;
        Ok(())
    }

    pub fn total_items(&self) -> usize {
        self.scenes.len()
            + self.meshes.len()
            + self.materials.len()
            + self.textures.len()
            + self.animations.len()
            + self.prefabs_first_pass.len()
            + self.prefabs_second_pass.len()
    }
}
