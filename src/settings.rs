use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::database::TargetKind;

/// How the importer treats a descriptor whose target asset may or may not
/// already exist in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingBehavior {
    /// Create when absent, reimport when present.
    #[default]
    AlwaysProcess,
    /// Reimport only when an asset already exists at the target path.
    UpdateExisting,
    /// Create when absent, leave an existing asset untouched.
    SkipExisting,
    /// Drain the queue without touching the database.
    DoNotProcess,
}

impl ProcessingBehavior {
    pub fn label(self) -> &'static str {
        match self {
            ProcessingBehavior::AlwaysProcess => "Always Process",
            ProcessingBehavior::UpdateExisting => "Update Existing",
            ProcessingBehavior::SkipExisting => "Skip Existing",
            ProcessingBehavior::DoNotProcess => "Do Not Process",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SavingBehavior {
    /// Bulk-persist every `saving_interval` successfully processed items.
    #[default]
    SaveEveryInterval,
    SaveAtEnd,
    PromptAtEnd,
}

impl SavingBehavior {
    pub fn label(self) -> &'static str {
        match self {
            SavingBehavior::SaveEveryInterval => "Save Every Interval",
            SavingBehavior::SaveAtEnd => "Save At End",
            SavingBehavior::PromptAtEnd => "Prompt At End",
        }
    }
}

/// Scene actors that reference a prefab can be spawned as the prefab
/// instance itself or flattened into bare mesh nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MeshSpawnBehavior {
    #[default]
    AllPrefab,
    AllStaticMesh,
    StaticMeshIfAloneInPrefab,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FindReplaceRule {
    pub find: String,
    pub replace: String,
}

/// Renaming applied by the path resolver. One policy per asset kind,
/// embedded by value.
#[derive(Debug, Clone, Deserialize)]
pub struct RenamePolicy {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default = "RenamePolicy::default_duplicate_suffix")]
    pub duplicate_suffix: String,
    #[serde(default = "RenamePolicy::default_auto_rename")]
    pub auto_rename_duplicates: bool,
    #[serde(default)]
    pub find_and_replace: Vec<FindReplaceRule>,
}

impl RenamePolicy {
    fn default_duplicate_suffix() -> String {
        "_2".to_string()
    }

    const fn default_auto_rename() -> bool {
        true
    }
}

impl Default for RenamePolicy {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            duplicate_suffix: Self::default_duplicate_suffix(),
            auto_rename_duplicates: Self::default_auto_rename(),
            find_and_replace: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KindSettings {
    #[serde(default)]
    pub behavior: ProcessingBehavior,
    #[serde(default)]
    pub rename: RenamePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeshSettings {
    /// Import each submesh as its own asset instead of one combined mesh.
    #[serde(default)]
    pub import_separated: bool,
    #[serde(default)]
    pub generate_lods: bool,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self { import_separated: false, generate_lods: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialSettings {
    /// Derive an instance from a shared parent material instead of creating
    /// a standalone material per descriptor.
    #[serde(default)]
    pub create_material_instances: bool,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self { create_material_instances: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightSettings {
    #[serde(default = "LightSettings::default_intensity_multiplier")]
    pub intensity_multiplier: f32,
    #[serde(default = "LightSettings::default_range_multiplier")]
    pub range_multiplier: f32,
    #[serde(default = "LightSettings::default_falloff_exponent")]
    pub falloff_exponent: f32,
    #[serde(default = "LightSettings::default_spot_inner_cone_angle")]
    pub spot_inner_cone_angle: f32,
    #[serde(default = "LightSettings::default_spot_angle_multiplier")]
    pub spot_angle_multiplier: f32,
    #[serde(default = "LightSettings::default_sky_light_intensity")]
    pub sky_light_intensity: f32,
}

impl LightSettings {
    const fn default_intensity_multiplier() -> f32 {
        1.0
    }

    const fn default_range_multiplier() -> f32 {
        1.0
    }

    const fn default_falloff_exponent() -> f32 {
        2.0
    }

    const fn default_spot_inner_cone_angle() -> f32 {
        0.0
    }

    const fn default_spot_angle_multiplier() -> f32 {
        1.0
    }

    const fn default_sky_light_intensity() -> f32 {
        1.0
    }
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            intensity_multiplier: Self::default_intensity_multiplier(),
            range_multiplier: Self::default_range_multiplier(),
            falloff_exponent: Self::default_falloff_exponent(),
            spot_inner_cone_angle: Self::default_spot_inner_cone_angle(),
            spot_angle_multiplier: Self::default_spot_angle_multiplier(),
            sky_light_intensity: Self::default_sky_light_intensity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneOptions {
    #[serde(default)]
    pub mesh_spawn_behavior: MeshSpawnBehavior,
    #[serde(default)]
    pub spawn_sky_light: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self { mesh_spawn_behavior: MeshSpawnBehavior::default(), spawn_sky_light: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportSettings {
    /// An asset of the wrong kind sitting at a target path is deleted before
    /// import when set; otherwise the item is skipped with a warning.
    #[serde(default)]
    pub delete_invalid_assets: bool,
    #[serde(default)]
    pub saving_behavior: SavingBehavior,
    #[serde(default = "ImportSettings::default_saving_interval")]
    pub saving_interval: usize,
    #[serde(default)]
    pub textures: KindSettings,
    #[serde(default)]
    pub materials: KindSettings,
    #[serde(default)]
    pub material_instances: KindSettings,
    #[serde(default)]
    pub static_meshes: KindSettings,
    #[serde(default)]
    pub skeletal_meshes: KindSettings,
    #[serde(default)]
    pub animations: KindSettings,
    #[serde(default)]
    pub prefabs: KindSettings,
    #[serde(default)]
    pub scenes: KindSettings,
    #[serde(default)]
    pub meshes: MeshSettings,
    #[serde(default)]
    pub material_options: MaterialSettings,
    #[serde(default)]
    pub lights: LightSettings,
    #[serde(default)]
    pub scene_options: SceneOptions,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            delete_invalid_assets: false,
            saving_behavior: SavingBehavior::default(),
            saving_interval: Self::default_saving_interval(),
            textures: KindSettings::default(),
            materials: KindSettings::default(),
            material_instances: KindSettings::default(),
            static_meshes: KindSettings::default(),
            skeletal_meshes: KindSettings::default(),
            animations: KindSettings::default(),
            prefabs: KindSettings::default(),
            scenes: KindSettings::default(),
            meshes: MeshSettings::default(),
            material_options: MaterialSettings::default(),
            lights: LightSettings::default(),
            scene_options: SceneOptions::default(),
        }
    }
}

impl ImportSettings {
    const fn default_saving_interval() -> usize {
        100
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read import settings {}", path.display()))?;
        let settings = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse import settings {}", path.display()))?;
        Ok(settings)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("[import] settings load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn kind_settings(&self, kind: TargetKind) -> &KindSettings {
        match kind {
            TargetKind::Texture => &self.textures,
            TargetKind::Material => &self.materials,
            TargetKind::MaterialInstance => &self.material_instances,
            TargetKind::StaticMesh => &self.static_meshes,
            TargetKind::SkeletalMesh => &self.skeletal_meshes,
            TargetKind::Animation => &self.animations,
            TargetKind::Prefab => &self.prefabs,
            TargetKind::Scene => &self.scenes,
        }
    }

    /// Flat key/value dump for the import log header. Explicit and versioned
    /// by hand; no runtime introspection.
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("delete_invalid_assets".to_string(), self.delete_invalid_assets.to_string()),
            ("saving_behavior".to_string(), self.saving_behavior.label().to_string()),
            ("saving_interval".to_string(), self.saving_interval.to_string()),
            ("meshes.import_separated".to_string(), self.meshes.import_separated.to_string()),
            ("meshes.generate_lods".to_string(), self.meshes.generate_lods.to_string()),
            (
                "material_options.create_material_instances".to_string(),
                self.material_options.create_material_instances.to_string(),
            ),
            (
                "scene_options.mesh_spawn_behavior".to_string(),
                format!("{:?}", self.scene_options.mesh_spawn_behavior),
            ),
            ("scene_options.spawn_sky_light".to_string(), self.scene_options.spawn_sky_light.to_string()),
            ("lights.intensity_multiplier".to_string(), self.lights.intensity_multiplier.to_string()),
            ("lights.range_multiplier".to_string(), self.lights.range_multiplier.to_string()),
        ];
        for (name, kind) in [
            ("textures", &self.textures),
            ("materials", &self.materials),
            ("material_instances", &self.material_instances),
            ("static_meshes", &self.static_meshes),
            ("skeletal_meshes", &self.skeletal_meshes),
            ("animations", &self.animations),
            ("prefabs", &self.prefabs),
            ("scenes", &self.scenes),
        ] {
            out.push((format!("{name}.behavior"), kind.behavior.label().to_string()));
            if !kind.rename.prefix.is_empty() {
                out.push((format!("{name}.rename.prefix"), kind.rename.prefix.clone()));
            }
            if !kind.rename.suffix.is_empty() {
                out.push((format!("{name}.rename.suffix"), kind.rename.suffix.clone()));
            }
            out.push((
                format!("{name}.rename.auto_rename_duplicates"),
                kind.rename.auto_rename_duplicates.to_string(),
            ));
        }
        out
    }
}
