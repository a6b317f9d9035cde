use std::collections::BTreeSet;

use crate::database::TargetKind;
use crate::payload::ExportPayload;
use crate::resolve::Resolver;
use crate::settings::ImportSettings;

/// Source paths whose canonical name collides with an earlier entity's.
///
/// Keyed by the source-relative path so that of two colliding entities
/// exactly one — the one seen later in scan order — receives the
/// disambiguation suffix, and re-running the scan reproduces the same
/// assignment.
#[derive(Debug, Clone, Default)]
pub struct DuplicateSet {
    marked: BTreeSet<String>,
}

impl DuplicateSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, source_path: impl Into<String>) {
        self.marked.insert(source_path.into());
    }

    pub fn is_marked(&self, source_path: &str) -> bool {
        self.marked.contains(source_path)
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.marked.iter().map(String::as_str)
    }
}

/// One pass over the whole payload, before any asset is created, so the
/// duplicate set is stable for the entire run. Renaming is opt-in per kind.
pub fn scan_for_duplicates(payload: &ExportPayload, settings: &ImportSettings) -> DuplicateSet {
    let resolver = Resolver::new(settings);
    let empty = DuplicateSet::empty();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut duplicates = DuplicateSet::empty();

    let mut visit = |source_path: &str, kind: TargetKind, duplicates: &mut DuplicateSet| {
        let name = resolver.resolve(source_path, kind, &empty);
        if name.is_empty() {
            return;
        }
        if !seen.insert(name.full_path) {
            duplicates.mark(source_path);
        }
    };

    if settings.scenes.rename.auto_rename_duplicates {
        for scene in &payload.scenes {
            visit(&scene.relative_path, TargetKind::Scene, &mut duplicates);
        }
    }
    for mesh in &payload.meshes {
        let kind = if mesh.is_skeletal { TargetKind::SkeletalMesh } else { TargetKind::StaticMesh };
        if settings.kind_settings(kind).rename.auto_rename_duplicates {
            visit(&mesh.relative_path, kind, &mut duplicates);
        }
    }
    if settings.animations.rename.auto_rename_duplicates {
        for animation in &payload.animations {
            visit(&animation.relative_path, TargetKind::Animation, &mut duplicates);
        }
    }
    if settings.materials.rename.auto_rename_duplicates {
        for material in &payload.materials {
            visit(&material.relative_path, TargetKind::Material, &mut duplicates);
        }
    }
    if settings.textures.rename.auto_rename_duplicates {
        for texture in &payload.textures {
            visit(&texture.relative_path, TargetKind::Texture, &mut duplicates);
        }
    }
    if settings.prefabs.rename.auto_rename_duplicates {
        for prefab in &payload.prefabs_first_pass {
            visit(&prefab.relative_path, TargetKind::Prefab, &mut duplicates);
        }
    }

    duplicates
}
