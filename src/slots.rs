use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::database::{SlotNames, TargetKind};
use crate::duplicates::DuplicateSet;
use crate::resolve::{Resolver, FBX_MATERIAL_SUFFIX};
use crate::settings::ImportSettings;

/// Result of matching ordered source material references against a mesh's
/// named slots. `per_slot` has one entry per engine slot; `unmatched` holds
/// source refs that found no slot (more materials than slots).
#[derive(Debug, Clone, Default)]
pub struct SlotAssignment {
    pub per_slot: Vec<Option<String>>,
    pub unmatched: Vec<String>,
}

fn stripped_slot_name(
    material: &str,
    kind: TargetKind,
    settings: &ImportSettings,
    resolver: &Resolver<'_>,
    duplicates: &DuplicateSet,
) -> String {
    let policy = &settings.kind_settings(kind).rename;
    let mut name = resolver.resolve(material, kind, duplicates).base_name;
    if !policy.prefix.is_empty() {
        if let Some(rest) = name.strip_prefix(&policy.prefix) {
            name = rest.to_string();
        }
    }
    if !policy.duplicate_suffix.is_empty() {
        if let Some(rest) = name.strip_suffix(&policy.duplicate_suffix) {
            name = rest.to_string();
        }
    }
    if !policy.suffix.is_empty() {
        if let Some(rest) = name.strip_suffix(&policy.suffix) {
            name = rest.to_string();
        }
    }
    if let Some(rest) = name.strip_suffix(FBX_MATERIAL_SUFFIX) {
        name = rest.to_string();
    }
    name
}

/// Greedy three-round matcher. Each round runs to completion across all
/// materials before the next begins, so an exact match can never lose its
/// slot to an earlier substring match.
pub fn match_slots(
    materials: &[String],
    slots: &[SlotNames],
    settings: &ImportSettings,
    duplicates: &DuplicateSet,
) -> SlotAssignment {
    let resolver = Resolver::new(settings);
    let mut matched: BTreeSet<usize> = BTreeSet::new();
    let mut slot_to_material: BTreeMap<usize, String> = BTreeMap::new();

    // Round 1: exact name equality against the slot's imported or current
    // name, with the rename decorations stripped from the source side.
    for (idx, material) in materials.iter().enumerate() {
        if matched.contains(&idx) {
            continue;
        }
        'kinds: for kind in [TargetKind::Material, TargetKind::MaterialInstance] {
            let name = stripped_slot_name(material, kind, settings, &resolver, duplicates);
            if name.is_empty() {
                continue;
            }
            for (slot_idx, slot) in slots.iter().enumerate() {
                if slot_to_material.contains_key(&slot_idx) {
                    continue;
                }
                if slot.imported_name == name || slot.current_name == name {
                    slot_to_material.insert(slot_idx, material.clone());
                    matched.insert(idx);
                    break 'kinds;
                }
            }
        }
    }

    // Round 2: slot name need only contain the stripped source name; covers
    // engine auto-renaming like trailing numeric suffixes.
    for (idx, material) in materials.iter().enumerate() {
        if matched.contains(&idx) {
            continue;
        }
        'kinds: for kind in [TargetKind::Material, TargetKind::MaterialInstance] {
            let name = stripped_slot_name(material, kind, settings, &resolver, duplicates);
            if name.is_empty() {
                continue;
            }
            for (slot_idx, slot) in slots.iter().enumerate() {
                if slot_to_material.contains_key(&slot_idx) {
                    continue;
                }
                if slot.imported_name.contains(&name) || slot.current_name.contains(&name) {
                    slot_to_material.insert(slot_idx, material.clone());
                    matched.insert(idx);
                    break 'kinds;
                }
            }
        }
    }

    // Round 3: positional fallback, index order on both sides.
    let mut unmatched = Vec::new();
    for (idx, material) in materials.iter().enumerate() {
        if matched.contains(&idx) {
            continue;
        }
        let free_slot = (0..slots.len()).find(|slot_idx| !slot_to_material.contains_key(slot_idx));
        match free_slot {
            Some(slot_idx) => {
                slot_to_material.insert(slot_idx, material.clone());
                matched.insert(idx);
            }
            None => unmatched.push(material.clone()),
        }
    }

    let per_slot = (0..slots.len()).map(|idx| slot_to_material.remove(&idx)).collect();
    SlotAssignment { per_slot, unmatched }
}
