//! In-memory stand-ins for the engine collaborators, used by the test suite
//! and by headless dry runs. They record everything the importer does so
//! assertions can inspect the resulting asset set and node trees.

use std::collections::{BTreeMap, BTreeSet};

use crate::database::{
    AssetDatabase, AssetHandle, GraphBackend, GraphMeshSummary, ImportOptions, NodeId, NodeKind,
    NodeTransform, SlotNames, TargetKind,
};
use crate::resolve::CanonicalName;

#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub path: String,
    pub kind: TargetKind,
    pub source_file: String,
    pub import_count: usize,
    pub properties: BTreeMap<String, String>,
    pub slots: Vec<SlotNames>,
    pub slot_materials: Vec<Option<AssetHandle>>,
    pub options: ImportOptions,
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    by_path: BTreeMap<String, AssetHandle>,
    records: BTreeMap<AssetHandle, AssetRecord>,
    persist_calls: Vec<bool>,
    pending_slots: BTreeMap<String, Vec<SlotNames>>,
    fail_paths: BTreeSet<String>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot names the backend will report for the mesh imported at `path`.
    pub fn seed_slots(&mut self, path: impl Into<String>, slot_names: &[&str]) {
        self.pending_slots
            .insert(path.into(), slot_names.iter().map(|name| SlotNames::new(*name)).collect());
    }

    /// Pre-create an asset, as if a previous run or the user had made it.
    pub fn seed_asset(&mut self, path: impl Into<String>, kind: TargetKind) -> AssetHandle {
        let path = path.into();
        let handle = AssetHandle::new();
        self.records.insert(
            handle,
            AssetRecord {
                path: path.clone(),
                kind,
                source_file: String::new(),
                import_count: 0,
                properties: BTreeMap::new(),
                slots: Vec::new(),
                slot_materials: Vec::new(),
                options: ImportOptions::default(),
            },
        );
        self.by_path.insert(path, handle);
        handle
    }

    /// Simulate the binary backend refusing to import at `path`.
    pub fn fail_imports_at(&mut self, path: impl Into<String>) {
        self.fail_paths.insert(path.into());
    }

    pub fn record(&self, path: &str) -> Option<&AssetRecord> {
        self.by_path.get(path).and_then(|handle| self.records.get(handle))
    }

    pub fn record_of(&self, handle: AssetHandle) -> Option<&AssetRecord> {
        self.records.get(&handle)
    }

    pub fn asset_paths(&self) -> Vec<String> {
        self.by_path.keys().cloned().collect()
    }

    pub fn asset_count(&self) -> usize {
        self.records.len()
    }

    pub fn persist_calls(&self) -> &[bool] {
        &self.persist_calls
    }
}

impl AssetDatabase for MemoryDatabase {
    fn try_get(&self, path: &str) -> Option<AssetHandle> {
        self.by_path.get(path).copied()
    }

    fn kind_of(&self, handle: AssetHandle) -> Option<TargetKind> {
        self.records.get(&handle).map(|record| record.kind)
    }

    fn delete(&mut self, handle: AssetHandle) -> bool {
        if let Some(record) = self.records.remove(&handle) {
            self.by_path.remove(&record.path);
            true
        } else {
            false
        }
    }

    fn create_or_update(
        &mut self,
        source_file: &str,
        name: &CanonicalName,
        kind: TargetKind,
        options: &ImportOptions,
    ) -> Option<AssetHandle> {
        if self.fail_paths.contains(&name.full_path) {
            return None;
        }
        let slots = self.pending_slots.get(&name.full_path).cloned().unwrap_or_default();
        if let Some(&handle) = self.by_path.get(&name.full_path) {
            let record = self.records.get_mut(&handle)?;
            record.import_count += 1;
            record.source_file = source_file.to_string();
            record.options = options.clone();
            if !slots.is_empty() {
                record.slot_materials = vec![None; slots.len()];
                record.slots = slots;
            }
            return Some(handle);
        }
        let handle = AssetHandle::new();
        let slot_materials = vec![None; slots.len()];
        self.records.insert(
            handle,
            AssetRecord {
                path: name.full_path.clone(),
                kind,
                source_file: source_file.to_string(),
                import_count: 1,
                properties: BTreeMap::new(),
                slots,
                slot_materials,
                options: options.clone(),
            },
        );
        self.by_path.insert(name.full_path.clone(), handle);
        Some(handle)
    }

    fn set_asset_property(&mut self, handle: AssetHandle, key: &str, value: String) {
        if let Some(record) = self.records.get_mut(&handle) {
            record.properties.insert(key.to_string(), value);
        }
    }

    fn slot_names(&self, handle: AssetHandle) -> Vec<SlotNames> {
        self.records.get(&handle).map(|record| record.slots.clone()).unwrap_or_default()
    }

    fn assign_slot_material(&mut self, handle: AssetHandle, slot: usize, material: Option<AssetHandle>) {
        if let Some(record) = self.records.get_mut(&handle) {
            if slot < record.slot_materials.len() {
                record.slot_materials[slot] = material;
            }
        }
    }

    fn persist_dirty(&mut self, prompt: bool) {
        self.persist_calls.push(prompt);
    }
}

#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub id: NodeId,
    pub graph: String,
    pub kind: NodeKind,
    pub name: String,
    pub parent: Option<NodeId>,
    pub tags: Vec<String>,
    pub transform: NodeTransform,
    pub visible: bool,
    pub movable: bool,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: BTreeMap<NodeId, NodeRecord>,
    order: Vec<NodeId>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    /// Nodes of one graph in creation order.
    pub fn nodes_in(&self, graph: &str) -> Vec<&NodeRecord> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|record| record.graph == graph)
            .collect()
    }

    pub fn find_by_name(&self, graph: &str, name: &str) -> Option<&NodeRecord> {
        self.nodes_in(graph).into_iter().find(|record| record.name == name)
    }

    pub fn children_of(&self, parent: NodeId) -> Vec<&NodeRecord> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|record| record.parent == Some(parent))
            .collect()
    }

    pub fn top_level_of(&self, graph: &str) -> Vec<&NodeRecord> {
        self.nodes_in(graph).into_iter().filter(|record| record.parent.is_none()).collect()
    }
}

impl GraphBackend for MemoryGraph {
    fn create_node(&mut self, graph: &str, kind: NodeKind, name: &str) -> Option<NodeId> {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            NodeRecord {
                id,
                graph: graph.to_string(),
                kind,
                name: name.to_string(),
                parent: None,
                tags: Vec::new(),
                transform: NodeTransform::default(),
                visible: true,
                movable: true,
                properties: BTreeMap::new(),
            },
        );
        self.order.push(id);
        Some(id)
    }

    fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(record) = self.nodes.get_mut(&child) {
            record.parent = Some(parent);
        }
    }

    fn delete_node(&mut self, node: NodeId) {
        let children: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|record| record.parent == Some(node))
            .map(|record| record.id)
            .collect();
        for child in children {
            self.delete_node(child);
        }
        self.nodes.remove(&node);
        self.order.retain(|id| *id != node);
    }

    fn set_transform(&mut self, node: NodeId, transform: NodeTransform) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.transform = transform;
        }
    }

    fn set_visibility(&mut self, node: NodeId, visible: bool) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.visible = visible;
        }
    }

    fn set_movable(&mut self, node: NodeId, movable: bool) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.movable = movable;
        }
    }

    fn add_tag(&mut self, node: NodeId, tag: &str) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.tags.push(tag.to_string());
        }
    }

    fn set_node_property(&mut self, node: NodeId, key: &str, value: String) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.properties.insert(key.to_string(), value);
        }
    }

    fn nodes_tagged(&self, graph: &str, tag: &str) -> Vec<NodeId> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|record| record.graph == graph && record.tags.iter().any(|t| t == tag))
            .map(|record| record.id)
            .collect()
    }

    fn mesh_summary(&self, graph: &str) -> GraphMeshSummary {
        let mut summary = GraphMeshSummary::default();
        for record in self.nodes_in(graph) {
            match record.kind {
                NodeKind::StaticMesh | NodeKind::SkeletalMesh => {
                    let mesh = record.properties.get("mesh").cloned().unwrap_or_default();
                    summary.mesh_nodes.push((mesh, record.transform));
                }
                NodeKind::Group => summary.group_node_count += 1,
                _ => summary.other_node_count += 1,
            }
        }
        summary
    }
}
