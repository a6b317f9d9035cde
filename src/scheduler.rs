//! Staged import scheduler. One export payload becomes one [`ImportJob`]
//! that the host drives item by item: kinds run in dependency order, each
//! `step` processes exactly one item, and cancellation only ever lands on an
//! item boundary so the database is never left mid-write.

use std::collections::VecDeque;

use crate::database::{AssetDatabase, GraphBackend};
use crate::duplicates::{self, DuplicateSet};
use crate::graph::{DefaultFlatten, FlattenStrategy};
use crate::log::ImportLog;
use crate::payload::{
    AnimationDescriptor, ExportPayload, MaterialDescriptor, MeshDescriptor, PrefabFirstPass,
    PrefabSecondPass, SceneDescriptor, TextureDescriptor,
};
use crate::process;
use crate::settings::{ImportSettings, SavingBehavior};

/// Processing stage, in the order stages run. Each stage only depends on
/// assets produced by earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKind {
    Texture,
    Material,
    Mesh,
    Animation,
    PrefabFirstPass,
    PrefabSecondPass,
    Scene,
}

impl AssetKind {
    pub const ORDER: [AssetKind; 7] = [
        AssetKind::Texture,
        AssetKind::Material,
        AssetKind::Mesh,
        AssetKind::Animation,
        AssetKind::PrefabFirstPass,
        AssetKind::PrefabSecondPass,
        AssetKind::Scene,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Texture => "Textures",
            AssetKind::Material => "Materials",
            AssetKind::Mesh => "Meshes",
            AssetKind::Animation => "Animations",
            AssetKind::PrefabFirstPass => "Prefabs (first pass)",
            AssetKind::PrefabSecondPass => "Prefabs (second pass)",
            AssetKind::Scene => "Scenes",
        }
    }
}

/// Snapshot of how far the job has gotten, for progress bars.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub kind: AssetKind,
    pub kind_processed: usize,
    pub kind_total: usize,
    pub overall_processed: usize,
    pub overall_total: usize,
}

impl Progress {
    pub fn overall_percent(&self) -> f32 {
        if self.overall_total == 0 {
            100.0
        } else {
            self.overall_processed as f32 * 100.0 / self.overall_total as f32
        }
    }
}

/// What a single [`ImportJob::step`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One item was processed; more remain.
    Worked(AssetKind),
    /// The last item of a stage was processed.
    StageFinished(AssetKind),
    /// The whole job just completed.
    Finished,
    /// The job stopped at an item boundary after a cancel request.
    Cancelled,
    /// Nothing left to do; the job already finished or was cancelled.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Running,
    Finished,
    Cancelled,
}

/// A resumable import of one export payload. The payload is consumed into
/// per-stage queues up front; the host owns the pacing by calling [`step`]
/// (or [`run_to_completion`]) whenever it has time for one more item.
///
/// [`step`]: ImportJob::step
/// [`run_to_completion`]: ImportJob::run_to_completion
pub struct ImportJob<D: AssetDatabase, G: GraphBackend> {
    settings: ImportSettings,
    duplicates: DuplicateSet,
    db: D,
    graph: G,
    log: ImportLog,
    flatten: Box<dyn FlattenStrategy>,

    textures: VecDeque<TextureDescriptor>,
    materials: VecDeque<MaterialDescriptor>,
    meshes: VecDeque<MeshDescriptor>,
    animations: VecDeque<AnimationDescriptor>,
    prefabs_first: VecDeque<PrefabFirstPass>,
    prefabs_second: VecDeque<PrefabSecondPass>,
    scenes: VecDeque<SceneDescriptor>,

    totals: [usize; 7],
    processed: [usize; 7],
    state: JobState,
    cancel_requested: bool,
    items_since_checkpoint: usize,
}

impl<D: AssetDatabase, G: GraphBackend> ImportJob<D, G> {
    pub fn new(payload: ExportPayload, settings: ImportSettings, db: D, graph: G) -> Self {
        Self::with_log(payload, settings, db, graph, ImportLog::new())
    }

    pub fn with_log(
        payload: ExportPayload,
        settings: ImportSettings,
        db: D,
        graph: G,
        mut log: ImportLog,
    ) -> Self {
        let duplicates = duplicates::scan_for_duplicates(&payload, &settings);
        if !duplicates.is_empty() {
            log.info(format!(
                "{} duplicate asset name(s) will be renamed",
                duplicates.len()
            ));
        }
        let textures: VecDeque<_> = payload.textures.into();
        let materials: VecDeque<_> = payload.materials.into();
        let meshes: VecDeque<_> = payload.meshes.into();
        let animations: VecDeque<_> = payload.animations.into();
        let prefabs_first: VecDeque<_> = payload.prefabs_first_pass.into();
        let prefabs_second: VecDeque<_> = payload.prefabs_second_pass.into();
        let scenes: VecDeque<_> = payload.scenes.into();
        let totals = [
            textures.len(),
            materials.len(),
            meshes.len(),
            animations.len(),
            prefabs_first.len(),
            prefabs_second.len(),
            scenes.len(),
        ];
        Self {
            settings,
            duplicates,
            db,
            graph,
            log,
            flatten: Box::new(DefaultFlatten),
            textures,
            materials,
            meshes,
            animations,
            prefabs_first,
            prefabs_second,
            scenes,
            totals,
            processed: [0; 7],
            state: JobState::Running,
            cancel_requested: false,
            items_since_checkpoint: 0,
        }
    }

    /// Replace the prefab flattening heuristic. Must be called before the
    /// prefab stages run to have any effect.
    pub fn set_flatten_strategy(&mut self, flatten: Box<dyn FlattenStrategy>) {
        self.flatten = flatten;
    }

    pub fn is_active(&self) -> bool {
        self.state == JobState::Running
    }

    pub fn was_cancelled(&self) -> bool {
        self.state == JobState::Cancelled
    }

    /// Request a graceful stop. The item currently being processed (if the
    /// host is inside `step`) still completes; nothing after it starts.
    pub fn cancel(&mut self) {
        self.cancel_requested = true;
    }

    fn stage_index(kind: AssetKind) -> usize {
        AssetKind::ORDER.iter().position(|&k| k == kind).unwrap_or(0)
    }

    fn current_stage(&self) -> Option<AssetKind> {
        AssetKind::ORDER
            .into_iter()
            .find(|&kind| self.processed[Self::stage_index(kind)] < self.totals[Self::stage_index(kind)])
    }

    pub fn progress(&self) -> Progress {
        let kind = self.current_stage().unwrap_or(AssetKind::Scene);
        let index = Self::stage_index(kind);
        Progress {
            kind,
            kind_processed: self.processed[index],
            kind_total: self.totals[index],
            overall_processed: self.processed.iter().sum(),
            overall_total: self.totals.iter().sum(),
        }
    }

    pub fn log(&self) -> &ImportLog {
        &self.log
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn into_parts(self) -> (D, G, ImportLog) {
        (self.db, self.graph, self.log)
    }

    /// Process one item. Returns what happened so hosts can interleave other
    /// work, repaint progress, or stop between items.
    pub fn step(&mut self) -> StepOutcome {
        if self.state != JobState::Running {
            return StepOutcome::Idle;
        }
        if self.cancel_requested {
            return self.finish_cancelled();
        }
        let Some(kind) = self.current_stage() else {
            return self.finish_complete();
        };
        let imported = self.process_one(kind);
        let index = Self::stage_index(kind);
        self.processed[index] += 1;
        if imported {
            self.items_since_checkpoint += 1;
            self.maybe_checkpoint();
        }

        if self.current_stage().is_none() {
            return self.finish_complete();
        }
        if self.processed[index] == self.totals[index] {
            StepOutcome::StageFinished(kind)
        } else {
            StepOutcome::Worked(kind)
        }
    }

    /// Drive the job until it finishes or a cancel request lands.
    pub fn run_to_completion(&mut self) {
        loop {
            match self.step() {
                StepOutcome::Finished | StepOutcome::Cancelled | StepOutcome::Idle => break,
                StepOutcome::Worked(_) | StepOutcome::StageFinished(_) => {}
            }
        }
    }

    fn process_one(&mut self, kind: AssetKind) -> bool {
        match kind {
            AssetKind::Texture => match self.textures.pop_front() {
                Some(item) => process::process_texture(
                    &self.settings,
                    &self.duplicates,
                    &mut self.db,
                    &mut self.log,
                    &item,
                ),
                None => false,
            },
            AssetKind::Material => match self.materials.pop_front() {
                Some(item) => process::process_material(
                    &self.settings,
                    &self.duplicates,
                    &mut self.db,
                    &mut self.log,
                    &item,
                ),
                None => false,
            },
            AssetKind::Mesh => match self.meshes.pop_front() {
                Some(item) => {
                    let (imported, follow_up) = process::process_mesh(
                        &self.settings,
                        &self.duplicates,
                        &mut self.db,
                        &mut self.log,
                        &item,
                    );
                    if let Some(follow_up) = follow_up {
                        self.prefabs_first.push_back(follow_up.first_pass);
                        self.prefabs_second.push_back(follow_up.second_pass);
                        self.totals[Self::stage_index(AssetKind::PrefabFirstPass)] += 1;
                        self.totals[Self::stage_index(AssetKind::PrefabSecondPass)] += 1;
                    }
                    imported
                }
                None => false,
            },
            AssetKind::Animation => match self.animations.pop_front() {
                Some(item) => process::process_animation(
                    &self.settings,
                    &self.duplicates,
                    &mut self.db,
                    &mut self.log,
                    &item,
                ),
                None => false,
            },
            AssetKind::PrefabFirstPass => match self.prefabs_first.pop_front() {
                Some(item) => process::process_prefab_first_pass(
                    &self.settings,
                    &self.duplicates,
                    &mut self.db,
                    &mut self.graph,
                    &mut self.log,
                    &item,
                ),
                None => false,
            },
            AssetKind::PrefabSecondPass => match self.prefabs_second.pop_front() {
                Some(item) => process::process_prefab_second_pass(
                    &self.settings,
                    &self.duplicates,
                    &mut self.db,
                    &mut self.graph,
                    &mut self.log,
                    self.flatten.as_ref(),
                    &item,
                ),
                None => false,
            },
            AssetKind::Scene => match self.scenes.pop_front() {
                Some(item) => process::process_scene(
                    &self.settings,
                    &self.duplicates,
                    &mut self.db,
                    &mut self.graph,
                    &mut self.log,
                    self.flatten.as_ref(),
                    &item,
                ),
                None => false,
            },
        }
    }

    fn maybe_checkpoint(&mut self) {
        if self.settings.saving_behavior != SavingBehavior::SaveEveryInterval {
            return;
        }
        let interval = self.settings.saving_interval.max(1);
        if self.items_since_checkpoint >= interval {
            self.db.persist_dirty(false);
            self.items_since_checkpoint = 0;
        }
    }

    fn finish_complete(&mut self) -> StepOutcome {
        self.state = JobState::Finished;
        let summary = self.log.summary();
        self.log.info(summary);
        match self.settings.saving_behavior {
            SavingBehavior::SaveEveryInterval | SavingBehavior::SaveAtEnd => {
                self.db.persist_dirty(false)
            }
            SavingBehavior::PromptAtEnd => self.db.persist_dirty(true),
        }
        StepOutcome::Finished
    }

    fn finish_cancelled(&mut self) -> StepOutcome {
        self.state = JobState::Cancelled;
        self.log.warning("Import cancelled by user; assets already processed are kept");
        self.db.persist_dirty(false);
        StepOutcome::Cancelled
    }
}
