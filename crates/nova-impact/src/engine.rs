//! The lifecycle coordinator.
//!
//! [`ImpactEngine`] is the context object every caller goes through: it owns the VFS, the parsed
//! project, declaration identities, baselines and the problem store, and it drives a
//! highlighting pass from change detection to the store update.
//!
//! A pass is split in three so the expensive part can leave the model thread:
//!
//! 1. [`ImpactEngine::begin_highlight`] observes the file's declarations (moving their
//!    baselines) and packages everything the scan needs into a [`HighlightRequest`].
//! 2. [`HighlightRequest::run`] scans and verifies against an immutable project snapshot. It
//!    is `Send` and cooperatively cancellable.
//! 3. [`ImpactEngine::finish_highlight`] applies the result, unless a newer edit superseded it.
//!
//! Any reparse cancels every in-flight pass and rewinds the baselines it moved, so the next
//! pass sees the change again instead of losing it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use nova_config::ImpactConfig;
use nova_core::{FileId, TextDelta, TextEdit, TextRange, WorkspaceEdit};
use nova_scheduler::{BlockingTask, Cancelled, CancellationToken, Scheduler};
use nova_syntax::Span;
use nova_vfs::{
    ChangeEvent, ContentChange, EditorId, FileChangeKind, OpenDocuments, Vfs, VfsPath,
};

use crate::decl::{DeclId, DeclarationTable};
use crate::detector::ChangeDetector;
use crate::error::{EngineError, EngineResult};
use crate::problem::{Problem, ProblemStore};
use crate::project::{ParsedFile, ProjectSnapshot, SiteRef};
use crate::scanner::{find_candidates, ScanOutcome, ScanRequest};
use crate::scope::{scan_scope, ScanScope};
use crate::snapshot::{ChangeKind, Snapshot};
use crate::verifier::{verify_file, Change, Finding};

/// Analysis state of one declaration, shared by every editor showing its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclState {
    Clean,
    /// A pass that observed a change is in flight.
    Analyzing,
    Reported,
    /// The last scan hit the file threshold; nothing is reported.
    Unknown,
}

#[derive(Debug, Clone)]
struct DeclRecord {
    state: DeclState,
    /// Names the reported problems were found with.
    probes: BTreeSet<String>,
    /// Shape the last pass ending in `Clean` or `Reported` verified.
    settled: Option<Snapshot>,
}

impl Default for DeclRecord {
    fn default() -> Self {
        Self {
            state: DeclState::Clean,
            probes: BTreeSet::new(),
            settled: None,
        }
    }
}

/// A problem whose file was reparsed since it was reported.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    decl: DeclId,
    file: FileId,
    /// Range mapped into the file's current text.
    range: TextRange,
}

#[derive(Debug)]
struct Rewind {
    decl: DeclId,
    previous: Option<Snapshot>,
    current: Snapshot,
    state: DeclState,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    token: CancellationToken,
    rewinds: Vec<Rewind>,
}

#[derive(Debug, Clone)]
struct Job {
    decl: DeclId,
    site: SiteRef,
    previous: Option<Snapshot>,
    change: ChangeKind,
    scope: ScanScope,
    probes: BTreeSet<String>,
    retained: BTreeMap<FileId, Vec<Span>>,
    pinned: BTreeSet<FileId>,
}

#[derive(Debug, Clone)]
struct Recheck {
    decl: DeclId,
    site: SiteRef,
    file: FileId,
    probes: BTreeSet<String>,
    retained: Vec<Span>,
}

/// Scan and verification work for one highlighting pass, detached from the engine.
#[derive(Debug, Clone)]
pub struct HighlightRequest {
    file: FileId,
    generation: u64,
    token: CancellationToken,
    project: ProjectSnapshot,
    limit: usize,
    jobs: Vec<Job>,
    rechecks: Vec<Recheck>,
    /// `Unknown` declarations whose shape is back to the settled one.
    reverted: Vec<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum JobOutcome {
    Verified {
        decl: DeclId,
        probes: BTreeSet<String>,
        problems: Vec<Problem>,
    },
    TooMany {
        decl: DeclId,
        found: usize,
        limit: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecheckOutcome {
    decl: DeclId,
    file: FileId,
    problems: Vec<Problem>,
}

/// Output of [`HighlightRequest::run`], to be handed back to
/// [`ImpactEngine::finish_highlight`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightResult {
    file: FileId,
    generation: u64,
    outcomes: Vec<JobOutcome>,
    rechecks: Vec<RecheckOutcome>,
    reverted: Vec<DeclId>,
}

impl HighlightResult {
    pub fn file(&self) -> FileId {
        self.file
    }
}

impl HighlightRequest {
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Token cancelled when a newer edit supersedes this pass.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Number of changed declarations this pass scans for.
    pub fn changed(&self) -> usize {
        self.jobs.len()
    }

    pub fn run(&self, token: &CancellationToken) -> Result<HighlightResult, Cancelled> {
        let mut outcomes = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            Cancelled::check(token)?;
            outcomes.push(self.run_job(job, token)?);
        }

        let mut rechecks = Vec::with_capacity(self.rechecks.len());
        for recheck in &self.rechecks {
            Cancelled::check(token)?;
            let change = Change {
                site: recheck.site,
                previous: None,
                kind: ChangeKind::NonBreaking,
                probes: &recheck.probes,
            };
            let findings = verify_file(&self.project, recheck.file, &change, &recheck.retained);
            rechecks.push(RecheckOutcome {
                decl: recheck.decl,
                file: recheck.file,
                problems: self.problems(recheck.decl, recheck.file, findings),
            });
        }

        Ok(HighlightResult {
            file: self.file,
            generation: self.generation,
            outcomes,
            rechecks,
            reverted: self.reverted.clone(),
        })
    }

    fn run_job(&self, job: &Job, token: &CancellationToken) -> Result<JobOutcome, Cancelled> {
        let request = ScanRequest {
            declaring_file: job.site.file,
            scope: job.scope,
            probes: &job.probes,
            pinned: &job.pinned,
            limit: self.limit,
        };
        let files = match find_candidates(&self.project, &request, token)? {
            ScanOutcome::Candidates(files) => files,
            ScanOutcome::TooMany { found, limit } => {
                return Ok(JobOutcome::TooMany {
                    decl: job.decl,
                    found,
                    limit,
                })
            }
        };

        let change = Change {
            site: job.site,
            previous: job.previous.as_ref(),
            kind: job.change,
            probes: &job.probes,
        };
        let mut problems = Vec::new();
        for file in files {
            Cancelled::check(token)?;
            let retained = job.retained.get(&file).map(Vec::as_slice).unwrap_or(&[]);
            let findings = verify_file(&self.project, file, &change, retained);
            problems.extend(self.problems(job.decl, file, findings));
        }
        Ok(JobOutcome::Verified {
            decl: job.decl,
            probes: job.probes.clone(),
            problems,
        })
    }

    fn problems(&self, decl: DeclId, file: FileId, findings: Vec<Finding>) -> Vec<Problem> {
        let Some(parsed) = self.project.file(file) else {
            return Vec::new();
        };
        findings
            .into_iter()
            .map(|finding| Problem {
                decl,
                element: parsed.element(finding.anchor),
                file,
                range: finding.range.to_text_range(),
                kind: finding.kind,
            })
            .collect()
    }
}

/// Incremental impact analysis over an in-memory project.
#[derive(Debug)]
pub struct ImpactEngine {
    config: ImpactConfig,
    vfs: Vfs,
    editors: OpenDocuments,
    project: ProjectSnapshot,
    decls: DeclarationTable,
    detector: ChangeDetector,
    store: ProblemStore,
    records: HashMap<DeclId, DeclRecord>,
    pending: Vec<Pending>,
    in_flight: HashMap<FileId, InFlight>,
    next_revision: u64,
    next_generation: u64,
}

impl Default for ImpactEngine {
    fn default() -> Self {
        Self::new(ImpactConfig::default())
    }
}

impl ImpactEngine {
    pub fn new(config: ImpactConfig) -> Self {
        Self {
            config,
            vfs: Vfs::new(),
            editors: OpenDocuments::default(),
            project: ProjectSnapshot::default(),
            decls: DeclarationTable::default(),
            detector: ChangeDetector::default(),
            store: ProblemStore::default(),
            records: HashMap::new(),
            pending: Vec::new(),
            in_flight: HashMap::new(),
            next_revision: 0,
            next_generation: 0,
        }
    }

    pub fn config(&self) -> &ImpactConfig {
        &self.config
    }

    /// Takes effect on the next highlighting pass.
    pub fn set_max_files_to_search_usages_in(&mut self, limit: usize) {
        self.config.max_files_to_search_usages_in = limit;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        if !enabled {
            self.retract_all();
        }
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    /// Direct VFS access for hosts that mutate files themselves; every mutation must be
    /// followed by [`ImpactEngine::handle_file_event`] with the event it returned.
    pub fn vfs_mut(&mut self) -> &mut Vfs {
        &mut self.vfs
    }

    pub fn project(&self) -> &ProjectSnapshot {
        &self.project
    }

    pub fn file_id(&self, path: &VfsPath) -> Option<FileId> {
        self.vfs.get_id(path)
    }

    pub fn text(&self, file: FileId) -> Option<&str> {
        self.vfs.document(file).map(|doc| doc.text())
    }

    // -- files ----------------------------------------------------------------------------

    pub fn add_file(&mut self, path: VfsPath, text: impl Into<String>) -> EngineResult<FileId> {
        if self.vfs.get_id(&path).is_some() {
            return Err(EngineError::PathExists(path));
        }
        let event = self.vfs.create(path, text);
        self.handle_file_event(&event)?;
        Ok(event.file_id())
    }

    pub fn delete_file(&mut self, file: FileId) -> EngineResult<()> {
        let event = self.vfs.remove(file).ok_or(EngineError::UnknownFile(file))?;
        self.handle_file_event(&event)
    }

    pub fn move_file(&mut self, file: FileId, to: VfsPath) -> EngineResult<()> {
        self.require_file(file)?;
        if self.vfs.get_id(&to).is_some() {
            return Err(EngineError::PathExists(to));
        }
        let event = self
            .vfs
            .rename(file, to)
            .ok_or(EngineError::UnknownFile(file))?;
        self.handle_file_event(&event)
    }

    /// Brings the analysis state up to date with a VFS mutation.
    pub fn handle_file_event(&mut self, event: &ChangeEvent) -> EngineResult<()> {
        match event {
            ChangeEvent::FileSystem(change) => match change.kind {
                FileChangeKind::Created | FileChangeKind::Modified => {
                    self.require_file(change.file_id)?;
                    self.reparse(change.file_id);
                }
                FileChangeKind::Deleted => self.forget_file(change.file_id),
                FileChangeKind::Moved => self.retract_moved(change.file_id),
            },
            ChangeEvent::Moved { file_id, .. } => self.retract_moved(*file_id),
            ChangeEvent::DocumentChanged { file_id, .. } => {
                self.require_file(*file_id)?;
                self.reparse(*file_id);
            }
        }
        Ok(())
    }

    // -- editors --------------------------------------------------------------------------

    /// Opens an editor (or another split) on `file` and captures baselines for declarations
    /// that have none yet.
    pub fn open_editor(&mut self, file: FileId) -> EngineResult<EditorId> {
        let parsed = self
            .project
            .file(file)
            .cloned()
            .ok_or(EngineError::UnknownFile(file))?;
        self.capture_baselines(&parsed);
        Ok(self.editors.open(file))
    }

    /// Closing the last editor of a file drops the problems of its declarations and resets
    /// their baselines to the current text.
    pub fn close_editor(&mut self, editor: EditorId) -> EngineResult<()> {
        let (file, last) = self
            .editors
            .close(editor)
            .ok_or(EngineError::UnknownEditor(editor))?;
        if !last {
            return Ok(());
        }

        if let Some(flight) = self.in_flight.remove(&file) {
            self.abandon(file, flight);
        }
        let ids = self.decls.ids_in(file).to_vec();
        for &decl in &ids {
            self.store.remove_for(decl);
            self.detector.forget(decl);
            self.records.remove(&decl);
        }
        self.pending.retain(|pending| !ids.contains(&pending.decl));
        if let Some(parsed) = self.project.file(file).cloned() {
            self.capture_baselines(&parsed);
        }
        tracing::debug!(
            target: "nova.impact",
            file = file.to_raw(),
            declarations = ids.len(),
            "last editor closed; dropped problems"
        );
        Ok(())
    }

    pub fn editors_of(&self, file: FileId) -> Vec<EditorId> {
        self.editors.editors_of(file)
    }

    // -- edits ----------------------------------------------------------------------------

    /// Applies LSP-style content changes to `file`.
    pub fn document_changed(
        &mut self,
        file: FileId,
        version: i32,
        changes: &[ContentChange],
    ) -> EngineResult<()> {
        self.require_file(file)?;
        let event = self.vfs.apply_changes(file, version, changes)?;
        self.handle_file_event(&event)
    }

    /// Applies `edits` and returns the edits that undo them.
    pub fn apply_edits(&mut self, file: FileId, edits: &[TextEdit]) -> EngineResult<Vec<TextEdit>> {
        self.require_file(file)?;
        let (event, inverse) = self.vfs.apply_edits(file, edits)?;
        self.handle_file_event(&event)?;
        Ok(inverse)
    }

    pub fn set_text(&mut self, file: FileId, text: impl Into<String>) -> EngineResult<()> {
        self.require_file(file)?;
        let event = self.vfs.set_text(file, text)?;
        self.handle_file_event(&event)
    }

    /// Applies a multi-file edit atomically: either every file changes or none does. The
    /// analysis sees only the net result. Returns the edit that undoes it.
    pub fn apply_workspace_edit(&mut self, edit: &WorkspaceEdit) -> EngineResult<WorkspaceEdit> {
        for &file in edit.changes.keys() {
            self.require_file(file)?;
        }

        let mut inverse = WorkspaceEdit::default();
        let mut events = Vec::with_capacity(edit.changes.len());
        for (&file, edits) in &edit.changes {
            match self.vfs.apply_edits(file, edits) {
                Ok((event, undo)) => {
                    inverse.changes.insert(file, undo);
                    events.push(event);
                }
                Err(err) => {
                    for (&file, undo) in inverse.changes.iter().rev() {
                        if let Err(err) = self.vfs.apply_edits(file, undo) {
                            tracing::error!(
                                target: "nova.impact",
                                file = file.to_raw(),
                                error = %err,
                                "failed to roll back workspace edit"
                            );
                        }
                    }
                    return Err(err.into());
                }
            }
        }

        for event in &events {
            self.handle_file_event(event)?;
        }
        Ok(inverse)
    }

    // -- highlighting ---------------------------------------------------------------------

    /// Runs a complete highlighting pass for `file` on the calling thread.
    pub fn highlight(&mut self, file: FileId) -> EngineResult<()> {
        let request = self.begin_highlight(file)?;
        match request.run(&request.token()) {
            Ok(result) => {
                self.finish_highlight(result);
            }
            Err(Cancelled) => {
                tracing::debug!(target: "nova.impact", file = file.to_raw(), "highlighting cancelled");
            }
        }
        Ok(())
    }

    /// Observes `file`'s declarations and prepares the scan for those that changed.
    ///
    /// Supersedes any pass still in flight for the same file.
    pub fn begin_highlight(&mut self, file: FileId) -> EngineResult<HighlightRequest> {
        let parsed = self
            .project
            .file(file)
            .cloned()
            .ok_or(EngineError::UnknownFile(file))?;
        if let Some(flight) = self.in_flight.remove(&file) {
            self.abandon(file, flight);
        }
        if !self.config.enabled {
            self.retract_all();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let token = CancellationToken::new();

        let mut rewinds = Vec::new();
        let mut jobs = Vec::new();
        let mut reverted = Vec::new();
        let ids = self.decls.ids_in(file).to_vec();
        for (index, decl) in ids.into_iter().enumerate() {
            let Some(site) = parsed.site(index as u32) else {
                continue;
            };
            let current = &site.snapshot;
            let observation = self.detector.on_declaration_changed(decl, current);
            let record = self.record(decl);
            if record.settled.is_none() {
                record.settled = Some(observation.previous.clone().unwrap_or_else(|| current.clone()));
            }
            if observation.change == ChangeKind::Unchanged {
                continue;
            }
            rewinds.push(Rewind {
                decl,
                previous: observation.previous.clone(),
                current: current.clone(),
                state: self.state_of(decl),
            });
            if !self.config.enabled {
                continue;
            }
            let record = self.record(decl);
            if record.state == DeclState::Unknown && record.settled.as_ref() == Some(current) {
                record.state = DeclState::Analyzing;
                reverted.push(decl);
                continue;
            }

            let site_ref = parsed.site_ref(index as u32);
            let previous = observation.previous;
            let scope = scan_scope(&parsed, site_ref, previous.as_ref(), current);
            let mut probes = self.reported_probes(decl);
            probes.insert(current.name.clone());
            if let Some(previous) = &previous {
                probes.insert(previous.name.clone());
            }
            let (retained, pinned) = self.retained(decl);

            tracing::trace!(
                target: "nova.impact",
                decl = ?decl,
                name = %current.name,
                change = ?observation.change,
                scope = ?scope,
                "declaration changed"
            );
            self.record(decl).state = DeclState::Analyzing;
            jobs.push(Job {
                decl,
                site: site_ref,
                previous,
                change: observation.change,
                scope,
                probes,
                retained,
                pinned,
            });
        }

        let rechecks = self.rechecks(&jobs);
        self.in_flight.insert(
            file,
            InFlight {
                generation,
                token: token.clone(),
                rewinds,
            },
        );

        Ok(HighlightRequest {
            file,
            generation,
            token,
            project: self.project.clone(),
            limit: self.config.max_files_to_search_usages_in,
            jobs,
            rechecks,
            reverted,
        })
    }

    /// Applies a finished pass. Returns `false` (and changes nothing) when the pass was
    /// superseded after it began.
    pub fn finish_highlight(&mut self, result: HighlightResult) -> bool {
        let current = self
            .in_flight
            .get(&result.file)
            .is_some_and(|flight| flight.generation == result.generation);
        if !current {
            tracing::debug!(
                target: "nova.impact",
                file = result.file.to_raw(),
                generation = result.generation,
                "discarding stale highlighting pass"
            );
            return false;
        }
        let Some(flight) = self.in_flight.remove(&result.file) else {
            return false;
        };
        let mut shapes: HashMap<DeclId, Snapshot> = flight
            .rewinds
            .into_iter()
            .map(|rewind| (rewind.decl, rewind.current))
            .collect();

        let mut analysed = BTreeSet::new();
        for decl in result.reverted {
            if !self.decls.is_valid(decl) {
                continue;
            }
            tracing::debug!(
                target: "nova.impact",
                decl = ?decl,
                "declaration reverted to its last analysed shape"
            );
            analysed.insert(decl);
            self.store.remove_for(decl);
            self.pending.retain(|pending| pending.decl != decl);
            let record = self.record(decl);
            record.state = DeclState::Clean;
            record.probes.clear();
        }
        for outcome in result.outcomes {
            match outcome {
                JobOutcome::Verified {
                    decl,
                    probes,
                    problems,
                } => {
                    if !self.decls.is_valid(decl) {
                        continue;
                    }
                    analysed.insert(decl);
                    self.store.replace(decl, problems);
                    self.pending.retain(|pending| pending.decl != decl);
                    let reported = self.store.has_problems(decl);
                    let shape = shapes.remove(&decl);
                    let record = self.record(decl);
                    if shape.is_some() {
                        record.settled = shape;
                    }
                    if reported {
                        record.state = DeclState::Reported;
                        record.probes = probes;
                    } else {
                        record.state = DeclState::Clean;
                        record.probes.clear();
                    }
                }
                JobOutcome::TooMany { decl, found, limit } => {
                    if !self.decls.is_valid(decl) {
                        continue;
                    }
                    tracing::debug!(
                        target: "nova.impact",
                        decl = ?decl,
                        found,
                        limit,
                        "too many files to search for usages; retracting problems"
                    );
                    analysed.insert(decl);
                    self.store.remove_for(decl);
                    self.pending.retain(|pending| pending.decl != decl);
                    let record = self.record(decl);
                    record.state = DeclState::Unknown;
                    record.probes.clear();
                }
            }
        }

        for recheck in result.rechecks {
            if analysed.contains(&recheck.decl) || !self.decls.is_valid(recheck.decl) {
                continue;
            }
            let outstanding = self
                .pending
                .iter()
                .any(|pending| pending.decl == recheck.decl && pending.file == recheck.file);
            if !outstanding {
                continue;
            }
            self.store.remove_for_in(recheck.decl, recheck.file);
            for problem in recheck.problems {
                self.store.add(problem);
            }
            self.pending
                .retain(|pending| !(pending.decl == recheck.decl && pending.file == recheck.file));
        }

        self.settle();
        true
    }

    /// Runs the scan and verification of a pass on the scheduler's background pool.
    ///
    /// Await the task and hand its result to [`ImpactEngine::finish_highlight`]. Any edit
    /// made meanwhile cancels the task.
    pub fn highlight_in_background(
        &mut self,
        scheduler: &Scheduler,
        file: FileId,
    ) -> EngineResult<BlockingTask<HighlightResult>> {
        let request = self.begin_highlight(file)?;
        let token = request.token();
        Ok(scheduler.spawn_background_with_token(token, move |token| request.run(&token)))
    }

    /// Cancels the pass in flight for `file`, if any.
    pub fn cancel_highlight(&mut self, file: FileId) -> bool {
        match self.in_flight.remove(&file) {
            Some(flight) => {
                self.abandon(file, flight);
                true
            }
            None => false,
        }
    }

    // -- queries --------------------------------------------------------------------------

    /// Problems caused by the declarations of the editor's file, by declaration.
    pub fn problems(&mut self, editor: EditorId) -> EngineResult<BTreeMap<DeclId, Vec<Problem>>> {
        let file = self
            .editors
            .file_of(editor)
            .ok_or(EngineError::UnknownEditor(editor))?;
        self.prune();
        Ok(self
            .decls
            .ids_in(file)
            .iter()
            .filter(|&&decl| self.store.has_problems(decl))
            .map(|&decl| (decl, self.store.problems_for(decl).to_vec()))
            .collect())
    }

    /// Problems reported in `file`, whichever declaration caused them.
    pub fn problems_in_file(&self, file: FileId) -> Vec<Problem> {
        self.store
            .iter()
            .flat_map(|(_, problems)| problems)
            .filter(|problem| problem.file == file && self.is_live(problem))
            .cloned()
            .collect()
    }

    pub fn problems_for(&self, decl: DeclId) -> Vec<Problem> {
        self.store
            .problems_for(decl)
            .iter()
            .filter(|problem| self.is_live(problem))
            .cloned()
            .collect()
    }

    pub fn problem_count(&self) -> usize {
        self.store.len()
    }

    /// Current snapshot of a declaration; `None` once the handle is stale.
    pub fn declaration(&self, decl: DeclId) -> Option<&Snapshot> {
        let site = self.decls.get(decl)?;
        self.project.site(site).map(|site| &site.snapshot)
    }

    /// Looks a declaration up by its member path, e.g. `Outer.Inner.field`.
    pub fn find_declaration(&self, file: FileId, path: &str) -> Option<DeclId> {
        let parsed = self.project.file(file)?;
        let index = parsed.find(path)?;
        self.decls.ids_in(file).get(index as usize).copied()
    }

    /// `None` once the handle is stale.
    pub fn state(&self, decl: DeclId) -> Option<DeclState> {
        self.decls
            .is_valid(decl)
            .then(|| self.state_of(decl))
    }

    // -- internals ------------------------------------------------------------------------

    fn require_file(&self, file: FileId) -> EngineResult<()> {
        if self.vfs.document(file).is_some() {
            Ok(())
        } else {
            Err(EngineError::UnknownFile(file))
        }
    }

    fn record(&mut self, decl: DeclId) -> &mut DeclRecord {
        self.records.entry(decl).or_default()
    }

    fn state_of(&self, decl: DeclId) -> DeclState {
        self.records
            .get(&decl)
            .map_or(DeclState::Clean, |record| record.state)
    }

    fn reported_probes(&self, decl: DeclId) -> BTreeSet<String> {
        self.records
            .get(&decl)
            .map(|record| record.probes.clone())
            .unwrap_or_default()
    }

    fn is_live(&self, problem: &Problem) -> bool {
        self.decls.is_valid(problem.decl)
            && self.project.revision(problem.file) == Some(problem.element.revision)
    }

    fn prune(&mut self) {
        let decls = &self.decls;
        let project = &self.project;
        let removed = self.store.prune(|problem| {
            decls.is_valid(problem.decl)
                && project.revision(problem.file) == Some(problem.element.revision)
        });
        if removed > 0 {
            tracing::debug!(target: "nova.impact", removed, "pruned stale problems");
            self.settle();
        }
    }

    /// Spans already reported for `decl`, per file, plus the files holding them.
    fn retained(&self, decl: DeclId) -> (BTreeMap<FileId, Vec<Span>>, BTreeSet<FileId>) {
        let mut retained: BTreeMap<FileId, Vec<Span>> = BTreeMap::new();
        for problem in self.store.problems_for(decl) {
            retained
                .entry(problem.file)
                .or_default()
                .push(Span::from(problem.range));
        }
        for pending in self.pending.iter().filter(|pending| pending.decl == decl) {
            retained
                .entry(pending.file)
                .or_default()
                .push(Span::from(pending.range));
        }
        let pinned = retained.keys().copied().collect();
        (retained, pinned)
    }

    /// Re-verification of problems whose files were reparsed, for declarations without a job
    /// of their own.
    fn rechecks(&self, jobs: &[Job]) -> Vec<Recheck> {
        let mut groups: BTreeMap<(DeclId, FileId), Vec<Span>> = BTreeMap::new();
        for pending in &self.pending {
            if jobs.iter().any(|job| job.decl == pending.decl) {
                continue;
            }
            groups
                .entry((pending.decl, pending.file))
                .or_default()
                .push(Span::from(pending.range));
        }

        groups
            .into_iter()
            .filter_map(|((decl, file), retained)| {
                let site = self.decls.get(decl)?;
                let mut probes = self.reported_probes(decl);
                if let Some(sig) = self.project.site(site).map(|site| &site.snapshot) {
                    probes.insert(sig.name.clone());
                }
                Some(Recheck {
                    decl,
                    site,
                    file,
                    probes,
                    retained,
                })
            })
            .collect()
    }

    fn capture_baselines(&mut self, parsed: &ParsedFile) {
        let ids = self.decls.ids_in(parsed.file).to_vec();
        for (site, decl) in parsed.decls.iter().zip(ids) {
            self.detector.capture_baseline(decl, &site.snapshot);
        }
    }

    fn reparse(&mut self, file: FileId) {
        let Some(text) = self.vfs.document(file).map(|doc| doc.text_arc()) else {
            return;
        };
        let old = self.project.file(file).cloned();
        if old.as_ref().is_some_and(|old| old.text == text) {
            return;
        }

        self.cancel_in_flight();
        self.next_revision += 1;
        let parsed = ParsedFile::parse(file, self.next_revision, text);
        match old {
            Some(old) => {
                let delta = TextDelta::between(&old.text, &parsed.text);
                self.remember_problems_in(file, delta);
                let rematch = self.decls.rematch(&old, &parsed, delta);
                for decl in rematch.removed {
                    self.retract_decl(decl);
                }
            }
            None => {
                self.decls.insert_file(&parsed);
                self.capture_baselines(&parsed);
            }
        }
        self.project.insert_file(parsed);
        self.settle();
    }

    /// Moves problems reported in `file` to the pending list, mapping their ranges through
    /// the edit.
    fn remember_problems_in(&mut self, file: FileId, delta: Option<TextDelta>) {
        let map = |range: TextRange| match delta {
            Some(delta) => delta.map_range_clamped(range),
            None => range,
        };
        for pending in self.pending.iter_mut().filter(|pending| pending.file == file) {
            pending.range = map(pending.range);
        }
        for problem in self.store.remove_in(file) {
            self.pending.push(Pending {
                decl: problem.decl,
                file,
                range: map(problem.range),
            });
        }
    }

    fn retract_decl(&mut self, decl: DeclId) {
        let removed = self.store.remove_for(decl);
        self.pending.retain(|pending| pending.decl != decl);
        self.detector.forget(decl);
        self.records.remove(&decl);
        if !removed.is_empty() {
            tracing::debug!(
                target: "nova.impact",
                decl = ?decl,
                problems = removed.len(),
                "declaration removed; retracted its problems"
            );
        }
    }

    fn forget_file(&mut self, file: FileId) {
        self.cancel_in_flight();
        self.editors.close_all(file);
        for decl in self.decls.remove_file(file) {
            self.retract_decl(decl);
        }
        self.store.remove_in(file);
        self.pending.retain(|pending| pending.file != file);
        self.project.remove_file(file);
        self.settle();
        tracing::debug!(target: "nova.impact", file = file.to_raw(), "file deleted");
    }

    /// A moved file keeps its id and content, but none of its problems survive: neither
    /// those reported in it nor those caused by its declarations.
    fn retract_moved(&mut self, file: FileId) {
        self.cancel_in_flight();
        for decl in self.decls.ids_in(file).to_vec() {
            self.store.remove_for(decl);
            self.pending.retain(|pending| pending.decl != decl);
            if let Some(record) = self.records.get_mut(&decl) {
                record.state = DeclState::Clean;
                record.probes.clear();
            }
        }
        self.store.remove_in(file);
        self.pending.retain(|pending| pending.file != file);
        self.settle();
        tracing::debug!(target: "nova.impact", file = file.to_raw(), "file moved");
    }

    fn retract_all(&mut self) {
        self.store = ProblemStore::default();
        self.pending.clear();
        for record in self.records.values_mut() {
            record.state = DeclState::Clean;
            record.probes.clear();
        }
    }

    fn cancel_in_flight(&mut self) {
        let flights: Vec<(FileId, InFlight)> = self.in_flight.drain().collect();
        for (file, flight) in flights {
            self.abandon(file, flight);
        }
    }

    /// Cancels a pass and restores the baselines and states it moved.
    fn abandon(&mut self, file: FileId, flight: InFlight) {
        flight.token.cancel();
        for rewind in flight.rewinds.into_iter().rev() {
            if !self.decls.is_valid(rewind.decl) {
                continue;
            }
            self.detector
                .rewind(rewind.decl, rewind.previous, &rewind.current);
            let record = self.record(rewind.decl);
            if record.state == DeclState::Analyzing {
                record.state = rewind.state;
            }
        }
        tracing::debug!(
            target: "nova.impact",
            file = file.to_raw(),
            generation = flight.generation,
            "superseded highlighting pass cancelled"
        );
    }

    /// Reported declarations that lost all their problems become clean.
    fn settle(&mut self) {
        let store = &self.store;
        let pending = &self.pending;
        for (decl, record) in self.records.iter_mut() {
            if record.state == DeclState::Reported
                && !store.has_problems(*decl)
                && !pending.iter().any(|pending| pending.decl == *decl)
            {
                record.state = DeclState::Clean;
                record.probes.clear();
            }
        }
    }
}
