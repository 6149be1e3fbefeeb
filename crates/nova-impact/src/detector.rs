use std::collections::HashMap;

use crate::decl::DeclId;
use crate::snapshot::{diff, ChangeKind, Snapshot};

/// Result of observing a declaration's current shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Baseline before this observation; `None` the first time a declaration is seen.
    pub previous: Option<Snapshot>,
    pub change: ChangeKind,
}

/// Last-known snapshot per declaration.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    baselines: HashMap<DeclId, Snapshot>,
}

impl ChangeDetector {
    /// Diffs `current` against the stored baseline and makes `current` the new baseline.
    ///
    /// The baseline moves even when the caller later abandons the pass (for example on a
    /// too-many-files outcome); only [`ChangeDetector::rewind`] undoes it.
    pub fn on_declaration_changed(&mut self, decl: DeclId, current: &Snapshot) -> Observation {
        let previous = self.baselines.insert(decl, current.clone());
        let change = match &previous {
            Some(previous) => diff(previous, current),
            None => ChangeKind::Unchanged,
        };
        Observation { previous, change }
    }

    /// Records `current` unless a baseline already exists.
    pub fn capture_baseline(&mut self, decl: DeclId, current: &Snapshot) {
        self.baselines
            .entry(decl)
            .or_insert_with(|| current.clone());
    }

    pub fn baseline(&self, decl: DeclId) -> Option<&Snapshot> {
        self.baselines.get(&decl)
    }

    /// Restores `previous` if the baseline is still the `expected` one installed by an
    /// abandoned pass.
    pub fn rewind(&mut self, decl: DeclId, previous: Option<Snapshot>, expected: &Snapshot) {
        if self.baselines.get(&decl) != Some(expected) {
            return;
        }
        match previous {
            Some(previous) => {
                self.baselines.insert(decl, previous);
            }
            None => {
                self.baselines.remove(&decl);
            }
        }
    }

    pub fn forget(&mut self, decl: DeclId) -> Option<Snapshot> {
        self.baselines.remove(&decl)
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::DeclarationTable;
    use crate::project::ParsedFile;
    use nova_core::FileId;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn field(text: &str) -> Snapshot {
        let parsed = ParsedFile::parse(FileId::from_raw(0), 0, Arc::new(text.to_string()));
        parsed.decls[1].snapshot.clone()
    }

    fn some_decl() -> DeclId {
        let parsed = ParsedFile::parse(FileId::from_raw(0), 0, Arc::new("class A {}".into()));
        DeclarationTable::default().insert_file(&parsed)[0]
    }

    #[test]
    fn first_observation_is_unchanged_but_stored() {
        let mut detector = ChangeDetector::default();
        let decl = some_decl();
        let snapshot = field("class A { int x; }");

        let observation = detector.on_declaration_changed(decl, &snapshot);
        assert_eq!(observation.previous, None);
        assert_eq!(observation.change, ChangeKind::Unchanged);
        assert_eq!(detector.baseline(decl), Some(&snapshot));
    }

    #[test]
    fn baseline_updates_unconditionally() {
        let mut detector = ChangeDetector::default();
        let decl = some_decl();
        let v1 = field("class A { int x; }");
        let v2 = field("class A { long x; }");
        let v3 = field("class A { int x; }");

        detector.on_declaration_changed(decl, &v1);
        assert_eq!(
            detector.on_declaration_changed(decl, &v2).change,
            ChangeKind::Breaking
        );
        // Reverting diffs against the latest baseline, not the original one.
        let observation = detector.on_declaration_changed(decl, &v3);
        assert_eq!(observation.change, ChangeKind::Breaking);
        assert_eq!(observation.previous, Some(v2));
        assert_eq!(
            detector.on_declaration_changed(decl, &v3).change,
            ChangeKind::Unchanged
        );
    }

    #[test]
    fn rewind_restores_only_the_expected_baseline() {
        let mut detector = ChangeDetector::default();
        let decl = some_decl();
        let v1 = field("class A { int x; }");
        let v2 = field("class A { long x; }");

        detector.capture_baseline(decl, &v1);
        detector.capture_baseline(decl, &v2);
        assert_eq!(detector.baseline(decl), Some(&v1));

        let observation = detector.on_declaration_changed(decl, &v2);
        detector.rewind(decl, observation.previous.clone(), &v1);
        assert_eq!(detector.baseline(decl), Some(&v2), "stale rewind is ignored");

        detector.rewind(decl, observation.previous, &v2);
        assert_eq!(detector.baseline(decl), Some(&v1));

        assert_eq!(detector.forget(decl), Some(v1));
        assert!(detector.is_empty());
    }
}
