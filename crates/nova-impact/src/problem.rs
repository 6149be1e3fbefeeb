//! Reported breakages and the store that owns them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use nova_core::{FileId, TextRange};

use crate::decl::DeclId;
use crate::project::ElementId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    UnresolvedReference { name: String },
    TypeMismatch { expected: String, found: String },
    WrongArguments { name: String },
    Inaccessible { name: String },
    StaticContext { name: String },
    AssignToFinal { name: String },
    AbstractInstantiation { name: String },
    FinalInheritance { name: String },
    ClassKindMismatch { name: String },
    MethodDoesNotOverride { name: String },
    OverrideConflict { name: String },
    MissingImplementation { name: String },
}

impl ProblemKind {
    /// Stable, user-facing category.
    pub fn tag(&self) -> &'static str {
        match self {
            ProblemKind::UnresolvedReference { .. } => "unresolved-reference",
            ProblemKind::TypeMismatch { .. } => "type-mismatch",
            ProblemKind::WrongArguments { .. } => "wrong-arguments",
            ProblemKind::Inaccessible { .. }
            | ProblemKind::StaticContext { .. }
            | ProblemKind::AssignToFinal { .. }
            | ProblemKind::AbstractInstantiation { .. } => "modifier-violation",
            ProblemKind::FinalInheritance { .. }
            | ProblemKind::ClassKindMismatch { .. }
            | ProblemKind::MethodDoesNotOverride { .. }
            | ProblemKind::OverrideConflict { .. }
            | ProblemKind::MissingImplementation { .. } => "hierarchy-violation",
        }
    }

    /// The referenced name, when the problem is about one.
    pub fn name(&self) -> Option<&str> {
        match self {
            ProblemKind::UnresolvedReference { name }
            | ProblemKind::WrongArguments { name }
            | ProblemKind::Inaccessible { name }
            | ProblemKind::StaticContext { name }
            | ProblemKind::AssignToFinal { name }
            | ProblemKind::AbstractInstantiation { name }
            | ProblemKind::FinalInheritance { name }
            | ProblemKind::ClassKindMismatch { name }
            | ProblemKind::MethodDoesNotOverride { name }
            | ProblemKind::OverrideConflict { name }
            | ProblemKind::MissingImplementation { name } => Some(name),
            ProblemKind::TypeMismatch { .. } => None,
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::UnresolvedReference { name } => write!(f, "cannot resolve `{name}`"),
            ProblemKind::TypeMismatch { expected, found } => {
                write!(f, "incompatible types: expected `{expected}`, found `{found}`")
            }
            ProblemKind::WrongArguments { name } => {
                write!(f, "`{name}` cannot be applied to the given arguments")
            }
            ProblemKind::Inaccessible { name } => write!(f, "`{name}` is not accessible here"),
            ProblemKind::StaticContext { name } => {
                write!(f, "`{name}` cannot be referenced from a static context")
            }
            ProblemKind::AssignToFinal { name } => {
                write!(f, "cannot assign a value to final variable `{name}`")
            }
            ProblemKind::AbstractInstantiation { name } => {
                write!(f, "`{name}` is abstract; cannot be instantiated")
            }
            ProblemKind::FinalInheritance { name } => {
                write!(f, "cannot inherit from final `{name}`")
            }
            ProblemKind::ClassKindMismatch { name } => {
                write!(f, "`{name}` has the wrong kind for this clause")
            }
            ProblemKind::MethodDoesNotOverride { name } => {
                write!(f, "`{name}` does not override a method from a supertype")
            }
            ProblemKind::OverrideConflict { name } => {
                write!(f, "`{name}` cannot override the inherited method")
            }
            ProblemKind::MissingImplementation { name } => {
                write!(f, "abstract method `{name}` is not implemented")
            }
        }
    }
}

/// A broken reference to `decl`, anchored at `element` in `file`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Problem {
    pub decl: DeclId,
    pub element: ElementId,
    pub file: FileId,
    pub range: TextRange,
    pub kind: ProblemKind,
}

/// Active problems keyed by the declaration that caused them.
///
/// An element is reported against at most one declaration; adding a problem for an element
/// already claimed by another declaration moves it to the newer one.
#[derive(Debug, Default, Clone)]
pub struct ProblemStore {
    by_decl: BTreeMap<DeclId, Vec<Problem>>,
    by_element: HashMap<ElementId, DeclId>,
}

impl ProblemStore {
    /// Returns `false` if the exact (declaration, element) pair is already present.
    pub fn add(&mut self, problem: Problem) -> bool {
        if let Some(&owner) = self.by_element.get(&problem.element) {
            if owner == problem.decl {
                return false;
            }
            self.detach(owner, |existing| existing.element == problem.element);
        }
        self.by_element.insert(problem.element, problem.decl);
        self.by_decl.entry(problem.decl).or_default().push(problem);
        true
    }

    pub fn remove_for(&mut self, decl: DeclId) -> Vec<Problem> {
        let removed = self.by_decl.remove(&decl).unwrap_or_default();
        for problem in &removed {
            self.by_element.remove(&problem.element);
        }
        removed
    }

    /// Removes every problem reported in `file`.
    pub fn remove_in(&mut self, file: FileId) -> Vec<Problem> {
        let decls: Vec<DeclId> = self.by_decl.keys().copied().collect();
        let mut removed = Vec::new();
        for decl in decls {
            removed.extend(self.detach(decl, |problem| problem.file == file));
        }
        removed
    }

    pub fn remove_for_in(&mut self, decl: DeclId, file: FileId) -> Vec<Problem> {
        self.detach(decl, |problem| problem.file == file)
    }

    /// Wholly replaces the problems of `decl`.
    pub fn replace(&mut self, decl: DeclId, problems: impl IntoIterator<Item = Problem>) {
        self.remove_for(decl);
        for problem in problems {
            debug_assert_eq!(problem.decl, decl);
            self.add(problem);
        }
    }

    pub fn problems_for(&self, decl: DeclId) -> &[Problem] {
        self.by_decl.get(&decl).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_problems(&self, decl: DeclId) -> bool {
        self.by_decl.get(&decl).is_some_and(|problems| !problems.is_empty())
    }

    /// Files holding problems for `decl`.
    pub fn files_of(&self, decl: DeclId) -> BTreeSet<FileId> {
        self.problems_for(decl)
            .iter()
            .map(|problem| problem.file)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &[Problem])> + '_ {
        self.by_decl
            .iter()
            .map(|(decl, problems)| (*decl, problems.as_slice()))
    }

    /// Drops every problem failing `is_valid`, returning how many were removed.
    pub fn prune(&mut self, mut is_valid: impl FnMut(&Problem) -> bool) -> usize {
        let decls: Vec<DeclId> = self.by_decl.keys().copied().collect();
        let mut removed = 0;
        for decl in decls {
            removed += self.detach(decl, |problem| !is_valid(problem)).len();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.by_decl.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_decl.is_empty()
    }

    fn detach(&mut self, decl: DeclId, mut remove: impl FnMut(&Problem) -> bool) -> Vec<Problem> {
        let Some(problems) = self.by_decl.get_mut(&decl) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        problems.retain(|problem| {
            if remove(problem) {
                removed.push(problem.clone());
                false
            } else {
                true
            }
        });
        if problems.is_empty() {
            self.by_decl.remove(&decl);
        }
        for problem in &removed {
            if self.by_element.get(&problem.element) == Some(&problem.decl) {
                self.by_element.remove(&problem.element);
            }
        }
        removed
    }
}
