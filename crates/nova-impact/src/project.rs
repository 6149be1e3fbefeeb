//! Parsed project state shared between the engine and background passes.
//!
//! [`ParsedFile`] is immutable once built; [`ProjectSnapshot`] is a cheap-to-clone view over
//! all parsed files (every map is behind an `Arc` and copied on write).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use nova_core::{FileId, TextRange};
use nova_syntax::ast::{self, ClassDecl, MemberDecl, Stmt};
use nova_syntax::Span;

use crate::index::WordIndex;
use crate::snapshot::{DeclContext, DeclKind, Snapshot};

/// Position of a declaration inside one parsed revision of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteRef {
    pub file: FileId,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclSite {
    pub kind: DeclKind,
    pub snapshot: Snapshot,
    pub parent: Option<u32>,
    pub children: Vec<u32>,
    pub range: Span,
    pub name_range: Span,
    /// Enum constants, for enum classes.
    pub constants: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorKind {
    Import,
    ClassHeader,
    Field,
    MethodHeader,
    Statement,
}

/// An element problems can be reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub kind: AnchorKind,
    pub range: Span,
}

/// Handle to an anchor of a specific file revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub file: FileId,
    pub revision: u64,
    pub index: u32,
}

#[derive(Debug)]
pub struct ParsedFile {
    pub file: FileId,
    pub revision: u64,
    pub text: Arc<String>,
    pub unit: ast::CompilationUnit,
    pub package: String,
    pub identifiers: BTreeSet<String>,
    /// Declarations in pre-order.
    pub decls: Vec<DeclSite>,
    pub anchors: Vec<Anchor>,
    anchor_index: HashMap<(AnchorKind, Span), u32>,
    site_by_name_range: HashMap<Span, u32>,
}

impl ParsedFile {
    pub fn parse(file: FileId, revision: u64, text: Arc<String>) -> Self {
        let (unit, identifiers) = nova_syntax::parse(&text).into_parts();
        let package = unit
            .package
            .as_ref()
            .map(|pkg| pkg.name.clone())
            .unwrap_or_default();

        let mut collector = Collector {
            package: &package,
            decls: Vec::new(),
            anchors: Vec::new(),
        };
        collector.collect_unit(&unit);
        let Collector { decls, anchors, .. } = collector;

        let anchor_index = anchors
            .iter()
            .enumerate()
            .map(|(idx, anchor)| ((anchor.kind, anchor.range), idx as u32))
            .collect();
        let site_by_name_range = decls
            .iter()
            .enumerate()
            .map(|(idx, decl)| (decl.name_range, idx as u32))
            .collect();

        Self {
            file,
            revision,
            text,
            unit,
            package,
            identifiers,
            decls,
            anchors,
            anchor_index,
            site_by_name_range,
        }
    }

    pub fn site(&self, index: u32) -> Option<&DeclSite> {
        self.decls.get(index as usize)
    }

    pub fn site_ref(&self, index: u32) -> SiteRef {
        SiteRef {
            file: self.file,
            index,
        }
    }

    /// The declaration whose name token is at `name_range`.
    pub fn site_at(&self, name_range: Span) -> Option<u32> {
        self.site_by_name_range.get(&name_range).copied()
    }

    pub fn anchor_at(&self, kind: AnchorKind, range: Span) -> Option<u32> {
        self.anchor_index.get(&(kind, range)).copied()
    }

    pub fn anchor(&self, index: u32) -> Option<Anchor> {
        self.anchors.get(index as usize).copied()
    }

    pub fn element(&self, index: u32) -> ElementId {
        ElementId {
            file: self.file,
            revision: self.revision,
            index,
        }
    }

    /// Top-level declarations (no parent).
    pub fn roots(&self) -> impl Iterator<Item = u32> + '_ {
        self.decls
            .iter()
            .enumerate()
            .filter(|(_, decl)| decl.parent.is_none())
            .map(|(idx, _)| idx as u32)
    }

    /// Resolves a dotted member path (`Outer.Inner.member`) to a declaration.
    pub fn find(&self, path: &str) -> Option<u32> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self
            .roots()
            .find(|&idx| self.decls[idx as usize].snapshot.name == first)?;
        for segment in segments {
            current = self.decls[current as usize]
                .children
                .iter()
                .copied()
                .find(|&child| self.decls[child as usize].snapshot.name == segment)?;
        }
        Some(current)
    }

    pub fn text_range(span: Span) -> TextRange {
        span.to_text_range()
    }
}

struct Collector<'a> {
    package: &'a str,
    decls: Vec<DeclSite>,
    anchors: Vec<Anchor>,
}

impl Collector<'_> {
    fn collect_unit(&mut self, unit: &ast::CompilationUnit) {
        for import in &unit.imports {
            self.anchor(AnchorKind::Import, import.range);
        }
        for decl in &unit.types {
            self.collect_class(decl, None, false);
        }
    }

    fn push_decl(&mut self, site: DeclSite) -> u32 {
        let idx = self.decls.len() as u32;
        if let Some(parent) = site.parent {
            self.decls[parent as usize].children.push(idx);
        }
        self.decls.push(site);
        idx
    }

    fn anchor(&mut self, kind: AnchorKind, range: Span) {
        self.anchors.push(Anchor { kind, range });
    }

    fn context(&self, parent: Option<u32>, is_local: bool) -> (Option<Snapshot>, bool) {
        let owner = parent.map(|idx| self.decls[idx as usize].snapshot.clone());
        let is_local = is_local || owner.as_ref().is_some_and(|owner| owner.is_local);
        (owner, is_local)
    }

    fn collect_class(&mut self, decl: &ClassDecl, parent: Option<u32>, is_local: bool) {
        let (owner, is_local) = self.context(parent, is_local);
        let snapshot = Snapshot::capture_class(
            DeclContext {
                package: self.package,
                owner: owner.as_ref(),
                is_local,
            },
            decl,
        );
        let idx = self.push_decl(DeclSite {
            kind: DeclKind::Class,
            snapshot,
            parent,
            children: Vec::new(),
            range: decl.range,
            name_range: decl.name_range,
            constants: decl
                .enum_constants
                .iter()
                .map(|constant| constant.name.clone())
                .collect(),
        });
        self.anchor(AnchorKind::ClassHeader, decl.header_range());

        for member in &decl.members {
            self.collect_member(member, idx);
        }
    }

    fn collect_member(&mut self, member: &MemberDecl, class: u32) {
        let (owner, is_local) = self.context(Some(class), false);
        let ctx = DeclContext {
            package: self.package,
            owner: owner.as_ref(),
            is_local,
        };
        match member {
            MemberDecl::Field(field) => {
                self.push_decl(DeclSite {
                    kind: DeclKind::Field,
                    snapshot: Snapshot::capture_field(ctx, field),
                    parent: Some(class),
                    children: Vec::new(),
                    range: field.range,
                    name_range: field.name_range,
                    constants: Vec::new(),
                });
                self.anchor(AnchorKind::Field, field.range);
                if let Some(init) = &field.initializer {
                    self.collect_expr(init, class);
                }
            }
            MemberDecl::Method(method) => {
                self.push_decl(DeclSite {
                    kind: DeclKind::Method,
                    snapshot: Snapshot::capture_method(ctx, method),
                    parent: Some(class),
                    children: Vec::new(),
                    range: method.range,
                    name_range: method.name_range,
                    constants: Vec::new(),
                });
                self.anchor(AnchorKind::MethodHeader, method.header_range());
                if let Some(body) = &method.body {
                    self.collect_block(body, class);
                }
            }
            MemberDecl::Constructor(ctor) => {
                self.push_decl(DeclSite {
                    kind: DeclKind::Method,
                    snapshot: Snapshot::capture_constructor(ctx, ctor),
                    parent: Some(class),
                    children: Vec::new(),
                    range: ctor.range,
                    name_range: ctor.name_range,
                    constants: Vec::new(),
                });
                self.anchor(AnchorKind::MethodHeader, ctor.header_range());
                self.collect_block(&ctor.body, class);
            }
            MemberDecl::Initializer(init) => self.collect_block(&init.body, class),
            MemberDecl::Type(nested) => self.collect_class(nested, Some(class), false),
        }
    }

    fn collect_block(&mut self, block: &ast::Block, class: u32) {
        for stmt in &block.statements {
            self.collect_stmt(stmt, class);
        }
    }

    fn collect_stmt(&mut self, stmt: &Stmt, class: u32) {
        match stmt {
            Stmt::Block(block) => self.collect_block(block, class),
            Stmt::LocalClass(decl) => self.collect_class(decl, Some(class), true),
            Stmt::Empty(_) => {}
            _ => {
                self.anchor(AnchorKind::Statement, stmt.range());
                match stmt {
                    Stmt::LocalVar(local) => {
                        if let Some(init) = &local.initializer {
                            self.collect_expr(init, class);
                        }
                    }
                    Stmt::Expr(expr) => self.collect_expr(&expr.expr, class),
                    Stmt::Return(ret) => {
                        if let Some(expr) = &ret.expr {
                            self.collect_expr(expr, class);
                        }
                    }
                    Stmt::If(stmt) => {
                        self.collect_expr(&stmt.condition, class);
                        self.collect_stmt(&stmt.then_branch, class);
                        for branch in &stmt.else_ifs {
                            self.collect_expr(&branch.condition, class);
                            self.collect_stmt(&branch.body, class);
                        }
                        if let Some(else_branch) = &stmt.else_branch {
                            self.collect_stmt(else_branch, class);
                        }
                    }
                    Stmt::While(stmt) => {
                        self.collect_expr(&stmt.condition, class);
                        self.collect_stmt(&stmt.body, class);
                    }
                    Stmt::For(stmt) => {
                        for init in &stmt.init {
                            self.collect_stmt(init, class);
                        }
                        for expr in stmt.condition.iter().chain(&stmt.updates).chain(&stmt.iterable) {
                            self.collect_expr(expr, class);
                        }
                        self.collect_stmt(&stmt.body, class);
                    }
                    Stmt::Try(stmt) => {
                        self.collect_block(&stmt.body, class);
                        for catch in &stmt.catches {
                            self.collect_block(&catch.body, class);
                        }
                        if let Some(finally) = &stmt.finally {
                            self.collect_block(finally, class);
                        }
                    }
                    Stmt::Block(_) | Stmt::LocalClass(_) | Stmt::Empty(_) => {}
                }
            }
        }
    }

    /// Anonymous class bodies contribute anchors but no declarations.
    fn collect_expr(&mut self, expr: &ast::Expr, class: u32) {
        use ast::Expr;
        match expr {
            Expr::New(new) => {
                for arg in &new.args {
                    self.collect_expr(arg, class);
                }
                if let Some(body) = &new.body {
                    for member in &body.members {
                        self.collect_anonymous_member(member, class);
                    }
                }
            }
            Expr::Call(call) => {
                self.collect_expr(&call.callee, class);
                for arg in &call.args {
                    self.collect_expr(arg, class);
                }
            }
            Expr::FieldAccess(access) => self.collect_expr(&access.receiver, class),
            Expr::Assign(assign) => {
                self.collect_expr(&assign.lhs, class);
                self.collect_expr(&assign.rhs, class);
            }
            Expr::Unary(unary) => self.collect_expr(&unary.expr, class),
            Expr::Binary(binary) => {
                self.collect_expr(&binary.lhs, class);
                self.collect_expr(&binary.rhs, class);
            }
            Expr::Conditional(cond) => {
                self.collect_expr(&cond.condition, class);
                self.collect_expr(&cond.then_expr, class);
                self.collect_expr(&cond.else_expr, class);
            }
            Expr::InstanceOf(expr) => self.collect_expr(&expr.expr, class),
            Expr::Cast(cast) => self.collect_expr(&cast.expr, class),
            Expr::Index(index) => {
                self.collect_expr(&index.target, class);
                self.collect_expr(&index.index, class);
            }
            Expr::Name(_) | Expr::Literal(_) | Expr::This(_) | Expr::Missing(_) => {}
        }
    }

    fn collect_anonymous_member(&mut self, member: &MemberDecl, class: u32) {
        match member {
            MemberDecl::Field(field) => {
                self.anchor(AnchorKind::Field, field.range);
                if let Some(init) = &field.initializer {
                    self.collect_expr(init, class);
                }
            }
            MemberDecl::Method(method) => {
                self.anchor(AnchorKind::MethodHeader, method.header_range());
                if let Some(body) = &method.body {
                    self.collect_block(body, class);
                }
            }
            MemberDecl::Constructor(ctor) => self.collect_block(&ctor.body, class),
            MemberDecl::Initializer(init) => self.collect_block(&init.body, class),
            MemberDecl::Type(_) => {}
        }
    }
}

/// Immutable view of every parsed file in the project.
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    files: Arc<HashMap<FileId, Arc<ParsedFile>>>,
    /// Qualified class name → declaring sites (duplicates are possible mid-edit).
    classes: Arc<HashMap<String, Vec<SiteRef>>>,
    packages: Arc<HashMap<String, BTreeSet<FileId>>>,
    words: Arc<WordIndex>,
}

impl ProjectSnapshot {
    /// Adds or replaces a file, returning the previous revision.
    pub fn insert_file(&mut self, parsed: ParsedFile) -> Option<Arc<ParsedFile>> {
        let file = parsed.file;
        let previous = self.remove_file(file);

        Arc::make_mut(&mut self.words).insert_file(file, &parsed.identifiers);
        Arc::make_mut(&mut self.packages)
            .entry(parsed.package.clone())
            .or_default()
            .insert(file);
        let classes = Arc::make_mut(&mut self.classes);
        for (idx, decl) in parsed.decls.iter().enumerate() {
            if let Some(qualified) = &decl.snapshot.qualified_name {
                classes
                    .entry(qualified.clone())
                    .or_default()
                    .push(parsed.site_ref(idx as u32));
            }
        }
        Arc::make_mut(&mut self.files).insert(file, Arc::new(parsed));

        previous
    }

    pub fn remove_file(&mut self, file: FileId) -> Option<Arc<ParsedFile>> {
        let previous = Arc::make_mut(&mut self.files).remove(&file)?;

        Arc::make_mut(&mut self.words).invalidate_file(file);
        let packages = Arc::make_mut(&mut self.packages);
        if let Some(files) = packages.get_mut(&previous.package) {
            files.remove(&file);
            if files.is_empty() {
                packages.remove(&previous.package);
            }
        }
        Arc::make_mut(&mut self.classes).retain(|_, sites| {
            sites.retain(|site| site.file != file);
            !sites.is_empty()
        });

        Some(previous)
    }

    pub fn file(&self, file: FileId) -> Option<&Arc<ParsedFile>> {
        self.files.get(&file)
    }

    pub fn files(&self) -> impl Iterator<Item = &Arc<ParsedFile>> + '_ {
        self.files.values()
    }

    pub fn contains(&self, file: FileId) -> bool {
        self.files.contains_key(&file)
    }

    pub fn revision(&self, file: FileId) -> Option<u64> {
        self.files.get(&file).map(|parsed| parsed.revision)
    }

    pub fn site(&self, site: SiteRef) -> Option<&DeclSite> {
        self.files.get(&site.file)?.site(site.index)
    }

    pub fn classes_named(&self, qualified_name: &str) -> &[SiteRef] {
        self.classes
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn files_in_package(&self, package: &str) -> impl Iterator<Item = FileId> + '_ {
        self.packages.get(package).into_iter().flatten().copied()
    }

    /// Whether `name` is a package of the project or a prefix of one.
    pub fn is_package_prefix(&self, name: &str) -> bool {
        self.packages.keys().any(|pkg| {
            pkg == name
                || (pkg.len() > name.len()
                    && pkg.starts_with(name)
                    && pkg.as_bytes()[name.len()] == b'.')
        })
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn words(&self) -> &WordIndex {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parsed(text: &str) -> ParsedFile {
        ParsedFile::parse(FileId::from_raw(0), 1, Arc::new(text.to_string()))
    }

    #[test]
    fn collects_declarations_in_pre_order() {
        let file = parsed(
            "package foo;\n\
             public class A {\n\
               static String field;\n\
               void m() { class Local { int x; } int y = 1; }\n\
               static class Nested { Nested() {} }\n\
             }\n",
        );

        let names: Vec<(&str, Option<u32>)> = file
            .decls
            .iter()
            .map(|decl| (decl.snapshot.name.as_str(), decl.parent))
            .collect();
        assert_eq!(
            names,
            vec![
                ("A", None),
                ("field", Some(0)),
                ("m", Some(0)),
                ("Local", Some(0)),
                ("x", Some(3)),
                ("Nested", Some(0)),
                ("Nested", Some(5)),
            ]
        );
        assert!(file.decls[3].snapshot.is_local);
        assert!(file.decls[4].snapshot.is_local);
        assert_eq!(file.decls[3].snapshot.qualified_name, None);
        assert_eq!(
            file.decls[5].snapshot.qualified_name.as_deref(),
            Some("foo.A.Nested")
        );
        assert_eq!(file.find("A.Nested"), Some(5));
        assert_eq!(file.find("A.field"), Some(1));
        assert_eq!(file.find("A.missing"), None);
    }

    #[test]
    fn anchors_cover_statements_inside_anonymous_bodies() {
        let file = parsed(
            "import foo.*;\n\
             class B { void m() { Parent p = new A() { void run() { go(); } }; } }\n",
        );
        let kinds: Vec<AnchorKind> = file.anchors.iter().map(|anchor| anchor.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AnchorKind::Import,
                AnchorKind::ClassHeader,
                AnchorKind::MethodHeader,
                AnchorKind::Statement,
                AnchorKind::MethodHeader,
                AnchorKind::Statement,
            ]
        );
        // Only `B` and `m` are declarations; the anonymous class is not tracked.
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn snapshot_maps_follow_file_replacement() {
        let mut project = ProjectSnapshot::default();
        let a = FileId::from_raw(0);
        project.insert_file(ParsedFile::parse(
            a,
            1,
            Arc::new("package foo; class A {}".to_string()),
        ));
        assert_eq!(project.classes_named("foo.A").len(), 1);
        assert!(project.is_package_prefix("foo"));

        let clone = project.clone();
        project.insert_file(ParsedFile::parse(
            a,
            2,
            Arc::new("package foo.bar; class Bar {}".to_string()),
        ));

        assert!(project.classes_named("foo.A").is_empty());
        assert_eq!(project.classes_named("foo.bar.Bar").len(), 1);
        assert!(project.is_package_prefix("foo"));
        assert!(!project.has_package("foo"));
        assert_eq!(project.revision(a), Some(2));

        // Earlier clones are unaffected.
        assert_eq!(clone.classes_named("foo.A").len(), 1);
        assert_eq!(clone.revision(a), Some(1));
        assert_eq!(clone.words().files_containing("A").count(), 1);

        project.remove_file(a);
        assert!(!project.contains(a));
        assert!(!project.is_package_prefix("foo"));
    }
}
