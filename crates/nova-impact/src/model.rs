//! Best-effort name and type resolution over a [`ProjectSnapshot`].
//!
//! Anything the model cannot pin down (external types, incomplete hierarchies, unknown
//! expressions) resolves to something compatible. Only definite breakage reaches callers.

use std::collections::{BTreeSet, HashSet, VecDeque};

use nova_core::FileId;
use nova_syntax::ast::{is_primitive_name, ClassKind, Visibility};

use crate::project::{DeclSite, ParsedFile, ProjectSnapshot, SiteRef};
use crate::snapshot::{DeclKind, Snapshot, TypeSig};

/// Types every compilation unit sees without an import.
const JAVA_LANG: &[&str] = &[
    "AutoCloseable",
    "Boolean",
    "Byte",
    "Character",
    "CharSequence",
    "Class",
    "Cloneable",
    "Comparable",
    "Deprecated",
    "Double",
    "Enum",
    "Error",
    "Exception",
    "Float",
    "FunctionalInterface",
    "IllegalArgumentException",
    "IllegalStateException",
    "Integer",
    "Iterable",
    "Long",
    "Math",
    "NullPointerException",
    "Number",
    "Object",
    "Override",
    "Record",
    "Runnable",
    "RuntimeException",
    "Short",
    "String",
    "StringBuilder",
    "SuppressWarnings",
    "System",
    "Thread",
    "Throwable",
    "UnsupportedOperationException",
    "Void",
];

/// Members inherited from `java.lang.Object`.
const OBJECT_METHODS: &[&str] = &[
    "clone", "equals", "finalize", "getClass", "hashCode", "notify", "notifyAll", "toString",
    "wait",
];

const WIDENING: &[(&str, &[&str])] = &[
    ("byte", &["short", "int", "long", "float", "double"]),
    ("short", &["int", "long", "float", "double"]),
    ("char", &["int", "long", "float", "double"]),
    ("int", &["long", "float", "double"]),
    ("long", &["float", "double"]),
    ("float", &["double"]),
];

/// The project as seen by one evaluation, optionally with one declaration replaced by another
/// snapshot of itself.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
    project: &'a ProjectSnapshot,
    overlay: Option<(SiteRef, &'a Snapshot)>,
}

impl<'a> View<'a> {
    pub fn new(project: &'a ProjectSnapshot) -> Self {
        Self {
            project,
            overlay: None,
        }
    }

    pub fn with_overlay(project: &'a ProjectSnapshot, site: SiteRef, snapshot: &'a Snapshot) -> Self {
        Self {
            project,
            overlay: Some((site, snapshot)),
        }
    }

    pub fn project(&self) -> &'a ProjectSnapshot {
        self.project
    }

    pub fn file(&self, file: FileId) -> Option<&'a ParsedFile> {
        self.project.file(file).map(|parsed| parsed.as_ref())
    }

    pub fn site(&self, site: SiteRef) -> Option<&'a DeclSite> {
        self.project.site(site)
    }

    /// Signature of `site`, honoring the overlay.
    pub fn sig(&self, site: SiteRef) -> Option<&'a Snapshot> {
        match self.overlay {
            Some((overlay, snapshot)) if overlay == site => Some(snapshot),
            _ => self.project.site(site).map(|decl| &decl.snapshot),
        }
    }

    pub fn parent(&self, site: SiteRef) -> Option<SiteRef> {
        let parent = self.site(site)?.parent?;
        Some(SiteRef {
            file: site.file,
            index: parent,
        })
    }

    pub fn children(&self, site: SiteRef) -> impl Iterator<Item = SiteRef> + 'a {
        let file = site.file;
        self.site(site)
            .into_iter()
            .flat_map(move |decl| decl.children.iter().map(move |&index| SiteRef { file, index }))
    }

    pub fn class_by_qualified_name(&self, qualified: &str) -> Option<SiteRef> {
        if let Some((site, snapshot)) = self.overlay {
            if snapshot.kind == DeclKind::Class
                && snapshot.qualified_name.as_deref() == Some(qualified)
            {
                return Some(site);
            }
        }
        self.project
            .classes_named(qualified)
            .iter()
            .copied()
            .find(|&site| {
                self.sig(site)
                    .is_some_and(|sig| sig.qualified_name.as_deref() == Some(qualified))
            })
    }
}

/// Resolved type of a value or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Prim(String),
    Class(SiteRef),
    /// A type defined outside the project, by (possibly qualified) name.
    Named(String),
    Array(Box<Ty>),
    Null,
    Void,
    Unknown,
}

impl Ty {
    pub fn string() -> Ty {
        Ty::Named("java.lang.String".to_string())
    }

    pub fn boolean() -> Ty {
        Ty::Prim("boolean".to_string())
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Ty::Named(name) if name == "String" || name == "java.lang.String")
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }
}

/// Whether `name` is implicitly imported from `java.lang`.
pub fn is_java_lang(name: &str) -> bool {
    JAVA_LANG.contains(&name)
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn is_object(name: &str) -> bool {
    name == "Object" || name == "java.lang.Object"
}

/// Lexical position a type name is resolved from.
#[derive(Debug, Clone, Copy)]
pub struct TypeCtx<'a> {
    pub file: &'a ParsedFile,
    /// Innermost enclosing declared class.
    pub class: Option<SiteRef>,
    pub at: usize,
}

/// Outcome of a member lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(SiteRef),
    /// An enum constant of the given enum.
    Constant(SiteRef),
    /// Not found; `complete` is false when part of the hierarchy could not be inspected.
    Missing { complete: bool },
}

/// Supertypes of a class plus whether every one of them is inside the project.
#[derive(Debug, Clone, Default)]
pub struct Supertypes {
    pub types: Vec<Ty>,
    pub complete: bool,
}

pub struct Model<'a> {
    pub view: View<'a>,
    probes: &'a BTreeSet<String>,
}

impl<'a> Model<'a> {
    /// `probes` are names whose failure to resolve is meaningful; other unknown type names
    /// are assumed to come from outside the project.
    pub fn new(view: View<'a>, probes: &'a BTreeSet<String>) -> Self {
        Self { view, probes }
    }

    pub fn is_probe(&self, name: &str) -> bool {
        self.probes.contains(name)
    }

    /// Context for the signature types of `site`.
    pub fn ctx_of(&self, site: SiteRef) -> Option<TypeCtx<'a>> {
        let file = self.view.file(site.file)?;
        let decl = file.site(site.index)?;
        Some(TypeCtx {
            file,
            class: self.view.parent(site),
            at: decl.range.start,
        })
    }

    pub fn resolve_sig(&self, ctx: TypeCtx<'_>, sig: &TypeSig) -> Result<Ty, String> {
        if sig.dims > 0 {
            let element = TypeSig {
                dims: 0,
                ..sig.clone()
            };
            let mut ty = self.resolve_sig(ctx, &element)?;
            for _ in 0..sig.dims {
                ty = Ty::Array(Box::new(ty));
            }
            return Ok(ty);
        }
        if is_primitive_name(&sig.name) {
            return Ok(if sig.name == "void" {
                Ty::Void
            } else {
                Ty::Prim(sig.name.clone())
            });
        }
        self.resolve_type_name(ctx, &sig.name)
    }

    /// Resolves a possibly dotted type name. `Err` carries the segment that failed.
    pub fn resolve_type_name(&self, ctx: TypeCtx<'_>, name: &str) -> Result<Ty, String> {
        let segments: Vec<&str> = name.split('.').collect();
        let (first, rest) = match segments.split_first() {
            Some(split) => split,
            None => return Ok(Ty::Unknown),
        };

        match self.resolve_simple_type(ctx, first) {
            Some(Ty::Class(site)) => return self.member_type_path(site, rest, name),
            Some(ty) if rest.is_empty() => return Ok(ty),
            Some(_) => return Ok(Ty::Named(name.to_string())),
            None => {}
        }

        if rest.is_empty() {
            if is_java_lang(first) {
                return Ok(Ty::Named(format!("java.lang.{first}")));
            }
            if self.probes.contains(*first) && !self.has_external_star_import(ctx.file) {
                return Err(first.to_string());
            }
            return Ok(Ty::Named(name.to_string()));
        }

        // `pkg.sub.Type.Inner`: find the first prefix naming a top-level class.
        let mut package = first.to_string();
        for (idx, segment) in rest.iter().enumerate() {
            let qualified = format!("{package}.{segment}");
            if let Some(site) = self.view.class_by_qualified_name(&qualified) {
                return self.member_type_path(site, &rest[idx + 1..], name);
            }
            if idx + 1 == rest.len() && self.view.project().has_package(&package) {
                return Err(segment.to_string());
            }
            package = qualified;
        }
        Ok(Ty::Named(name.to_string()))
    }

    fn member_type_path(&self, mut site: SiteRef, rest: &[&str], full: &str) -> Result<Ty, String> {
        for segment in rest {
            match self.find_member_class(site, segment) {
                Lookup::Found(inner) => site = inner,
                Lookup::Missing { complete: true } => return Err(segment.to_string()),
                Lookup::Missing { complete: false } | Lookup::Constant(_) => {
                    return Ok(Ty::Named(full.to_string()))
                }
            }
        }
        Ok(Ty::Class(site))
    }

    /// Single-segment type lookup in the usual order: enclosing classes and their member (or
    /// visible local) classes, the file's own classes, single-type imports, the package, and
    /// on-demand imports.
    pub fn resolve_simple_type(&self, ctx: TypeCtx<'_>, name: &str) -> Option<Ty> {
        let view = &self.view;
        let mut class = ctx.class;
        while let Some(current) = class {
            for child in view.children(current) {
                let Some(sig) = view.sig(child) else {
                    continue;
                };
                if sig.is_class()
                    && sig.name == name
                    && (!sig.is_local || self.local_visible(child, ctx.at))
                {
                    return Some(Ty::Class(child));
                }
            }
            if view.sig(current).is_some_and(|sig| sig.name == name) {
                return Some(Ty::Class(current));
            }
            class = view.parent(current);
        }

        for root in ctx.file.roots() {
            let site = ctx.file.site_ref(root);
            if view.sig(site).is_some_and(|sig| sig.name == name) {
                return Some(Ty::Class(site));
            }
        }

        for import in &ctx.file.unit.imports {
            if import.is_static || import.is_star || import.simple_name() != Some(name) {
                continue;
            }
            if let Some(site) = view.class_by_qualified_name(&import.path) {
                return Some(Ty::Class(site));
            }
            if !self.is_project_prefix(&import.path) {
                return Some(Ty::Named(import.path.clone()));
            }
        }

        let qualified = if ctx.file.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", ctx.file.package)
        };
        if let Some(site) = view.class_by_qualified_name(&qualified) {
            return Some(Ty::Class(site));
        }

        for import in &ctx.file.unit.imports {
            if import.is_static || !import.is_star {
                continue;
            }
            if let Some(site) = view.class_by_qualified_name(&format!("{}.{name}", import.path)) {
                return Some(Ty::Class(site));
            }
        }

        None
    }

    /// Whether the package part of `path` (everything before the last segment) belongs to the
    /// project.
    pub fn is_project_prefix(&self, path: &str) -> bool {
        match path.rsplit_once('.') {
            Some((prefix, _)) => {
                self.view.project().has_package(prefix)
                    || self.view.class_by_qualified_name(prefix).is_some()
            }
            None => false,
        }
    }

    pub fn has_external_star_import(&self, file: &ParsedFile) -> bool {
        file.unit.imports.iter().any(|import| {
            import.is_star
                && !self.view.project().has_package(&import.path)
                && self.view.class_by_qualified_name(&import.path).is_none()
        })
    }

    /// Local classes are visible inside the member that declares them.
    fn local_visible(&self, local: SiteRef, at: usize) -> bool {
        let (Some(parent), Some(local_site)) = (self.view.parent(local), self.view.site(local))
        else {
            return false;
        };
        for member in self.view.children(parent) {
            let Some(site) = self.view.site(member) else {
                continue;
            };
            if !site.snapshot.is_local && site.range.contains_span(local_site.range) {
                return site.range.contains(at);
            }
        }
        true
    }

    pub fn supertypes(&self, class: SiteRef) -> Supertypes {
        let Some(sig) = self.view.sig(class) else {
            return Supertypes::default();
        };
        let Some(ctx) = self.ctx_of(class) else {
            return Supertypes::default();
        };

        let mut result = Supertypes {
            types: Vec::new(),
            complete: !matches!(
                sig.class_kind,
                Some(ClassKind::Enum | ClassKind::Record | ClassKind::Annotation)
            ),
        };
        for ty in sig.extends.iter().chain(&sig.implements) {
            match self.resolve_sig(ctx, ty) {
                Ok(Ty::Class(site)) => result.types.push(Ty::Class(site)),
                Ok(Ty::Named(name)) => {
                    if !is_object(&name) {
                        result.complete = false;
                    }
                    result.types.push(Ty::Named(name));
                }
                Ok(_) | Err(_) => result.complete = false,
            }
        }
        result
    }

    /// Whether `sub` is `sup` or one of its subtypes. `None` when the answer depends on types
    /// outside the project.
    pub fn is_subclass(&self, sub: SiteRef, sup: &Ty) -> Option<bool> {
        match sup {
            Ty::Class(target) if *target == sub => return Some(true),
            Ty::Named(name) if is_object(name) => return Some(true),
            Ty::Class(_) | Ty::Named(_) => {}
            _ => return Some(false),
        }

        let mut complete = true;
        let mut seen = HashSet::from([sub]);
        let mut queue = VecDeque::from([sub]);
        while let Some(class) = queue.pop_front() {
            let supertypes = self.supertypes(class);
            complete &= supertypes.complete;
            for ty in supertypes.types {
                match (&ty, sup) {
                    (Ty::Class(site), Ty::Class(target)) if site == target => return Some(true),
                    (Ty::Named(a), Ty::Named(b)) if simple_name(a) == simple_name(b) => {
                        return Some(true)
                    }
                    _ => {}
                }
                if let Ty::Class(site) = ty {
                    if seen.insert(site) {
                        queue.push_back(site);
                    }
                }
            }
        }
        if complete {
            Some(false)
        } else {
            None
        }
    }

    /// `class` followed by every project supertype, breadth first.
    pub fn hierarchy(&self, class: SiteRef) -> (Vec<SiteRef>, bool) {
        let mut complete = true;
        let mut order = vec![class];
        let mut seen = HashSet::from([class]);
        let mut idx = 0;
        while let Some(&current) = order.get(idx) {
            idx += 1;
            let supertypes = self.supertypes(current);
            complete &= supertypes.complete;
            for ty in supertypes.types {
                if let Ty::Class(site) = ty {
                    if seen.insert(site) {
                        order.push(site);
                    }
                }
            }
        }
        (order, complete)
    }

    pub fn hierarchy_complete(&self, class: SiteRef) -> bool {
        self.hierarchy(class).1
    }

    pub fn find_field(&self, class: SiteRef, name: &str) -> Lookup {
        let (order, complete) = self.hierarchy(class);
        for current in order {
            for child in self.view.children(current) {
                if self
                    .view
                    .sig(child)
                    .is_some_and(|sig| sig.kind == DeclKind::Field && sig.name == name)
                {
                    return Lookup::Found(child);
                }
            }
            if self.is_enum_constant(current, name) {
                return Lookup::Constant(current);
            }
        }
        Lookup::Missing { complete }
    }

    fn is_enum_constant(&self, class: SiteRef, name: &str) -> bool {
        self.view
            .sig(class)
            .is_some_and(|sig| sig.class_kind == Some(ClassKind::Enum))
            && self
                .view
                .site(class)
                .is_some_and(|site| site.constants.iter().any(|constant| constant == name))
    }

    /// Methods named `name` in `class` and its supertypes. The flag is false when more could
    /// exist outside the project.
    pub fn find_methods(&self, class: SiteRef, name: &str) -> (Vec<SiteRef>, bool) {
        let (order, complete) = self.hierarchy(class);
        let mut methods = Vec::new();
        for current in order {
            for child in self.view.children(current) {
                if self.view.sig(child).is_some_and(|sig| {
                    sig.kind == DeclKind::Method && !sig.is_constructor && sig.name == name
                }) {
                    methods.push(child);
                }
            }
        }
        (methods, complete && !OBJECT_METHODS.contains(&name))
    }

    pub fn constructors(&self, class: SiteRef) -> Vec<SiteRef> {
        self.view
            .children(class)
            .filter(|&child| self.view.sig(child).is_some_and(|sig| sig.is_constructor))
            .collect()
    }

    pub fn find_member_class(&self, class: SiteRef, name: &str) -> Lookup {
        let (order, complete) = self.hierarchy(class);
        for current in order {
            for child in self.view.children(current) {
                if self
                    .view
                    .sig(child)
                    .is_some_and(|sig| sig.is_class() && !sig.is_local && sig.name == name)
                {
                    return Lookup::Found(child);
                }
            }
        }
        Lookup::Missing { complete }
    }

    /// Overridable methods matching `name` and `params` in `classes` and their supertypes.
    pub fn overridden(&self, classes: &[SiteRef], name: &str, params: &[Ty]) -> (Vec<SiteRef>, bool) {
        let mut complete = true;
        let mut found = Vec::new();
        for &class in classes {
            let (order, class_complete) = self.hierarchy(class);
            complete &= class_complete;
            for current in order {
                for child in self.view.children(current) {
                    let Some(sig) = self.view.sig(child) else {
                        continue;
                    };
                    if sig.kind != DeclKind::Method
                        || sig.is_constructor
                        || sig.name != name
                        || sig.visibility == Visibility::Private
                        || sig.params.len() != params.len()
                        || found.contains(&child)
                    {
                        continue;
                    }
                    let same_params = self.param_types(child).iter().zip(params).all(|(a, b)| {
                        a.is_unknown() || b.is_unknown() || self.same_type(a, b)
                    });
                    if same_params {
                        found.push(child);
                    }
                }
            }
        }
        (found, complete && !OBJECT_METHODS.contains(&name))
    }

    pub fn param_types(&self, method: SiteRef) -> Vec<Ty> {
        let (Some(sig), Some(ctx)) = (self.view.sig(method), self.ctx_of(method)) else {
            return Vec::new();
        };
        sig.params
            .iter()
            .map(|param| self.resolve_sig(ctx, param).unwrap_or(Ty::Unknown))
            .collect()
    }

    /// Declared field type or method return type.
    pub fn declared_type(&self, site: SiteRef) -> Ty {
        let (Some(sig), Some(ctx)) = (self.view.sig(site), self.ctx_of(site)) else {
            return Ty::Unknown;
        };
        match &sig.ty {
            Some(ty) => self.resolve_sig(ctx, ty).unwrap_or(Ty::Unknown),
            None => Ty::Unknown,
        }
    }

    pub fn same_type(&self, a: &Ty, b: &Ty) -> bool {
        match (a, b) {
            (Ty::Named(a), Ty::Named(b)) => simple_name(a) == simple_name(b),
            (Ty::Array(a), Ty::Array(b)) => self.same_type(a, b),
            _ => a == b,
        }
    }

    /// Whether a value of type `from` may be stored in `to`. Unknowns are compatible.
    pub fn assignable(&self, to: &Ty, from: &Ty, from_literal: bool) -> bool {
        match (to, from) {
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (_, Ty::Void) | (Ty::Void, _) => false,
            (Ty::Prim(_), Ty::Null) => false,
            (_, Ty::Null) => true,
            (Ty::Prim(to), Ty::Prim(from)) => {
                to == from
                    || WIDENING
                        .iter()
                        .any(|(src, targets)| src == from && targets.contains(&to.as_str()))
                    || (from_literal
                        && from == "int"
                        && matches!(to.as_str(), "byte" | "short" | "char"))
            }
            // Boxing and unboxing.
            (Ty::Prim(_), Ty::Named(name)) | (Ty::Named(name), Ty::Prim(_)) => {
                !(name == "String" || name == "java.lang.String")
            }
            (Ty::Prim(_), _) | (_, Ty::Prim(_)) => false,
            (Ty::Named(to), _) if is_object(to) => true,
            (Ty::Named(to), Ty::Named(from)) => {
                simple_name(to) == simple_name(from)
                    || !(is_well_known(to) && is_well_known(from))
            }
            (Ty::Named(_), Ty::Class(class)) => self.is_subclass(*class, to) != Some(false),
            (Ty::Class(_), Ty::Named(from)) => !is_well_known(from),
            (Ty::Class(_), Ty::Class(class)) => self.is_subclass(*class, to) != Some(false),
            (Ty::Null, _) => false,
            (Ty::Array(to), Ty::Array(from)) => match (to.as_ref(), from.as_ref()) {
                (Ty::Prim(a), Ty::Prim(b)) => a == b,
                (to, from) => self.assignable(to, from, false),
            },
            (Ty::Array(_), _) | (_, Ty::Array(_)) => false,
        }
    }

    /// Whether the member or class `target` may be used from `from`.
    pub fn accessible(&self, target: SiteRef, from: TypeCtx<'_>) -> bool {
        let Some(sig) = self.view.sig(target) else {
            return true;
        };
        match sig.visibility {
            Visibility::Public => true,
            Visibility::Private => target.file == from.file.file,
            Visibility::Package | Visibility::Protected => {
                let same_package = self
                    .view
                    .file(target.file)
                    .is_some_and(|file| file.package == from.file.package);
                if same_package || sig.visibility == Visibility::Package {
                    return same_package;
                }
                let Some(owner) = (if sig.is_class() {
                    Some(target)
                } else {
                    self.view.parent(target)
                }) else {
                    return true;
                };
                let mut class = from.class;
                while let Some(current) = class {
                    if self.is_subclass(current, &Ty::Class(owner)) != Some(false) {
                        return true;
                    }
                    class = self.view.parent(current);
                }
                false
            }
        }
    }

    pub fn display(&self, ty: &Ty) -> String {
        match ty {
            Ty::Prim(name) => name.clone(),
            Ty::Class(site) => self
                .view
                .sig(*site)
                .map(|sig| sig.name.clone())
                .unwrap_or_else(|| "?".to_string()),
            Ty::Named(name) => simple_name(name).to_string(),
            Ty::Array(inner) => format!("{}[]", self.display(inner)),
            Ty::Null => "null".to_string(),
            Ty::Void => "void".to_string(),
            Ty::Unknown => "?".to_string(),
        }
    }
}

/// Final `java.lang` value types whose mutual incompatibility is certain.
fn is_well_known(name: &str) -> bool {
    matches!(
        simple_name(name),
        "String" | "Integer" | "Long" | "Short" | "Byte" | "Character" | "Boolean" | "Double"
            | "Float"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ParsedFile;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn project(files: &[&str]) -> ProjectSnapshot {
        let mut project = ProjectSnapshot::default();
        for (idx, text) in files.iter().enumerate() {
            project.insert_file(ParsedFile::parse(
                FileId::from_raw(idx as u32),
                0,
                Arc::new(text.to_string()),
            ));
        }
        project
    }

    fn site(project: &ProjectSnapshot, file: u32, path: &str) -> SiteRef {
        let parsed = project.file(FileId::from_raw(file)).expect("file");
        parsed.site_ref(parsed.find(path).expect("declaration"))
    }

    fn top_ctx<'a>(project: &'a ProjectSnapshot, file: u32) -> TypeCtx<'a> {
        TypeCtx {
            file: project.file(FileId::from_raw(file)).expect("file"),
            class: None,
            at: 0,
        }
    }

    #[test]
    fn type_names_resolve_through_imports_and_packages() {
        let project = project(&[
            "package foo; public class A { public static class Inner {} }",
            "package bar; import foo.*; class B {}",
            "package bar; import foo.A; class C {}",
            "package foo; class D {}",
        ]);
        let probes = BTreeSet::from(["Missing".to_string()]);
        let model = Model::new(View::new(&project), &probes);
        let a = site(&project, 0, "A");
        let inner = site(&project, 0, "A.Inner");

        assert_eq!(model.resolve_type_name(top_ctx(&project, 1), "A"), Ok(Ty::Class(a)));
        assert_eq!(model.resolve_type_name(top_ctx(&project, 2), "A"), Ok(Ty::Class(a)));
        assert_eq!(
            model.resolve_type_name(top_ctx(&project, 1), "A.Inner"),
            Ok(Ty::Class(inner))
        );
        assert_eq!(
            model.resolve_type_name(top_ctx(&project, 1), "foo.A.Inner"),
            Ok(Ty::Class(inner))
        );
        assert_eq!(
            model.resolve_type_name(top_ctx(&project, 3), "A"),
            Ok(Ty::Class(a)),
            "same package"
        );
        assert_eq!(
            model.resolve_type_name(top_ctx(&project, 1), "String"),
            Ok(Ty::string())
        );
        assert_eq!(
            model.resolve_type_name(top_ctx(&project, 1), "Missing"),
            Err("Missing".to_string())
        );
        assert_eq!(
            model.resolve_type_name(top_ctx(&project, 1), "foo.Gone"),
            Err("Gone".to_string())
        );
        assert_eq!(
            model.resolve_type_name(top_ctx(&project, 1), "java.util.List"),
            Ok(Ty::Named("java.util.List".to_string()))
        );
        assert_eq!(
            model.resolve_type_name(top_ctx(&project, 1), "Unrelated"),
            Ok(Ty::Named("Unrelated".to_string()))
        );
    }

    #[test]
    fn overlay_restores_the_previous_class_name() {
        let project = project(&["package foo; public class Bar {}", "package bar; import foo.*; class B {}"]);
        let bar = site(&project, 0, "Bar");
        let mut old = project.site(bar).expect("site").snapshot.clone();
        old.name = "A".to_string();
        old.qualified_name = Some("foo.A".to_string());

        let probes = BTreeSet::from(["A".to_string(), "Bar".to_string()]);
        let current = Model::new(View::new(&project), &probes);
        let previous = Model::new(View::with_overlay(&project, bar, &old), &probes);

        assert_eq!(
            current.resolve_type_name(top_ctx(&project, 1), "A"),
            Err("A".to_string())
        );
        assert_eq!(
            previous.resolve_type_name(top_ctx(&project, 1), "A"),
            Ok(Ty::Class(bar))
        );
        assert_eq!(
            previous.resolve_type_name(top_ctx(&project, 1), "Bar"),
            Err("Bar".to_string())
        );
    }

    #[test]
    fn hierarchy_queries_are_lenient_about_external_supertypes() {
        let project = project(&[
            "package foo;\n\
             class Base { int x; void run() {} }\n\
             class Sub extends Base {}\n\
             class Ext extends java.util.AbstractList {}\n\
             class Other {}\n",
        ]);
        let probes = BTreeSet::new();
        let model = Model::new(View::new(&project), &probes);
        let base = site(&project, 0, "Base");
        let sub = site(&project, 0, "Sub");
        let ext = site(&project, 0, "Ext");
        let other = site(&project, 0, "Other");

        assert_eq!(model.is_subclass(sub, &Ty::Class(base)), Some(true));
        assert_eq!(model.is_subclass(other, &Ty::Class(base)), Some(false));
        assert_eq!(model.is_subclass(ext, &Ty::Class(base)), None);

        assert_eq!(model.find_field(sub, "x"), Lookup::Found(site(&project, 0, "Base.x")));
        assert_eq!(model.find_field(sub, "y"), Lookup::Missing { complete: true });
        assert_eq!(model.find_field(ext, "y"), Lookup::Missing { complete: false });
        assert_eq!(model.find_methods(sub, "run").0, vec![site(&project, 0, "Base.run")]);
        assert!(!model.find_methods(sub, "toString").1);

        assert!(model.assignable(&Ty::Class(base), &Ty::Class(sub), false));
        assert!(!model.assignable(&Ty::Class(base), &Ty::Class(other), false));
        assert!(model.assignable(&Ty::Class(base), &Ty::Class(ext), false));
    }

    #[test]
    fn assignability_of_builtin_types() {
        let project = project(&[]);
        let probes = BTreeSet::new();
        let model = Model::new(View::new(&project), &probes);
        let prim = |name: &str| Ty::Prim(name.to_string());

        assert!(model.assignable(&prim("long"), &prim("int"), false));
        assert!(!model.assignable(&prim("int"), &prim("long"), false));
        assert!(model.assignable(&prim("byte"), &prim("int"), true));
        assert!(!model.assignable(&prim("int"), &Ty::string(), false));
        assert!(!model.assignable(&Ty::string(), &prim("int"), false));
        assert!(model.assignable(&Ty::Named("Integer".into()), &prim("int"), false));
        assert!(model.assignable(&Ty::string(), &Ty::Null, false));
        assert!(!model.assignable(&prim("int"), &Ty::Null, false));
        assert!(!model.assignable(&Ty::string(), &Ty::Named("Integer".into()), false));
        assert!(model.assignable(&Ty::Named("java.util.List".into()), &Ty::Named("ArrayList".into()), false));
        assert!(model.assignable(&prim("int"), &Ty::Unknown, false));
        assert!(!model.assignable(&prim("int"), &Ty::Void, false));
    }

    #[test]
    fn nothing_is_assignable_to_the_null_type() {
        let project = project(&["class Box {}\n"]);
        let probes = BTreeSet::new();
        let model = Model::new(View::new(&project), &probes);
        let class = Ty::Class(site(&project, 0, "Box"));

        assert!(!model.assignable(&Ty::Null, &class, false));
        assert!(!model.assignable(&Ty::Null, &Ty::string(), false));
        assert!(model.assignable(&Ty::Null, &Ty::Null, false));
        assert!(model.assignable(&class, &Ty::Null, false));
    }
}
