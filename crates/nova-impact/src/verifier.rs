//! Re-checks a candidate file against the current project and decides which broken elements
//! are attributable to one changed declaration.
//!
//! [`check_file`] walks a file and produces a [`Diag`] for every reference the model is sure
//! is broken. [`verify_file`] runs it against the current project and, for breaking changes,
//! against the same project with the changed declaration's previous snapshot overlaid; an
//! element is reported when it is broken now and was not broken before, or when it already
//! carried a problem that still applies.

use std::collections::{BTreeMap, BTreeSet};

use nova_core::FileId;
use nova_syntax::ast::{
    self, AssignOp, BinaryOp, ClassDecl, ClassKind, Expr, LiteralKind, MemberDecl, Stmt, UnaryOp,
    Visibility,
};
use nova_syntax::Span;

use crate::model::{is_java_lang, Lookup, Model, Ty, TypeCtx, View};
use crate::problem::ProblemKind;
use crate::project::{AnchorKind, ParsedFile, ProjectSnapshot, SiteRef};
use crate::snapshot::{ChangeKind, DeclKind, Snapshot, TypeSig};

/// A broken reference found while checking one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    /// Innermost anchor enclosing the reference.
    pub anchor: u32,
    pub kind: ProblemKind,
    /// Declarations the failing check depended on.
    pub targets: Vec<SiteRef>,
}

impl Diag {
    fn concerns(&self, decl: SiteRef, probes: &BTreeSet<String>) -> bool {
        self.targets.contains(&decl) || self.kind.name().is_some_and(|name| probes.contains(name))
    }
}

/// One changed declaration, as seen by a verification pass.
#[derive(Debug, Clone, Copy)]
pub struct Change<'a> {
    pub site: SiteRef,
    /// Baseline before the change; `None` disables the before/after comparison.
    pub previous: Option<&'a Snapshot>,
    pub kind: ChangeKind,
    /// Names a reference to the declaration would use, before and after the change.
    pub probes: &'a BTreeSet<String>,
}

/// A confirmed breakage in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub anchor: u32,
    pub range: Span,
    pub kind: ProblemKind,
}

/// Verifies `file` for `change`. `retained` are spans of elements that already carry a
/// problem for the declaration; those are kept for as long as they stay broken.
pub fn verify_file(
    project: &ProjectSnapshot,
    file: FileId,
    change: &Change<'_>,
    retained: &[Span],
) -> Vec<Finding> {
    let Some(parsed) = project.file(file) else {
        return Vec::new();
    };
    let current = relevant(check_file(View::new(project), parsed, change.probes), change);
    if current.is_empty() {
        return Vec::new();
    }

    let before: Option<BTreeSet<u32>> = match (change.kind, change.previous) {
        (ChangeKind::Breaking, Some(previous)) => {
            let view = View::with_overlay(project, change.site, previous);
            Some(
                relevant(check_file(view, parsed, change.probes), change)
                    .into_keys()
                    .collect(),
            )
        }
        _ => None,
    };

    current
        .into_iter()
        .filter_map(|(anchor, kind)| {
            let range = parsed.anchor(anchor)?.range;
            let newly_broken = before
                .as_ref()
                .is_some_and(|before| !before.contains(&anchor));
            let still_broken = retained.iter().any(|&span| overlaps(span, range));
            (newly_broken || still_broken).then_some(Finding {
                anchor,
                range,
                kind,
            })
        })
        .collect()
}

/// First relevant diagnostic per anchor.
fn relevant(diags: Vec<Diag>, change: &Change<'_>) -> BTreeMap<u32, ProblemKind> {
    let mut by_anchor = BTreeMap::new();
    for diag in diags {
        if diag.concerns(change.site, change.probes) {
            by_anchor.entry(diag.anchor).or_insert(diag.kind);
        }
    }
    by_anchor
}

fn overlaps(a: Span, b: Span) -> bool {
    a == b || (a.start < b.end && b.start < a.end)
}

/// Checks every reference in `file` against `view`.
pub fn check_file<'a>(view: View<'a>, file: &'a ParsedFile, probes: &'a BTreeSet<String>) -> Vec<Diag> {
    let mut checker = Checker {
        model: Model::new(view, probes),
        file,
        diags: Vec::new(),
    };
    checker.check_unit();
    checker.diags
}

/// A class whose members are in scope.
#[derive(Debug, Clone, Copy)]
struct Frame {
    /// `None` when the members come from outside the project.
    class: Option<SiteRef>,
    /// Whether instance members of `class` can be used without a qualifier.
    instance: bool,
    /// The frame of an anonymous class body; `class` is its supertype.
    anonymous: bool,
}

#[derive(Debug, Clone, Default)]
struct Ctx {
    /// Enclosing classes, innermost last.
    frames: Vec<Frame>,
    /// Innermost declared (non-anonymous) class.
    lexical: Option<SiteRef>,
    method: Option<SiteRef>,
    return_ty: Option<Ty>,
    /// Class whose constructor or initializer is being checked.
    init_of: Option<SiteRef>,
    anchor: Option<u32>,
    locals: Vec<(String, Ty)>,
}

impl Ctx {
    fn set_instance(&mut self, instance: bool) {
        if let Some(frame) = self.frames.last_mut() {
            frame.instance = instance;
        }
    }
}

#[derive(Debug, Clone)]
struct Typed {
    ty: Ty,
    /// Declarations the type was derived from.
    origin: Vec<SiteRef>,
    /// The field an lvalue denotes.
    field: Option<SiteRef>,
    literal: bool,
}

impl Typed {
    fn of(ty: Ty) -> Self {
        Self {
            ty,
            origin: Vec::new(),
            field: None,
            literal: false,
        }
    }

    fn unknown() -> Self {
        Self::of(Ty::Unknown)
    }

    fn from_site(ty: Ty, site: SiteRef) -> Self {
        Self {
            origin: vec![site],
            ..Self::of(ty)
        }
    }
}

/// What a name or qualified name denotes.
enum Value {
    Expr(Typed),
    Type(Ty),
    Package(String),
}

fn element_class(ty: &Ty) -> Option<SiteRef> {
    match ty {
        Ty::Class(site) => Some(*site),
        Ty::Array(inner) => element_class(inner),
        _ => None,
    }
}

fn is_override(method: &ast::MethodDecl) -> bool {
    method
        .modifiers
        .annotations
        .iter()
        .any(|ann| ann.name == "Override" || ann.name == "java.lang.Override")
}

struct Checker<'a> {
    model: Model<'a>,
    file: &'a ParsedFile,
    diags: Vec<Diag>,
}

impl<'a> Checker<'a> {
    fn report(&mut self, ctx: &Ctx, kind: ProblemKind, targets: Vec<SiteRef>) {
        if let Some(anchor) = ctx.anchor {
            self.diags.push(Diag {
                anchor,
                kind,
                targets,
            });
        }
    }

    fn unresolved(&mut self, ctx: &Ctx, name: &str, targets: Vec<SiteRef>) {
        self.report(
            ctx,
            ProblemKind::UnresolvedReference {
                name: name.to_string(),
            },
            targets,
        );
    }

    fn type_ctx(&self, ctx: &Ctx, at: usize) -> TypeCtx<'a> {
        TypeCtx {
            file: self.file,
            class: ctx.lexical,
            at,
        }
    }

    fn sig(&self, site: SiteRef) -> Option<&'a Snapshot> {
        self.model.view.sig(site)
    }

    fn name_of(&self, site: SiteRef) -> String {
        self.sig(site).map(|sig| sig.name.clone()).unwrap_or_default()
    }

    fn check_access(&mut self, ctx: &Ctx, target: SiteRef, from: TypeCtx<'a>) -> bool {
        if self.model.accessible(target, from) {
            return true;
        }
        let name = self.name_of(target);
        self.report(ctx, ProblemKind::Inaccessible { name }, vec![target]);
        false
    }

    fn check_assignable(&mut self, ctx: &Ctx, to: &Ty, value: &Typed, mut targets: Vec<SiteRef>) {
        if self.model.assignable(to, &value.ty, value.literal) {
            return;
        }
        targets.extend(value.origin.iter().copied());
        targets.extend(element_class(to));
        targets.extend(element_class(&value.ty));
        let kind = ProblemKind::TypeMismatch {
            expected: self.model.display(to),
            found: self.model.display(&value.ty),
        };
        self.report(ctx, kind, targets);
    }

    /// Resolves a written type, reporting unresolved and inaccessible classes.
    fn resolve_type_ref(&mut self, ctx: &Ctx, from: TypeCtx<'a>, ty: &ast::TypeRef) -> Ty {
        for arg in &ty.type_args {
            if arg.name != "?" {
                self.resolve_type_ref(ctx, from, arg);
            }
        }
        match self.model.resolve_sig(from, &TypeSig::from_type_ref(ty)) {
            Ok(resolved) => {
                if let Some(class) = element_class(&resolved) {
                    self.check_access(ctx, class, from);
                }
                resolved
            }
            Err(name) => {
                self.unresolved(ctx, &name, Vec::new());
                Ty::Unknown
            }
        }
    }

    fn check_unit(&mut self) {
        let file = self.file;
        for import in &file.unit.imports {
            self.check_import(import);
        }
        let top = Ctx::default();
        for class in &file.unit.types {
            self.check_class(class, &top);
        }
    }

    fn check_import(&mut self, import: &'a ast::ImportDecl) {
        let file = self.file;
        let view = self.model.view;
        let ctx = Ctx {
            anchor: file.anchor_at(AnchorKind::Import, import.range),
            ..Ctx::default()
        };
        let from = self.type_ctx(&ctx, import.range.start);

        if !import.is_static {
            if import.is_star {
                return;
            }
            match view.class_by_qualified_name(&import.path) {
                Some(class) => {
                    self.check_access(&ctx, class, from);
                }
                None if self.model.is_project_prefix(&import.path) => {
                    let name = import.path.rsplit('.').next().unwrap_or(&import.path);
                    self.unresolved(&ctx, name, Vec::new());
                }
                None => {}
            }
            return;
        }

        let (class_path, member) = if import.is_star {
            (import.path.as_str(), None)
        } else {
            match import.path.rsplit_once('.') {
                Some((class, member)) => (class, Some(member)),
                None => return,
            }
        };
        let Some(class) = view.class_by_qualified_name(class_path) else {
            if self.model.is_project_prefix(class_path) {
                let name = class_path.rsplit('.').next().unwrap_or(class_path);
                self.unresolved(&ctx, name, Vec::new());
            }
            return;
        };
        if !self.check_access(&ctx, class, from) {
            return;
        }
        let Some(member) = member else {
            return;
        };
        let found = !matches!(self.model.find_field(class, member), Lookup::Missing { .. })
            || !self.model.find_methods(class, member).0.is_empty()
            || matches!(self.model.find_member_class(class, member), Lookup::Found(_));
        if !found && self.model.hierarchy_complete(class) {
            self.unresolved(&ctx, member, vec![class]);
        }
    }

    fn check_class(&mut self, decl: &'a ClassDecl, outer: &Ctx) {
        let file = self.file;
        let site = file.site_at(decl.name_range).map(|idx| file.site_ref(idx));
        let sig = site.and_then(|site| self.sig(site));

        let mut ctx = outer.clone();
        if sig.is_some_and(|sig| sig.is_static) {
            for frame in &mut ctx.frames {
                frame.instance = false;
            }
        }
        ctx.frames.push(Frame {
            class: site,
            instance: true,
            anonymous: false,
        });
        ctx.lexical = site.or(outer.lexical);
        ctx.method = None;
        ctx.return_ty = None;
        ctx.init_of = None;
        ctx.anchor = file.anchor_at(AnchorKind::ClassHeader, decl.header_range());

        self.check_class_header(decl, &ctx, outer);
        if let Some(site) = site {
            let abstract_class = sig.is_some_and(|sig| sig.is_abstract);
            if !abstract_class {
                self.check_implemented(&ctx, site, &[], false);
            }
        }
        self.check_members(&decl.members, site, &ctx);
    }

    fn check_class_header(&mut self, decl: &'a ClassDecl, ctx: &Ctx, outer: &Ctx) {
        let from = TypeCtx {
            file: self.file,
            class: outer.lexical,
            at: decl.range.start,
        };
        let is_interface = decl.kind.is_interface();
        let clauses = decl
            .extends
            .iter()
            .map(|ty| (true, ty))
            .chain(decl.implements.iter().map(|ty| (false, ty)));
        for (extends, ty) in clauses {
            let Ty::Class(target) = self.resolve_type_ref(ctx, from, ty) else {
                continue;
            };
            let Some(target_sig) = self.sig(target) else {
                continue;
            };
            let name = target_sig.name.clone();
            let wants_interface = is_interface || !extends;
            if target_sig.is_interface() != wants_interface {
                self.report(ctx, ProblemKind::ClassKindMismatch { name }, vec![target]);
            } else if !wants_interface
                && (target_sig.is_final || target_sig.class_kind == Some(ClassKind::Enum))
            {
                self.report(ctx, ProblemKind::FinalInheritance { name }, vec![target]);
            }
        }
    }

    /// Checks the members of a declared class (`class` is `Some`) or an anonymous body.
    fn check_members(&mut self, members: &'a [MemberDecl], class: Option<SiteRef>, ctx: &Ctx) {
        let file = self.file;
        let in_interface = class
            .and_then(|class| self.sig(class))
            .is_some_and(|sig| sig.is_interface());
        let owner = ctx.frames.last().and_then(|frame| frame.class);

        for member in members {
            match member {
                MemberDecl::Field(field) => {
                    let site = file.site_at(field.name_range).map(|idx| file.site_ref(idx));
                    let is_static = match site.and_then(|site| self.sig(site)) {
                        Some(sig) => sig.is_static,
                        None => field.modifiers.is_static || in_interface,
                    };
                    let mut ctx = ctx.clone();
                    ctx.set_instance(!is_static);
                    ctx.init_of = owner;
                    ctx.anchor = file.anchor_at(AnchorKind::Field, field.range).or(ctx.anchor);
                    let from = self.type_ctx(&ctx, field.range.start);
                    let declared = self.resolve_type_ref(&ctx, from, &field.ty);
                    if let Some(init) = &field.initializer {
                        let value = self.check_expr(init, &ctx);
                        self.check_assignable(&ctx, &declared, &value, site.into_iter().collect());
                    }
                }
                MemberDecl::Method(method) => self.check_method(method, ctx),
                MemberDecl::Constructor(ctor) => {
                    let mut ctx = ctx.clone();
                    ctx.set_instance(true);
                    ctx.init_of = owner;
                    ctx.method = file.site_at(ctor.name_range).map(|idx| file.site_ref(idx));
                    ctx.anchor = file
                        .anchor_at(AnchorKind::MethodHeader, ctor.header_range())
                        .or(ctx.anchor);
                    self.declare_params(&mut ctx, &ctor.params);
                    self.check_block(&ctor.body, &mut ctx);
                }
                MemberDecl::Initializer(init) => {
                    let mut ctx = ctx.clone();
                    ctx.set_instance(!init.is_static);
                    ctx.init_of = owner;
                    ctx.anchor = None;
                    self.check_block(&init.body, &mut ctx);
                }
                MemberDecl::Type(nested) => {
                    if class.is_some() {
                        self.check_class(nested, ctx);
                    }
                }
            }
        }
    }

    fn declare_params(&mut self, ctx: &mut Ctx, params: &'a [ast::ParamDecl]) -> Vec<Ty> {
        let mut declared = Vec::with_capacity(params.len());
        for param in params {
            let from = self.type_ctx(ctx, param.range.start);
            let ty = self.resolve_type_ref(ctx, from, &param.ty);
            let local = if param.is_varargs {
                Ty::Array(Box::new(ty.clone()))
            } else {
                ty.clone()
            };
            ctx.locals.push((param.name.clone(), local));
            declared.push(ty);
        }
        declared
    }

    fn check_method(&mut self, method: &'a ast::MethodDecl, class_ctx: &Ctx) {
        let file = self.file;
        let site = file.site_at(method.name_range).map(|idx| file.site_ref(idx));
        let sig = site.and_then(|site| self.sig(site));
        let is_static = sig.map_or(method.modifiers.is_static, |sig| sig.is_static);
        let visibility = sig.map_or(method.modifiers.visibility, |sig| sig.visibility);

        let mut ctx = class_ctx.clone();
        ctx.set_instance(!is_static);
        ctx.method = site;
        ctx.init_of = None;
        ctx.anchor = file
            .anchor_at(AnchorKind::MethodHeader, method.header_range())
            .or(ctx.anchor);

        let from = self.type_ctx(&ctx, method.range.start);
        let ret = self.resolve_type_ref(&ctx, from, &method.return_ty);
        let params = self.declare_params(&mut ctx, &method.params);

        if !is_static {
            self.check_override(&ctx, method, &params, &ret, visibility);
        }

        if let Some(body) = &method.body {
            ctx.return_ty = Some(ret);
            self.check_block(body, &mut ctx);
        }
    }

    /// Supertypes whose methods a member of the innermost frame can override, and whether
    /// every one of them is known.
    fn override_bases(&self, ctx: &Ctx) -> Option<(Vec<SiteRef>, bool)> {
        let frame = ctx.frames.last()?;
        let class = frame.class?;
        if frame.anonymous {
            return Some((vec![class], true));
        }
        let supertypes = self.model.supertypes(class);
        let bases = supertypes
            .types
            .iter()
            .filter_map(|ty| match ty {
                Ty::Class(site) => Some(*site),
                _ => None,
            })
            .collect();
        Some((bases, supertypes.complete))
    }

    fn check_override(
        &mut self,
        ctx: &Ctx,
        method: &'a ast::MethodDecl,
        params: &[Ty],
        ret: &Ty,
        visibility: Visibility,
    ) {
        let Some((bases, bases_complete)) = self.override_bases(ctx) else {
            return;
        };
        let name = method.name.clone();
        let (overridden, complete) = self.model.overridden(&bases, &name, params);

        if overridden.is_empty() {
            if is_override(method) && complete && bases_complete {
                self.report(ctx, ProblemKind::MethodDoesNotOverride { name }, bases);
            }
            return;
        }

        for base in overridden {
            let Some(base_sig) = self.sig(base) else {
                continue;
            };
            let base_ret = self.model.declared_type(base);
            let returns_clash = match (ret, &base_ret) {
                (Ty::Void, Ty::Void) => false,
                (Ty::Void, _) | (_, Ty::Void) => !ret.is_unknown() && !base_ret.is_unknown(),
                (Ty::Prim(_), _) | (_, Ty::Prim(_)) => {
                    !ret.is_unknown() && !base_ret.is_unknown() && !self.model.same_type(ret, &base_ret)
                }
                _ => !self.model.assignable(&base_ret, ret, false),
            };
            if base_sig.is_final
                || base_sig.is_static
                || visibility < base_sig.visibility
                || returns_clash
            {
                self.report(ctx, ProblemKind::OverrideConflict { name }, vec![base]);
                return;
            }
        }
    }

    /// Reports abstract methods inherited by `class` that nothing in its hierarchy (or in
    /// `own`, the methods of an anonymous body) implements.
    fn check_implemented(
        &mut self,
        ctx: &Ctx,
        class: SiteRef,
        own: &[&'a ast::MethodDecl],
        include_self: bool,
    ) {
        let view = self.model.view;
        if self.sig(class).is_some_and(|sig| sig.is_interface()) && !include_self {
            return;
        }
        let (order, complete) = self.model.hierarchy(class);
        if !complete {
            return;
        }
        let skip = usize::from(!include_self);
        for &current in order.iter().skip(skip) {
            for candidate in view.children(current) {
                let Some(sig) = self.sig(candidate) else {
                    continue;
                };
                if sig.kind != DeclKind::Method || sig.is_constructor || !sig.is_abstract {
                    continue;
                }
                let implemented_here = own
                    .iter()
                    .any(|method| method.name == sig.name && method.params.len() == sig.params.len());
                if implemented_here || self.implemented_in(&order, candidate, sig) {
                    continue;
                }
                let name = sig.name.clone();
                self.report(
                    ctx,
                    ProblemKind::MissingImplementation { name },
                    vec![candidate, class],
                );
            }
        }
    }

    fn implemented_in(&self, order: &[SiteRef], abstract_method: SiteRef, sig: &Snapshot) -> bool {
        let view = self.model.view;
        let wanted = self.model.param_types(abstract_method);
        order.iter().any(|&class| {
            view.children(class).any(|child| {
                child != abstract_method
                    && self.sig(child).is_some_and(|other| {
                        other.kind == DeclKind::Method
                            && !other.is_constructor
                            && !other.is_abstract
                            && other.name == sig.name
                            && other.params.len() == sig.params.len()
                    })
                    && self
                        .model
                        .param_types(child)
                        .iter()
                        .zip(&wanted)
                        .all(|(a, b)| a.is_unknown() || b.is_unknown() || self.model.same_type(a, b))
            })
        })
    }

    fn check_block(&mut self, block: &'a ast::Block, ctx: &mut Ctx) {
        let scope = ctx.locals.len();
        for stmt in &block.statements {
            self.check_stmt(stmt, ctx);
        }
        ctx.locals.truncate(scope);
    }

    fn check_nested(&mut self, stmt: &'a Stmt, ctx: &mut Ctx) {
        let scope = ctx.locals.len();
        self.check_stmt(stmt, ctx);
        ctx.locals.truncate(scope);
    }

    fn check_stmt(&mut self, stmt: &'a Stmt, ctx: &mut Ctx) {
        let file = self.file;
        let outer_anchor = ctx.anchor;
        if !matches!(stmt, Stmt::Block(_) | Stmt::LocalClass(_) | Stmt::Empty(_)) {
            ctx.anchor = file
                .anchor_at(AnchorKind::Statement, stmt.range())
                .or(outer_anchor);
        }

        match stmt {
            Stmt::LocalVar(local) => {
                let value = local
                    .initializer
                    .as_ref()
                    .map(|init| self.check_expr(init, ctx));
                let declared = if local.ty.name == "var" && local.ty.array_dims == 0 {
                    value.as_ref().map_or(Ty::Unknown, |value| value.ty.clone())
                } else {
                    let from = self.type_ctx(ctx, local.range.start);
                    let declared = self.resolve_type_ref(ctx, from, &local.ty);
                    if let Some(value) = &value {
                        self.check_assignable(ctx, &declared, value, Vec::new());
                    }
                    declared
                };
                ctx.locals.push((local.name.clone(), declared));
            }
            Stmt::LocalClass(decl) => self.check_class(decl, ctx),
            Stmt::Expr(stmt) => {
                self.check_expr(&stmt.expr, ctx);
            }
            Stmt::Return(ret) => {
                if let Some(expr) = &ret.expr {
                    let value = self.check_expr(expr, ctx);
                    if let Some(expected) = ctx.return_ty.clone() {
                        self.check_assignable(ctx, &expected, &value, ctx.method.into_iter().collect());
                    }
                }
            }
            Stmt::If(stmt) => {
                self.check_expr(&stmt.condition, ctx);
                self.check_nested(&stmt.then_branch, ctx);
                for branch in &stmt.else_ifs {
                    self.check_expr(&branch.condition, ctx);
                    self.check_nested(&branch.body, ctx);
                }
                if let Some(else_branch) = &stmt.else_branch {
                    self.check_nested(else_branch, ctx);
                }
            }
            Stmt::While(stmt) => {
                self.check_expr(&stmt.condition, ctx);
                self.check_nested(&stmt.body, ctx);
            }
            Stmt::For(stmt) => {
                let scope = ctx.locals.len();
                for init in &stmt.init {
                    self.check_stmt(init, ctx);
                }
                for expr in stmt
                    .condition
                    .iter()
                    .chain(&stmt.updates)
                    .chain(&stmt.iterable)
                {
                    self.check_expr(expr, ctx);
                }
                self.check_nested(&stmt.body, ctx);
                ctx.locals.truncate(scope);
            }
            Stmt::Try(stmt) => {
                self.check_block(&stmt.body, ctx);
                for catch in &stmt.catches {
                    let scope = ctx.locals.len();
                    self.declare_params(ctx, std::slice::from_ref(&catch.param));
                    self.check_block(&catch.body, ctx);
                    ctx.locals.truncate(scope);
                }
                if let Some(finally) = &stmt.finally {
                    self.check_block(finally, ctx);
                }
            }
            Stmt::Block(block) => self.check_block(block, ctx),
            Stmt::Empty(_) => {}
        }

        ctx.anchor = outer_anchor;
    }

    fn check_expr(&mut self, expr: &'a Expr, ctx: &Ctx) -> Typed {
        match self.eval(expr, ctx) {
            Value::Expr(typed) => typed,
            Value::Type(_) | Value::Package(_) => Typed::unknown(),
        }
    }

    fn eval(&mut self, expr: &'a Expr, ctx: &Ctx) -> Value {
        let typed = match expr {
            Expr::Name(name) => return self.eval_name(&name.name, name.range.start, ctx),
            Expr::FieldAccess(access) => return self.eval_field_access(access, ctx),
            Expr::Literal(literal) => {
                let ty = match literal.kind {
                    LiteralKind::Int => Ty::Prim("int".to_string()),
                    LiteralKind::Long => Ty::Prim("long".to_string()),
                    LiteralKind::Float => Ty::Prim("float".to_string()),
                    LiteralKind::Double => Ty::Prim("double".to_string()),
                    LiteralKind::Char => Ty::Prim("char".to_string()),
                    LiteralKind::Bool => Ty::boolean(),
                    LiteralKind::String => Ty::string(),
                    LiteralKind::Null => Ty::Null,
                };
                Typed {
                    literal: true,
                    ..Typed::of(ty)
                }
            }
            Expr::This(_) => match ctx.frames.last().and_then(|frame| frame.class) {
                Some(class) => Typed::of(Ty::Class(class)),
                None => Typed::unknown(),
            },
            Expr::Call(call) => self.check_call(call, ctx),
            Expr::New(new) => self.check_new(new, ctx),
            Expr::Assign(assign) => {
                let target = self.check_expr(&assign.lhs, ctx);
                let value = self.check_expr(&assign.rhs, ctx);
                self.check_final_write(ctx, &target);
                if assign.op == AssignOp::Assign {
                    self.check_assignable(ctx, &target.ty, &value, target.origin.clone());
                }
                Typed {
                    field: None,
                    ..target
                }
            }
            Expr::Unary(unary) => {
                let operand = self.check_expr(&unary.expr, ctx);
                match unary.op {
                    UnaryOp::Not => Typed::of(Ty::boolean()),
                    UnaryOp::Step => {
                        self.check_final_write(ctx, &operand);
                        Typed {
                            field: None,
                            literal: false,
                            ..operand
                        }
                    }
                    UnaryOp::Neg | UnaryOp::Plus => Typed {
                        field: None,
                        ..operand
                    },
                }
            }
            Expr::Binary(binary) => {
                let lhs = self.check_expr(&binary.lhs, ctx);
                let rhs = self.check_expr(&binary.rhs, ctx);
                let ty = if binary.op.is_comparison() || binary.op.is_logical() {
                    Ty::boolean()
                } else if binary.op == BinaryOp::Add && (lhs.ty.is_string() || rhs.ty.is_string()) {
                    Ty::string()
                } else {
                    numeric_promotion(&lhs.ty, &rhs.ty)
                };
                let mut origin = lhs.origin;
                origin.extend(rhs.origin);
                Typed {
                    ty,
                    origin,
                    field: None,
                    literal: lhs.literal && rhs.literal,
                }
            }
            Expr::Conditional(cond) => {
                self.check_expr(&cond.condition, ctx);
                let then_value = self.check_expr(&cond.then_expr, ctx);
                let else_value = self.check_expr(&cond.else_expr, ctx);
                let ty = match (&then_value.ty, &else_value.ty) {
                    (a, b) if self.model.same_type(a, b) => a.clone(),
                    (Ty::Null, other) | (other, Ty::Null) if !matches!(other, Ty::Prim(_)) => {
                        other.clone()
                    }
                    _ => Ty::Unknown,
                };
                let mut origin = then_value.origin;
                origin.extend(else_value.origin);
                Typed {
                    origin,
                    ..Typed::of(ty)
                }
            }
            Expr::InstanceOf(instance_of) => {
                self.check_expr(&instance_of.expr, ctx);
                let from = self.type_ctx(ctx, instance_of.range.start);
                self.resolve_type_ref(ctx, from, &instance_of.ty);
                Typed::of(Ty::boolean())
            }
            Expr::Cast(cast) => {
                let value = self.check_expr(&cast.expr, ctx);
                let from = self.type_ctx(ctx, cast.range.start);
                let ty = self.resolve_type_ref(ctx, from, &cast.ty);
                Typed {
                    literal: value.literal,
                    ..Typed::of(ty)
                }
            }
            Expr::Index(index) => {
                let target = self.check_expr(&index.target, ctx);
                self.check_expr(&index.index, ctx);
                match target.ty {
                    Ty::Array(inner) => Typed {
                        origin: target.origin,
                        ..Typed::of(*inner)
                    },
                    _ => Typed::unknown(),
                }
            }
            Expr::Missing(_) => Typed::unknown(),
        };
        Value::Expr(typed)
    }

    fn field_value(&self, field: SiteRef) -> Typed {
        Typed {
            field: Some(field),
            ..Typed::from_site(self.model.declared_type(field), field)
        }
    }

    fn eval_name(&mut self, name: &str, at: usize, ctx: &Ctx) -> Value {
        if name == "super" {
            return Value::Expr(Typed::unknown());
        }
        if let Some((_, ty)) = ctx.locals.iter().rev().find(|(local, _)| local == name) {
            return Value::Expr(Typed::of(ty.clone()));
        }

        let mut searched = Vec::new();
        for frame in ctx.frames.iter().rev() {
            let Some(class) = frame.class else {
                return Value::Expr(Typed::unknown());
            };
            searched.push(class);
            match self.model.find_field(class, name) {
                Lookup::Found(field) => {
                    if !frame.instance && !self.sig(field).is_some_and(|sig| sig.is_static) {
                        let kind = ProblemKind::StaticContext {
                            name: name.to_string(),
                        };
                        self.report(ctx, kind, vec![field]);
                    }
                    return Value::Expr(self.field_value(field));
                }
                Lookup::Constant(owner) => {
                    return Value::Expr(Typed::from_site(Ty::Class(owner), owner))
                }
                Lookup::Missing { complete: false } => return Value::Expr(Typed::unknown()),
                Lookup::Missing { complete: true } => {}
            }
        }

        if let Some(value) = self.static_import_field(name) {
            return value;
        }

        let from = self.type_ctx(ctx, at);
        if let Some(ty) = self.model.resolve_simple_type(from, name) {
            return Value::Type(ty);
        }
        if is_java_lang(name) {
            return Value::Type(Ty::Named(format!("java.lang.{name}")));
        }
        let project = self.model.view.project();
        if project.is_package_prefix(name) {
            return Value::Package(name.to_string());
        }
        if self.model.is_probe(name) && !self.model.has_external_star_import(self.file) {
            self.unresolved(ctx, name, searched);
            return Value::Expr(Typed::unknown());
        }
        // Most likely the first segment of an external qualified name.
        Value::Package(name.to_string())
    }

    fn static_import_field(&mut self, name: &str) -> Option<Value> {
        let file = self.file;
        let view = self.model.view;
        for import in &file.unit.imports {
            if !import.is_static {
                continue;
            }
            let class_path = if import.is_star {
                import.path.as_str()
            } else {
                match import.path.rsplit_once('.') {
                    Some((class, member)) if member == name => class,
                    _ => continue,
                }
            };
            match view.class_by_qualified_name(class_path) {
                Some(class) => match self.model.find_field(class, name) {
                    Lookup::Found(field) => return Some(Value::Expr(self.field_value(field))),
                    Lookup::Constant(owner) => {
                        return Some(Value::Expr(Typed::from_site(Ty::Class(owner), owner)))
                    }
                    Lookup::Missing { complete: false } => {
                        return Some(Value::Expr(Typed::unknown()))
                    }
                    Lookup::Missing { complete: true } => {}
                },
                None if !import.is_star => return Some(Value::Expr(Typed::unknown())),
                None => {}
            }
        }
        None
    }

    fn eval_field_access(&mut self, access: &'a ast::FieldAccessExpr, ctx: &Ctx) -> Value {
        let name = access.name.as_str();
        let from = self.type_ctx(ctx, access.range.start);
        let view = self.model.view;
        match self.eval(&access.receiver, ctx) {
            Value::Package(package) => {
                let qualified = format!("{package}.{name}");
                if let Some(class) = view.class_by_qualified_name(&qualified) {
                    self.check_access(ctx, class, from);
                    return Value::Type(Ty::Class(class));
                }
                let project = view.project();
                if project.is_package_prefix(&qualified) {
                    return Value::Package(qualified);
                }
                if project.has_package(&package) {
                    self.unresolved(ctx, name, Vec::new());
                    return Value::Expr(Typed::unknown());
                }
                Value::Package(qualified)
            }
            Value::Type(Ty::Class(class)) => {
                if matches!(self.model.find_field(class, name), Lookup::Missing { .. }) {
                    if let Lookup::Found(inner) = self.model.find_member_class(class, name) {
                        self.check_access(ctx, inner, from);
                        return Value::Type(Ty::Class(inner));
                    }
                }
                Value::Expr(self.member_field(ctx, class, name, from, false, vec![class]))
            }
            Value::Type(_) => Value::Expr(Typed::unknown()),
            Value::Expr(receiver) => Value::Expr(match &receiver.ty {
                Ty::Class(class) => {
                    self.member_field(ctx, *class, name, from, true, receiver.origin.clone())
                }
                Ty::Array(_) if name == "length" => Typed::of(Ty::Prim("int".to_string())),
                _ => Typed::unknown(),
            }),
        }
    }

    fn member_field(
        &mut self,
        ctx: &Ctx,
        class: SiteRef,
        name: &str,
        from: TypeCtx<'a>,
        instance: bool,
        targets: Vec<SiteRef>,
    ) -> Typed {
        match self.model.find_field(class, name) {
            Lookup::Found(field) => {
                if !instance && !self.sig(field).is_some_and(|sig| sig.is_static) {
                    let kind = ProblemKind::StaticContext {
                        name: name.to_string(),
                    };
                    self.report(ctx, kind, vec![field]);
                }
                self.check_access(ctx, field, from);
                self.field_value(field)
            }
            Lookup::Constant(owner) => Typed::from_site(Ty::Class(owner), owner),
            Lookup::Missing { complete: true } => {
                self.unresolved(ctx, name, targets);
                Typed::unknown()
            }
            Lookup::Missing { complete: false } => Typed::unknown(),
        }
    }

    fn check_final_write(&mut self, ctx: &Ctx, target: &Typed) {
        let Some(field) = target.field else {
            return;
        };
        let Some(sig) = self.sig(field) else {
            return;
        };
        if !sig.is_final {
            return;
        }
        if ctx.init_of.is_some() && ctx.init_of == self.model.view.parent(field) {
            return;
        }
        let name = sig.name.clone();
        self.report(ctx, ProblemKind::AssignToFinal { name }, vec![field]);
    }

    fn check_call(&mut self, call: &'a ast::CallExpr, ctx: &Ctx) -> Typed {
        let args: Vec<Typed> = call.args.iter().map(|arg| self.check_expr(arg, ctx)).collect();
        let from = self.type_ctx(ctx, call.range.start);
        match call.callee.as_ref() {
            Expr::Name(callee) => self.call_unqualified(ctx, &callee.name, &args, from),
            Expr::FieldAccess(access) => {
                let name = access.name.as_str();
                match self.eval(&access.receiver, ctx) {
                    Value::Type(Ty::Class(class)) => {
                        self.call_member(ctx, class, name, &args, from, false, vec![class])
                    }
                    Value::Expr(Typed {
                        ty: Ty::Class(class),
                        origin,
                        ..
                    }) => self.call_member(ctx, class, name, &args, from, true, origin),
                    Value::Expr(_) | Value::Type(_) | Value::Package(_) => Typed::unknown(),
                }
            }
            other => {
                self.check_expr(other, ctx);
                Typed::unknown()
            }
        }
    }

    fn call_unqualified(&mut self, ctx: &Ctx, name: &str, args: &[Typed], from: TypeCtx<'a>) -> Typed {
        if name == "super" || name == "this" {
            return Typed::unknown();
        }
        let mut searched = Vec::new();
        for frame in ctx.frames.iter().rev() {
            let Some(class) = frame.class else {
                return Typed::unknown();
            };
            searched.push(class);
            let (methods, complete) = self.model.find_methods(class, name);
            if !methods.is_empty() {
                return self.invoke(ctx, name, &methods, args, from, frame.instance);
            }
            if !complete {
                return Typed::unknown();
            }
        }

        let file = self.file;
        let view = self.model.view;
        for import in &file.unit.imports {
            if !import.is_static {
                continue;
            }
            let class_path = if import.is_star {
                import.path.as_str()
            } else {
                match import.path.rsplit_once('.') {
                    Some((class, member)) if member == name => class,
                    _ => continue,
                }
            };
            let Some(class) = view.class_by_qualified_name(class_path) else {
                return Typed::unknown();
            };
            let (methods, complete) = self.model.find_methods(class, name);
            if !methods.is_empty() {
                return self.invoke(ctx, name, &methods, args, from, false);
            }
            if !complete {
                return Typed::unknown();
            }
        }

        if self.model.is_probe(name) {
            self.unresolved(ctx, name, searched);
        }
        Typed::unknown()
    }

    #[allow(clippy::too_many_arguments)]
    fn call_member(
        &mut self,
        ctx: &Ctx,
        class: SiteRef,
        name: &str,
        args: &[Typed],
        from: TypeCtx<'a>,
        instance: bool,
        targets: Vec<SiteRef>,
    ) -> Typed {
        let (methods, complete) = self.model.find_methods(class, name);
        if methods.is_empty() {
            if complete {
                self.unresolved(ctx, name, targets);
            }
            return Typed::unknown();
        }
        self.invoke(ctx, name, &methods, args, from, instance)
    }

    fn invoke(
        &mut self,
        ctx: &Ctx,
        name: &str,
        candidates: &[SiteRef],
        args: &[Typed],
        from: TypeCtx<'a>,
        instance: bool,
    ) -> Typed {
        let Some(&method) = candidates.iter().find(|&&method| self.applicable(method, args)) else {
            let mut targets = candidates.to_vec();
            targets.extend(args.iter().flat_map(|arg| arg.origin.iter().copied()));
            let kind = ProblemKind::WrongArguments {
                name: name.to_string(),
            };
            self.report(ctx, kind, targets);
            return Typed::unknown();
        };
        if !instance && !self.sig(method).is_some_and(|sig| sig.is_static) {
            let kind = ProblemKind::StaticContext {
                name: name.to_string(),
            };
            self.report(ctx, kind, vec![method]);
        }
        self.check_access(ctx, method, from);
        Typed::from_site(self.model.declared_type(method), method)
    }

    fn applicable(&self, method: SiteRef, args: &[Typed]) -> bool {
        let Some(sig) = self.sig(method) else {
            return true;
        };
        let params = self.model.param_types(method);
        let accepts = |param: &Ty, arg: &Typed| self.model.assignable(param, &arg.ty, arg.literal);
        if !sig.is_varargs {
            return params.len() == args.len()
                && params.iter().zip(args).all(|(param, arg)| accepts(param, arg));
        }
        let Some((last, fixed)) = params.split_last() else {
            return args.is_empty();
        };
        if args.len() < fixed.len() {
            return false;
        }
        let (head, rest) = args.split_at(fixed.len());
        let fixed_ok = fixed.iter().zip(head).all(|(param, arg)| accepts(param, arg));
        let spread = rest.iter().all(|arg| accepts(last, arg));
        let direct = match rest {
            [single] => accepts(&Ty::Array(Box::new(last.clone())), single),
            _ => false,
        };
        fixed_ok && (spread || direct)
    }

    fn check_new(&mut self, new: &'a ast::NewExpr, ctx: &Ctx) -> Typed {
        let args: Vec<Typed> = new.args.iter().map(|arg| self.check_expr(arg, ctx)).collect();
        let from = self.type_ctx(ctx, new.range.start);
        let ty = self.resolve_type_ref(ctx, from, &new.ty);
        let class = match ty {
            Ty::Class(class) if new.ty.array_dims == 0 => Some(class),
            _ => None,
        };
        if let Some(class) = class {
            self.check_instantiation(ctx, class, new, &args, from);
        }

        if let Some(body) = &new.body {
            let mut inner = ctx.clone();
            inner.frames.push(Frame {
                class,
                instance: true,
                anonymous: true,
            });
            inner.method = None;
            inner.return_ty = None;
            inner.init_of = None;
            self.check_members(&body.members, None, &inner);

            if let Some(class) = class {
                let own: Vec<&'a ast::MethodDecl> = body
                    .members
                    .iter()
                    .filter_map(|member| match member {
                        MemberDecl::Method(method) => Some(method),
                        _ => None,
                    })
                    .collect();
                self.check_implemented(ctx, class, &own, true);
            }
        }

        match class {
            Some(class) => Typed::from_site(Ty::Class(class), class),
            None => Typed::of(ty),
        }
    }

    fn check_instantiation(
        &mut self,
        ctx: &Ctx,
        class: SiteRef,
        new: &'a ast::NewExpr,
        args: &[Typed],
        from: TypeCtx<'a>,
    ) {
        let Some(sig) = self.sig(class) else {
            return;
        };
        let name = sig.name.clone();
        let arg_origins = || args.iter().flat_map(|arg| arg.origin.iter().copied());

        if new.body.is_none() && sig.is_abstract {
            let kind = ProblemKind::AbstractInstantiation { name: name.clone() };
            self.report(ctx, kind, vec![class]);
        }
        if new.body.is_some() && (sig.is_final || sig.class_kind == Some(ClassKind::Enum)) {
            let kind = ProblemKind::FinalInheritance { name: name.clone() };
            self.report(ctx, kind, vec![class]);
        }
        if sig.needs_outer_instance && !self.has_outer_instance(ctx, class) {
            let kind = ProblemKind::StaticContext { name: name.clone() };
            self.report(ctx, kind, vec![class]);
        }

        let constructors = if sig.is_interface() {
            Vec::new()
        } else {
            self.model.constructors(class)
        };
        if constructors.is_empty() {
            if !args.is_empty() {
                let mut targets = vec![class];
                targets.extend(arg_origins());
                self.report(ctx, ProblemKind::WrongArguments { name }, targets);
            }
            return;
        }
        match constructors
            .iter()
            .find(|&&ctor| self.applicable(ctor, args))
        {
            Some(&ctor) => {
                self.check_access(ctx, ctor, from);
            }
            None => {
                let mut targets = constructors.clone();
                targets.extend(arg_origins());
                self.report(ctx, ProblemKind::WrongArguments { name }, targets);
            }
        }
    }

    fn has_outer_instance(&self, ctx: &Ctx, inner: SiteRef) -> bool {
        let Some(outer) = self.model.view.parent(inner) else {
            return true;
        };
        ctx.frames.iter().any(|frame| {
            frame.instance
                && match frame.class {
                    Some(class) => {
                        class == outer
                            || self.model.is_subclass(class, &Ty::Class(outer)) != Some(false)
                    }
                    None => true,
                }
        })
    }
}

fn numeric_promotion(a: &Ty, b: &Ty) -> Ty {
    fn rank(ty: &Ty) -> Option<u8> {
        match ty {
            Ty::Prim(name) => match name.as_str() {
                "double" => Some(4),
                "float" => Some(3),
                "long" => Some(2),
                "int" | "short" | "byte" | "char" => Some(1),
                _ => None,
            },
            _ => None,
        }
    }
    match (rank(a), rank(b)) {
        (Some(a), Some(b)) => Ty::Prim(
            match a.max(b) {
                4 => "double",
                3 => "float",
                2 => "long",
                _ => "int",
            }
            .to_string(),
        ),
        _ => Ty::Unknown,
    }
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

    fn probes(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn anchor_text(parsed: &ParsedFile, anchor: u32) -> String {
        let range = parsed.anchor(anchor).expect("anchor").range;
        parsed.text[range.start..range.end].to_string()
    }

    /// Every diagnostic in `file`, as (anchor text, problem).
    fn diags(project: &ProjectSnapshot, file: u32, names: &[&str]) -> Vec<(String, ProblemKind)> {
        let probes = probes(names);
        let parsed = project.file(FileId::from_raw(file)).expect("file");
        check_file(View::new(project), parsed, &probes)
            .into_iter()
            .map(|diag| (anchor_text(parsed, diag.anchor), diag.kind))
            .collect()
    }

    fn site(project: &ProjectSnapshot, file: u32, path: &str) -> SiteRef {
        let parsed = project.file(FileId::from_raw(file)).expect("file");
        parsed.site_ref(parsed.find(path).expect("declaration"))
    }

    fn snapshot_of(text: &str, path: &str) -> Snapshot {
        let parsed = ParsedFile::parse(FileId::from_raw(99), 0, Arc::new(text.to_string()));
        let index = parsed.find(path).expect("declaration");
        parsed.decls[index as usize].snapshot.clone()
    }

    fn unresolved(name: &str) -> ProblemKind {
        ProblemKind::UnresolvedReference {
            name: name.to_string(),
        }
    }

    #[test]
    fn retyped_field_breaks_assignment_to_local() {
        let project = project(&[
            "package foo; public class A { public static int count; }",
            "package bar; import foo.A; class B { void m() { String s = A.count; } }",
        ]);
        assert_eq!(
            diags(&project, 1, &["count"]),
            vec![(
                "String s = A.count;".to_string(),
                ProblemKind::TypeMismatch {
                    expected: "String".to_string(),
                    found: "int".to_string()
                }
            )]
        );

        let previous = snapshot_of(
            "package foo; public class A { public static String count; }",
            "A.count",
        );
        let probes = probes(&["count"]);
        let change = Change {
            site: site(&project, 0, "A.count"),
            previous: Some(&previous),
            kind: ChangeKind::Breaking,
            probes: &probes,
        };
        let findings = verify_file(&project, FileId::from_raw(1), &change, &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind.tag(), "type-mismatch");
    }

    #[test]
    fn renamed_class_breaks_anonymous_instantiation() {
        let project = project(&[
            "package foo; public class Bar extends Parent {}",
            "package foo; public class Parent {}",
            "package bar; import foo.*; class B { void m() { Parent parent = new A() {}; } }",
        ]);
        assert_eq!(
            diags(&project, 2, &["A", "Bar"]),
            vec![("Parent parent = new A() {};".to_string(), unresolved("A"))]
        );

        let previous = snapshot_of("package foo; public class A extends Parent {}", "A");
        let probes = probes(&["A", "Bar"]);
        let change = Change {
            site: site(&project, 0, "Bar"),
            previous: Some(&previous),
            kind: ChangeKind::Breaking,
            probes: &probes,
        };
        let findings = verify_file(&project, FileId::from_raw(2), &change, &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, unresolved("A"));
    }

    #[test]
    fn already_broken_elements_need_retention() {
        let project = project(&[
            "package foo; public class A { public static int count; }",
            "package foo; class B { void m() { String s = A.count; A.missing = 1; } }",
        ]);
        let probes = probes(&["count"]);
        let change = Change {
            site: site(&project, 0, "A.count"),
            previous: None,
            kind: ChangeKind::NonBreaking,
            probes: &probes,
        };
        assert!(verify_file(&project, FileId::from_raw(1), &change, &[]).is_empty());

        let parsed = project.file(FileId::from_raw(1)).expect("file");
        let start = parsed.text.find("String s").expect("statement");
        let retained = [Span::new(start, start + "String s = A.count;".len())];
        let findings = verify_file(&project, FileId::from_raw(1), &change, &retained);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].range, retained[0]);
    }

    #[test]
    fn final_fields_may_only_be_assigned_during_construction() {
        let project = project(&[
            "package foo; public class A { final int x; A() { x = 1; } void set() { x = 2; this.x++; } }",
        ]);
        assert_eq!(
            diags(&project, 0, &[]),
            vec![
                (
                    "x = 2;".to_string(),
                    ProblemKind::AssignToFinal {
                        name: "x".to_string()
                    }
                ),
                (
                    "this.x++;".to_string(),
                    ProblemKind::AssignToFinal {
                        name: "x".to_string()
                    }
                ),
            ]
        );
    }

    #[test]
    fn modifier_violations() {
        let project = project(&[
            "package foo;\n\
             public class A {\n\
               int value;\n\
               class Inner {}\n\
               static void s() { int v = value; Inner i = new Inner(); }\n\
             }\n\
             abstract class Shape {}\n\
             final class Leaf {}\n\
             class Use {\n\
               void m() { Shape s = new Shape(); Leaf l = new Leaf() {}; }\n\
             }\n",
        ]);
        let name = |name: &str| name.to_string();
        assert_eq!(
            diags(&project, 0, &[]),
            vec![
                (
                    name("int v = value;"),
                    ProblemKind::StaticContext { name: name("value") }
                ),
                (
                    name("Inner i = new Inner();"),
                    ProblemKind::StaticContext { name: name("Inner") }
                ),
                (
                    name("Shape s = new Shape();"),
                    ProblemKind::AbstractInstantiation { name: name("Shape") }
                ),
                (
                    name("Leaf l = new Leaf() {};"),
                    ProblemKind::FinalInheritance { name: name("Leaf") }
                ),
            ]
        );
    }

    #[test]
    fn hierarchy_violations() {
        let project = project(&[
            "package foo;\n\
             interface Shape {}\n\
             class Base { final void run() {} void walk(int steps) {} }\n\
             class Square extends Shape {}\n\
             class Circle implements Base {}\n\
             class Runner extends Base { void run() {} @Override void walk(String steps) {} }\n",
        ]);
        let tags: Vec<(String, &str)> = diags(&project, 0, &[])
            .into_iter()
            .map(|(text, kind)| (text, kind.tag()))
            .collect();
        let header = |text: &str| text.to_string();
        assert_eq!(
            tags,
            vec![
                (header("class Square extends Shape "), "hierarchy-violation"),
                (header("class Circle implements Base "), "hierarchy-violation"),
                (header("void run() "), "hierarchy-violation"),
                (header("@Override void walk(String steps) "), "hierarchy-violation"),
            ]
        );
    }

    #[test]
    fn call_arity_and_overloads() {
        let project = project(&[
            "package foo;\n\
             class Util {\n\
               static int twice(int x) { return x * 2; }\n\
               static int twice(long x) { return 0; }\n\
               static void log(String format, Object... args) {}\n\
             }\n\
             class Use {\n\
               void m() {\n\
                 int a = Util.twice(1);\n\
                 Util.log(\"x\", 1, 2);\n\
                 Util.log(\"x\");\n\
                 Util.twice(\"no\");\n\
                 String s = Util.twice(2);\n\
               }\n\
             }\n",
        ]);
        let name = |name: &str| name.to_string();
        assert_eq!(
            diags(&project, 0, &[]),
            vec![
                (
                    name("Util.twice(\"no\");"),
                    ProblemKind::WrongArguments { name: name("twice") }
                ),
                (
                    name("String s = Util.twice(2);"),
                    ProblemKind::TypeMismatch {
                        expected: name("String"),
                        found: name("int")
                    }
                ),
            ]
        );
    }

    #[test]
    fn external_references_are_never_reported() {
        let project = project(&[
            "package foo;\n\
             import java.util.List;\n\
             import org.example.*;\n\
             class Use extends org.example.Base {\n\
               List<String> names;\n\
               void m() { Widget w = new Widget(1, 2); w.frob(); inherited = 3; java.util.Collections.sort(names); }\n\
             }\n",
        ]);
        assert_eq!(diags(&project, 0, &["Widget", "inherited"]), vec![]);
    }

    #[test]
    fn missing_implementation_of_interface_method() {
        let project = project(&[
            "package foo;\n\
             interface Shape { double area(); }\n\
             class Square implements Shape { public double area() { return 1.0; } }\n\
             class Blob implements Shape {}\n\
             class Use { Shape s = new Shape() {}; }\n",
        ]);
        let area = site(&project, 0, "Shape.area");
        let probes = probes(&[]);
        let parsed = project.file(FileId::from_raw(0)).expect("file");
        let found: Vec<(String, bool)> = check_file(View::new(&project), parsed, &probes)
            .into_iter()
            .map(|diag| (anchor_text(parsed, diag.anchor), diag.targets.contains(&area)))
            .collect();
        assert_eq!(
            found,
            vec![
                ("class Blob implements Shape ".to_string(), true),
                ("Shape s = new Shape() {};".to_string(), true),
            ]
        );
    }
}
