//! Structural fingerprints of declarations.
//!
//! A [`Snapshot`] captures the parts of a class, field, or method that code in other files can
//! observe. Snapshots are range-insensitive: moving a declaration or editing a method body
//! yields an equal snapshot.

use std::fmt;

use nova_syntax::ast::{self, ClassKind, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclKind {
    Class,
    Field,
    Method,
}

/// A type as written in a signature, without source ranges.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeSig {
    pub name: String,
    pub args: Vec<TypeSig>,
    pub dims: u8,
}

impl TypeSig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            dims: 0,
        }
    }

    pub fn from_type_ref(ty: &ast::TypeRef) -> Self {
        Self {
            name: ty.name.clone(),
            args: ty.type_args.iter().map(TypeSig::from_type_ref).collect(),
            dims: ty.array_dims,
        }
    }

    /// Last segment of the name (`java.util.List` -> `List`).
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn element(&self) -> TypeSig {
        TypeSig {
            dims: self.dims.saturating_sub(1),
            ..self.clone()
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (idx, arg) in self.args.iter().enumerate() {
                if idx > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSig({self})")
    }
}

/// Externally visible shape of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot {
    pub kind: DeclKind,
    pub name: String,
    pub class_kind: Option<ClassKind>,
    /// Dotted name for top-level and member classes; `None` for local classes and members.
    pub qualified_name: Option<String>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    /// Field type or method return type. `None` for classes and constructors.
    pub ty: Option<TypeSig>,
    pub params: Vec<TypeSig>,
    pub is_varargs: bool,
    pub is_constructor: bool,
    pub extends: Vec<TypeSig>,
    pub implements: Vec<TypeSig>,
    /// Member classes only: instances need an enclosing instance.
    pub needs_outer_instance: bool,
    pub is_local: bool,
    /// Sorted annotation names.
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    Unchanged,
    NonBreaking,
    Breaking,
}

/// Where a declaration sits; everything [`Snapshot`] capture needs besides the node itself.
#[derive(Debug, Clone, Copy)]
pub struct DeclContext<'a> {
    pub package: &'a str,
    /// Snapshot of the enclosing class, if any.
    pub owner: Option<&'a Snapshot>,
    /// Declared inside a method body (or inside such a class).
    pub is_local: bool,
}

impl DeclContext<'_> {
    fn in_interface(&self) -> bool {
        self.owner
            .and_then(|owner| owner.class_kind)
            .is_some_and(ClassKind::is_interface)
    }
}

impl Snapshot {
    fn base(kind: DeclKind, name: &str, modifiers: &ast::Modifiers, ctx: DeclContext<'_>) -> Self {
        let mut annotations: Vec<String> = modifiers
            .annotations
            .iter()
            .map(|ann| ann.name.clone())
            .collect();
        annotations.sort();
        annotations.dedup();

        let mut visibility = modifiers.visibility;
        if ctx.in_interface() && visibility == Visibility::Package {
            visibility = Visibility::Public;
        }

        Snapshot {
            kind,
            name: name.to_string(),
            class_kind: None,
            qualified_name: None,
            visibility,
            is_static: modifiers.is_static,
            is_final: modifiers.is_final,
            is_abstract: modifiers.is_abstract,
            ty: None,
            params: Vec::new(),
            is_varargs: false,
            is_constructor: false,
            extends: Vec::new(),
            implements: Vec::new(),
            needs_outer_instance: false,
            is_local: ctx.is_local,
            annotations,
        }
    }

    pub fn capture_class(ctx: DeclContext<'_>, decl: &ast::ClassDecl) -> Self {
        let mut snapshot = Self::base(DeclKind::Class, &decl.name, &decl.modifiers, ctx);
        snapshot.class_kind = Some(decl.kind);
        snapshot.extends = decl.extends.iter().map(TypeSig::from_type_ref).collect();
        snapshot.implements = decl.implements.iter().map(TypeSig::from_type_ref).collect();

        match decl.kind {
            ClassKind::Interface | ClassKind::Annotation => snapshot.is_abstract = true,
            ClassKind::Record => snapshot.is_final = true,
            ClassKind::Class | ClassKind::Enum => {}
        }

        if let Some(owner) = ctx.owner {
            // Nested enums, records and interfaces are implicitly static, as is every
            // member type of an interface.
            if decl.kind != ClassKind::Class || ctx.in_interface() {
                snapshot.is_static = true;
            }
            snapshot.needs_outer_instance = !ctx.is_local && !snapshot.is_static;
            if !ctx.is_local {
                snapshot.qualified_name = owner
                    .qualified_name
                    .as_ref()
                    .map(|outer| format!("{outer}.{}", decl.name));
            }
        } else if !ctx.is_local {
            snapshot.qualified_name = Some(if ctx.package.is_empty() {
                decl.name.clone()
            } else {
                format!("{}.{}", ctx.package, decl.name)
            });
        }

        snapshot
    }

    pub fn capture_field(ctx: DeclContext<'_>, decl: &ast::FieldDecl) -> Self {
        let mut snapshot = Self::base(DeclKind::Field, &decl.name, &decl.modifiers, ctx);
        if ctx.in_interface() {
            snapshot.is_static = true;
            snapshot.is_final = true;
        }
        snapshot.ty = Some(TypeSig::from_type_ref(&decl.ty));
        snapshot
    }

    pub fn capture_method(ctx: DeclContext<'_>, decl: &ast::MethodDecl) -> Self {
        let mut snapshot = Self::base(DeclKind::Method, &decl.name, &decl.modifiers, ctx);
        if ctx.in_interface()
            && decl.body.is_none()
            && !decl.modifiers.is_static
            && !decl.modifiers.is_default
        {
            snapshot.is_abstract = true;
        }
        snapshot.ty = Some(TypeSig::from_type_ref(&decl.return_ty));
        snapshot.params = decl
            .params
            .iter()
            .map(|param| TypeSig::from_type_ref(&param.ty))
            .collect();
        snapshot.is_varargs = decl.params.last().is_some_and(|param| param.is_varargs);
        snapshot
    }

    pub fn capture_constructor(ctx: DeclContext<'_>, decl: &ast::ConstructorDecl) -> Self {
        let mut snapshot = Self::base(DeclKind::Method, &decl.name, &decl.modifiers, ctx);
        snapshot.is_constructor = true;
        snapshot.params = decl
            .params
            .iter()
            .map(|param| TypeSig::from_type_ref(&param.ty))
            .collect();
        snapshot.is_varargs = decl.params.last().is_some_and(|param| param.is_varargs);
        snapshot
    }

    pub fn is_class(&self) -> bool {
        self.kind == DeclKind::Class
    }

    pub fn is_interface(&self) -> bool {
        self.class_kind.is_some_and(ClassKind::is_interface)
    }
}

/// Classifies the difference between two snapshots of the same declaration.
pub fn diff(old: &Snapshot, new: &Snapshot) -> ChangeKind {
    if old == new {
        return ChangeKind::Unchanged;
    }

    let breaking = old.kind != new.kind
        || old.name != new.name
        || old.class_kind != new.class_kind
        || old.qualified_name != new.qualified_name
        || old.ty != new.ty
        || old.params != new.params
        || old.is_varargs != new.is_varargs
        || old.is_constructor != new.is_constructor
        || old.extends != new.extends
        || old.implements != new.implements
        || old.is_static != new.is_static
        || old.is_final != new.is_final
        || old.is_abstract != new.is_abstract
        || old.needs_outer_instance != new.needs_outer_instance
        || old.is_local != new.is_local
        || new.visibility < old.visibility;

    if breaking {
        ChangeKind::Breaking
    } else {
        // Only visibility widening and annotation changes remain.
        ChangeKind::NonBreaking
    }
}
