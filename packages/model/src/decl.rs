use crate::{Accessibility, ArcStr, DeclFile, Member, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inheritance {
    pub class: Type,
    pub accessibility: Accessibility,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub name: ArcStr,
    pub decl_file: Option<DeclFile>,
    pub accessibility: Accessibility,
    pub inheritance: Option<Inheritance>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: ArcStr,
    pub decl_file: Option<DeclFile>,
    pub accessibility: Accessibility,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union {
    pub name: ArcStr,
    pub decl_file: Option<DeclFile>,
    pub accessibility: Accessibility,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: ArcStr,
    pub decl_file: Option<DeclFile>,
    pub entities: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: ArcStr,
    pub decl_file: Option<DeclFile>,
    pub accessibility: Accessibility,
    pub target: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationType {
    pub name: ArcStr,
    pub decl_file: Option<DeclFile>,
    pub accessibility: Accessibility,
    pub enumerators: Vec<crate::Enumerator>,
    pub backing_type: Type,
}

/// A top-level reconstructed declaration entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Class(Class),
    Struct(Struct),
    Union(Union),
    Namespace(Namespace),
    TypeDef(TypeDef),
    Enum(EnumerationType),
}

impl Declaration {
    pub fn name(&self) -> &ArcStr {
        match self {
            Declaration::Class(c) => &c.name,
            Declaration::Struct(s) => &s.name,
            Declaration::Union(u) => &u.name,
            Declaration::Namespace(n) => &n.name,
            Declaration::TypeDef(t) => &t.name,
            Declaration::Enum(e) => &e.name,
        }
    }

    pub fn decl_file(&self) -> Option<&DeclFile> {
        match self {
            Declaration::Class(c) => c.decl_file.as_ref(),
            Declaration::Struct(s) => s.decl_file.as_ref(),
            Declaration::Union(u) => u.decl_file.as_ref(),
            Declaration::Namespace(n) => n.decl_file.as_ref(),
            Declaration::TypeDef(t) => t.decl_file.as_ref(),
            Declaration::Enum(e) => e.decl_file.as_ref(),
        }
    }

    /// The kind discriminant used as half of the Entries Storage dedup key.
    pub fn kind(&self) -> &'static str {
        match self {
            Declaration::Class(_) => "class",
            Declaration::Struct(_) => "struct",
            Declaration::Union(_) => "union",
            Declaration::Namespace(_) => "namespace",
            Declaration::TypeDef(_) => "typedef",
            Declaration::Enum(_) => "enum",
        }
    }

    /// Per-kind size proxy used by Entries Storage to pick the most
    /// informative duplicate of a named entity.
    pub fn fill_value(&self) -> usize {
        match self {
            Declaration::Class(c) => c.members.len(),
            Declaration::Struct(s) => s.members.len(),
            Declaration::Union(u) => u.members.len(),
            Declaration::Namespace(n) => n.entities.len(),
            Declaration::TypeDef(t) => usize::from(!t.target.name.as_ref().is_empty()),
            Declaration::Enum(e) => e.enumerators.len(),
        }
    }
}
