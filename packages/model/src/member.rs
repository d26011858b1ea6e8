use crate::{Accessibility, ArcStr, DeclFile, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<ArcStr>,
    pub ty: Type,
    /// Position among formal-parameter children, used to synthesize
    /// `argN` names when `name` is absent.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: ArcStr,
    pub ty: Type,
    pub accessibility: Accessibility,
    pub is_static: bool,
    /// Raw `DW_AT_const_value` bytes, decoded at render time according to
    /// the field's resolved type (float/int array reinterpretation is a
    /// rendering concern, not an extraction one).
    pub const_value: Option<Vec<u8>>,
    pub array_size: Option<u64>,
    pub data_member_location: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: ArcStr,
    pub return_type: Option<Type>,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_virtual: bool,
    /// Named formal parameters, contributed by the out-of-line definition
    /// DIE. Preferred by renderers when non-empty.
    pub parameters: Vec<Parameter>,
    /// Formal parameters from the declaration-site DIE, usually unnamed.
    /// Fallback when `parameters` is empty.
    pub direct_parameters: Vec<Parameter>,
    pub low_pc: Option<u64>,
    /// Global DIE offset of the declaration, used as the method's identity
    /// when unifying declaration and definition DIEs.
    pub offset: u64,
    pub decl_file: Option<DeclFile>,
    pub fully_defined: bool,
    pub linkage_name: Option<ArcStr>,
}

impl Method {
    /// The parameter list renderers should use: named parameters from the
    /// definition site if present, otherwise the declaration's unnamed ones.
    pub fn rendered_parameters(&self) -> &[Parameter] {
        if self.parameters.is_empty() {
            &self.direct_parameters
        } else {
            &self.parameters
        }
    }

    pub fn is_destructor(&self) -> bool {
        self.name.as_ref().starts_with('~')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    pub name: ArcStr,
    pub value: i64,
}

/// A member of a class/struct/union body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Field(Field),
    Method(Method),
    /// An anonymous union member: its fields are hoisted into the owning
    /// container's accessibility/naming scope but kept grouped here so the
    /// renderer can still emit a nested `union { ... };` block.
    AnonymousUnion(Vec<Member>),
    /// A nested enum declared directly inside a class/struct body.
    NestedEnum(crate::EnumerationType),
}

impl Member {
    pub fn accessibility(&self) -> Accessibility {
        match self {
            Member::Field(f) => f.accessibility,
            Member::Method(m) => m.accessibility,
            Member::AnonymousUnion(_) => Accessibility::Private,
            Member::NestedEnum(e) => e.accessibility,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_prefers_named_parameters() {
        let mut method = Method {
            name: "f".into(),
            return_type: None,
            accessibility: Accessibility::Public,
            is_static: false,
            is_virtual: false,
            parameters: vec![],
            direct_parameters: vec![Parameter {
                name: None,
                ty: Type::default(),
                offset: 0,
            }],
            low_pc: None,
            offset: 0,
            decl_file: None,
            fully_defined: true,
            linkage_name: None,
        };
        assert_eq!(method.rendered_parameters().len(), 1);
        method.parameters.push(Parameter {
            name: Some("y".into()),
            ty: Type::default(),
            offset: 0,
        });
        assert_eq!(method.rendered_parameters().len(), 1);
        assert_eq!(
            method.rendered_parameters()[0].name.as_ref().unwrap().as_ref(),
            "y"
        );
    }
}
