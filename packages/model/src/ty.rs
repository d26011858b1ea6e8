use crate::{ArcStr, DeclFile};

/// A single qualifier hop accumulated while walking a DWARF type-reference
/// chain, stored outermost-first (the order it prints after the name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Pointer,
    Constant,
    Volatile,
    Reference,
}

impl Modifier {
    pub fn token(self) -> &'static str {
        match self {
            Modifier::Pointer => "*",
            Modifier::Constant => "const",
            Modifier::Volatile => "volatile",
            Modifier::Reference => "&",
        }
    }
}

/// A resolved type reference: the terminal named node of a DWARF type chain
/// plus every modifier hop collected along the way. Always a value type,
/// never shared by ownership.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Type {
    pub name: ArcStr,
    pub namespaces: Vec<ArcStr>,
    pub modifiers: Vec<Modifier>,
    pub decl_file: Option<DeclFile>,
    pub array: bool,
    pub array_size: Option<u64>,
    pub byte_size: Option<u64>,
    pub base: bool,
    /// Global DIE offset of the reference that failed to resolve, when
    /// known, so the renderer can print `<<ERROR_UNKNOWN - 0xOFFSET>>`.
    pub unresolved_offset: Option<u64>,
}

impl Type {
    pub fn unresolved() -> Self {
        Self {
            name: "<<unknown>>".into(),
            ..Default::default()
        }
    }

    pub fn unresolved_at(offset: u64) -> Self {
        Self {
            name: "<<unknown>>".into(),
            unresolved_offset: Some(offset),
            ..Default::default()
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.name.as_ref() == "<<unknown>>"
    }

    /// Prepends a modifier, keeping the outermost-first ordering invariant
    /// (each hop during resolution is closer to the root than what came
    /// before it).
    pub fn push_front_modifier(&mut self, modifier: Modifier) {
        self.modifiers.insert(0, modifier);
    }

    /// Prepends a namespace segment, keeping outermost-first ordering.
    pub fn push_front_namespace(&mut self, segment: ArcStr) {
        self.namespaces.insert(0, segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_order_is_outermost_first() {
        let mut ty = Type::default();
        ty.push_front_modifier(Modifier::Pointer);
        ty.push_front_modifier(Modifier::Constant);
        // `const T *` accumulates pointer first (innermost hop), then const
        // prepended in front of it, matching the "const *" rendering.
        assert_eq!(ty.modifiers, vec![Modifier::Constant, Modifier::Pointer]);
    }
}
