/// C++ member/inheritance accessibility.
///
/// Absence of `DW_AT_accessibility` in DWARF means private; unrecognized
/// values (`>= 3`, or the ones GCC/Clang never actually emit) render as
/// public rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accessibility {
    #[default]
    Private = 0,
    Public = 1,
    Protected = 2,
}

impl Accessibility {
    /// Maps a raw `DW_AT_accessibility` constant. `None` (attribute absent)
    /// is private; any value other than 1/2 is public.
    pub fn from_dwarf(value: Option<u64>) -> Self {
        match value {
            None => Accessibility::Private,
            Some(1) => Accessibility::Public,
            Some(2) => Accessibility::Protected,
            Some(_) => Accessibility::Public,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Accessibility::Private => "private",
            Accessibility::Public => "public",
            Accessibility::Protected => "protected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_private() {
        assert_eq!(Accessibility::from_dwarf(None), Accessibility::Private);
    }

    #[test]
    fn unknown_is_public() {
        assert_eq!(Accessibility::from_dwarf(Some(7)), Accessibility::Public);
        assert_eq!(Accessibility::from_dwarf(Some(3)), Accessibility::Public);
    }

    #[test]
    fn known_values_roundtrip() {
        assert_eq!(Accessibility::from_dwarf(Some(1)), Accessibility::Public);
        assert_eq!(Accessibility::from_dwarf(Some(2)), Accessibility::Protected);
    }
}
